//! pcm-bench: 交错/解交错引擎吞吐量基准工具
//!
//! 对每种位深和声道数测量交错与解交错的吞吐量 (MB/s)。
//!
//! 用法：
//!   pcm-bench                      # 默认：1/2/6/8声道 × 全部位深
//!   pcm-bench -s 4096 -n 50        # 自定义块大小与轮数
//!   pcm-bench -f json              # JSON 输出

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use macinmeter_flac_pcm::audio::{BitDepth, ChannelBlock, PcmFormat, deinterleave, interleave};
use serde::Serialize;
use std::hint::black_box;
use std::time::Instant;

const DEFAULT_BLOCK_SAMPLES: usize = 4096;
const DEFAULT_ROUNDS: usize = 200;

#[derive(Parser)]
#[command(name = "pcm-bench")]
#[command(about = "交错引擎吞吐量基准 / Interleave engine throughput benchmark")]
#[command(version)]
struct Cli {
    /// 每块样本数（每声道）
    #[arg(long, short = 's', default_value_t = DEFAULT_BLOCK_SAMPLES)]
    block_samples: usize,

    /// 每种组合的轮数
    #[arg(long, short = 'n', default_value_t = DEFAULT_ROUNDS)]
    rounds: usize,

    /// 声道数列表
    #[arg(long, short = 'c', value_delimiter = ',', default_values_t = [1u16, 2, 6, 8])]
    channels: Vec<u16>,

    /// 输出格式: table, json
    #[arg(long, short = 'f', default_value = "table")]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {s} / 未知格式: {s}")),
        }
    }
}

/// 单个组合的测量结果
#[derive(Serialize)]
struct BenchResult {
    bits: u32,
    channels: u16,
    bytes_per_round: usize,
    interleave_mb_s: f64,
    deinterleave_mb_s: f64,
}

/// 生成确定性的满量程噪声块
fn noise_block(channels: u16, samples: usize, depth: BitDepth) -> Result<ChannelBlock> {
    let mut state = 0x2545_f491_4f6c_dd1du64;
    let span = (i64::from(depth.max_value()) - i64::from(depth.min_value()) + 1) as u64;

    let data = (0..channels)
        .map(|_| {
            (0..samples)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    (i64::from(depth.min_value()) + (state % span) as i64) as i32
                })
                .collect()
        })
        .collect();

    ChannelBlock::from_channels(data).context("构建噪声块失败 / Failed to build noise block")
}

fn mb_per_second(bytes: usize, rounds: usize, seconds: f64) -> f64 {
    if seconds <= 0.0 {
        return 0.0;
    }
    (bytes * rounds) as f64 / (1024.0 * 1024.0) / seconds
}

fn run_one(depth: BitDepth, channels: u16, cli: &Cli) -> Result<BenchResult> {
    let format = PcmFormat::new(44100, depth, channels)
        .with_context(|| format!("无效组合 / Invalid combination: {depth}-bit × {channels} ch"))?;
    let source = noise_block(channels, cli.block_samples, depth)?;
    let bytes = format.byte_len(cli.block_samples);

    let mut pcm = vec![0u8; bytes];
    let start = Instant::now();
    for _ in 0..cli.rounds {
        interleave(black_box(&mut pcm), black_box(&source), depth);
    }
    let interleave_secs = start.elapsed().as_secs_f64();

    let mut decoded = ChannelBlock::with_capacity(format.channels_usize(), cli.block_samples);
    let start = Instant::now();
    for _ in 0..cli.rounds {
        deinterleave(
            black_box(&mut decoded),
            black_box(&pcm),
            0,
            cli.block_samples,
            depth,
        );
    }
    let deinterleave_secs = start.elapsed().as_secs_f64();

    anyhow::ensure!(
        decoded.to_vecs() == source.to_vecs(),
        "往返结果不一致 / Round-trip mismatch: {depth}-bit × {channels} ch"
    );

    Ok(BenchResult {
        bits: depth.bits(),
        channels,
        bytes_per_round: bytes,
        interleave_mb_s: mb_per_second(bytes, cli.rounds, interleave_secs),
        deinterleave_mb_s: mb_per_second(bytes, cli.rounds, deinterleave_secs),
    })
}

fn output_table(results: &[BenchResult], cli: &Cli) {
    println!("PCM Engine Benchmark / 交错引擎基准");
    println!("================================");
    println!(
        "Block / 块: {} samples, Rounds / 轮数: {}\n",
        cli.block_samples, cli.rounds
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Bits / 位深",
        "Channels / 声道",
        "Bytes / 字节",
        "Interleave (MB/s)",
        "Deinterleave (MB/s)",
    ]);

    for r in results {
        table.add_row(vec![
            Cell::new(r.bits).set_alignment(CellAlignment::Right),
            Cell::new(r.channels).set_alignment(CellAlignment::Right),
            Cell::new(r.bytes_per_round).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}", r.interleave_mb_s)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}", r.deinterleave_mb_s)).set_alignment(CellAlignment::Right),
        ]);
    }

    println!("{table}");
}

fn output_json(results: &[BenchResult]) {
    println!(
        "{}",
        serde_json::to_string_pretty(results).unwrap_or_default()
    );
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    anyhow::ensure!(cli.block_samples > 0, "块大小必须大于0 / Block size must be positive");

    let mut results = Vec::new();
    for &channels in &cli.channels {
        for depth in BitDepth::ALL {
            eprintln!("Running / 运行: {depth}-bit × {channels} ch");
            results.push(run_one(depth, channels, &cli)?);
        }
    }

    match cli.format {
        OutputFormat::Table => output_table(&results, &cli),
        OutputFormat::Json => output_json(&results),
    }

    Ok(())
}
