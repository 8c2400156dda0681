//! 转换处理模块
//!
//! 单文件解码/编码流程，以及批量模式的文件级并行处理。

use super::cli::{DecodeConfig, EncodeConfig, InputSource, OutputFormat};
use super::constants::io::WAV_EXTENSIONS;
use super::utils::path;
use super::wav;
use crate::audio::streaming::READ_CHUNK_SIZE;
use crate::audio::{Decoder, PcmFormat, encode};
use crate::error::{AudioError, AudioResult, ErrorCategory};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// 单次转换的结果报告
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub input: String,
    pub output: String,
    pub format: PcmFormat,
    pub pcm_bytes: usize,
    pub duration_seconds: f64,
    pub elapsed_ms: f64,
}

/// 批量失败条目
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub input: String,
    pub category: &'static str,
    pub message: String,
}

/// 批量处理汇总（按扫描顺序）
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub converted: Vec<ConversionReport>,
    pub failed: Vec<BatchFailure>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.converted.len() + self.failed.len()
    }

    pub fn total_pcm_bytes(&self) -> usize {
        self.converted.iter().map(|r| r.pcm_bytes).sum()
    }
}

/// 解码单个输入（文件或标准输入），输出到文件或标准输出
pub fn decode_single(config: &DecodeConfig) -> AudioResult<ConversionReport> {
    let start = Instant::now();

    let decoder = match &config.input {
        InputSource::Stdin => {
            // 标准输入不可寻址，先整体读入内存
            let mut data = Vec::new();
            std::io::stdin().lock().read_to_end(&mut data)?;
            tracing::debug!("标准输入读取 {} 字节", data.len());
            Decoder::open(Cursor::new(data))?
        }
        InputSource::File(path) => Decoder::open(BufReader::new(File::open(path)?))?,
    };

    let output_name = config
        .output_path
        .as_ref()
        .map_or_else(|| "<stdout>".to_string(), |p| p.display().to_string());

    let (format, pcm_bytes) = match &config.output_path {
        Some(path) => {
            let file = BufWriter::new(File::create(path)?);
            write_decoded(decoder, config.output_format, file)?
        }
        None => write_decoded(decoder, config.output_format, std::io::stdout().lock())?,
    };

    Ok(ConversionReport {
        input: config.input.display_name(),
        output: output_name,
        format,
        pcm_bytes,
        duration_seconds: format.duration_seconds(pcm_bytes),
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
    })
}

/// 解码单个文件到指定路径（批量模式）
pub fn decode_file(
    input: &Path,
    output: &Path,
    output_format: OutputFormat,
) -> AudioResult<ConversionReport> {
    let start = Instant::now();
    let decoder = Decoder::open(BufReader::new(File::open(input)?))?;

    let file = BufWriter::new(File::create(output)?);
    let (format, pcm_bytes) = write_decoded(decoder, output_format, file)?;

    Ok(ConversionReport {
        input: input.display().to_string(),
        output: output.display().to_string(),
        format,
        pcm_bytes,
        duration_seconds: format.duration_seconds(pcm_bytes),
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
    })
}

/// 把解码器输出写入目标，返回格式和PCM字节数
///
/// 裸PCM按块流式写出；WAV需要完整样本数，先整体解码。
fn write_decoded<W: Write>(
    mut decoder: Decoder,
    output_format: OutputFormat,
    mut out: W,
) -> AudioResult<(PcmFormat, usize)> {
    let format = decoder.format();

    let result = match output_format {
        OutputFormat::Pcm => {
            let mut chunk = vec![0u8; READ_CHUNK_SIZE];
            let mut total = 0usize;
            loop {
                let n = match decoder.read_pcm(&mut chunk) {
                    Ok(0) => break Ok(total),
                    Ok(n) => n,
                    Err(e) => break Err(e),
                };
                if let Err(e) = out.write_all(&chunk[..n]) {
                    break Err(AudioError::IoError(e));
                }
                total += n;
            }
        }
        OutputFormat::Wav => decoder.read_all().and_then(|pcm| {
            out.write_all(&wav::wav_to_vec(&pcm, format)?)?;
            Ok(pcm.len())
        }),
    };

    let closed = decoder.close();
    let pcm_bytes = result?;
    closed?;
    out.flush()?;

    Ok((format, pcm_bytes))
}

/// 编码WAV或裸PCM文件为FLAC
///
/// 先编码到内存，成功后才创建输出文件，失败时不会留下残缺的FLAC。
pub fn encode_file(config: &EncodeConfig) -> AudioResult<ConversionReport> {
    let start = Instant::now();

    let (pcm, format) = match config.raw_params {
        Some(params) => {
            let format =
                PcmFormat::from_raw(params.sample_rate, params.bits_per_sample, params.channels)?;
            (std::fs::read(&config.input_path)?, format)
        }
        None if path::has_extension(&config.input_path, WAV_EXTENSIONS) => {
            wav::read_wav(BufReader::new(File::open(&config.input_path)?))?
        }
        None => {
            return Err(AudioError::InvalidInput(format!(
                "裸PCM输入需要 --rate/--bits/--channels: {}",
                config.input_path.display()
            )));
        }
    };

    tracing::info!("编码输入: {format}, {} 字节", pcm.len());

    let mut flac = Vec::new();
    encode(&mut flac, &pcm, format)?;
    std::fs::write(&config.output_path, &flac)?;

    tracing::info!(
        "FLAC输出: {} 字节 (压缩率 {:.1}%)",
        flac.len(),
        compression_percent(flac.len(), pcm.len())
    );

    Ok(ConversionReport {
        input: config.input_path.display().to_string(),
        output: config.output_path.display().to_string(),
        format,
        pcm_bytes: pcm.len(),
        duration_seconds: format.duration_seconds(pcm.len()),
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
    })
}

fn compression_percent(compressed: usize, original: usize) -> f64 {
    if original == 0 {
        0.0
    } else {
        compressed as f64 / original as f64 * 100.0
    }
}

/// 多文件并行解码
///
/// 并行只在文件之间进行；结果保持扫描顺序，单个文件失败不影响其余文件。
pub fn process_batch_parallel(
    flac_files: &[PathBuf],
    config: &DecodeConfig,
    verbose: bool,
) -> AudioResult<BatchSummary> {
    let output_dir = config.output_path.as_deref();
    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)?;
    }

    eprintln!(
        "⚡ 启用多文件并行处理：{} 并发度",
        config.parallel_files
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.parallel_files)
        .thread_name(|i| format!("flac-worker-{i}"))
        .build()
        .map_err(|e| AudioError::InvalidInput(format!("线程池创建失败: {e}")))?;

    // par_iter().collect() 保持输入顺序
    let results: Vec<(&PathBuf, AudioResult<ConversionReport>)> = pool.install(|| {
        flac_files
            .par_iter()
            .map(|input| {
                let output = path::batch_output_path(
                    input,
                    output_dir,
                    config.output_format.extension(),
                );
                let result = decode_file(input, &output, config.output_format);

                match &result {
                    Ok(_) if verbose => {
                        eprintln!("✅ {}", path::extract_filename_lossy(input));
                    }
                    Err(e) => {
                        tracing::warn!("{} 解码失败: {e}", input.display());
                        if verbose {
                            eprintln!("❌ {} - {e}", path::extract_filename_lossy(input));
                        }
                    }
                    _ => {}
                }

                (input, result)
            })
            .collect()
    });

    let mut summary = BatchSummary::default();
    for (input, result) in results {
        match result {
            Ok(report) => summary.converted.push(report),
            Err(e) => summary.failed.push(BatchFailure {
                input: input.display().to_string(),
                category: ErrorCategory::from_audio_error(&e).display_name(),
                message: e.to_string(),
            }),
        }
    }

    Ok(summary)
}
