//! 命令行接口模块
//!
//! 负责命令行参数解析、配置管理和程序信息展示。

use super::constants::{defaults, io, parallel_limits};
use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

/// 应用程序版本信息
const VERSION: &str = env!("CARGO_PKG_VERSION");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// 解码输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// RIFF/WAVE 封装（容器位数）
    Wav,
    /// 裸交错PCM
    Pcm,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Wav => "wav",
            OutputFormat::Pcm => "pcm",
        }
    }
}

/// 输入来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// 标准输入（整体读入内存后解码）
    Stdin,
    File(PathBuf),
}

impl InputSource {
    fn parse(value: &str) -> Self {
        if value == io::STDIO_MARKER {
            InputSource::Stdin
        } else {
            InputSource::File(PathBuf::from(value))
        }
    }

    /// 是否为目录（批量模式）
    #[inline]
    pub fn is_batch(&self) -> bool {
        matches!(self, InputSource::File(path) if path.is_dir())
    }

    pub fn display_name(&self) -> String {
        match self {
            InputSource::Stdin => "<stdin>".to_string(),
            InputSource::File(path) => path.display().to_string(),
        }
    }
}

/// 裸PCM输入的格式参数（编码）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPcmParams {
    pub sample_rate: u32,
    pub bits_per_sample: u32,
    pub channels: u16,
}

/// 解码配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeConfig {
    pub input: InputSource,
    pub output_format: OutputFormat,
    /// 未指定时：单文件写到标准输出，批量模式写到源文件旁
    pub output_path: Option<PathBuf>,
    /// 批量模式的文件级并发度
    pub parallel_files: usize,
}

/// 编码配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// 裸PCM输入时必需；WAV输入时忽略
    pub raw_params: Option<RawPcmParams>,
}

/// 子命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Decode(DecodeConfig),
    Encode(EncodeConfig),
}

/// 应用程序配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub mode: Mode,

    /// 是否显示详细信息
    pub verbose: bool,

    /// 是否以JSON输出报告
    pub json: bool,
}

/// 构建命令行定义
fn build_command() -> Command {
    Command::new("flac-pcm")
        .version(VERSION)
        .about(DESCRIPTION)
        .author("MacinMeter Team")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .help("显示详细处理信息")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .help("以JSON输出处理报告（写到标准错误）")
                .action(clap::ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("decode")
                .about("FLAC → WAV/裸PCM")
                .arg(
                    Arg::new("INPUT")
                        .help("FLAC文件、目录（批量模式）或 - 表示标准输入")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("输出格式")
                        .value_parser(["wav", "pcm"])
                        .default_value(defaults::OUTPUT_FORMAT),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("输出文件（省略时写到标准输出；批量模式为输出目录）")
                        .value_name("FILE"),
                )
                .arg(
                    Arg::new("parallel-files")
                        .long("parallel-files")
                        .help("批量模式的文件级并发度（默认4，范围1-16）")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new("encode")
                .about("WAV/裸PCM → FLAC")
                .arg(
                    Arg::new("INPUT")
                        .help("WAV文件或裸交错小端PCM文件")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("输出FLAC文件")
                        .value_name("FILE")
                        .required(true),
                )
                .arg(
                    Arg::new("rate")
                        .long("rate")
                        .help("裸PCM采样率 (Hz)")
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    Arg::new("bits")
                        .long("bits")
                        .help("裸PCM位深 (8/12/16/20/24)")
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    Arg::new("channels")
                        .long("channels")
                        .help("裸PCM声道数 (1-8)")
                        .value_parser(clap::value_parser!(u16)),
                ),
        )
}

/// 解析命令行参数并创建配置
pub fn parse_args() -> AppConfig {
    config_from_matches(&build_command().get_matches())
}

/// 从给定参数解析（便于测试）
pub fn parse_args_from<I, T>(args: I) -> Result<AppConfig, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = build_command().try_get_matches_from(args)?;
    Ok(config_from_matches(&matches))
}

fn config_from_matches(matches: &ArgMatches) -> AppConfig {
    let mode = match matches.subcommand() {
        Some(("encode", sub)) => Mode::Encode(encode_config(sub)),
        Some(("decode", sub)) => Mode::Decode(decode_config(sub)),
        _ => unreachable!("subcommand_required 保证存在子命令"),
    };

    AppConfig {
        mode,
        verbose: matches.get_flag("verbose"),
        json: matches.get_flag("json"),
    }
}

fn decode_config(matches: &ArgMatches) -> DecodeConfig {
    let output_format = match matches.get_one::<String>("format").map(String::as_str) {
        Some("pcm") => OutputFormat::Pcm,
        _ => OutputFormat::Wav,
    };

    let parallel_files = matches
        .get_one::<usize>("parallel-files")
        .copied()
        .unwrap_or(defaults::PARALLEL_FILES_DEGREE)
        .clamp(
            parallel_limits::MIN_PARALLEL_DEGREE,
            parallel_limits::MAX_PARALLEL_DEGREE,
        );

    DecodeConfig {
        input: InputSource::parse(
            matches
                .get_one::<String>("INPUT")
                .map_or(io::STDIO_MARKER, String::as_str),
        ),
        output_format,
        output_path: matches
            .get_one::<String>("output")
            .filter(|path| path.as_str() != io::STDIO_MARKER)
            .map(PathBuf::from),
        parallel_files,
    }
}

fn encode_config(matches: &ArgMatches) -> EncodeConfig {
    let raw_params = match (
        matches.get_one::<u32>("rate"),
        matches.get_one::<u32>("bits"),
        matches.get_one::<u16>("channels"),
    ) {
        (Some(&sample_rate), Some(&bits_per_sample), Some(&channels)) => Some(RawPcmParams {
            sample_rate,
            bits_per_sample,
            channels,
        }),
        _ => None,
    };

    EncodeConfig {
        input_path: PathBuf::from(
            matches
                .get_one::<String>("INPUT")
                .map_or("", String::as_str),
        ),
        output_path: PathBuf::from(
            matches
                .get_one::<String>("output")
                .map_or("", String::as_str),
        ),
        raw_params,
    }
}

/// 显示程序启动信息（写到标准错误，标准输出可能承载PCM数据）
pub fn show_startup_info(config: &AppConfig) {
    if config.verbose {
        eprintln!("🚀 MacinMeter FLAC-PCM v{VERSION} 启动");
        eprintln!("📝 {DESCRIPTION}");
    }
}
