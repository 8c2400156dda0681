//! MacinMeter FLAC-PCM - 主程序入口
//!
//! 纯流程控制器，负责协调各个工具模块完成解码/编码任务。

use macinmeter_flac_pcm::{
    error::{AudioError, ErrorCategory},
    tools::{self, AppConfig, Mode, cli::DecodeConfig},
};
use std::process;
use tracing_subscriber::EnvFilter;

/// 错误退出码定义
mod exit_codes {
    /// 通用错误
    pub const GENERAL_ERROR: i32 = 1;
    /// 格式/输入错误
    pub const FORMAT_ERROR: i32 = 2;
    /// 解码失败
    pub const DECODING_ERROR: i32 = 3;
    /// 编码失败
    pub const ENCODING_ERROR: i32 = 4;
}

/// 日志输出到标准错误（标准输出可能承载PCM数据）
///
/// `RUST_LOG` 优先；否则 `--verbose` 时为debug级别，默认只输出警告。
/// symphonia经由 `log` 发出的记录也会被桥接进来。
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
    {
        eprintln!("⚠️  日志初始化失败: {e}");
    }
}

/// 获取错误建议文本
fn get_error_suggestion(error: &AudioError) -> &'static str {
    match error {
        AudioError::InvalidInput(_) => {
            "检查命令行参数是否正确，使用 --help 查看完整用法 / Check if command-line arguments are correct, use --help to see full usage"
        }
        AudioError::UnsupportedBitDepth(_) => {
            "支持的位深: 4/8/12/16/20/24/32（4位与32位仅支持解码） / Supported depths: 4/8/12/16/20/24/32 (4-bit and 32-bit are decode-only)"
        }
        AudioError::LengthMismatch { .. } => {
            "PCM长度必须是整帧的整数倍，检查 --bits/--channels 是否与数据一致 / PCM length must be a whole number of frames, check --bits/--channels"
        }
        _ => match ErrorCategory::from_audio_error(error) {
            ErrorCategory::Io => {
                "检查文件路径是否正确，文件是否存在且可读 / Check if file path is correct, file exists and is readable"
            }
            ErrorCategory::Decoding => {
                "文件可能损坏或不是FLAC码流 / File may be corrupted or is not a FLAC stream"
            }
            ErrorCategory::Encoding => {
                "FLAC编码失败，请检查输入数据 / FLAC encoding failed, check the input data"
            }
            ErrorCategory::Format | ErrorCategory::Other => {
                "请检查输入文件和参数设置 / Please check input file and parameter settings"
            }
        },
    }
}

/// 错误处理和建议
fn handle_error(error: AudioError) -> ! {
    eprintln!("[ERROR] 错误 / Error: {error}");
    eprintln!("[INFO] 建议 / Suggestion: {}", get_error_suggestion(&error));

    let exit_code = match &error {
        AudioError::InvalidInput(_) => exit_codes::FORMAT_ERROR,
        _ => match ErrorCategory::from_audio_error(&error) {
            ErrorCategory::Format => exit_codes::FORMAT_ERROR,
            ErrorCategory::Decoding => exit_codes::DECODING_ERROR,
            ErrorCategory::Encoding => exit_codes::ENCODING_ERROR,
            ErrorCategory::Io | ErrorCategory::Other => exit_codes::GENERAL_ERROR,
        },
    };

    process::exit(exit_code);
}

/// 批量解码目录中的FLAC文件
fn process_batch_mode(config: &AppConfig, decode: &DecodeConfig) -> Result<(), AudioError> {
    let tools::cli::InputSource::File(dir) = &decode.input else {
        return Err(AudioError::InvalidInput(
            "批量模式需要目录输入".to_string(),
        ));
    };

    let flac_files = tools::scan_flac_files(dir)?;
    tools::show_scan_results(dir, &flac_files, config.verbose);

    if flac_files.is_empty() {
        return Ok(());
    }

    let summary = tools::process_batch_parallel(&flac_files, decode, config.verbose)?;
    tools::print_batch_summary(&summary, config.json);

    // 全部失败时以非零退出码结束
    if summary.converted.is_empty() && !summary.failed.is_empty() {
        return Err(AudioError::InvalidInput(format!(
            "全部 {} 个文件解码失败",
            summary.failed.len()
        )));
    }

    Ok(())
}

fn run() -> Result<(), AudioError> {
    let config = tools::parse_args();
    init_logging(config.verbose);
    tools::show_startup_info(&config);

    match &config.mode {
        Mode::Decode(decode) if decode.input.is_batch() => process_batch_mode(&config, decode),
        Mode::Decode(decode) => {
            let report = tools::decode_single(decode)?;
            tools::print_report(&report, config.json);
            Ok(())
        }
        Mode::Encode(encode) => {
            let report = tools::encode_file(encode)?;
            tools::print_report(&report, config.json);
            Ok(())
        }
    }
}

fn main() {
    if let Err(error) = run() {
        handle_error(error);
    }
}
