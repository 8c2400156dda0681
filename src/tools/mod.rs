//! 工具模块集合
//!
//! 包含CLI、文件处理、格式化等工具模块，支持main.rs的流程控制。

pub mod cli;
pub mod constants;
pub mod formatter;
pub mod processor;
pub mod scanner;
pub mod utils;
pub mod wav;

// 重新导出主要的公共接口
pub use cli::{AppConfig, Mode, OutputFormat, parse_args, show_startup_info};
pub use formatter::{print_batch_summary, print_report};
pub use processor::{
    BatchSummary, ConversionReport, decode_file, decode_single, encode_file,
    process_batch_parallel,
};
pub use scanner::{scan_flac_files, show_scan_results};
pub use utils::path;
pub use wav::{read_wav, wav_to_vec, write_wav};
