//! 常量和默认配置集中管理
//!
//! 将CLI相关的常量集中定义，避免"默认值漂移"和重复定义

/// 输入/输出相关常量
pub mod io {
    /// 表示标准输入/标准输出的路径占位符
    pub const STDIO_MARKER: &str = "-";

    /// 批量模式扫描的FLAC扩展名
    pub const FLAC_EXTENSIONS: &[&str] = &["flac"];

    /// WAV输入识别的扩展名
    pub const WAV_EXTENSIONS: &[&str] = &["wav", "wave"];
}

/// 默认配置值
pub mod defaults {
    /// 默认解码输出格式
    pub const OUTPUT_FORMAT: &str = "wav";

    /// 默认多文件并行并发度
    ///
    /// 并行只发生在文件之间，单个文件的解码仍是单线程
    pub const PARALLEL_FILES_DEGREE: usize = 4;
}

/// 并发度限制常量
pub mod parallel_limits {
    /// 最小并发度
    pub const MIN_PARALLEL_DEGREE: usize = 1;

    /// 最大并发度
    pub const MAX_PARALLEL_DEGREE: usize = 16;
}
