//! 工具函数模块
//!
//! 文件路径处理等通用工具函数。

/// 文件路径处理工具函数
pub mod path {
    use std::path::{Path, PathBuf};

    /// 提取文件名（返回String，用于日志显示）
    #[inline]
    pub fn extract_filename_lossy(path: &Path) -> String {
        path.file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    /// 安全提取文件stem（返回String）
    #[inline]
    pub fn extract_file_stem_string(path: &Path) -> String {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("audio")
            .to_string()
    }

    /// 扩展名是否在列表内（大小写不敏感）
    #[inline]
    pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| extensions.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// 批量模式的输出路径
    ///
    /// 指定输出目录时写入该目录，否则写到源文件旁，仅替换扩展名。
    pub fn batch_output_path(input: &Path, output_dir: Option<&Path>, extension: &str) -> PathBuf {
        match output_dir {
            Some(dir) => dir
                .join(extract_file_stem_string(input))
                .with_extension(extension),
            None => input.with_extension(extension),
        }
    }

}
