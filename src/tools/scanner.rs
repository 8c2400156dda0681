//! 文件扫描模块
//!
//! 批量解码时递归扫描目录中的FLAC文件。

use super::constants::io::FLAC_EXTENSIONS;
use super::utils::path;
use crate::{AudioError, AudioResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 递归扫描目录中的FLAC文件，按路径排序
pub fn scan_flac_files(dir_path: &Path) -> AudioResult<Vec<PathBuf>> {
    if !dir_path.exists() {
        return Err(AudioError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("目录不存在: {}", dir_path.display()),
        )));
    }

    if !dir_path.is_dir() {
        return Err(AudioError::InvalidInput(format!(
            "路径不是目录: {}",
            dir_path.display()
        )));
    }

    let mut flac_files: Vec<PathBuf> = WalkDir::new(dir_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| path::has_extension(e.path(), FLAC_EXTENSIONS))
        .map(|e| e.into_path())
        .collect();

    flac_files.sort();
    Ok(flac_files)
}

/// 显示文件扫描结果（标准错误）
pub fn show_scan_results(dir_path: &Path, flac_files: &[PathBuf], verbose: bool) {
    if flac_files.is_empty() {
        eprintln!("⚠️  在目录 {} 中没有找到FLAC文件", dir_path.display());
        return;
    }

    eprintln!("📁 扫描目录: {}", dir_path.display());
    eprintln!("🎵 找到 {} 个FLAC文件", flac_files.len());

    if verbose {
        for (i, file) in flac_files.iter().enumerate() {
            eprintln!("   {}. {}", i + 1, path::extract_filename_lossy(file));
        }
    }
}
