//! 输出格式化模块
//!
//! 报告一律写到标准错误：标准输出可能承载PCM/WAV数据。

use super::processor::{BatchSummary, ConversionReport};
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};

/// 单行摘要，例如 `44100 Hz, 16-bit, 2 ch, 176400 bytes PCM`
pub fn format_summary_line(report: &ConversionReport) -> String {
    format!("{}, {} bytes PCM", report.format, report.pcm_bytes)
}

/// 输出单文件报告
pub fn print_report(report: &ConversionReport, json: bool) {
    if json {
        eprintln!(
            "{}",
            serde_json::to_string_pretty(report).unwrap_or_default()
        );
    } else {
        eprintln!("{}", format_summary_line(report));
    }
}

/// 构建批量结果表格
pub fn build_batch_table(summary: &BatchSummary) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "File / 文件",
        "Format / 格式",
        "PCM Bytes / 字节",
        "Duration (s) / 时长",
        "Time (ms) / 耗时",
    ]);

    for report in &summary.converted {
        table.add_row(vec![
            Cell::new(&report.input),
            Cell::new(report.format.to_string()),
            Cell::new(report.pcm_bytes).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", report.duration_seconds))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}", report.elapsed_ms)).set_alignment(CellAlignment::Right),
        ]);
    }

    for failure in &summary.failed {
        table.add_row(vec![
            Cell::new(&failure.input),
            Cell::new(format!("❌ {}", failure.category)),
            Cell::new(&failure.message),
            Cell::new("-").set_alignment(CellAlignment::Right),
            Cell::new("-").set_alignment(CellAlignment::Right),
        ]);
    }

    table
}

/// 输出批量汇总
pub fn print_batch_summary(summary: &BatchSummary, json: bool) {
    if json {
        eprintln!(
            "{}",
            serde_json::to_string_pretty(summary).unwrap_or_default()
        );
        return;
    }

    eprintln!("{}", build_batch_table(summary));
    eprintln!(
        "📊 批量处理统计: 成功 {} / 失败 {} / 共 {}，PCM合计 {} 字节",
        summary.converted.len(),
        summary.failed.len(),
        summary.total(),
        summary.total_pcm_bytes()
    );
}
