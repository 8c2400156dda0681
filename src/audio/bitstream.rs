//! 码流协作方接口
//!
//! 帧解析、线性预测和熵编解码由外部码流组件完成，本层只通过这里的两个trait
//! 与之交换逐块的分声道 i32 样本。

use super::block::ChannelBlock;
use super::format::PcmFormat;
use crate::error::AudioResult;

/// 码流元数据（解码方向，打开码流时读取一次）
///
/// 位深保持原始数值，由 [`Decoder`](super::Decoder) 负责校验。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub bits_per_sample: u32,
    pub channels: u16,
    /// 每声道总样本数（元数据未给出时为 `None`）
    pub total_samples: Option<u64>,
}

/// 码流头（编码方向，在写入任何块之前交给协作方）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    pub format: PcmFormat,
    /// 每声道总样本数
    pub total_samples: u64,
    /// 固定块大小（最后一块可以更短）
    pub block_size: usize,
}

/// 解码协作方：逐块产出分声道样本
pub trait BlockReader {
    /// 码流元数据
    fn stream_info(&self) -> StreamInfo;

    /// 解析下一块
    ///
    /// - `Ok(Some(block))` - 新的一块，引用在下次调用前有效
    /// - `Ok(None)` - 正常的流结束
    /// - `Err(_)` - 读取或解析失败
    fn next_block(&mut self) -> AudioResult<Option<&ChannelBlock>>;

    /// 释放底层码流（可重复调用）
    fn close(&mut self) -> AudioResult<()> {
        Ok(())
    }
}

/// 编码协作方：逐块接收分声道样本
pub trait BlockWriter {
    /// 写入一块（`block.len()` 为实际块长度）
    fn write_block(&mut self, block: &ChannelBlock) -> AudioResult<()>;

    /// 收尾并刷新到目标
    fn finish(self) -> AudioResult<()>
    where
        Self: Sized;
}
