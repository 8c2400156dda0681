//! 分声道样本块
//!
//! 一个音频块的N个声道数组。底层存储按最大块大小一次性分配，
//! 每块只调整"当前有效长度"，避免解码/编码热循环中的逐块分配。

use crate::error::{AudioError, AudioResult};

/// 分声道样本块（每声道 `len` 个 i32 样本）
///
/// 样本始终为全精度的32位有符号值，与最终的容器宽度无关。
/// 下一块会覆盖同一存储，调用方不得跨块保留引用。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelBlock {
    storage: Vec<Vec<i32>>,
    len: usize,
}

impl ChannelBlock {
    /// 按最大块大小预分配
    pub fn with_capacity(channels: usize, max_block_size: usize) -> Self {
        Self {
            storage: vec![vec![0; max_block_size]; channels],
            len: 0,
        }
    }

    /// 由已有的声道数组构造（所有声道长度必须一致）
    pub fn from_channels(channels: Vec<Vec<i32>>) -> AudioResult<Self> {
        let len = channels.first().map_or(0, Vec::len);
        if let Some(bad) = channels.iter().position(|ch| ch.len() != len) {
            return Err(AudioError::InvalidInput(format!(
                "声道{bad}长度为{}，与声道0的{len}不一致",
                channels[bad].len()
            )));
        }

        Ok(Self {
            storage: channels,
            len,
        })
    }

    /// 设置当前有效长度
    ///
    /// 不超过已有存储时只调整视图；超过时扩容（只增不减）。
    pub fn set_len(&mut self, len: usize) {
        for channel in &mut self.storage {
            if channel.len() < len {
                channel.resize(len, 0);
            }
        }
        self.len = len;
    }

    /// 当前块的样本数（每声道）
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn channel_count(&self) -> usize {
        self.storage.len()
    }

    /// 已分配的每声道容量
    pub fn capacity(&self) -> usize {
        self.storage.iter().map(Vec::len).min().unwrap_or(0)
    }

    /// 指定声道的有效样本
    pub fn channel(&self, ch: usize) -> &[i32] {
        &self.storage[ch][..self.len]
    }

    pub fn channel_mut(&mut self, ch: usize) -> &mut [i32] {
        let len = self.len;
        &mut self.storage[ch][..len]
    }

    /// 按声道顺序遍历有效样本
    pub fn channels(&self) -> impl Iterator<Item = &[i32]> {
        self.storage.iter().map(move |ch| &ch[..self.len])
    }

    /// 复制出当前块（测试与诊断用）
    pub fn to_vecs(&self) -> Vec<Vec<i32>> {
        self.channels().map(<[i32]>::to_vec).collect()
    }
}
