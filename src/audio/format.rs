//! 音频格式信息模块
//!
//! 定义位深枚举和PCM格式三元组 (采样率, 位深, 声道数)。

use crate::error::{AudioError, AudioResult};
use serde::Serialize;
use std::fmt;

/// 支持的最大声道数（FLAC码流上限）
pub const MAX_CHANNELS: u16 = 8;

/// PCM位深
///
/// 封闭枚举：集合由FLAC码流规范固定，不需要扩展点。
/// 4/12/20位样本不以非字节对齐的方式存储，而是符号扩展后放入1/2/3字节容器。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "u32")]
pub enum BitDepth {
    Depth4,
    Depth8,
    Depth12,
    Depth16,
    Depth20,
    Depth24,
    Depth32,
}

impl BitDepth {
    /// 全部支持的位深（升序）
    pub const ALL: [BitDepth; 7] = [
        BitDepth::Depth4,
        BitDepth::Depth8,
        BitDepth::Depth12,
        BitDepth::Depth16,
        BitDepth::Depth20,
        BitDepth::Depth24,
        BitDepth::Depth32,
    ];

    /// 有效位数
    pub const fn bits(self) -> u32 {
        match self {
            BitDepth::Depth4 => 4,
            BitDepth::Depth8 => 8,
            BitDepth::Depth12 => 12,
            BitDepth::Depth16 => 16,
            BitDepth::Depth20 => 20,
            BitDepth::Depth24 => 24,
            BitDepth::Depth32 => 32,
        }
    }

    /// 容器宽度（字节）
    ///
    /// - 4/8位 → 1字节
    /// - 12/16位 → 2字节
    /// - 20/24位 → 3字节
    /// - 32位 → 4字节
    pub const fn container_width(self) -> usize {
        match self {
            BitDepth::Depth4 | BitDepth::Depth8 => 1,
            BitDepth::Depth12 | BitDepth::Depth16 => 2,
            BitDepth::Depth20 | BitDepth::Depth24 => 3,
            BitDepth::Depth32 => 4,
        }
    }

    /// 容器位数（WAV头的 bits_per_sample 使用此值，例如20位写成24位）
    pub const fn container_bits(self) -> u16 {
        (self.container_width() * 8) as u16
    }

    /// 该位深可表示的最小值
    pub const fn min_value(self) -> i32 {
        match self {
            BitDepth::Depth32 => i32::MIN,
            _ => -(1 << (self.bits() - 1)),
        }
    }

    /// 该位深可表示的最大值
    pub const fn max_value(self) -> i32 {
        match self {
            BitDepth::Depth32 => i32::MAX,
            _ => (1 << (self.bits() - 1)) - 1,
        }
    }
}

impl TryFrom<u32> for BitDepth {
    type Error = AudioError;

    fn try_from(bits: u32) -> AudioResult<Self> {
        BitDepth::ALL
            .into_iter()
            .find(|depth| depth.bits() == bits)
            .ok_or(AudioError::UnsupportedBitDepth(bits))
    }
}

impl From<BitDepth> for u32 {
    fn from(depth: BitDepth) -> Self {
        depth.bits()
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// PCM格式信息
///
/// 构造后不可变：解码时由码流元数据生成一次，编码时由调用方提供。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PcmFormat {
    sample_rate: u32,
    bit_depth: BitDepth,
    channels: u16,
}

impl PcmFormat {
    /// 创建新的PCM格式并校验参数
    pub fn new(sample_rate: u32, bit_depth: BitDepth, channels: u16) -> AudioResult<Self> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidInput("采样率不能为0".to_string()));
        }
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(AudioError::InvalidInput(format!(
                "不支持的声道数: {channels}（仅支持1-{MAX_CHANNELS}声道）"
            )));
        }

        Ok(Self {
            sample_rate,
            bit_depth,
            channels,
        })
    }

    /// 由原始位数构造（码流元数据、命令行参数）
    ///
    /// 位深不在支持集合内时返回 [`AudioError::UnsupportedBitDepth`]。
    pub fn from_raw(sample_rate: u32, bits_per_sample: u32, channels: u16) -> AudioResult<Self> {
        let bit_depth = BitDepth::try_from(bits_per_sample)?;
        Self::new(sample_rate, bit_depth, channels)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// 获取声道数（usize类型）
    ///
    /// 辅助方法，用于数组索引和循环边界，避免重复的类型转换
    pub fn channels_usize(&self) -> usize {
        self.channels as usize
    }

    /// 一个采样帧（所有声道各一个样本）的字节数
    pub fn frame_size(&self) -> usize {
        self.channels_usize() * self.bit_depth.container_width()
    }

    /// 指定样本数（每声道）对应的交错字节数
    pub fn byte_len(&self, samples: usize) -> usize {
        samples * self.frame_size()
    }

    /// 交错字节数对应的样本数（每声道），不足一帧的尾部被忽略
    pub fn sample_count(&self, bytes: usize) -> usize {
        bytes / self.frame_size()
    }

    /// 交错字节数对应的时长（秒）
    pub fn duration_seconds(&self, bytes: usize) -> f64 {
        self.sample_count(bytes) as f64 / self.sample_rate as f64
    }

    /// WAV封装使用的位数（容器位数）
    pub fn wav_bits_per_sample(&self) -> u16 {
        self.bit_depth.container_bits()
    }
}

impl fmt::Display for PcmFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {}-bit, {} ch",
            self.sample_rate, self.bit_depth, self.channels
        )
    }
}
