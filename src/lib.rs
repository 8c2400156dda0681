//! MacinMeter FLAC ⇄ PCM
//!
//! 无损码流内部的分声道样本与扁平交错小端有符号PCM字节之间的逐位精确转换。
//!
//! ## 核心特性
//! - 7种位深：4/8/12/16/20/24/32位（4/12/20位符号扩展到1/2/3字节容器）
//! - 1-8声道，任意采样率
//! - 立体声整字打包快速路径，与通用N声道路径逐字节一致
//! - 流式解码器：按块拉取，内部缓冲跨块复用
//! - 分块编码器：固定4096样本块，声道缓冲只分配一次

pub mod audio;
pub mod error;
pub mod tools;

// 重新导出核心类型
pub use audio::{
    BitDepth, BlockEncoder, ChannelBlock, Decoder, PcmFormat, decode, deinterleave, encode,
    interleave,
};
pub use error::{AudioError, AudioResult, ErrorCategory};
