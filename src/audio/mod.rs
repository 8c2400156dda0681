//! FLAC ⇄ 交错PCM 转换模块
//!
//! 解码方向：码流协作方 → 分声道 i32 块 → 交错引擎 → 字节缓冲 → 调用方
//! 编码方向：调用方字节缓冲 → 分块编码器 → 解交错引擎 → 分声道 i32 块 → 码流协作方

pub mod bitstream;
pub mod block;
pub mod deinterleave;
pub mod encoder;
pub mod flac_reader;
pub mod flac_writer;
pub mod format;
pub mod interleave;
pub mod streaming;

pub use bitstream::{BlockReader, BlockWriter, StreamHeader, StreamInfo};
pub use block::ChannelBlock;
pub use deinterleave::deinterleave;
pub use encoder::{BlockEncoder, DEFAULT_BLOCK_SIZE, encode};
pub use flac_reader::FlacBlockReader;
pub use flac_writer::FlacBlockWriter;
pub use format::{BitDepth, MAX_CHANNELS, PcmFormat};
pub use interleave::interleave;
pub use streaming::{Decoder, DecoderState, decode, decode_with};
