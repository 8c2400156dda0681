//! 分块编码器模块
//!
//! 把扁平的交错PCM缓冲按固定块大小切分，逐块解交错后交给码流协作方。

use super::bitstream::{BlockWriter, StreamHeader};
use super::block::ChannelBlock;
use super::deinterleave::deinterleave;
use super::flac_writer::FlacBlockWriter;
use super::format::{BitDepth, PcmFormat};
use crate::error::{AudioError, AudioResult};
use std::io::Write;

/// 默认块大小（每声道样本数）
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// FLAC允许的最小块大小
pub const MIN_BLOCK_SIZE: usize = 16;

/// FLAC允许的最大块大小
pub const MAX_BLOCK_SIZE: usize = 65535;

/// 分块编码器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEncoder {
    block_size: usize,
}

impl Default for BlockEncoder {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl BlockEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用自定义块大小（16-65535）
    pub fn with_block_size(block_size: usize) -> AudioResult<Self> {
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size) {
            return Err(AudioError::InvalidInput(format!(
                "块大小 {block_size} 超出范围 {MIN_BLOCK_SIZE}-{MAX_BLOCK_SIZE}"
            )));
        }
        Ok(Self { block_size })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// 编码交错PCM
    ///
    /// 1. 校验长度为整帧的整数倍（否则 `LengthMismatch`，协作方不会被创建）
    /// 2. 用码流头打开协作方
    /// 3. 逐块解交错并写入，声道缓冲按块大小只分配一次
    /// 4. 收尾
    ///
    /// 任一步失败都会中止整个操作。
    pub fn encode_with<B, F>(&self, pcm: &[u8], format: PcmFormat, open: F) -> AudioResult<()>
    where
        B: BlockWriter,
        F: FnOnce(&StreamHeader) -> AudioResult<B>,
    {
        let frame_size = format.frame_size();
        if pcm.len() % frame_size != 0 {
            return Err(AudioError::LengthMismatch {
                pcm_len: pcm.len(),
                frame_size,
            });
        }

        let total_samples = pcm.len() / frame_size;
        let header = StreamHeader {
            format,
            total_samples: total_samples as u64,
            block_size: self.block_size,
        };

        let mut writer = open(&header)?;
        let mut block = ChannelBlock::with_capacity(format.channels_usize(), self.block_size);

        let mut remaining = total_samples;
        let mut offset = 0;
        let mut blocks = 0usize;
        while remaining > 0 {
            let block_samples = remaining.min(self.block_size);

            deinterleave(&mut block, pcm, offset, block_samples, format.bit_depth());
            writer.write_block(&block)?;

            offset += block_samples * frame_size;
            remaining -= block_samples;
            blocks += 1;
        }

        tracing::debug!("分块完成: {total_samples} 样本/声道, {blocks} 块");
        writer.finish()
    }
}

/// 把交错小端有符号PCM编码为FLAC码流写入 `writer`（[`decode`](super::decode) 的逆运算）
///
/// flacenc只能编码8-24位：4位和32位PCM返回 `UnsupportedBitDepth`，不写入任何字节。
pub fn encode<W: Write>(writer: W, pcm: &[u8], format: PcmFormat) -> AudioResult<()> {
    let depth = format.bit_depth();
    if matches!(depth, BitDepth::Depth4 | BitDepth::Depth32) {
        return Err(AudioError::UnsupportedBitDepth(depth.bits()));
    }

    BlockEncoder::new().encode_with(pcm, format, |header| FlacBlockWriter::new(writer, header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorded {
        header: Option<StreamHeader>,
        blocks: Vec<Vec<Vec<i32>>>,
        finished: bool,
    }

    /// Mock 编码协作方：记录收到的码流头和块，可在第 N 块注入失败
    struct RecordingWriter {
        log: Rc<RefCell<Recorded>>,
        fail_at: Option<usize>,
    }

    impl BlockWriter for RecordingWriter {
        fn write_block(&mut self, block: &ChannelBlock) -> AudioResult<()> {
            let mut log = self.log.borrow_mut();
            if self.fail_at == Some(log.blocks.len()) {
                return Err(error::encoding_error("写入帧失败", "注入的错误"));
            }
            log.blocks.push(block.to_vecs());
            Ok(())
        }

        fn finish(self) -> AudioResult<()> {
            self.log.borrow_mut().finished = true;
            Ok(())
        }
    }

    fn record(
        encoder: BlockEncoder,
        pcm: &[u8],
        format: PcmFormat,
        fail_at: Option<usize>,
    ) -> (AudioResult<()>, Rc<RefCell<Recorded>>) {
        let log = Rc::new(RefCell::new(Recorded::default()));
        let shared = Rc::clone(&log);
        let result = encoder.encode_with(pcm, format, |header| {
            shared.borrow_mut().header = Some(*header);
            Ok(RecordingWriter {
                log: Rc::clone(&shared),
                fail_at,
            })
        });
        (result, log)
    }

    #[test]
    fn test_block_splitting() {
        let format = PcmFormat::new(44100, BitDepth::Depth8, 1).unwrap();
        let pcm: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();

        let (result, log) = record(BlockEncoder::new(), &pcm, format, None);
        result.unwrap();

        let log = log.borrow();
        let sizes: Vec<usize> = log.blocks.iter().map(|b| b[0].len()).collect();
        assert_eq!(sizes, vec![4096, 4096, 1808]);
        assert!(log.finished);

        let header = log.header.unwrap();
        assert_eq!(header.total_samples, 10_000);
        assert_eq!(header.block_size, DEFAULT_BLOCK_SIZE);

        let flat: Vec<i32> = log.blocks.iter().flat_map(|b| b[0].iter().copied()).collect();
        let expected: Vec<i32> = pcm.iter().map(|&b| i32::from(b as i8)).collect();
        assert_eq!(flat, expected);
    }

    #[test]
    fn test_length_mismatch_opens_nothing() {
        let format = PcmFormat::new(44100, BitDepth::Depth24, 2).unwrap();
        let (result, log) = record(BlockEncoder::new(), &[0u8; 13], format, None);

        match result {
            Err(AudioError::LengthMismatch {
                pcm_len,
                frame_size,
            }) => {
                assert_eq!(pcm_len, 13);
                assert_eq!(frame_size, 6);
            }
            other => panic!("应返回LengthMismatch，实际: {other:?}"),
        }
        let log = log.borrow();
        assert!(log.header.is_none());
        assert!(log.blocks.is_empty());
    }

    #[test]
    fn test_write_failure_aborts_without_finish() {
        let format = PcmFormat::new(8000, BitDepth::Depth16, 1).unwrap();
        let encoder = BlockEncoder::with_block_size(16).unwrap();
        let pcm = vec![0u8; 16 * 2 * 5];

        let (result, log) = record(encoder, &pcm, format, Some(2));
        assert!(matches!(result, Err(AudioError::EncodingError(_))));

        let log = log.borrow();
        assert_eq!(log.blocks.len(), 2);
        assert!(!log.finished);
    }

    #[test]
    fn test_empty_input_still_finishes() {
        let format = PcmFormat::new(44100, BitDepth::Depth32, 8).unwrap();
        let (result, log) = record(BlockEncoder::new(), &[], format, None);
        result.unwrap();

        let log = log.borrow();
        assert!(log.blocks.is_empty());
        assert!(log.finished);
        assert_eq!(log.header.unwrap().total_samples, 0);
    }

    #[test]
    fn test_block_size_bounds() {
        assert!(BlockEncoder::with_block_size(15).is_err());
        assert!(BlockEncoder::with_block_size(65536).is_err());
        assert_eq!(BlockEncoder::with_block_size(1152).unwrap().block_size(), 1152);
    }

    #[test]
    fn test_encode_rejects_4bit_before_writing() {
        let format = PcmFormat::new(8000, BitDepth::Depth4, 1).unwrap();
        let mut sink = Vec::new();
        assert!(matches!(
            encode(&mut sink, &[0u8; 8], format),
            Err(AudioError::UnsupportedBitDepth(4))
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_encode_rejects_32bit_before_writing() {
        let format = PcmFormat::new(48000, BitDepth::Depth32, 2).unwrap();
        let mut sink = Vec::new();
        // 长度也不合法：位深检查优先
        assert!(matches!(
            encode(&mut sink, &[0u8; 13], format),
            Err(AudioError::UnsupportedBitDepth(32))
        ));
        assert!(sink.is_empty());
    }
}
