//! 流式解码器模块
//!
//! 从码流协作方逐块拉取分声道样本，经交错引擎写入内部缓冲，
//! 以拉取式字节流的形式交给调用方。

use super::bitstream::BlockReader;
use super::flac_reader::FlacBlockReader;
use super::format::{BitDepth, PcmFormat};
use super::interleave::interleave;
use crate::error::{self, AudioError, AudioResult};
use std::io::{self, Read, Seek};

/// 一次性解码时每次拉取的字节数
pub const READ_CHUNK_SIZE: usize = 64 * 1024;

/// 解码器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// 还可能产出字节
    Active,
    /// 协作方已报告流结束（缓冲中可能仍有未读字节）
    Drained,
    /// 读取块失败，之后的读取全部报错
    Failed,
}

/// 流式PCM解码器
///
/// 内部缓冲只增不减：新块字节数不超过已有容量时复用存储，否则扩容。
/// 单线程使用，状态完全归本实例所有。
///
/// # 使用示例
///
/// ```ignore
/// let mut decoder = Decoder::open(std::fs::File::open("track.flac")?)?;
/// let format = decoder.format();
/// let mut chunk = [0u8; 4096];
/// loop {
///     let n = decoder.read_pcm(&mut chunk)?;
///     if n == 0 {
///         break;
///     }
///     sink.write_all(&chunk[..n])?;
/// }
/// decoder.close()?;
/// ```
pub struct Decoder<R: BlockReader = FlacBlockReader> {
    reader: R,
    format: PcmFormat,
    buf: Vec<u8>,
    buf_off: usize,
    state: DecoderState,
    /// 读取失败但本次调用已交付部分字节时，错误延迟到下一次调用返回
    pending_error: Option<AudioError>,
    samples_decoded: u64,
    total_samples: Option<u64>,
}

impl Decoder<FlacBlockReader> {
    /// 打开FLAC码流
    ///
    /// - 码流无法打开或元数据无效：`ReadFailure`
    /// - 位深不在支持集合内：`UnsupportedBitDepth`（码流随即关闭）
    pub fn open<S>(source: S) -> AudioResult<Self>
    where
        S: Read + Seek + Send + Sync + 'static,
    {
        Self::from_reader(FlacBlockReader::open(source)?)
    }
}

impl<R: BlockReader> Decoder<R> {
    /// 基于任意码流协作方创建解码器
    pub fn from_reader(mut reader: R) -> AudioResult<Self> {
        let info = reader.stream_info();

        let format = BitDepth::try_from(info.bits_per_sample)
            .and_then(|depth| PcmFormat::new(info.sample_rate, depth, info.channels));

        let format = match format {
            Ok(format) => format,
            Err(err) => {
                if let Err(close_err) = reader.close() {
                    tracing::warn!("关闭码流失败: {close_err}");
                }
                return Err(err);
            }
        };

        Ok(Self {
            reader,
            format,
            buf: Vec::new(),
            buf_off: 0,
            state: DecoderState::Active,
            pending_error: None,
            samples_decoded: 0,
            total_samples: info.total_samples,
        })
    }

    /// PCM输出格式
    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// 流已结束且缓冲已读空
    pub fn is_drained(&self) -> bool {
        self.state == DecoderState::Drained && self.buf_off >= self.buf.len()
    }

    /// 码流元数据声明的每声道总样本数
    pub fn total_samples(&self) -> Option<u64> {
        self.total_samples
    }

    /// 已解码（已交错进缓冲）的每声道样本数
    pub fn samples_decoded(&self) -> u64 {
        self.samples_decoded
    }

    /// 解码进度 (0.0-1.0)，总样本数未知时返回 0.0
    pub fn progress(&self) -> f32 {
        match self.total_samples {
            Some(total) if total > 0 => {
                (self.samples_decoded as f64 / total as f64).min(1.0) as f32
            }
            _ => 0.0,
        }
    }

    /// 读取最多 `out.len()` 个PCM字节
    ///
    /// 返回 `Ok(0)` 表示流结束（`out` 为空时也返回0）。
    /// 先取上一块剩余的字节，读空后再向协作方拉取下一块。
    pub fn read_pcm(&mut self, out: &mut [u8]) -> AudioResult<usize> {
        if let Some(err) = self.pending_error.take() {
            self.state = DecoderState::Failed;
            return Err(err);
        }

        let mut written = 0;
        while written < out.len() {
            if self.buf_off < self.buf.len() {
                let n = (self.buf.len() - self.buf_off).min(out.len() - written);
                out[written..written + n]
                    .copy_from_slice(&self.buf[self.buf_off..self.buf_off + n]);
                self.buf_off += n;
                written += n;
                continue;
            }

            match self.state {
                DecoderState::Drained => break,
                DecoderState::Failed => {
                    if written > 0 {
                        break;
                    }
                    return Err(error::read_failure_msg("解码器已因先前的错误停止"));
                }
                DecoderState::Active => {}
            }

            match self.fill_next_block() {
                Ok(true) => {}
                Ok(false) => {
                    self.state = DecoderState::Drained;
                    tracing::debug!("解码完成: {} 样本/声道", self.samples_decoded);
                }
                Err(err) => {
                    if written > 0 {
                        tracing::warn!("读取块失败，已交付 {written} 字节，错误延迟返回: {err}");
                        self.pending_error = Some(err);
                        break;
                    }
                    self.state = DecoderState::Failed;
                    return Err(err);
                }
            }
        }

        Ok(written)
    }

    /// 读取剩余全部PCM字节
    pub fn read_all(&mut self) -> AudioResult<Vec<u8>> {
        let remaining_hint = self
            .total_samples
            .map(|total| total.saturating_sub(self.samples_decoded))
            .and_then(|samples| usize::try_from(samples).ok())
            .map_or(0, |samples| samples.saturating_mul(self.format.frame_size()));

        let mut pcm = Vec::with_capacity(remaining_hint);
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        loop {
            let n = self.read_pcm(&mut chunk)?;
            if n == 0 {
                break;
            }
            pcm.extend_from_slice(&chunk[..n]);
        }
        Ok(pcm)
    }

    /// 释放底层码流（可重复调用）
    pub fn close(&mut self) -> AudioResult<()> {
        self.reader.close()
    }

    /// 拉取下一块并交错进内部缓冲，流结束时返回 `false`
    fn fill_next_block(&mut self) -> AudioResult<bool> {
        let Some(block) = self.reader.next_block()? else {
            return Ok(false);
        };

        let channels = self.format.channels_usize();
        if block.channel_count() != channels {
            return Err(error::read_failure_msg(format!(
                "块声道数 {} 与流格式的 {channels} 不一致",
                block.channel_count()
            )));
        }

        let block_bytes = self.format.byte_len(block.len());
        self.buf.resize(block_bytes, 0);
        interleave(&mut self.buf, block, self.format.bit_depth());

        self.buf_off = 0;
        self.samples_decoded += block.len() as u64;
        Ok(true)
    }
}

impl<R: BlockReader> Read for Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_pcm(buf).map_err(io::Error::other)
    }
}

/// 一次性解码FLAC码流为交错小端有符号PCM字节
///
/// 保留原始位深：16位FLAC输出s16le，20位输出符号扩展的s24le，依此类推。
pub fn decode<S>(source: S) -> AudioResult<(Vec<u8>, PcmFormat)>
where
    S: Read + Seek + Send + Sync + 'static,
{
    decode_with(FlacBlockReader::open(source)?)
}

/// 基于任意码流协作方的一次性解码
pub fn decode_with<R: BlockReader>(reader: R) -> AudioResult<(Vec<u8>, PcmFormat)> {
    let mut decoder = Decoder::from_reader(reader)?;
    let result = decoder.read_all();
    let closed = decoder.close();

    let pcm = result?;
    closed?;
    Ok((pcm, decoder.format()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::bitstream::StreamInfo;
    use crate::audio::block::ChannelBlock;

    /// Mock 码流协作方：按顺序返回预设块，可在第 N 块注入错误
    struct MockReader {
        info: StreamInfo,
        blocks: Vec<ChannelBlock>,
        current: Option<ChannelBlock>,
        position: usize,
        error_at: Option<usize>,
        closed: bool,
    }

    impl MockReader {
        fn new(bits: u32, channels: u16, blocks: Vec<Vec<Vec<i32>>>) -> Self {
            let total: usize = blocks.iter().map(|b| b[0].len()).sum();
            Self {
                info: StreamInfo {
                    sample_rate: 48000,
                    bits_per_sample: bits,
                    channels,
                    total_samples: Some(total as u64),
                },
                blocks: blocks
                    .into_iter()
                    .map(|b| ChannelBlock::from_channels(b).unwrap())
                    .collect(),
                current: None,
                position: 0,
                error_at: None,
                closed: false,
            }
        }

        fn with_error_at(mut self, block_index: usize) -> Self {
            self.error_at = Some(block_index);
            self
        }
    }

    impl BlockReader for MockReader {
        fn stream_info(&self) -> StreamInfo {
            self.info
        }

        fn next_block(&mut self) -> AudioResult<Option<&ChannelBlock>> {
            if self.error_at == Some(self.position) {
                self.position += 1;
                return Err(error::read_failure_msg("注入的帧错误"));
            }
            if self.position >= self.blocks.len() {
                return Ok(None);
            }
            self.current = Some(self.blocks[self.position].clone());
            self.position += 1;
            Ok(self.current.as_ref())
        }

        fn close(&mut self) -> AudioResult<()> {
            self.closed = true;
            Ok(())
        }
    }

    fn stereo_blocks() -> Vec<Vec<Vec<i32>>> {
        vec![
            vec![vec![1, 2, 3], vec![-1, -2, -3]],
            vec![vec![4], vec![-4]],
            vec![vec![5, 6], vec![-5, -6]],
        ]
    }

    #[test]
    fn test_streaming_reads_all_blocks() {
        let mut decoder = Decoder::from_reader(MockReader::new(8, 2, stereo_blocks())).unwrap();
        assert_eq!(decoder.format(), PcmFormat::new(48000, BitDepth::Depth8, 2).unwrap());

        let pcm = decoder.read_all().unwrap();
        assert_eq!(
            pcm,
            vec![1, 0xFF, 2, 0xFE, 3, 0xFD, 4, 0xFC, 5, 0xFB, 6, 0xFA]
        );
        assert!(decoder.is_drained());
        assert_eq!(decoder.samples_decoded(), 6);
        assert!((decoder.progress() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_byte_at_a_time_matches_one_shot() {
        let (whole, _) = decode_with(MockReader::new(16, 2, stereo_blocks())).unwrap();

        let mut decoder = Decoder::from_reader(MockReader::new(16, 2, stereo_blocks())).unwrap();
        let mut bytes = Vec::new();
        let mut one = [0u8; 1];
        while decoder.read_pcm(&mut one).unwrap() == 1 {
            bytes.push(one[0]);
        }
        assert_eq!(bytes, whole);
        assert_eq!(whole.len(), 6 * 2 * 2);
    }

    #[test]
    fn test_drained_returns_zero_repeatedly() {
        let mut decoder = Decoder::from_reader(MockReader::new(24, 1, vec![])).unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(decoder.read_pcm(&mut buf).unwrap(), 0);
        assert_eq!(decoder.read_pcm(&mut buf).unwrap(), 0);
        assert_eq!(decoder.state(), DecoderState::Drained);
        assert_eq!(decoder.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_unsupported_depth_rejected() {
        let reader = MockReader::new(10, 2, stereo_blocks());
        match Decoder::from_reader(reader) {
            Err(AudioError::UnsupportedBitDepth(10)) => {}
            Err(other) => panic!("应返回UnsupportedBitDepth，实际: {other}"),
            Ok(_) => panic!("10位不应被接受"),
        }
    }

    #[test]
    fn test_mid_stream_error_after_partial_delivery() {
        let reader = MockReader::new(8, 2, stereo_blocks()).with_error_at(1);
        let mut decoder = Decoder::from_reader(reader).unwrap();

        // 第一块6字节先交付，错误延迟到下一次调用
        let mut buf = [0u8; 32];
        assert_eq!(decoder.read_pcm(&mut buf).unwrap(), 6);
        assert_eq!(&buf[..6], &[1, 0xFF, 2, 0xFE, 3, 0xFD]);

        assert!(matches!(
            decoder.read_pcm(&mut buf),
            Err(AudioError::ReadFailure { .. })
        ));
        assert_eq!(decoder.state(), DecoderState::Failed);
        assert!(decoder.read_pcm(&mut buf).is_err());
    }

    #[test]
    fn test_error_on_first_block_is_immediate() {
        let reader = MockReader::new(8, 2, stereo_blocks()).with_error_at(0);
        let mut decoder = Decoder::from_reader(reader).unwrap();
        let mut buf = [0u8; 4];
        assert!(decoder.read_pcm(&mut buf).is_err());
        assert!(decode_with(MockReader::new(8, 2, stereo_blocks()).with_error_at(2)).is_err());
    }

    #[test]
    fn test_buffer_reused_across_blocks() {
        let blocks = vec![
            vec![vec![0; 4096], vec![0; 4096]],
            vec![vec![1; 100], vec![1; 100]],
        ];
        let mut decoder = Decoder::from_reader(MockReader::new(16, 2, blocks)).unwrap();
        let mut buf = vec![0u8; 4096 * 4];
        assert_eq!(decoder.read_pcm(&mut buf).unwrap(), 4096 * 4);
        let capacity = decoder.buf.capacity();

        assert_eq!(decoder.read_pcm(&mut buf).unwrap(), 400);
        assert_eq!(decoder.buf.capacity(), capacity);
        assert_eq!(decoder.buf.len(), 400);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut decoder = Decoder::from_reader(MockReader::new(8, 2, stereo_blocks())).unwrap();
        decoder.close().unwrap();
        decoder.close().unwrap();
        assert!(decoder.reader.closed);
    }

    #[test]
    fn test_channel_mismatch_is_read_failure() {
        let blocks = vec![vec![vec![1, 2, 3]]];
        let mut decoder = Decoder::from_reader(MockReader::new(8, 2, blocks)).unwrap();
        let mut buf = [0u8; 8];
        assert!(matches!(
            decoder.read_pcm(&mut buf),
            Err(AudioError::ReadFailure { .. })
        ));
    }
}
