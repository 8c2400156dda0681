//! 基于symphonia的FLAC解码协作方
//!
//! symphonia把FLAC样本左移到32位满幅输出，这里按码流位深算术右移还原原始数值，
//! 保证与码流中的整数样本逐位一致。

use super::bitstream::{BlockReader, StreamInfo};
use super::block::ChannelBlock;
use crate::error::{self, AudioResult};
use std::io::{self, Read, Seek, SeekFrom};
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{CODEC_TYPE_FLAC, Decoder as CodecDecoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// FLAC最大块大小（码流规范上限），用于预分配声道缓冲
const FLAC_MAX_BLOCK_SIZE: usize = 65535;

/// 把任意可寻址字节源适配为symphonia的 `MediaSource`
struct SeekableSource<R> {
    inner: R,
}

impl<R: Read> Read for SeekableSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Seek> Seek for SeekableSource<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl<R: Read + Seek + Send + Sync> MediaSource for SeekableSource<R> {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        None
    }
}

/// FLAC码流读取器
pub struct FlacBlockReader {
    format_reader: Option<Box<dyn FormatReader>>,
    decoder: Option<Box<dyn CodecDecoder>>,
    track_id: u32,
    info: StreamInfo,
    /// symphonia输出相对原始位深的左移量
    shift: u32,
    block: ChannelBlock,
    blocks_read: u64,
    /// 已产出的每声道样本数
    samples_read: u64,
}

impl FlacBlockReader {
    /// 打开FLAC码流并读取STREAMINFO
    ///
    /// 探测失败、不是FLAC或元数据缺失时返回 `ReadFailure`。
    /// 位深在这里不做支持集合校验（交给 `Decoder`），只要求落在FLAC允许的1-32位。
    pub fn open<R>(source: R) -> AudioResult<Self>
    where
        R: Read + Seek + Send + Sync + 'static,
    {
        let mss = MediaSourceStream::new(
            Box::new(SeekableSource { inner: source }),
            Default::default(),
        );

        let mut hint = Hint::new();
        hint.with_extension("flac");

        let detected = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| error::read_failure("格式探测失败", e))?;

        let format_reader = detected.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec == CODEC_TYPE_FLAC)
            .ok_or_else(|| error::read_failure_msg("未找到FLAC音频轨道"))?;

        let track_id = track.id;
        let codec_params = &track.codec_params;

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| error::read_failure_msg("STREAMINFO缺少采样率"))?;
        let channels = codec_params
            .channels
            .map(|ch| ch.count())
            .ok_or_else(|| error::read_failure_msg("STREAMINFO缺少声道数"))?;
        let bits_per_sample = codec_params
            .bits_per_sample
            .ok_or_else(|| error::read_failure_msg("STREAMINFO缺少位深"))?;
        if !(1..=32).contains(&bits_per_sample) {
            return Err(error::read_failure_msg(format!(
                "STREAMINFO位深非法: {bits_per_sample}"
            )));
        }

        let decoder = symphonia::default::get_codecs()
            .make(codec_params, &DecoderOptions::default())
            .map_err(|e| error::read_failure("创建FLAC解码器失败", e))?;

        let info = StreamInfo {
            sample_rate,
            bits_per_sample,
            channels: channels as u16,
            total_samples: codec_params.n_frames,
        };

        let max_block = codec_params
            .max_frames_per_packet
            .map_or(FLAC_MAX_BLOCK_SIZE, |n| n as usize);

        tracing::debug!(
            "打开FLAC码流: {} Hz, {} bit, {} ch, 总样本 {:?}, 最大块 {}",
            info.sample_rate,
            info.bits_per_sample,
            info.channels,
            info.total_samples,
            max_block
        );

        Ok(Self {
            format_reader: Some(format_reader),
            decoder: Some(decoder),
            track_id,
            info,
            shift: 32 - bits_per_sample,
            block: ChannelBlock::with_capacity(channels, max_block),
            blocks_read: 0,
            samples_read: 0,
        })
    }

    /// 已读取的块数
    pub fn blocks_read(&self) -> u64 {
        self.blocks_read
    }

    /// 已产出的每声道样本数
    pub fn samples_read(&self) -> u64 {
        self.samples_read
    }

    /// STREAMINFO声明的总样本数还剩多少（未声明时为 `None`）
    fn remaining_samples(&self) -> Option<u64> {
        self.info
            .total_samples
            .map(|total| total.saturating_sub(self.samples_read))
    }
}

impl BlockReader for FlacBlockReader {
    fn stream_info(&self) -> StreamInfo {
        self.info
    }

    fn next_block(&mut self) -> AudioResult<Option<&ChannelBlock>> {
        // STREAMINFO给出总样本数时以它为准，之后的帧（补零的尾帧等）不再产出
        let remaining = self.remaining_samples();
        if remaining == Some(0) {
            tracing::debug!(
                "已达到STREAMINFO总样本数 {}，共 {} 块",
                self.samples_read,
                self.blocks_read
            );
            return Ok(None);
        }

        let (Some(format_reader), Some(decoder)) =
            (self.format_reader.as_mut(), self.decoder.as_mut())
        else {
            return Err(error::read_failure_msg("FLAC码流已关闭"));
        };

        loop {
            let packet = match format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    tracing::debug!("FLAC码流结束，共 {} 块", self.blocks_read);
                    return Ok(None);
                }
                Err(e) => return Err(error::read_failure("读取FLAC帧失败", e)),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = decoder
                .decode(&packet)
                .map_err(|e| error::read_failure("解码FLAC帧失败", e))?;

            let AudioBufferRef::S32(buf) = decoded else {
                return Err(error::read_failure_msg("FLAC解码器输出了非32位整数样本"));
            };

            let decoded_frames = buf.frames();
            if decoded_frames == 0 {
                continue;
            }
            let frames = match remaining {
                Some(left) if (decoded_frames as u64) > left => {
                    tracing::debug!("末帧 {decoded_frames} 样本截断为剩余的 {left} 样本");
                    left as usize
                }
                _ => decoded_frames,
            };

            let channel_count = buf.spec().channels.count();
            if channel_count != self.block.channel_count() {
                return Err(error::read_failure_msg(format!(
                    "帧声道数 {channel_count} 与STREAMINFO的 {} 不一致",
                    self.block.channel_count()
                )));
            }

            self.block.set_len(frames);
            let shift = self.shift;
            for ch in 0..channel_count {
                for (dst, &src) in self.block.channel_mut(ch).iter_mut().zip(buf.chan(ch)) {
                    *dst = src >> shift;
                }
            }

            self.blocks_read += 1;
            self.samples_read += frames as u64;
            tracing::trace!("FLAC块 #{}: {} 样本/声道", self.blocks_read, frames);
            return Ok(Some(&self.block));
        }
    }

    fn close(&mut self) -> AudioResult<()> {
        self.decoder = None;
        self.format_reader = None;
        Ok(())
    }
}
