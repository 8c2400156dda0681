//! 基于flacenc的FLAC编码协作方
//!
//! 每个块在 `write_block` 里按真实长度立即编码为一帧，最后的短块不补零。
//! STREAMINFO依赖全部帧的统计（帧字节范围、总样本数、MD5），所以压缩后的帧先暂存在内存，
//! `finish` 时连同头部一次性写入目标；中途失败时目标不会收到任何字节。

use super::bitstream::{BlockWriter, StreamHeader};
use super::block::ChannelBlock;
use super::encoder::{MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};
use crate::error::{self, AudioError, AudioResult};
use flacenc::bitsink::ByteSink;
use flacenc::component::{BitRepr, StreamInfo as FrameStreamInfo};
use flacenc::config::Encoder as FlacConfig;
use flacenc::constant::{
    MAX_BITS_PER_SAMPLE, MIN_BITS_PER_SAMPLE, MIN_BLOCK_SIZE as PREDICTIVE_MIN_BLOCK_SIZE,
};
use flacenc::error::{Verified, Verify};
use flacenc::source::{Context, Fill, FrameBuf};
use std::io::Write;

/// 码流起始标记
const FLAC_MARKER: &[u8; 4] = b"fLaC";

/// STREAMINFO块体长度（字节）
const STREAMINFO_LEN: usize = 34;

/// STREAMINFO可表示的最大采样率
const MAX_SAMPLE_RATE: u32 = 655_350;

/// STREAMINFO总样本数字段为36位
const MAX_TOTAL_SAMPLES: u64 = (1 << 36) - 1;

/// 帧字节数字段为24位
const MAX_FRAME_BYTES: usize = (1 << 24) - 1;

/// flacenc的StreamInfo校验上限；帧头采样率引用STREAMINFO，不会写出这个值
const FRAME_INFO_SAMPLE_RATE_CAP: u32 = 96_000;

/// FLAC码流写入器
pub struct FlacBlockWriter<W: Write> {
    writer: W,
    header: StreamHeader,
    /// 常规块：定长/线性预测全开
    config: Verified<FlacConfig>,
    /// 短于flacenc预测下限的块只用常量/原样子帧
    short_block_config: Verified<FlacConfig>,
    frame_info: FrameStreamInfo,
    framebuf: FrameBuf,
    /// 单块交错暂存（容量为一个块）
    interleaved: Vec<i32>,
    /// MD5累加器（逐帧喂入，末尾不补零）
    md5: Context,
    frames: ByteSink,
    frame_count: usize,
    min_frame_bytes: usize,
    max_frame_bytes: usize,
    samples_written: u64,
}

impl<W: Write> FlacBlockWriter<W> {
    /// 根据码流头创建写入器
    ///
    /// flacenc只能编码8-24位：4位（FLAC帧头没有对应编码）和32位在这里以
    /// `UnsupportedBitDepth` 拒绝，解码方向仍支持二者。
    pub fn new(writer: W, header: &StreamHeader) -> AudioResult<Self> {
        let format = header.format;
        let bits = format.bit_depth().bits();
        if !(MIN_BITS_PER_SAMPLE..=MAX_BITS_PER_SAMPLE).contains(&(bits as usize)) {
            return Err(AudioError::UnsupportedBitDepth(bits));
        }
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&header.block_size) {
            return Err(AudioError::InvalidInput(format!(
                "块大小 {} 超出范围 {MIN_BLOCK_SIZE}-{MAX_BLOCK_SIZE}",
                header.block_size
            )));
        }
        if format.sample_rate() > MAX_SAMPLE_RATE {
            return Err(AudioError::InvalidInput(format!(
                "采样率 {} 超过FLAC上限 {MAX_SAMPLE_RATE}",
                format.sample_rate()
            )));
        }
        if header.total_samples > MAX_TOTAL_SAMPLES {
            return Err(AudioError::InvalidInput(format!(
                "总样本数 {} 超过STREAMINFO上限",
                header.total_samples
            )));
        }

        let channels = format.channels_usize();
        let config = FlacConfig::default()
            .into_verified()
            .map_err(|e| error::encoding_error("FLAC编码配置无效", e))?;

        let mut short_block = FlacConfig::default();
        short_block.subframe_coding.use_fixed = false;
        short_block.subframe_coding.use_lpc = false;
        let short_block_config = short_block
            .into_verified()
            .map_err(|e| error::encoding_error("FLAC编码配置无效", e))?;

        let frame_info = FrameStreamInfo::new(
            format.sample_rate().min(FRAME_INFO_SAMPLE_RATE_CAP) as usize,
            channels,
            bits as usize,
        )
        .map_err(|e| error::encoding_error("FLAC码流参数无效", e))?;

        let framebuf = FrameBuf::with_size(channels, PREDICTIVE_MIN_BLOCK_SIZE)
            .map_err(|e| error::encoding_error("FLAC帧缓冲创建失败", e))?;

        tracing::debug!(
            "创建FLAC编码器: {}, 总样本 {}, 块大小 {}",
            format,
            header.total_samples,
            header.block_size
        );

        Ok(Self {
            writer,
            header: *header,
            config,
            short_block_config,
            frame_info,
            framebuf,
            interleaved: Vec::with_capacity(header.block_size * channels),
            md5: Context::new(bits as usize, channels, 1),
            frames: ByteSink::new(),
            frame_count: 0,
            min_frame_bytes: usize::MAX,
            max_frame_bytes: 0,
            samples_written: 0,
        })
    }

    /// 已编码的帧数
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// 把当前交错暂存编码为一帧并追加到帧缓冲
    fn encode_frame(&mut self, len: usize) -> AudioResult<()> {
        let channels = self.header.format.channels_usize();

        // MD5按每帧一组样本喂入，Context的块大小为1，不会补零
        for frame in self.interleaved.chunks_exact(channels) {
            self.md5
                .fill_interleaved(frame)
                .map_err(|e| error::encoding_error("MD5计算失败", e))?;
        }

        self.framebuf.resize(len);
        self.framebuf
            .fill_interleaved(&self.interleaved)
            .map_err(|e| error::encoding_error("FLAC帧缓冲填充失败", e))?;

        let config = if len < PREDICTIVE_MIN_BLOCK_SIZE {
            &self.short_block_config
        } else {
            &self.config
        };
        let frame = flacenc::encode_fixed_size_frame(
            config,
            &self.framebuf,
            self.frame_count,
            &self.frame_info,
        )
        .map_err(|e| error::encoding_error("FLAC帧编码失败", e))?;

        let before = self.frames.as_slice().len();
        frame
            .write(&mut self.frames)
            .map_err(|e| error::encoding_error("FLAC帧序列化失败", e))?;
        let frame_bytes = self.frames.as_slice().len() - before;

        self.min_frame_bytes = self.min_frame_bytes.min(frame_bytes);
        self.max_frame_bytes = self.max_frame_bytes.max(frame_bytes);
        self.frame_count += 1;
        Ok(())
    }

    /// STREAMINFO块体
    ///
    /// 定长分块的码流里最小/最大块大小都记为块大小（最后的短块不计入）。
    /// 没有任何帧时帧字节范围记为0（未知）。
    fn streaminfo(&self) -> [u8; STREAMINFO_LEN] {
        let format = self.header.format;
        let mut info = [0u8; STREAMINFO_LEN];

        let block_size = (self.header.block_size as u16).to_be_bytes();
        info[0..2].copy_from_slice(&block_size);
        info[2..4].copy_from_slice(&block_size);

        let (min_frame, max_frame) = if self.frame_count == 0 {
            (0, 0)
        } else {
            (self.min_frame_bytes, self.max_frame_bytes)
        };
        info[4..7].copy_from_slice(&frame_bytes_field(min_frame));
        info[7..10].copy_from_slice(&frame_bytes_field(max_frame));

        // 采样率(20) | 声道数-1(3) | 位深-1(5) | 总样本数(36)
        let packed = u64::from(format.sample_rate()) << 44
            | u64::from(format.channels() - 1) << 41
            | u64::from(format.bit_depth().bits() - 1) << 36
            | self.samples_written;
        info[10..18].copy_from_slice(&packed.to_be_bytes());
        info[18..34].copy_from_slice(&self.md5.md5_digest());
        info
    }
}

/// 24位帧字节数字段，超出范围时记为0（未知）
fn frame_bytes_field(bytes: usize) -> [u8; 3] {
    let value = if bytes > MAX_FRAME_BYTES { 0 } else { bytes as u32 };
    let be = value.to_be_bytes();
    [be[1], be[2], be[3]]
}

impl<W: Write> BlockWriter for FlacBlockWriter<W> {
    fn write_block(&mut self, block: &ChannelBlock) -> AudioResult<()> {
        let channels = self.header.format.channels_usize();
        if block.channel_count() != channels {
            return Err(AudioError::InvalidInput(format!(
                "块声道数 {} 与码流头的 {channels} 不一致",
                block.channel_count()
            )));
        }
        let len = block.len();
        if len > self.header.block_size {
            return Err(AudioError::InvalidInput(format!(
                "块长度 {len} 超过码流头的块大小 {}",
                self.header.block_size
            )));
        }
        if len == 0 {
            return Ok(());
        }
        if self.samples_written + len as u64 > self.header.total_samples {
            return Err(AudioError::InvalidInput(format!(
                "写入样本数超过码流头声明的 {}",
                self.header.total_samples
            )));
        }

        self.interleaved.clear();
        for i in 0..len {
            self.interleaved.extend(block.channels().map(|ch| ch[i]));
        }
        self.encode_frame(len)?;

        self.samples_written += len as u64;
        tracing::trace!("FLAC帧 #{}: {} 样本/声道", self.frame_count, len);
        Ok(())
    }

    fn finish(mut self) -> AudioResult<()> {
        if self.samples_written != self.header.total_samples {
            return Err(AudioError::EncodingError(format!(
                "写入样本数 {} 与码流头声明的 {} 不一致",
                self.samples_written, self.header.total_samples
            )));
        }

        // 元数据块头：最后一块标志 | 类型0(STREAMINFO) | 24位长度
        let block_header = [0x80, 0x00, 0x00, STREAMINFO_LEN as u8];

        self.writer.write_all(FLAC_MARKER)?;
        self.writer.write_all(&block_header)?;
        self.writer.write_all(&self.streaminfo())?;
        self.writer.write_all(self.frames.as_slice())?;
        self.writer.flush()?;

        tracing::debug!(
            "FLAC编码完成: {} 样本/声道, {} 帧, {} 字节",
            self.samples_written,
            self.frame_count,
            FLAC_MARKER.len() + block_header.len() + STREAMINFO_LEN + self.frames.as_slice().len()
        );
        Ok(())
    }
}
