//! WAV封装模块
//!
//! 基于hound在交错PCM字节与RIFF/WAVE之间转换。
//! 4/12/20位样本按容器位数（8/16/24位）写出，数值不变。

use crate::audio::PcmFormat;
use crate::audio::deinterleave::read_sample;
use crate::error::{AudioError, AudioResult};
use std::io::{Read, Seek, Write};

/// 把交错PCM写为WAV
///
/// `pcm` 必须是整帧长度，否则返回 `LengthMismatch`。
pub fn write_wav<W: Write + Seek>(writer: W, pcm: &[u8], format: PcmFormat) -> AudioResult<()> {
    let frame_size = format.frame_size();
    if pcm.len() % frame_size != 0 {
        return Err(AudioError::LengthMismatch {
            pcm_len: pcm.len(),
            frame_size,
        });
    }

    let spec = hound::WavSpec {
        channels: format.channels(),
        sample_rate: format.sample_rate(),
        bits_per_sample: format.wav_bits_per_sample(),
        sample_format: hound::SampleFormat::Int,
    };

    let mut wav = hound::WavWriter::new(writer, spec)?;
    for bytes in pcm.chunks_exact(format.bit_depth().container_width()) {
        wav.write_sample(read_sample(bytes))?;
    }
    wav.finalize()?;

    Ok(())
}

/// 把WAV写入内存（用于标准输出等不可寻址的目标）
pub fn wav_to_vec(pcm: &[u8], format: PcmFormat) -> AudioResult<Vec<u8>> {
    let mut cursor = std::io::Cursor::new(Vec::with_capacity(pcm.len() + 128));
    write_wav(&mut cursor, pcm, format)?;
    Ok(cursor.into_inner())
}

/// 读取整数PCM的WAV，返回交错小端PCM字节及其格式
///
/// 浮点WAV返回 `InvalidInput`；位深不受支持时返回 `UnsupportedBitDepth`。
pub fn read_wav<R: Read>(reader: R) -> AudioResult<(Vec<u8>, PcmFormat)> {
    let mut wav = hound::WavReader::new(reader)?;
    let spec = wav.spec();

    if spec.sample_format != hound::SampleFormat::Int {
        return Err(AudioError::InvalidInput(
            "仅支持整数PCM的WAV（不支持浮点）".to_string(),
        ));
    }

    let format = PcmFormat::from_raw(
        spec.sample_rate,
        u32::from(spec.bits_per_sample),
        spec.channels,
    )?;
    let width = format.bit_depth().container_width();

    let mut pcm = Vec::with_capacity(wav.len() as usize * width);
    for sample in wav.samples::<i32>() {
        pcm.extend_from_slice(&sample?.to_le_bytes()[..width]);
    }

    tracing::debug!("WAV读取完成: {format}, {} 字节", pcm.len());
    Ok((pcm, format))
}
