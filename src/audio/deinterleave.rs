//! 解交错引擎
//!
//! [`interleave`](super::interleave::interleave) 的精确逆运算：把扁平的小端有符号PCM字节
//! 读回分声道的 i32 数组，并从容器宽度符号扩展回32位。

use super::block::ChannelBlock;
use super::format::BitDepth;

const SIGN_24BIT: i32 = 0x80_0000;
const MASK_24BIT: i32 = 0xFF_FFFF;

/// 从 `pcm[offset..]` 读取 `block_size` 个采样帧到 `block`
///
/// `block` 的有效长度被调整为 `block_size`（存储不足时扩容），
/// 声道数取 `block.channel_count()`。
///
/// # Panics
///
/// `pcm` 从 `offset` 起不足 `block_size` 帧时panic。
pub fn deinterleave(
    block: &mut ChannelBlock,
    pcm: &[u8],
    offset: usize,
    block_size: usize,
    depth: BitDepth,
) {
    let n_channels = block.channel_count();
    let width = depth.container_width();
    let frame_size = n_channels * width;
    let end = offset + block_size * frame_size;
    assert!(
        end <= pcm.len(),
        "deinterleave: 需要读取到第 {end} 字节，输入只有 {} 字节",
        pcm.len()
    );

    block.set_len(block_size);
    if n_channels == 0 {
        return;
    }

    let frames = pcm[offset..end].chunks_exact(frame_size);
    for ch in 0..n_channels {
        let column = block.channel_mut(ch);
        let start = ch * width;
        for (sample, frame) in column.iter_mut().zip(frames.clone()) {
            *sample = read_sample(&frame[start..start + width]);
        }
    }
}

/// 读取一个容器宽度的小端样本并符号扩展到32位
#[inline]
pub(crate) fn read_sample(bytes: &[u8]) -> i32 {
    match *bytes {
        [b0] => i32::from(b0 as i8),
        [b0, b1] => i32::from(i16::from_le_bytes([b0, b1])),
        [b0, b1, b2] => {
            let raw = i32::from(b0) | i32::from(b1) << 8 | i32::from(b2) << 16;
            if raw & SIGN_24BIT != 0 {
                raw | !MASK_24BIT
            } else {
                raw
            }
        }
        [b0, b1, b2, b3] => i32::from_le_bytes([b0, b1, b2, b3]),
        _ => unreachable!("容器宽度只能是1-4字节"),
    }
}
