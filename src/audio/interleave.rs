//! 交错引擎
//!
//! 把一个块的N个声道数组写成扁平的小端有符号PCM字节串：
//! 样本优先、声道次之（`[ch0_s0, ch1_s0, ..., chN_s0, ch0_s1, ...]`），
//! 每个样本截断为容器宽度的低位字节，不做范围检查。

use super::block::ChannelBlock;
use super::format::BitDepth;

/// 把分声道样本交错写入 `dst`
///
/// `dst.len()` 必须恰好等于 `block.len() × 声道数 × 容器宽度`。
/// 立体声走按字宽打包的快速路径，输出与通用路径逐字节一致。
///
/// # Panics
///
/// 目标缓冲区长度不符时panic（调用契约错误，不能输出错误字节）。
pub fn interleave(dst: &mut [u8], block: &ChannelBlock, depth: BitDepth) {
    let width = depth.container_width();
    let expected = block.len() * block.channel_count() * width;
    assert_eq!(
        dst.len(),
        expected,
        "interleave: 目标缓冲区 {} 字节，应为 {expected} 字节",
        dst.len()
    );

    if block.channel_count() == 2 {
        interleave_stereo(dst, block.channel(0), block.channel(1), width);
    } else {
        interleave_generic(dst, block, width);
    }
}

/// 通用N声道路径：逐样本、逐声道写入容器宽度的小端字节
pub(crate) fn interleave_generic(dst: &mut [u8], block: &ChannelBlock, width: usize) {
    let n_channels = block.channel_count();
    if n_channels == 0 {
        return;
    }

    for (i, frame) in dst.chunks_exact_mut(n_channels * width).enumerate() {
        for (slot, channel) in frame.chunks_exact_mut(width).zip(block.channels()) {
            slot.copy_from_slice(&channel[i].to_le_bytes()[..width]);
        }
    }
}

/// 立体声快速路径：每个样本用一次整字存储写出左右两个声道
///
/// 左声道占据样本字节组的低位，右声道占高位。
fn interleave_stereo(dst: &mut [u8], left: &[i32], right: &[i32], width: usize) {
    match width {
        1 => {
            for ((out, &l), &r) in dst.chunks_exact_mut(2).zip(left).zip(right) {
                let packed = u16::from(l as u8) | u16::from(r as u8) << 8;
                out.copy_from_slice(&packed.to_le_bytes());
            }
        }
        2 => {
            for ((out, &l), &r) in dst.chunks_exact_mut(4).zip(left).zip(right) {
                let packed = u32::from(l as u16) | u32::from(r as u16) << 16;
                out.copy_from_slice(&packed.to_le_bytes());
            }
        }
        3 => {
            // 两个24位样本拼成48位，取u64的低6字节
            for ((out, &l), &r) in dst.chunks_exact_mut(6).zip(left).zip(right) {
                let packed =
                    u64::from(l as u32 & 0x00FF_FFFF) | u64::from(r as u32 & 0x00FF_FFFF) << 24;
                out.copy_from_slice(&packed.to_le_bytes()[..6]);
            }
        }
        4 => {
            for ((out, &l), &r) in dst.chunks_exact_mut(8).zip(left).zip(right) {
                let packed = u64::from(l as u32) | u64::from(r as u32) << 32;
                out.copy_from_slice(&packed.to_le_bytes());
            }
        }
        _ => unreachable!("容器宽度只能是1-4字节"),
    }
}
