//! 真实FLAC码流集成测试
//!
//! 使用flacenc编码、symphonia解码，验证端到端逐字节一致。


use macinmeter_flac_pcm::audio::{
    BitDepth, BlockReader, Decoder, FlacBlockReader, PcmFormat, decode, encode,
};
use macinmeter_flac_pcm::tools::wav_to_vec;
use macinmeter_flac_pcm::{AudioError, ErrorCategory};
use pcm_test_fixtures::{XorShift, noise_pcm, samples_to_pcm, sine_pcm};
use std::io::{Cursor, Read};

fn log(msg_zh: impl AsRef<str>, msg_en: impl AsRef<str>) {
    println!("{} / {}", msg_zh.as_ref(), msg_en.as_ref());
}

fn encode_to_vec(pcm: &[u8], format: PcmFormat) -> Vec<u8> {
    let mut flac = Vec::new();
    encode(&mut flac, pcm, format).expect("FLAC编码失败");
    flac
}

fn cd_format() -> PcmFormat {
    PcmFormat::new(44100, BitDepth::Depth16, 2).unwrap()
}

// ========== 端到端 ==========

#[test]
fn test_one_second_cd_audio_roundtrip() {
    let format = cd_format();
    let pcm = sine_pcm(format, 44100, 440.0);
    assert_eq!(pcm.len(), 176_400);

    let flac = encode_to_vec(&pcm, format);
    assert_eq!(&flac[..4], b"fLaC");
    log(
        format!("编码 {} 字节PCM → {} 字节FLAC", pcm.len(), flac.len()),
        format!("Encoded {} PCM bytes → {} FLAC bytes", pcm.len(), flac.len()),
    );

    let (decoded, decoded_format) = decode(Cursor::new(flac)).unwrap();
    assert_eq!(decoded_format, format);
    assert_eq!(decoded_format.sample_rate(), 44100);
    assert_eq!(decoded_format.bit_depth().bits(), 16);
    assert_eq!(decoded_format.channels(), 2);
    assert_eq!(decoded.len(), 176_400);
    assert_eq!(decoded, pcm);
}

#[test]
fn test_24bit_multichannel_roundtrip() {
    let format = PcmFormat::new(48000, BitDepth::Depth24, 6).unwrap();
    let pcm = noise_pcm(format, 10_000, 2024);

    let (decoded, decoded_format) = decode(Cursor::new(encode_to_vec(&pcm, format))).unwrap();
    assert_eq!(decoded_format, format);
    assert_eq!(decoded, pcm);
    log("24位6声道噪声往返一致", "24-bit 6-channel noise round-trip identical");
}

#[test]
fn test_16bit_extremes_roundtrip() {
    let format = PcmFormat::new(96000, BitDepth::Depth16, 1).unwrap();
    let pcm: Vec<u8> = [i16::MIN, i16::MAX, -1, 0, 1]
        .iter()
        .cycle()
        .take(5000)
        .flat_map(|s| s.to_le_bytes())
        .collect();

    let (decoded, _) = decode(Cursor::new(encode_to_vec(&pcm, format))).unwrap();
    assert_eq!(decoded, pcm);
}

#[test]
fn test_roundtrip_every_encodable_depth_with_short_final_block() {
    // 4097 = 4096 + 1，9000 = 2 × 4096 + 808：最后一块都短于块大小
    let depths = [
        BitDepth::Depth8,
        BitDepth::Depth12,
        BitDepth::Depth16,
        BitDepth::Depth20,
        BitDepth::Depth24,
    ];
    let mut cases = 0;
    for depth in depths {
        for channels in [1u16, 2, 6] {
            for samples in [4097usize, 9000] {
                let format = PcmFormat::new(44100, depth, channels).unwrap();
                let seed = u64::from(depth.bits()) * 131 + u64::from(channels) + samples as u64;
                let pcm = noise_pcm(format, samples, seed);

                let (decoded, decoded_format) =
                    decode(Cursor::new(encode_to_vec(&pcm, format))).unwrap();
                assert_eq!(decoded_format, format);
                assert_eq!(decoded.len(), pcm.len(), "{format}, {samples} samples");
                assert_eq!(decoded, pcm, "{format}, {samples} samples");
                cases += 1;
            }
        }
    }
    log(
        format!("8-24位 × 1/2/6声道 × 短末块: {cases} 种组合逐字节一致"),
        format!("{cases} real FLAC round-trips with a short final block are byte-identical"),
    );
}

#[test]
fn test_24bit_mono_shorter_than_one_block() {
    let format = PcmFormat::new(22050, BitDepth::Depth24, 1).unwrap();
    let pcm = noise_pcm(format, 3000, 3);

    let flac = encode_to_vec(&pcm, format);
    let (decoded, decoded_format) = decode(Cursor::new(flac)).unwrap();
    assert_eq!(decoded_format, format);
    assert_eq!(decoded, pcm);
}

#[test]
fn test_final_frame_keeps_its_true_length() {
    let format = cd_format();
    let pcm = noise_pcm(format, 4097, 41);

    let mut reader = FlacBlockReader::open(Cursor::new(encode_to_vec(&pcm, format))).unwrap();
    let mut lengths = Vec::new();
    while let Some(block) = reader.next_block().unwrap() {
        lengths.push(block.len());
    }
    assert_eq!(lengths, vec![4096, 1]);
    assert_eq!(reader.samples_read(), 4097);
}

#[test]
fn test_8bit_extremes_roundtrip() {
    let format = PcmFormat::new(8000, BitDepth::Depth8, 2).unwrap();
    let interleaved: Vec<i32> = [-128, 127, -1, 0, 1, -128]
        .iter()
        .copied()
        .cycle()
        .take(2 * 1500)
        .collect();
    let pcm = samples_to_pcm(&interleaved, BitDepth::Depth8);

    let (decoded, _) = decode(Cursor::new(encode_to_vec(&pcm, format))).unwrap();
    assert_eq!(decoded, pcm);
}

#[test]
fn test_12bit_and_20bit_extremes_roundtrip() {
    for depth in [BitDepth::Depth12, BitDepth::Depth20] {
        let format = PcmFormat::new(48000, depth, 1).unwrap();
        let mut rng = XorShift::new(u64::from(depth.bits()));
        let interleaved: Vec<i32> = (0..5000)
            .map(|i| match i % 4 {
                0 => depth.min_value(),
                1 => depth.max_value(),
                _ => rng.sample(depth),
            })
            .collect();
        let pcm = samples_to_pcm(&interleaved, depth);

        let (decoded, decoded_format) = decode(Cursor::new(encode_to_vec(&pcm, format))).unwrap();
        assert_eq!(decoded_format.bit_depth(), depth);
        assert_eq!(decoded, pcm, "{depth}-bit");
    }
}

// ========== 流式读取 ==========

#[test]
fn test_streaming_reads_match_one_shot() {
    let format = cd_format();
    let pcm = noise_pcm(format, 9000, 77);
    let flac = encode_to_vec(&pcm, format);

    for chunk_size in [1usize, 1000, 65536] {
        let mut decoder = Decoder::open(Cursor::new(flac.clone())).unwrap();
        assert_eq!(decoder.total_samples(), Some(9000));

        let mut chunk = vec![0u8; chunk_size];
        let mut collected = Vec::new();
        loop {
            let n = decoder.read_pcm(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&chunk[..n]);
        }
        decoder.close().unwrap();
        assert_eq!(collected, pcm, "chunk size {chunk_size}");
    }
}

#[test]
fn test_decoder_as_std_read() {
    let format = cd_format();
    let pcm = noise_pcm(format, 5000, 11);
    let mut decoder = Decoder::open(Cursor::new(encode_to_vec(&pcm, format))).unwrap();

    let mut collected = Vec::new();
    decoder.read_to_end(&mut collected).unwrap();
    assert_eq!(collected, pcm);
}

#[test]
fn test_reader_stops_at_declared_total_samples() {
    // flacenc的整段编码会把最后一帧补零到块大小，STREAMINFO仍声明真实的样本数
    use flacenc::component::BitRepr;
    use flacenc::error::Verify;

    let format = cd_format();
    let pcm = noise_pcm(format, 1000, 8);
    let samples: Vec<i32> = pcm
        .chunks_exact(2)
        .map(|b| i32::from(i16::from_le_bytes([b[0], b[1]])))
        .collect();

    let config = flacenc::config::Encoder::default()
        .into_verified()
        .expect("flacenc默认配置应有效");
    let source = flacenc::source::MemSource::from_samples(&samples, 2, 16, 44100);
    let stream = flacenc::encode_with_fixed_block_size(&config, source, 4096).unwrap();
    let mut sink = flacenc::bitsink::ByteSink::new();
    stream.write(&mut sink).unwrap();

    let mut reader = FlacBlockReader::open(Cursor::new(sink.as_slice().to_vec())).unwrap();
    assert_eq!(reader.stream_info().total_samples, Some(1000));
    let first = reader.next_block().unwrap().map(|block| block.len());
    assert_eq!(first, Some(1000));
    assert!(reader.next_block().unwrap().is_none());

    let (decoded, _) = decode(Cursor::new(sink.as_slice().to_vec())).unwrap();
    assert_eq!(decoded, pcm);
    log("补零尾帧被截断到声明的样本数", "Padded final frame is clamped to the declared total");
}

#[test]
fn test_flac_reader_stream_info() {
    let format = PcmFormat::new(22050, BitDepth::Depth24, 1).unwrap();
    let pcm = noise_pcm(format, 3000, 3);

    let reader = FlacBlockReader::open(Cursor::new(encode_to_vec(&pcm, format))).unwrap();
    let info = reader.stream_info();
    assert_eq!(info.sample_rate, 22050);
    assert_eq!(info.bits_per_sample, 24);
    assert_eq!(info.channels, 1);
    assert_eq!(info.total_samples, Some(3000));
}

// ========== 错误路径 ==========

#[test]
fn test_garbage_input_is_read_failure() {
    let garbage: Vec<u8> = (0..512u32).map(|i| (i * 37 % 251) as u8).collect();
    let err = decode(Cursor::new(garbage)).unwrap_err();

    assert!(matches!(err, AudioError::ReadFailure { .. }));
    assert_eq!(ErrorCategory::from_audio_error(&err), ErrorCategory::Decoding);
    log(format!("垃圾输入: {err}"), "Garbage input rejected as read failure");
}

#[test]
fn test_4bit_cannot_be_encoded() {
    let format = PcmFormat::new(8000, BitDepth::Depth4, 1).unwrap();
    let mut sink = Vec::new();

    assert!(matches!(
        encode(&mut sink, &[0u8, 1, 0xff, 0xf8], format),
        Err(AudioError::UnsupportedBitDepth(4))
    ));
    assert!(sink.is_empty());
}

#[test]
fn test_32bit_cannot_be_encoded() {
    let format = PcmFormat::new(48000, BitDepth::Depth32, 2).unwrap();
    let pcm = noise_pcm(format, 100, 32);
    let mut sink = Vec::new();

    let err = encode(&mut sink, &pcm, format).unwrap_err();
    assert!(matches!(err, AudioError::UnsupportedBitDepth(32)));
    assert_eq!(ErrorCategory::from_audio_error(&err), ErrorCategory::Format);
    assert!(sink.is_empty());
}

#[test]
fn test_length_mismatch_writes_nothing() {
    let mut sink = Vec::new();
    let result = encode(&mut sink, &[0u8; 6], cd_format());

    assert!(matches!(
        result,
        Err(AudioError::LengthMismatch {
            pcm_len: 6,
            frame_size: 4
        })
    ));
    assert!(sink.is_empty());
}

// ========== WAV封装 ==========

#[test]
fn test_decoded_pcm_wraps_into_wav() {
    let format = cd_format();
    let pcm = sine_pcm(format, 4410, 1000.0);
    let (decoded, decoded_format) = decode(Cursor::new(encode_to_vec(&pcm, format))).unwrap();

    let wav = wav_to_vec(&decoded, decoded_format).unwrap();
    let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 44100);
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.len() as usize, 4410 * 2);
}
