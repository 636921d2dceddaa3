//! 端到端集成测试: HCA 码流的完整解码管线.
//!
//! 测试流程: 在内存中构造 HCA 码流 (头部 + CRC 封口的数据块) →
//! 解码 → 校验 WAVE 封装、采样数量与错误语义.

use koe::codec::{Cipher, DecodeConfig, HcaDecoder};
use koe::core::{KoeError, OutputMode};
use koe::format::{IoContext, MemoryBackend};

/// CRC-16 (多项式 0x8005), 用于给测试块封口
fn crc16(data: &[u8]) -> u16 {
    koe::core::crc::crc16(data, 0)
}

/// 合成 HCA 码流构造器
struct StreamBuilder {
    channels: u8,
    rate: u32,
    block_count: u32,
    block_size: u16,
    /// comp 区 r01..r08
    comp: [u8; 8],
    loop_chunk: Option<(u32, u32, u16)>,
    cipher_type: Option<u16>,
    comment: Option<&'static str>,
}

impl StreamBuilder {
    fn new(channels: u8, rate: u32, block_count: u32, block_size: u16) -> Self {
        Self {
            channels,
            rate,
            block_count,
            block_size,
            // 全频带独立编码, 无高频组
            comp: [1, 15, 1, 0, 0x80, 0x80, 0, 0],
            loop_chunk: None,
            cipher_type: None,
            comment: None,
        }
    }

    /// 强度立体声划分: 64 基础频带 + 64 强度频带
    fn with_coupling(mut self) -> Self {
        self.comp = [1, 15, 1, 0, 0x80, 0x40, 0x40, 0];
        self
    }

    fn with_loop(mut self, start: u32, end: u32, r01: u16) -> Self {
        self.loop_chunk = Some((start, end, r01));
        self
    }

    fn with_cipher(mut self, cipher_type: u16) -> Self {
        self.cipher_type = Some(cipher_type);
        self
    }

    fn with_comment(mut self, comment: &'static str) -> Self {
        self.comment = Some(comment);
        self
    }

    /// 生成头部, dataOffset 指向头部末尾
    fn header(&self) -> Vec<u8> {
        let mut h = Vec::new();
        h.extend_from_slice(b"HCA\0");
        h.extend_from_slice(&0x0200u16.to_be_bytes());
        h.extend_from_slice(&0u16.to_be_bytes()); // dataOffset 占位

        h.extend_from_slice(b"fmt\0");
        h.extend_from_slice(&((u32::from(self.channels) << 24) | self.rate).to_be_bytes());
        h.extend_from_slice(&self.block_count.to_be_bytes());
        h.extend_from_slice(&[0, 0, 0, 0]);

        h.extend_from_slice(b"comp");
        h.extend_from_slice(&self.block_size.to_be_bytes());
        h.extend_from_slice(&self.comp);
        h.extend_from_slice(&[0, 0]); // 保留

        if let Some((start, end, r01)) = self.loop_chunk {
            h.extend_from_slice(b"loop");
            h.extend_from_slice(&start.to_be_bytes());
            h.extend_from_slice(&end.to_be_bytes());
            h.extend_from_slice(&r01.to_be_bytes());
            h.extend_from_slice(&0u16.to_be_bytes());
        }
        if let Some(t) = self.cipher_type {
            h.extend_from_slice(b"ciph");
            h.extend_from_slice(&t.to_be_bytes());
        }
        if let Some(c) = self.comment {
            h.extend_from_slice(b"comm");
            h.push(c.len() as u8);
            h.extend_from_slice(c.as_bytes());
        }

        let offset = h.len() as u16;
        h[6..8].copy_from_slice(&offset.to_be_bytes());
        h
    }

    /// 静音块: 同步字 + 全零码流
    fn silent_block(&self, cipher: Option<&Cipher>) -> Vec<u8> {
        let mut payload = vec![0u8; self.block_size as usize - 2];
        payload[0] = 0xFF;
        payload[1] = 0xFF;
        seal(payload, cipher)
    }

    /// 含伪随机频谱数据的块
    fn noisy_block(&self, seed: u8, cipher: Option<&Cipher>) -> Vec<u8> {
        let mut payload = vec![0u8; self.block_size as usize - 2];
        payload[0] = 0xFF;
        payload[1] = 0xFF;
        // 噪声等级 + 原始模式比例因子, 之后的位都来自伪随机字节
        payload[2] = 0x20;
        payload[3] = 0xDB;
        for (i, byte) in payload.iter_mut().enumerate().skip(4) {
            *byte = (i as u8).wrapping_mul(37).wrapping_add(seed.wrapping_mul(11)) ^ 0x5C;
        }
        seal(payload, cipher)
    }

    fn cipher(&self) -> Option<Cipher> {
        self.cipher_type
            .map(|t| Cipher::new(u32::from(t), 0x30DB_E1AB, 0xCC55_4639).unwrap())
    }

    fn build(&self) -> Vec<u8> {
        let cipher = self.cipher();
        let mut data = self.header();
        for _ in 0..self.block_count {
            data.extend_from_slice(&self.silent_block(cipher.as_ref()));
        }
        data
    }

    fn build_noisy(&self) -> Vec<u8> {
        let cipher = self.cipher();
        let mut data = self.header();
        for i in 0..self.block_count {
            data.extend_from_slice(&self.noisy_block(i as u8, cipher.as_ref()));
        }
        data
    }
}

/// 加扰 (需要时) 并追加 CRC 封口
fn seal(mut payload: Vec<u8>, cipher: Option<&Cipher>) -> Vec<u8> {
    if let Some(c) = cipher {
        c.unmask(&mut payload);
    }
    let sum = crc16(&payload);
    payload.extend_from_slice(&sum.to_be_bytes());
    payload
}

fn decode_with(config: DecodeConfig, data: Vec<u8>) -> Result<Vec<u8>, KoeError> {
    HcaDecoder::new(config).decode_bytes(&data)
}

fn decode(data: Vec<u8>) -> Vec<u8> {
    decode_with(DecodeConfig::default(), data).unwrap()
}

fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[test]
fn test_mono_pcm16_envelope() {
    // 场景: 单声道 44100 Hz, 10 块, 16 位输出 → 44 + 10×1024×2 字节
    let wave = decode(StreamBuilder::new(1, 44100, 10, 0x20).build());
    assert_eq!(wave.len(), 44 + 10 * 1024 * 2);
    assert_eq!(&wave[0..4], b"RIFF");
    assert_eq!(u32_at(&wave, 4) as usize, wave.len() - 8);
    assert_eq!(u16_at(&wave, 20), 1); // 整数 PCM
    assert_eq!(u16_at(&wave, 22), 1); // 单声道
    assert_eq!(u32_at(&wave, 24), 44100);
    assert_eq!(u16_at(&wave, 34), 16);
    assert_eq!(&wave[36..40], b"data");
    assert_eq!(u32_at(&wave, 40), 10 * 1024 * 2);
    // 静音输入 → 静音输出
    assert!(wave[44..].iter().all(|&b| b == 0));
}

#[test]
fn test_float_stereo_with_keyed_cipher() {
    // 场景: 双声道 48000 Hz, 类型 0x38 加扰, 浮点输出
    let data = StreamBuilder::new(2, 48000, 4, 0x40)
        .with_coupling()
        .with_cipher(0x38)
        .build();
    let wave = decode_with(
        DecodeConfig {
            mode: OutputMode::Float,
            ..DecodeConfig::default()
        },
        data,
    )
    .unwrap();

    assert_eq!(u16_at(&wave, 20), 3); // IEEE 浮点
    assert_eq!(u16_at(&wave, 22), 2);
    assert_eq!(u16_at(&wave, 32), 8); // blockAlign = 4 字节 × 2 声道
    assert_eq!(u16_at(&wave, 34), 32);
    assert_eq!(wave.len(), 44 + 4 * 1024 * 8);
}

#[test]
fn test_cipher_is_transparent_to_decoded_audio() {
    // 同一明文码流经任意加扰类型存储, 解码结果必须一致
    let plain = decode_with(
        DecodeConfig {
            mode: OutputMode::Float,
            ..DecodeConfig::default()
        },
        StreamBuilder::new(1, 44100, 3, 0x80).build_noisy(),
    )
    .unwrap();
    for cipher_type in [1u16, 0x38] {
        let scrambled = decode_with(
            DecodeConfig {
                mode: OutputMode::Float,
                ..DecodeConfig::default()
            },
            StreamBuilder::new(1, 44100, 3, 0x80)
                .with_cipher(cipher_type)
                .build_noisy(),
        )
        .unwrap();
        // WAVE 头不含加扰信息, 整个输出应当逐字节一致
        assert_eq!(plain, scrambled, "cipher type {cipher_type}");
    }
    assert!(plain[44..].iter().any(|&b| b != 0));
}

#[test]
fn test_wrong_key_garbles_audio_silently() {
    // 同步字节是替换表的不动点, 错误密钥不会报错, 只会解出不同的音频
    let data = StreamBuilder::new(1, 44100, 3, 0x80)
        .with_cipher(0x38)
        .build_noisy();
    let good = decode_with(
        DecodeConfig {
            mode: OutputMode::Float,
            ..DecodeConfig::default()
        },
        data.clone(),
    )
    .unwrap();
    let garbled = decode_with(
        DecodeConfig {
            mode: OutputMode::Float,
            key1: 0xDEAD_BEEF,
            key2: 0x0000_0001,
            ..DecodeConfig::default()
        },
        data,
    )
    .unwrap();
    assert_eq!(good.len(), garbled.len());
    assert_ne!(good[44..], garbled[44..]);
}

#[test]
fn test_forced_loop_expands_pcm_without_smpl() {
    // 场景: 22050 Hz 双声道, 20 块, 循环 4..12, 强制 3 次 → 36 块
    let data = StreamBuilder::new(2, 22050, 20, 0x40)
        .with_loop(4, 12, 0x80)
        .build();
    let wave = decode_with(
        DecodeConfig {
            loop_count: 3,
            ..DecodeConfig::default()
        },
        data,
    )
    .unwrap();

    assert_eq!(u32_at(&wave, 40), 36 * 1024 * 4);
    assert_eq!(wave.len(), 44 + 147_456);
    // 强制循环展开后不写 smpl
    assert_eq!(&wave[36..40], b"data");
}

#[test]
fn test_file_loop_emits_smpl() {
    let data = StreamBuilder::new(1, 44100, 20, 0x20)
        .with_loop(4, 12, 0x80)
        .build();
    let wave = decode(data);

    assert_eq!(&wave[36..40], b"smpl");
    assert_eq!(u32_at(&wave, 40), 0x3C);
    // 循环点以采样为单位
    assert_eq!(u32_at(&wave, 88), 4 * 1024);
    assert_eq!(u32_at(&wave, 92), 12 * 1024);
    // loop_r01 = 0x80 → 无限循环
    assert_eq!(u32_at(&wave, 100), 0);
    assert_eq!(&wave[104..108], b"data");
    // PCM 不展开
    assert_eq!(wave.len(), 44 + 8 + 0x3C + 20 * 1024 * 2);
}

#[test]
fn test_degenerate_loop_region() {
    // loopStart == loopEnd: 循环段为空, 展开不增加块
    let data = StreamBuilder::new(1, 44100, 8, 0x20)
        .with_loop(5, 5, 0)
        .build();
    let wave = decode_with(
        DecodeConfig {
            loop_count: 3,
            ..DecodeConfig::default()
        },
        data,
    )
    .unwrap();
    assert_eq!(wave.len(), 44 + 8 * 1024 * 2);
}

#[test]
fn test_forced_loop_without_loop_chunk_loops_whole_file() {
    let data = StreamBuilder::new(1, 44100, 5, 0x20).build();
    let wave = decode_with(
        DecodeConfig {
            loop_count: 2,
            ..DecodeConfig::default()
        },
        data,
    )
    .unwrap();
    assert_eq!(wave.len(), 44 + 2 * 5 * 1024 * 2);
}

#[test]
fn test_crc_mismatch_stops_at_block() {
    let builder = StreamBuilder::new(1, 44100, 10, 0x20);
    let mut data = builder.build();
    // 破坏第 5 块的一个字节
    let header_len = builder.header().len();
    let offset = header_len + 5 * 0x20 + 7;
    data[offset] ^= 0xA5;

    let mut input = IoContext::new(Box::new(MemoryBackend::from_data(data)));
    let mut output = IoContext::new(Box::new(MemoryBackend::new()));
    let result = HcaDecoder::new(DecodeConfig::default()).decode(&mut input, &mut output);

    assert!(matches!(result, Err(KoeError::CrcMismatch(5))));
    // 之前的 5 块已写出, 之后不再消费
    assert_eq!(output.position().unwrap(), 44 + 5 * 1024 * 2);
}

#[test]
fn test_invalid_signature_rejected() {
    let mut data = StreamBuilder::new(1, 44100, 1, 0x20).build();
    data[0] = b'X';
    assert!(matches!(
        decode_with(DecodeConfig::default(), data),
        Err(KoeError::InvalidSignature(_))
    ));
}

#[test]
fn test_short_read_is_fatal() {
    let mut data = StreamBuilder::new(1, 44100, 10, 0x20).build();
    // 截掉最后 3 个块
    data.truncate(data.len() - 3 * 0x20);
    assert!(matches!(
        decode_with(DecodeConfig::default(), data),
        Err(KoeError::Eof)
    ));
}

#[test]
fn test_block_size_extremes() {
    // 最小块 (8 字节)
    let wave = decode(StreamBuilder::new(1, 44100, 3, 8).build());
    assert_eq!(wave.len(), 44 + 3 * 1024 * 2);

    // 最大块 (0xFFFF 字节)
    let wave = decode(StreamBuilder::new(1, 44100, 1, 0xFFFF).build());
    assert_eq!(wave.len(), 44 + 1024 * 2);
}

#[test]
fn test_eight_channel_surround() {
    let data = StreamBuilder::new(8, 48000, 2, 0x80).with_coupling().build();
    let wave = decode(data);
    assert_eq!(u16_at(&wave, 22), 8);
    assert_eq!(wave.len(), 44 + 2 * 1024 * 2 * 8);
}

#[test]
fn test_comment_becomes_note_chunk() {
    let data = StreamBuilder::new(1, 44100, 1, 0x20)
        .with_comment("TEST")
        .build();
    let wave = decode(data);
    assert_eq!(&wave[36..40], b"note");
    // noteSize = 4 + 4 + 1, 对齐到 12
    assert_eq!(u32_at(&wave, 40), 12);
    assert_eq!(&wave[48..52], b"TEST");
    assert_eq!(&wave[56..60], b"data");
}

#[test]
fn test_decode_is_deterministic() {
    let data = StreamBuilder::new(2, 48000, 6, 0x60).with_coupling().build_noisy();
    let config = DecodeConfig {
        mode: OutputMode::Float,
        ..DecodeConfig::default()
    };
    let first = decode_with(config, data.clone()).unwrap();
    let second = decode_with(config, data).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_volume_is_pure_post_scaling() {
    let data = StreamBuilder::new(1, 44100, 4, 0x80).build_noisy();
    let full = decode_with(
        DecodeConfig {
            mode: OutputMode::Float,
            ..DecodeConfig::default()
        },
        data.clone(),
    )
    .unwrap();
    let half = decode_with(
        DecodeConfig {
            mode: OutputMode::Float,
            volume: 0.5,
            ..DecodeConfig::default()
        },
        data,
    )
    .unwrap();

    assert_eq!(full.len(), half.len());
    let mut nonzero = 0usize;
    for off in (44..full.len()).step_by(4) {
        let a = f32::from_le_bytes([full[off], full[off + 1], full[off + 2], full[off + 3]]);
        let b = f32::from_le_bytes([half[off], half[off + 1], half[off + 2], half[off + 3]]);
        assert_eq!(b, a * 0.5);
        if a != 0.0 {
            nonzero += 1;
        }
    }
    // 伪随机码流必须产生非零采样, 否则该测试没有意义
    assert!(nonzero > 0);
}

#[test]
fn test_silence_in_u8_mode_is_midpoint() {
    let wave = decode_with(
        DecodeConfig {
            mode: OutputMode::Pcm8,
            ..DecodeConfig::default()
        },
        StreamBuilder::new(1, 44100, 2, 0x20).build(),
    )
    .unwrap();
    assert_eq!(u16_at(&wave, 34), 8);
    assert!(wave[44..].iter().all(|&b| b == 128));
}

#[test]
fn test_total_samples_invariant() {
    // 任意声道数 n: 输出采样数恒为 1024 × n × 块数
    for channels in [1u8, 2, 3, 6] {
        let data = StreamBuilder::new(channels, 48000, 3, 0x60).build();
        let wave = decode_with(
            DecodeConfig {
                mode: OutputMode::Float,
                ..DecodeConfig::default()
            },
            data,
        )
        .unwrap();
        let samples = (wave.len() - 44) / 4;
        assert_eq!(samples, 1024 * usize::from(channels) * 3);
    }
}
