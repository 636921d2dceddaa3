//! HCA 解码器.
//!
//! 顶层编排: 头部解析 → 定位数据区 → 写 WAVE 头 → 逐块解码.
//! 每块流程: 整块 CRC 校验 → cipher 解扰 → 同步字 → 声道解码 →
//! 音量缩放与交错 → 采样格式转换 → 写出.
//!
//! 循环展开时对循环段重复 seek 源流, 但 IMDCT 重叠缓冲区保持不变,
//! 循环边界处的波形因此是连续的.

mod ath;
mod channel;
mod cipher;
mod header;
mod imdct;
mod tables;

pub use cipher::Cipher;
pub use header::StreamInfo;

use std::io::SeekFrom;

use log::{debug, warn};

use koe_core::{crc, KoeError, KoeResult, OutputMode};
use koe_format::{IoContext, MemoryBackend, SampleLoop, WaveHeader};

use crate::sample::SampleConverter;
use ath::AthTable;
use channel::ChannelDecoder;
use tables::SAMPLES_PER_BLOCK;

/// 解码配置
#[derive(Debug, Clone, Copy)]
pub struct DecodeConfig {
    /// 解扰密钥 1
    pub key1: u32,
    /// 解扰密钥 2
    pub key2: u32,
    /// 输出位深
    pub mode: OutputMode,
    /// 强制循环次数, 0 表示遵循文件内的循环设置
    pub loop_count: u32,
    /// 音量缩放因子
    pub volume: f32,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            key1: 0x30DB_E1AB,
            key2: 0xCC55_4639,
            mode: OutputMode::Pcm16,
            loop_count: 0,
            volume: 1.0,
        }
    }
}

/// HCA 解码器
///
/// 持有配置; 每次 [`decode`](Self::decode) 独立解析头部并分配工作缓冲,
/// 同一实例可依次解码多个流. 实例不可跨线程并发使用, 并行批量解码时
/// 每个文件各建一个实例.
pub struct HcaDecoder {
    config: DecodeConfig,
}

/// 单次解码的工作状态 (头部解析后构建, 跨块复用)
struct DecodeSession {
    info: StreamInfo,
    cipher: Cipher,
    ath: AthTable,
    channels: ChannelDecoder,
    converter: SampleConverter,
    /// 单块原始字节
    block: Vec<u8>,
    /// 单块交错浮点输出
    pcm: Vec<f32>,
    /// 最终音量 (文件 RVA × 用户配置)
    volume: f32,
}

impl HcaDecoder {
    /// 创建解码器
    pub fn new(config: DecodeConfig) -> Self {
        Self { config }
    }

    /// 当前配置
    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// 从字节源解码完整 HCA 流, 把 WAVE 输出写入字节汇
    ///
    /// 返回解析出的流参数, 供调用方做诊断或展示.
    pub fn decode(&self, input: &mut IoContext, output: &mut IoContext) -> KoeResult<StreamInfo> {
        let info = StreamInfo::parse(input)?;

        let ath = AthTable::new(info.ath_type, info.sampling_rate)?;
        let cipher = Cipher::new(info.cipher_type, self.config.key1, self.config.key2)?;
        let channels = ChannelDecoder::new(&info);
        let samples_per_block = SAMPLES_PER_BLOCK * channels.channel_count();

        let mut session = DecodeSession {
            cipher,
            ath,
            channels,
            converter: SampleConverter::new(self.config.mode, samples_per_block),
            block: vec![0u8; info.block_size as usize],
            pcm: vec![0f32; samples_per_block],
            volume: info.rva_volume * self.config.volume,
            info,
        };

        input.seek(SeekFrom::Start(u64::from(session.info.data_offset)))?;
        self.build_wave_header(&session.info).write(output)?;

        let info = session.info.clone();
        if self.config.loop_count == 0 {
            self.decode_blocks(input, output, &mut session, 0, info.block_count)?;
        } else {
            // 强制循环: 无循环信息的文件把整个流当作循环段
            let (loop_start, loop_end) = if info.loop_flag {
                (info.loop_start, info.loop_end)
            } else {
                (0, info.block_count)
            };
            let loop_offset =
                u64::from(info.data_offset) + u64::from(loop_start) * u64::from(info.block_size);

            self.decode_blocks(input, output, &mut session, 0, loop_end)?;
            for _ in 1..self.config.loop_count {
                input.seek(SeekFrom::Start(loop_offset))?;
                self.decode_blocks(input, output, &mut session, loop_start, loop_end)?;
            }
            let tail_offset =
                u64::from(info.data_offset) + u64::from(loop_end) * u64::from(info.block_size);
            input.seek(SeekFrom::Start(tail_offset))?;
            self.decode_blocks(input, output, &mut session, loop_end, info.block_count)?;
        }

        Ok(session.info)
    }

    /// 解码文件路径 → 文件路径, 失败时删除不完整的输出文件
    pub fn decode_file(&self, src: &str, dst: &str) -> KoeResult<StreamInfo> {
        let mut input = IoContext::open_read(src)?;
        let mut output = IoContext::open_write(dst)?;

        match self.decode(&mut input, &mut output) {
            Ok(info) => Ok(info),
            Err(e) => {
                drop(output);
                if let Err(rm) = std::fs::remove_file(dst) {
                    warn!("清理不完整输出失败 {dst}: {rm}");
                }
                Err(e)
            }
        }
    }

    /// 解码内存中的 HCA 数据, 返回 WAVE 字节
    pub fn decode_bytes(&self, data: &[u8]) -> KoeResult<Vec<u8>> {
        let mut input = IoContext::new(Box::new(MemoryBackend::from_data(data.to_vec())));
        let mut output = IoContext::new(Box::new(MemoryBackend::new()));
        self.decode(&mut input, &mut output)?;

        output.seek(SeekFrom::Start(0))?;
        let mut wave = Vec::new();
        output.read_to_end(&mut wave)?;
        Ok(wave)
    }

    /// 解码 `[first, limit)` 区间的数据块
    fn decode_blocks(
        &self,
        input: &mut IoContext,
        output: &mut IoContext,
        session: &mut DecodeSession,
        first: u32,
        limit: u32,
    ) -> KoeResult<()> {
        for index in first..limit {
            input.read_exact(&mut session.block)?;
            self.decode_one_block(session, index)?;
            session.channels.serialize(session.volume, &mut session.pcm);
            let bytes = session.converter.convert(&session.pcm);
            output.write_all(bytes)?;
        }
        Ok(())
    }

    /// 解码单个数据块: CRC → 解扰 → 同步字 → 声道管线
    fn decode_one_block(&self, session: &mut DecodeSession, index: u32) -> KoeResult<()> {
        if crc::crc16(&session.block, 0) != 0 {
            return Err(KoeError::CrcMismatch(index));
        }
        session.cipher.mask(&mut session.block);

        // 尾部 2 字节是校验和, 不参与码流
        let payload_len = session.block.len().saturating_sub(2);
        let mut br = koe_core::FrameBitReader::new(&session.block[..payload_len]);
        let sync = br.get(16);
        if sync != 0xFFFF {
            return Err(KoeError::SyncMismatch {
                block: index,
                found: sync,
            });
        }

        session.channels.decode_block(&mut br, session.ath.table());
        Ok(())
    }

    /// 由流参数与配置构建 WAVE 头
    fn build_wave_header(&self, info: &StreamInfo) -> WaveHeader {
        let mode = self.config.mode;

        // 循环展开后的总块数
        let loop_blocks = if info.loop_flag {
            info.loop_end - info.loop_start
        } else if self.config.loop_count > 0 {
            info.block_count
        } else {
            0
        };
        let total_blocks = u64::from(info.block_count)
            + u64::from(loop_blocks) * u64::from(self.config.loop_count.saturating_sub(1));
        let total_samples = (total_blocks * SAMPLES_PER_BLOCK as u64) as u32;

        // smpl 只在遵循文件内循环设置时写出; 强制循环已把循环展开进 PCM
        let sample_loop = if info.loop_flag && self.config.loop_count == 0 {
            Some(SampleLoop {
                start_sample: info.loop_start * SAMPLES_PER_BLOCK as u32,
                end_sample: info.loop_end * SAMPLES_PER_BLOCK as u32,
                play_count: if info.loop_r01 == 0x80 { 0 } else { info.loop_r01 },
            })
        } else {
            None
        };

        let header = WaveHeader {
            format_code: mode.wave_format_code(),
            bit_count: mode.bit_count(),
            channel_count: info.channel_count as u16,
            sampling_rate: info.sampling_rate,
            total_samples,
            sample_loop,
            note: (!info.comment.is_empty()).then(|| info.comment.clone()),
        };
        debug!(
            "输出 WAVE: {} 块 → {} 采样/声道, riff {} 字节",
            total_blocks,
            total_samples,
            header.riff_size(),
        );
        header
    }
}
