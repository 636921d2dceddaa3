//! HCA 头部解析.
//!
//! 头部是一串 4 字节签名引导的块. 所有多字节字段按大端读取;
//! 签名字节的最高位可能被置位作为加扰标记, 比较时统一按 0x7F7F7F7F
//! 掩码. 块顺序固定: `HCA`、`fmt` 必选, `comp`/`dec` 二选一,
//! 之后 `vbr`/`ath`/`loop`/`ciph`/`rva`/`comm` 依序可选,
//! 缺席的块取文档约定的默认值.

use log::debug;

use koe_core::{KoeError, KoeResult};
use koe_format::IoContext;

const SIG_MASK: u32 = 0x7F7F7F7F;
const SIG_HCA: u32 = 0x48434100;
const SIG_FMT: u32 = 0x666D7400;
const SIG_COMP: u32 = 0x636F6D70;
const SIG_DEC: u32 = 0x64656300;
const SIG_VBR: u32 = 0x76627200;
const SIG_ATH: u32 = 0x61746800;
const SIG_LOOP: u32 = 0x6C6F6F70;
const SIG_CIPH: u32 = 0x63697068;
const SIG_RVA: u32 = 0x72766100;
const SIG_COMM: u32 = 0x636F6D6D;

/// 解析后的流参数
///
/// 由 [`parse`](Self::parse) 填充, 之后不再变化.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    /// HCA 版本 (u16 零扩展)
    pub version: u32,
    /// 数据区起始字节偏移
    pub data_offset: u32,
    /// 声道数 (1..=16)
    pub channel_count: u32,
    /// 采样率 (1..=0x7FFFFF)
    pub sampling_rate: u32,
    /// 数据块总数
    pub block_count: u32,
    /// 单个数据块的字节数 ({0} ∪ 8..=0xFFFF)
    pub block_size: u32,
    /// `fmt` 块保留字段
    pub fmt_r01: u32,
    /// `fmt` 块保留字段
    pub fmt_r02: u32,
    /// 最小分辨率类别
    pub min_resolution: u32,
    /// 最大分辨率类别
    pub max_resolution: u32,
    /// 声道分组数
    pub track_count: u32,
    /// 声道布局配置
    pub channel_config: u32,
    /// 总频带数
    pub total_band_count: u32,
    /// 基础频带数
    pub base_band_count: u32,
    /// 强度立体声频带数
    pub stereo_band_count: u32,
    /// 每个高频组的频带数
    pub bands_per_hfr_group: u32,
    /// 高频组数
    pub hfr_group_count: u32,
    /// `vbr` 块字段
    pub vbr_r01: u32,
    /// `vbr` 块字段
    pub vbr_r02: u32,
    /// ATH 表类型
    pub ath_type: u32,
    /// 是否携带循环信息
    pub loop_flag: bool,
    /// 循环起始块
    pub loop_start: u32,
    /// 循环结束块
    pub loop_end: u32,
    /// `loop` 块字段 (0x80 表示无限循环)
    pub loop_r01: u32,
    /// `loop` 块字段
    pub loop_r02: u32,
    /// 加扰类型
    pub cipher_type: u32,
    /// 文件内置音量增益
    pub rva_volume: f32,
    /// 备注文本
    pub comment: String,
}

impl StreamInfo {
    /// 从字节源解析完整头部
    pub fn parse(io: &mut IoContext) -> KoeResult<Self> {
        let mut info = Self {
            version: 0,
            data_offset: 0,
            channel_count: 0,
            sampling_rate: 0,
            block_count: 0,
            block_size: 0,
            fmt_r01: 0,
            fmt_r02: 0,
            min_resolution: 0,
            max_resolution: 0,
            track_count: 0,
            channel_config: 0,
            total_band_count: 0,
            base_band_count: 0,
            stereo_band_count: 0,
            bands_per_hfr_group: 0,
            hfr_group_count: 0,
            vbr_r01: 0,
            vbr_r02: 0,
            ath_type: 0,
            loop_flag: false,
            loop_start: 0,
            loop_end: 0,
            loop_r01: 0,
            loop_r02: 0,
            cipher_type: 0,
            rva_volume: 1.0,
            comment: String::new(),
        };

        // HCA (必选)
        let sig = io.read_u32_be()?;
        if sig & SIG_MASK != SIG_HCA {
            return Err(KoeError::InvalidSignature(sig));
        }
        info.read_hca(io)?;

        // fmt (必选)
        let sig = io.read_u32_be()?;
        if sig & SIG_MASK != SIG_FMT {
            return Err(KoeError::UnexpectedChunk {
                expected: "fmt",
                found: sig,
            });
        }
        info.read_fmt(io)?;

        // comp 或 dec (二选一)
        let sig = io.read_u32_be()?;
        let mut sig = match sig & SIG_MASK {
            SIG_COMP => {
                info.read_comp(io)?;
                next_signature(io)?
            }
            SIG_DEC => {
                info.read_dec(io)?;
                next_signature(io)?
            }
            _ => {
                return Err(KoeError::UnexpectedChunk {
                    expected: "comp/dec",
                    found: sig,
                });
            }
        };

        // 可选块链, 顺序固定
        if sig & SIG_MASK == SIG_VBR {
            info.vbr_r01 = u32::from(io.read_u16_be()?);
            info.vbr_r02 = u32::from(io.read_u16_be()?);
            sig = next_signature(io)?;
        }

        if sig & SIG_MASK == SIG_ATH {
            info.ath_type = u32::from(io.read_u16_be()?);
            sig = next_signature(io)?;
        } else {
            info.ath_type = if info.version >= 0x200 { 0 } else { 1 };
        }

        if sig & SIG_MASK == SIG_LOOP {
            info.read_loop(io)?;
            sig = next_signature(io)?;
        }

        if sig & SIG_MASK == SIG_CIPH {
            let cipher_type = u32::from(io.read_u16_be()?);
            if !(cipher_type == 0 || cipher_type == 1 || cipher_type == 0x38) {
                return Err(KoeError::UnsupportedCipherType(cipher_type));
            }
            info.cipher_type = cipher_type;
            sig = next_signature(io)?;
        }

        if sig & SIG_MASK == SIG_RVA {
            info.rva_volume = io.read_f32_be()?;
            sig = next_signature(io)?;
        }

        if sig & SIG_MASK == SIG_COMM {
            let len = io.read_u8()? as usize;
            let bytes = io.read_bytes(len)?;
            info.comment = String::from_utf8_lossy(&bytes).into_owned();
        }

        info.finalize()?;

        debug!(
            "HCA 头部: v0x{:X}, {} 声道, {} Hz, {} 块 × {} 字节, cipher {}, ath {}",
            info.version,
            info.channel_count,
            info.sampling_rate,
            info.block_count,
            info.block_size,
            info.cipher_type,
            info.ath_type,
        );

        Ok(info)
    }

    fn read_hca(&mut self, io: &mut IoContext) -> KoeResult<()> {
        self.version = u32::from(io.read_u16_be()?);
        self.data_offset = u32::from(io.read_u16_be()?);
        Ok(())
    }

    fn read_fmt(&mut self, io: &mut IoContext) -> KoeResult<()> {
        let raw = io.read_u32_be()?;
        self.channel_count = raw >> 24;
        self.sampling_rate = raw & 0x00FF_FFFF;
        self.block_count = io.read_u32_be()?;
        self.fmt_r01 = u32::from(io.read_u16_be()?);
        self.fmt_r02 = u32::from(io.read_u16_be()?);

        if !(1..=16).contains(&self.channel_count) {
            return Err(KoeError::RangeViolation(format!(
                "声道数 {} 不在 1..=16",
                self.channel_count
            )));
        }
        if !(1..=0x7F_FFFF).contains(&self.sampling_rate) {
            return Err(KoeError::RangeViolation(format!(
                "采样率 {} 不在 1..=0x7FFFFF",
                self.sampling_rate
            )));
        }
        Ok(())
    }

    fn read_comp(&mut self, io: &mut IoContext) -> KoeResult<()> {
        self.block_size = u32::from(io.read_u16_be()?);
        let buf = io.read_bytes(10)?;
        self.min_resolution = u32::from(buf[0]);
        self.max_resolution = u32::from(buf[1]);
        self.track_count = u32::from(buf[2]);
        self.channel_config = u32::from(buf[3]);
        self.total_band_count = u32::from(buf[4]);
        self.base_band_count = u32::from(buf[5]);
        self.stereo_band_count = u32::from(buf[6]);
        self.bands_per_hfr_group = u32::from(buf[7]);
        self.validate_layout()
    }

    fn read_dec(&mut self, io: &mut IoContext) -> KoeResult<()> {
        self.block_size = u32::from(io.read_u16_be()?);
        let buf = io.read_bytes(6)?;
        self.min_resolution = u32::from(buf[0]);
        self.max_resolution = u32::from(buf[1]);
        self.track_count = u32::from(buf[4] & 0xF);
        self.channel_config = u32::from(buf[4] >> 4);
        self.total_band_count = u32::from(buf[2]) + 1;
        // buf[5] 非零时基础频带数取自 buf[3], 否则与总频带数一致
        self.base_band_count = if buf[5] > 0 {
            u32::from(buf[3]) + 1
        } else {
            u32::from(buf[2]) + 1
        };
        self.stereo_band_count = self
            .total_band_count
            .checked_sub(self.base_band_count)
            .ok_or_else(|| {
                KoeError::RangeViolation(format!(
                    "基础频带数 {} 超过总频带数 {}",
                    self.base_band_count, self.total_band_count
                ))
            })?;
        self.bands_per_hfr_group = 0;
        if self.track_count == 0 {
            self.track_count = 1;
        }
        self.validate_layout()
    }

    fn validate_layout(&self) -> KoeResult<()> {
        if !(self.block_size == 0 || (8..=0xFFFF).contains(&self.block_size)) {
            return Err(KoeError::RangeViolation(format!(
                "块大小 {} 不在 {{0}} ∪ 8..=0xFFFF",
                self.block_size
            )));
        }
        if !(self.min_resolution <= self.max_resolution && self.max_resolution <= 0x1F) {
            return Err(KoeError::RangeViolation(format!(
                "分辨率区间无效: min={}, max={}",
                self.min_resolution, self.max_resolution
            )));
        }
        Ok(())
    }

    fn read_loop(&mut self, io: &mut IoContext) -> KoeResult<()> {
        self.loop_start = io.read_u32_be()?;
        self.loop_end = io.read_u32_be()?;
        self.loop_r01 = u32::from(io.read_u16_be()?);
        self.loop_r02 = u32::from(io.read_u16_be()?);
        self.loop_flag = true;
        if !(self.loop_start <= self.loop_end && self.loop_end < self.block_count) {
            return Err(KoeError::RangeViolation(format!(
                "循环区间无效: {}..{} (共 {} 块)",
                self.loop_start, self.loop_end, self.block_count
            )));
        }
        Ok(())
    }

    /// 收尾: 补默认值、派生高频组数并校验频带布局
    fn finalize(&mut self) -> KoeResult<()> {
        if self.track_count == 0 {
            self.track_count = 1;
        }
        if !(self.min_resolution == 1 && self.max_resolution == 15) {
            let hfr_bands = self
                .total_band_count
                .saturating_sub(self.base_band_count + self.stereo_band_count);
            self.hfr_group_count = ceil_div(hfr_bands, self.bands_per_hfr_group);
        }

        if self.total_band_count > 0x80 {
            return Err(KoeError::RangeViolation(format!(
                "总频带数 {} 超过 128",
                self.total_band_count
            )));
        }
        if self.base_band_count + self.stereo_band_count > self.total_band_count {
            return Err(KoeError::RangeViolation(format!(
                "频带划分无效: base={} + stereo={} > total={}",
                self.base_band_count, self.stereo_band_count, self.total_band_count
            )));
        }
        if self.base_band_count + self.stereo_band_count + self.hfr_group_count > 0x80 {
            return Err(KoeError::RangeViolation(format!(
                "高频组数 {} 超出比例因子容量",
                self.hfr_group_count
            )));
        }
        Ok(())
    }
}

/// 读取下一个块签名; 头部可能在最后一个块处结束, EOF 视为无更多块
fn next_signature(io: &mut IoContext) -> KoeResult<u32> {
    match io.read_u32_be() {
        Ok(sig) => Ok(sig),
        Err(KoeError::Eof) => Ok(0),
        Err(e) => Err(e),
    }
}

/// 向上取整除法, 除数为 0 时返回 0
fn ceil_div(a: u32, b: u32) -> u32 {
    if b == 0 {
        return 0;
    }
    a / b + u32::from(a % b != 0)
}
