//! ATH (绝对听阈) 包络表.
//!
//! 反量化阶段按频谱线叠加一条听阈包络, 阈值越高的线分到越少的量化位.
//! 类型 0 全零 (不做掩蔽), 类型 1 按采样率在基准曲线上取样.

use koe_core::{KoeError, KoeResult};

use super::tables::ATH_CURVE;

/// 128 字节 ATH 包络
pub(crate) struct AthTable {
    table: [u8; 0x80],
}

impl AthTable {
    /// 按类型与采样率构建包络
    pub(crate) fn new(ath_type: u32, sampling_rate: u32) -> KoeResult<Self> {
        match ath_type {
            0 => Ok(Self { table: [0; 0x80] }),
            1 => Ok(Self::curve(sampling_rate)),
            other => Err(KoeError::AthInitFailed(other)),
        }
    }

    /// 类型 1: 以 (线索引 × 采样率) >> 13 为下标在基准曲线上取样,
    /// 超出曲线末端后一律饱和为 0xFF.
    fn curve(sampling_rate: u32) -> Self {
        let mut table = [0xFFu8; 0x80];
        let mut acc = 0u32;
        for slot in table.iter_mut() {
            let index = (acc >> 13) as usize;
            if index >= ATH_CURVE.len() {
                break;
            }
            *slot = ATH_CURVE[index];
            acc += sampling_rate;
        }
        Self { table }
    }

    /// 取包络数据
    pub(crate) fn table(&self) -> &[u8; 0x80] {
        &self.table
    }
}
