//! 输出采样格式定义.
//!
//! HCA 解码输出统一为交错排列的采样流, 位深由输出模式决定.

use std::fmt;

use crate::{KoeError, KoeResult};

/// WAVE 输出模式 (位深)
///
/// 解码器内部始终以 32 位浮点运算, 输出阶段按模式做饱和转换.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputMode {
    /// 32 位 IEEE 浮点
    Float,
    /// 8 位无符号整数
    Pcm8,
    /// 16 位有符号整数
    #[default]
    Pcm16,
    /// 24 位有符号整数 (3 字节小端存储)
    Pcm24,
    /// 32 位有符号整数
    Pcm32,
}

impl OutputMode {
    /// 从命令行数值解析 (0=浮点, 8, 16, 24, 32)
    pub fn from_bits(bits: i64) -> KoeResult<Self> {
        match bits {
            0 => Ok(Self::Float),
            8 => Ok(Self::Pcm8),
            16 => Ok(Self::Pcm16),
            24 => Ok(Self::Pcm24),
            32 => Ok(Self::Pcm32),
            other => Err(KoeError::InvalidOutputMode(other)),
        }
    }

    /// WAVE `fmt` 块的格式码 (1=整数 PCM, 3=IEEE 浮点)
    pub const fn wave_format_code(&self) -> u16 {
        match self {
            Self::Float => 3,
            _ => 1,
        }
    }

    /// 每个采样点的位数
    pub const fn bit_count(&self) -> u16 {
        match self {
            Self::Float | Self::Pcm32 => 32,
            Self::Pcm8 => 8,
            Self::Pcm16 => 16,
            Self::Pcm24 => 24,
        }
    }

    /// 每个采样点占用的字节数
    pub const fn bytes_per_sample(&self) -> u32 {
        self.bit_count() as u32 / 8
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Float => "f32",
            Self::Pcm8 => "u8",
            Self::Pcm16 => "s16",
            Self::Pcm24 => "s24",
            Self::Pcm32 => "s32",
        };
        write!(f, "{name}")
    }
}
