//! 采样格式转换.
//!
//! 解码器内部输出 32 位浮点采样, 写入 WAVE 前按输出模式转换.
//! 所有整数模式都先做饱和裁剪再收窄, 超出范围的输入一律钳到可表示的
//! 最大幅度; 浮点模式直接按小端写出.

use koe_core::OutputMode;

/// 采样转换器
///
/// 持有一个按块大小预分配的输出缓冲区, 跨块复用, 避免逐块分配.
pub struct SampleConverter {
    mode: OutputMode,
    buf: Vec<u8>,
}

impl SampleConverter {
    /// 创建转换器, `samples_per_block` 为单块采样总数 (1024 × 声道数)
    pub fn new(mode: OutputMode, samples_per_block: usize) -> Self {
        Self {
            mode,
            buf: Vec::with_capacity(samples_per_block * mode.bytes_per_sample() as usize),
        }
    }

    /// 转换一个采样块, 返回可直接写出的字节切片
    pub fn convert(&mut self, samples: &[f32]) -> &[u8] {
        self.buf.clear();
        match self.mode {
            OutputMode::Float => {
                for &x in samples {
                    self.buf.extend_from_slice(&x.to_le_bytes());
                }
            }
            OutputMode::Pcm8 => {
                for &x in samples {
                    self.buf.push(convert_u8(x));
                }
            }
            OutputMode::Pcm16 => {
                for &x in samples {
                    self.buf.extend_from_slice(&convert_i16(x).to_le_bytes());
                }
            }
            OutputMode::Pcm24 => {
                for &x in samples {
                    let v = convert_i24(x);
                    self.buf.push(v as u8);
                    self.buf.push((v >> 8) as u8);
                    self.buf.push((v >> 16) as u8);
                }
            }
            OutputMode::Pcm32 => {
                for &x in samples {
                    self.buf.extend_from_slice(&convert_i32(x).to_le_bytes());
                }
            }
        }
        &self.buf
    }
}

/// 8 位无符号: 偏置 128, 裁剪到 0..=255
pub fn convert_u8(x: f32) -> u8 {
    (((x * 127.0) as i32) + 128).clamp(0, 255) as u8
}

/// 16 位有符号, 饱和裁剪
pub fn convert_i16(x: f32) -> i16 {
    (x * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// 24 位有符号 (存入 i32 低 3 字节), 饱和裁剪
pub fn convert_i24(x: f32) -> i32 {
    ((f64::from(x) * 8_388_607.0) as i64).clamp(-8_388_608, 8_388_607) as i32
}

/// 32 位有符号, 饱和裁剪
pub fn convert_i32(x: f32) -> i32 {
    (f64::from(x) * 2_147_483_647.0).clamp(-2_147_483_648.0, 2_147_483_647.0) as i32
}
