//! # koe-codec
//!
//! Koe 框架编解码层, 当前提供 HCA (High-Compression Audio) 解码器.
//!
//! 解码流程:
//! 1. 解析按块寻址的大端头部, 得到流参数
//! 2. 逐块: CRC 校验 → cipher 解扰 → 比特解包 → 反量化 → IMDCT
//! 3. 采样格式转换后写出 RIFF/WAVE

pub mod decoders;
pub mod sample;

// 重导出常用类型
pub use decoders::hca::{Cipher, DecodeConfig, HcaDecoder, StreamInfo};
pub use koe_core::OutputMode;
pub use sample::SampleConverter;
