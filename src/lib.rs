//! # Koe (声)
//!
//! 纯 Rust 实现的 HCA (High-Compression Audio) 解码框架.
//!
//! Koe 把游戏音频管线中常见的 HCA 码流解码为标准 RIFF/WAVE 文件:
//! - **头部解析**: 按块寻址的大端头部 (`HCA`/`fmt`/`comp`/`dec`/`vbr`/`ath`/`loop`/`ciph`/`rva`/`comm`)
//! - **逐块解扰**: 三种替换表 cipher (0 / 1 / 0x38, 后者由密钥派生)
//! - **频谱解码**: 比例因子、强度立体声、高频重建、ATH 掩蔽
//! - **IMDCT**: 128 点逆变换 + 正弦窗 50% 重叠相加, 每块输出每声道 1024 采样
//! - **WAVE 输出**: float / 8 / 16 / 24 / 32 位, 支持循环展开
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use koe::codec::{DecodeConfig, HcaDecoder};
//!
//! let decoder = HcaDecoder::new(DecodeConfig::default());
//! decoder.decode_file("bgm.hca", "bgm.wav").unwrap();
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `koe-core` | 错误类型、比特读取、CRC 校验、采样格式 |
//! | `koe-codec` | HCA 解码器本体 |
//! | `koe-format` | I/O 抽象与 WAVE 封装 |

/// 核心类型与工具 (错误、比特流、CRC)
pub use koe_core as core;

/// HCA 解码器
pub use koe_codec as codec;

/// I/O 抽象与 WAVE 封装
pub use koe_format as format;

/// 获取 Koe 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
