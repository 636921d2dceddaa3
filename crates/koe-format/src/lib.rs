//! # koe-format
//!
//! Koe 框架容器层, 提供统一的 I/O 抽象与 RIFF/WAVE 封装.
//!
//! HCA 解码的输入端是任意可定位的字节源 (文件、内存), 输出端是顺序
//! 写入的字节汇; 两者都通过 [`IoContext`] 访问. WAVE 头部由
//! [`wave::WaveHeader`] 一次性构建并写出, 之后解码器按块追加 PCM 数据.

pub mod io;
pub mod wave;

// 重导出常用类型
pub use io::{IoBackend, IoContext, MemoryBackend};
pub use wave::{SampleLoop, WaveHeader};
