//! 统一错误类型定义.
//!
//! 所有 Koe crate 共用的错误类型, 支持跨模块传播.

use thiserror::Error;

/// Koe 框架统一错误类型
#[derive(Debug, Error)]
pub enum KoeError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// HCA 头部签名无效
    #[error("无效的 HCA 签名: 0x{0:08X}")]
    InvalidSignature(u32),

    /// 头部块顺序或类型不符合预期
    #[error("非预期的头部块: 期望 {expected}, 读到 0x{found:08X}")]
    UnexpectedChunk {
        /// 期望的块名
        expected: &'static str,
        /// 实际读到的签名
        found: u32,
    },

    /// 头部参数超出允许范围
    #[error("头部参数越界: {0}")]
    RangeViolation(String),

    /// 不支持的加扰类型
    #[error("不支持的加扰类型: {0}")]
    UnsupportedCipherType(u32),

    /// 加扰表初始化失败
    #[error("加扰表初始化失败: {0}")]
    CipherInitFailed(String),

    /// ATH 表初始化失败
    #[error("ATH 表初始化失败: 类型 {0}")]
    AthInitFailed(u32),

    /// 数据块 CRC 校验失败
    #[error("数据块 {0} CRC 校验失败")]
    CrcMismatch(u32),

    /// 数据块同步字不匹配
    #[error("数据块 {block} 同步字不匹配: 期望 0xFFFF, 读到 0x{found:04X}")]
    SyncMismatch {
        /// 失败的块索引
        block: u32,
        /// 实际读到的同步字
        found: u32,
    },

    /// 无效的输出模式
    #[error("无效的输出模式: {0} (允许 0/8/16/24/32)")]
    InvalidOutputMode(i64),

    /// 已到达流末尾 (短读)
    #[error("已到达流末尾")]
    Eof,

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// Koe 框架统一 Result 类型
pub type KoeResult<T> = Result<T, KoeError>;
