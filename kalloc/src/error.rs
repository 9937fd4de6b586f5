//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 页分配器错误
//!
//! 只有可恢复的错误才会以 `Err` 返回。对齐错误、越界释放等不变量破坏
//! 不属于这里，它们通过 `Platform::fatal` 直接停机。

use core::fmt;

/// ENOMEM，和 include/uapi/asm-generic/errno-base.h
const ENOMEM: i32 = 12;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KallocError {
    /// 扫描所有池后仍没有空闲页 (ENOMEM)
    OutOfMemory,
}

impl KallocError {
    /// 获取错误代码的正数值
    #[inline]
    pub const fn as_i32(self) -> i32 {
        match self {
            KallocError::OutOfMemory => ENOMEM,
        }
    }

    /// 获取错误代码的负数值（用于系统调用返回）
    #[inline]
    pub const fn as_neg_i32(self) -> i32 {
        -self.as_i32()
    }
}

impl fmt::Display for KallocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KallocError::OutOfMemory => f.write_str("out of physical pages"),
        }
    }
}

pub type Result<T> = core::result::Result<T, KallocError>;
