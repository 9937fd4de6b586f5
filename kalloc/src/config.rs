//! kalloc 配置（自动生成）
//!
//! 此文件由 build.rs 根据 Kalloc.toml 自动生成，请勿手动修改

// ============================================================
// SMP 配置
// ============================================================

/// 最大CPU数量（空闲页池数量）
pub const NCPU: usize = 4;

// ============================================================
// 内存配置
// ============================================================

/// 页大小
pub const PAGE_SIZE: usize = 4096;

/// 页大小位移
pub const PAGE_SHIFT: usize = 12;

/// 每次探测成功后最多窃取的页数
pub const STEAL_BATCH: usize = 1;

// ============================================================
// 调试配置
// ============================================================

/// 释放时填充的毒化字节
pub const JUNK_ON_FREE: u8 = 0x01;

/// 分配时填充的毒化字节
pub const JUNK_ON_ALLOC: u8 = 0x05;
