//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! kalloc - 多核内核的每 CPU 物理页分配器
//!
//! 管理固定大小的物理页，用于进程内存、内核栈、页表页和管道缓冲区。
//!
//! ```text
//!   allocate_page()                       free_page(pa)
//!        │                                     │
//!        ▼                                     ▼
//!   ┌─────────┐  空   ┌──────────────┐   ┌─────────┐
//!   │ 本地池  │ ────▶ │ 轮询其它池   │   │ 本地池  │
//!   │ (cpu i) │       │ 探测 → 窃取  │   │ (cpu i) │
//!   └─────────┘       └──────────────┘   └─────────┘
//! ```
//!
//! 在裸机 riscv64 上为 `no_std`；其它目标使用 std 的线程模拟 CPU。

#![cfg_attr(all(target_arch = "riscv64", target_os = "none"), no_std)]

pub mod arch;
pub mod config;
pub mod error;
pub mod mm;
pub mod sync;

#[cfg(test)]
mod tests;

pub use arch::Platform;
pub use error::KallocError;
pub use mm::{
    allocate_page, free_page, free_page_to, initialize, is_initialized, pool_length, stats,
    steal, MemoryLayout, PageAllocator, PhysAddr, PoolStats, PAGE_SIZE,
};
