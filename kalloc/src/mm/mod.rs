//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 内存管理模块

pub mod freelist;
pub mod kalloc;
pub mod page;
pub mod pool;

pub use kalloc::{
    allocate_page, free_page, free_page_to, initialize, is_initialized, pool_length, stats,
    steal, PageAllocator, PoolStats,
};
pub use page::{MemoryLayout, PhysAddr, PAGE_MASK, PAGE_SHIFT, PAGE_SIZE};
