//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 物理页分配器
//!
//! 为用户进程、内核栈、页表页和管道缓冲区分配整页（`PAGE_SIZE` 字节）物理内存。
//!
//! # 设计
//! - 每个 CPU 维护独立的空闲页池（LIFO 链表 + 一把自旋锁）
//! - 分配优先从本地池取页，只持有一把锁
//! - 本地池为空时，从 `(cpu + 1) % N` 开始轮询其它池：先探测长度，
//!   非空则窃取到本地池再重试本地弹出
//! - 释放默认归还到当前 CPU 的池
//!
//! 探测与窃取之间不是原子的，被探测为非空的池可能在窃取前被取空；
//! 窃取在持锁后重新检查，只移动实际存在的页。
//!
//! 不维护全局空闲页计数：那会让所有 CPU 争用同一个计数器。

use core::marker::PhantomData;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicBool, Ordering};

use spin::Once;

use super::freelist::fill_page;
use super::page::{MemoryLayout, PhysAddr};
use super::pool::PoolTable;
use crate::arch::{Cpu, Platform};
use crate::config::{JUNK_ON_ALLOC, JUNK_ON_FREE, NCPU, STEAL_BATCH};
use crate::error::{KallocError, Result};
use crate::sync::CpuPin;

/// 每 CPU 页分配器
///
/// `P` 提供 CPU 编号、抢占控制和致命错误处理；`N` 是池（CPU）数量。
pub struct PageAllocator<P: Platform, const N: usize = { NCPU }> {
    layout: MemoryLayout,
    pools: PoolTable<N>,
    /// initialize 已被调用（防止重复填充）
    seeded: AtomicBool,
    /// 所有受管页都已进入池中
    ready: AtomicBool,
    _platform: PhantomData<fn() -> P>,
}

/// 各池长度快照
///
/// 每一项都是独立的探测结果，不是某一时刻的全局一致视图。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PoolStats<const N: usize> {
    pub lengths: [usize; N],
}

impl<const N: usize> PoolStats<N> {
    pub fn total(&self) -> usize {
        self.lengths.iter().sum()
    }

    pub fn min(&self) -> usize {
        self.lengths.iter().copied().min().unwrap_or(0)
    }

    pub fn max(&self) -> usize {
        self.lengths.iter().copied().max().unwrap_or(0)
    }
}

impl<P: Platform, const N: usize> PageAllocator<P, N> {
    /// 创建分配器，所有池为空
    ///
    /// 池和锁在这里一次性建好，之后才可能有页被释放进来。
    pub const fn new(layout: MemoryLayout) -> Self {
        const { assert!(N > 0, "PageAllocator needs at least one pool") };
        Self {
            layout,
            pools: PoolTable::new(),
            seeded: AtomicBool::new(false),
            ready: AtomicBool::new(false),
            _platform: PhantomData,
        }
    }

    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    /// 按地址递增顺序把受管页轮流分给各池
    ///
    /// 第 i 页进入池 `i % N`，各池页数最多相差一页。只能调用一次。
    pub fn initialize(&self) {
        if self.seeded.swap(true, Ordering::AcqRel) {
            P::fatal(format_args!("kalloc: initialize called twice"));
        }

        let mut count = 0;
        for (i, pa) in self.layout.pages().enumerate() {
            self.free_page_to(pa, i % N);
            count += 1;
        }
        self.ready.store(true, Ordering::Release);

        log::info!(
            "kalloc: {} pages in [{}, {}) seeded across {} pools",
            count,
            self.layout.pages_start(),
            self.layout.pages_end(),
            N
        );
    }

    /// 填充是否已经完成
    ///
    /// 填充过程中返回 false：此时各池还不完整，分配可能误报内存不足。
    pub fn is_initialized(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// 释放一页到指定池
    ///
    /// 供初始化和重新平衡工具使用。
    pub fn free_page_to(&self, pa: PhysAddr, pool_id: usize) {
        self.check_pool(pool_id, "free_page_to");
        let page = self.checked_page(pa, "free_page_to");
        self.release(page, pool_id);
    }

    /// 释放一页到当前 CPU 的池
    ///
    /// `pa` 通常应由 [`allocate_page`](Self::allocate_page) 返回。
    pub fn free_page(&self, pa: PhysAddr) {
        let pin = CpuPin::<P>::new();
        let cpu = self.checked_cpu(pin.cpu());
        let page = self.checked_page(pa, "free_page");
        self.release(page, cpu);
    }

    /// 分配一页
    ///
    /// 返回页的每个字节都等于 `JUNK_ON_ALLOC`。
    /// 扫描完所有池仍无空闲页时返回 [`KallocError::OutOfMemory`]。
    pub fn allocate_page(&self) -> Result<PhysAddr> {
        let pin = CpuPin::<P>::new();
        let cpu = self.checked_cpu(pin.cpu());

        let page = match self.pop(cpu).or_else(|| self.steal_and_pop(cpu)) {
            Some(page) => page,
            None => {
                log::warn!("kalloc: out of memory on cpu {}", cpu);
                return Err(KallocError::OutOfMemory);
            }
        };

        // SAFETY: 页刚从池中摘下，由本次调用独占。
        unsafe { fill_page(page, JUNK_ON_ALLOC) };

        Ok(self.layout.virt_to_phys(page.as_ptr() as usize))
    }

    /// 从 `src` 池移动最多 `count` 页到 `dest` 池
    ///
    /// 两把锁按池编号升序获取。持锁后按实际可用页数移动，
    /// 源池已空时移动 0 页。返回实际移动的页数。
    pub fn steal(&self, dest: usize, src: usize, count: usize) -> usize {
        self.check_pool(dest, "steal");
        self.check_pool(src, "steal");
        if dest == src || count == 0 {
            return 0;
        }

        let moved = {
            let (mut to, mut from) = self.pools.lock_pair::<P>(dest, src);
            to.take_from(&mut from, count)
        };

        log::debug!("kalloc: stole {}/{} pages from pool {} to pool {}", moved, count, src, dest);
        moved
    }

    /// 池长度探测（仅供参考，可能已过期）
    pub fn pool_length(&self, pool_id: usize) -> usize {
        self.check_pool(pool_id, "pool_length");
        self.pools.length::<P>(pool_id)
    }

    pub fn stats(&self) -> PoolStats<N> {
        PoolStats {
            lengths: core::array::from_fn(|id| self.pool_length(id)),
        }
    }

    #[cfg(test)]
    pub(crate) fn pools(&self) -> &PoolTable<N> {
        &self.pools
    }

    fn pop(&self, pool_id: usize) -> Option<NonNull<u8>> {
        self.pools.lock::<P>(pool_id).pop()
    }

    /// 本地池为空时轮询其它池
    fn steal_and_pop(&self, cpu: usize) -> Option<NonNull<u8>> {
        for i in 1..N {
            let victim = (cpu + i) % N;

            let available = self.pool_length(victim);
            if available == 0 {
                continue;
            }

            self.steal(cpu, victim, available.min(STEAL_BATCH));
            if let Some(page) = self.pop(cpu) {
                return Some(page);
            }
        }
        None
    }

    fn release(&self, page: NonNull<u8>, pool_id: usize) {
        // SAFETY: checked_page 保证页在受管范围内；调用方把所有权交还给分配器。
        unsafe { fill_page(page, JUNK_ON_FREE) };

        let mut pool = self.pools.lock::<P>(pool_id);
        // SAFETY: 同上，且该页此刻不在任何池中。
        unsafe { pool.push(page) };
    }

    fn checked_page(&self, pa: PhysAddr, op: &str) -> NonNull<u8> {
        if !self.layout.contains_page(pa) {
            P::fatal(format_args!(
                "{}: bad page {} (managed [{}, {}))",
                op,
                pa,
                self.layout.pages_start(),
                self.layout.pages_end()
            ));
        }
        match NonNull::new(self.layout.phys_to_virt(pa) as *mut u8) {
            Some(page) => page,
            None => P::fatal(format_args!("{}: page {} maps to null", op, pa)),
        }
    }

    fn check_pool(&self, pool_id: usize, op: &str) {
        if pool_id >= N {
            P::fatal(format_args!("{}: pool {} out of range (N = {})", op, pool_id, N));
        }
    }

    fn checked_cpu(&self, cpu: usize) -> usize {
        if cpu >= N {
            P::fatal(format_args!("kalloc: cpu {} has no pool (N = {})", cpu, N));
        }
        cpu
    }
}

// ============================================================
// 全局分配器
// ============================================================

static KMEM: Once<PageAllocator<Cpu>> = Once::new();

fn kmem() -> &'static PageAllocator<Cpu> {
    match KMEM.get() {
        Some(kmem) => kmem,
        None => Cpu::fatal(format_args!("kalloc: used before initialize")),
    }
}

/// 初始化全局分配器并填充各池，必须在任何分配/释放之前调用且只调用一次
pub fn initialize(layout: MemoryLayout) {
    let mut fresh = false;
    let kmem = KMEM.call_once(|| {
        fresh = true;
        PageAllocator::new(layout)
    });
    if !fresh {
        Cpu::fatal(format_args!("kalloc: initialize called twice"));
    }
    kmem.initialize();
}

/// 全局分配器是否已创建并完成填充
pub fn is_initialized() -> bool {
    KMEM.get().is_some_and(PageAllocator::is_initialized)
}

pub fn allocate_page() -> Result<PhysAddr> {
    kmem().allocate_page()
}

pub fn free_page(pa: PhysAddr) {
    kmem().free_page(pa)
}

pub fn free_page_to(pa: PhysAddr, pool_id: usize) {
    kmem().free_page_to(pa, pool_id)
}

pub fn pool_length(pool_id: usize) -> usize {
    kmem().pool_length(pool_id)
}

pub fn steal(dest: usize, src: usize, count: usize) -> usize {
    kmem().steal(dest, src, count)
}

pub fn stats() -> PoolStats<NCPU> {
    kmem().stats()
}
