//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 物理地址与受管内存布局

use core::fmt;

pub use crate::config::{PAGE_SHIFT, PAGE_SIZE};

pub const PAGE_MASK: usize = PAGE_SIZE - 1;

/// 物理地址
///
/// 不做隐式对齐：释放路径需要看到调用方传入的原始地址来检查对齐。
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysAddr(pub usize);

impl PhysAddr {
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    pub const fn as_usize(&self) -> usize {
        self.0
    }

    pub const fn is_aligned(&self) -> bool {
        self.0 & PAGE_MASK == 0
    }

    pub const fn floor(&self) -> Self {
        Self(self.0 & !PAGE_MASK)
    }

    /// 向上取整到页边界（即 PGROUNDUP）
    ///
    /// 地址空间最后一页内的地址饱和到该页起点，不会溢出。
    pub const fn ceil(&self) -> Self {
        Self(self.0.saturating_add(PAGE_MASK) & !PAGE_MASK)
    }
}

impl fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysAddr({:#x})", self.0)
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<usize> for PhysAddr {
    fn from(addr: usize) -> Self {
        Self(addr)
    }
}

/// 受管物理内存布局（由启动代码提供）
///
/// 受管页为 `[pages_start, pages_end)` 中的整页，其中
/// `pages_start = ceil(range_start)`，`pages_end = floor(range_end)`。
/// 物理页通过 `phys + direct_map_offset` 访问：恒等映射时偏移为 0，
/// 高半部直接映射（HHDM）时为映射基址。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemoryLayout {
    /// 内核镜像之后的第一个地址（对应 kernel.ld 的 `end`）
    pub range_start: PhysAddr,
    /// 受管物理内存上界，不含（对应 PHYSTOP）
    pub range_end: PhysAddr,
    /// 物理地址到可访问虚拟地址的偏移
    pub direct_map_offset: usize,
}

impl MemoryLayout {
    /// 恒等映射的内存布局
    pub const fn identity(range_start: PhysAddr, range_end: PhysAddr) -> Self {
        Self {
            range_start,
            range_end,
            direct_map_offset: 0,
        }
    }

    pub const fn with_direct_map(
        range_start: PhysAddr,
        range_end: PhysAddr,
        direct_map_offset: usize,
    ) -> Self {
        Self {
            range_start,
            range_end,
            direct_map_offset,
        }
    }

    /// 第一个受管页
    pub const fn pages_start(&self) -> PhysAddr {
        self.range_start.ceil()
    }

    /// 最后一个受管页之后的地址
    ///
    /// 不足一页的尾部不受管理。
    pub const fn pages_end(&self) -> PhysAddr {
        self.range_end.floor()
    }

    /// 受管页总数
    pub const fn page_count(&self) -> usize {
        let start = self.pages_start().as_usize();
        let end = self.pages_end().as_usize();
        if end > start {
            (end - start) >> PAGE_SHIFT
        } else {
            0
        }
    }

    /// 地址是否为受管范围内的页起始地址
    pub const fn contains_page(&self, pa: PhysAddr) -> bool {
        pa.is_aligned()
            && pa.as_usize() >= self.pages_start().as_usize()
            && pa.as_usize() < self.pages_end().as_usize()
    }

    /// 物理地址对应的可访问地址
    #[inline]
    pub const fn phys_to_virt(&self, pa: PhysAddr) -> usize {
        pa.as_usize().wrapping_add(self.direct_map_offset)
    }

    #[inline]
    pub const fn virt_to_phys(&self, va: usize) -> PhysAddr {
        PhysAddr(va.wrapping_sub(self.direct_map_offset))
    }

    /// 按地址递增顺序遍历所有受管页
    pub fn pages(&self) -> impl Iterator<Item = PhysAddr> {
        let start = self.pages_start().as_usize();
        (0..self.page_count()).map(move |i| PhysAddr(start + (i << PAGE_SHIFT)))
    }
}
