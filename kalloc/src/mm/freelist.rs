//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 侵入式空闲页链表
//!
//! 空闲页自身的第一个字存放指向下一个空闲页的链接，页不携带任何额外元数据。
//! 这是整个分配器中唯一直接读写页内存的模块。
//!
//! # 链接编码
//! 链接以 `next ^ LINK_MASK` 的形式存放，`LINK_MASK` 由 `JUNK_ON_FREE` 字节
//! 铺满一个字构成：
//! - 链尾页（next 为空）的每个字节都等于释放毒化值
//! - 悬空引用读到的不会是原始内核指针
//!
//! 因此“释放后整页毒化”对链尾页逐字节成立；其余空闲页的第一个字
//! 是编码后的链接，有意不等于毒化值，第一个字之后的字节仍全部毒化。

use core::mem::size_of;
use core::ptr::{self, NonNull};

use crate::config::{JUNK_ON_FREE, PAGE_SIZE};

const LINK_MASK: usize = usize::from_ne_bytes([JUNK_ON_FREE; size_of::<usize>()]);

#[inline]
fn encode(next: Option<NonNull<u8>>) -> usize {
    next.map_or(0, |p| p.as_ptr() as usize) ^ LINK_MASK
}

#[inline]
fn decode(raw: usize) -> Option<NonNull<u8>> {
    NonNull::new((raw ^ LINK_MASK) as *mut u8)
}

/// 用 `byte` 填满整页
///
/// # Safety
/// `page` 必须指向调用方独占的、可写的 `PAGE_SIZE` 字节。
#[inline]
pub unsafe fn fill_page(page: NonNull<u8>, byte: u8) {
    ptr::write_bytes(page.as_ptr(), byte, PAGE_SIZE);
}

/// 单向 LIFO 空闲页链表
pub struct FreeList {
    head: Option<NonNull<u8>>,
}

// SAFETY: 链表中的页只被持有链表的一方访问，链表随锁一起在 CPU 间转移。
unsafe impl Send for FreeList {}

impl FreeList {
    pub const fn new() -> Self {
        Self { head: None }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// 读取页中保存的下一个链接
    #[inline]
    fn next_of(page: NonNull<u8>) -> Option<NonNull<u8>> {
        // SAFETY: 链表中的页由 push 的约定保证可读且按字对齐。
        decode(unsafe { ptr::read(page.as_ptr().cast::<usize>()) })
    }

    /// 将页压入链表头部
    ///
    /// # Safety
    /// - `page` 按页对齐，指向可写的 `PAGE_SIZE` 字节
    /// - 调用方独占该页，且它不在任何链表中
    #[inline]
    pub unsafe fn push(&mut self, page: NonNull<u8>) {
        ptr::write(page.as_ptr().cast::<usize>(), encode(self.head));
        self.head = Some(page);
    }

    /// 弹出链表头部的页，所有权转移给调用方
    #[inline]
    pub fn pop(&mut self) -> Option<NonNull<u8>> {
        let page = self.head?;
        self.head = Self::next_of(page);
        Some(page)
    }

    /// 遍历链表计数
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// 从 `src` 头部摘下最多 `count` 页，依次压入本链表头部
    ///
    /// 返回实际移动的页数，即 `min(count, src.len())`。
    pub fn take_from(&mut self, src: &mut FreeList, count: usize) -> usize {
        let mut moved = 0;
        while moved < count {
            let Some(page) = src.pop() else {
                break;
            };
            // SAFETY: 页刚从 src 摘下，满足 push 的全部约定。
            unsafe { self.push(page) };
            moved += 1;
        }
        moved
    }

    /// 从头到尾遍历空闲页（只读）
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            next: self.head,
            _list: self,
        }
    }
}

impl Default for FreeList {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Iter<'a> {
    next: Option<NonNull<u8>>,
    _list: &'a FreeList,
}

impl Iterator for Iter<'_> {
    type Item = NonNull<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        let page = self.next?;
        self.next = FreeList::next_of(page);
        Some(page)
    }
}
