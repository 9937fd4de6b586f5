//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 每 CPU 空闲页池表
//!
//! 每个 CPU 一个池，每个池一把锁。
//!
//! # 锁顺序
//! 需要同时持有两个池的锁时，一律按池编号升序获取，
//! 与哪个池是“源”、哪个是“目的”无关。整个模块只有 [`PoolTable::lock_pair`]
//! 会同时持有两把池锁。

use super::freelist::FreeList;
use crate::arch::Platform;
use crate::sync::{IrqSpinLock, IrqSpinLockGuard};

pub type FreePool = IrqSpinLock<FreeList>;

pub type PoolGuard<'a, P> = IrqSpinLockGuard<'a, P, FreeList>;

pub struct PoolTable<const N: usize> {
    pools: [FreePool; N],
}

impl<const N: usize> PoolTable<N> {
    /// 创建 N 个空池（所有锁在任何页被释放之前就已就绪）
    pub const fn new() -> Self {
        Self {
            pools: [const { IrqSpinLock::new(FreeList::new()) }; N],
        }
    }

    /// 获取单个池的锁
    #[inline]
    pub fn lock<P: Platform>(&self, id: usize) -> PoolGuard<'_, P> {
        self.pools[id].lock()
    }

    /// 按固定顺序获取两个不同池的锁
    ///
    /// 返回值按调用方给出的 `(a, b)` 顺序排列，但加锁总是先小编号后大编号，
    /// 因此两个方向相反的并发调用不会死锁。
    pub fn lock_pair<P: Platform>(
        &self,
        a: usize,
        b: usize,
    ) -> (PoolGuard<'_, P>, PoolGuard<'_, P>) {
        debug_assert_ne!(a, b, "lock_pair: same pool");
        if a < b {
            let first = self.pools[a].lock();
            let second = self.pools[b].lock();
            (first, second)
        } else {
            let first = self.pools[b].lock();
            let second = self.pools[a].lock();
            (second, first)
        }
    }

    /// 在池自己的锁下遍历计数
    ///
    /// 结果仅供参考，调用方拿到时可能已经过期。
    pub fn length<P: Platform>(&self, id: usize) -> usize {
        self.lock::<P>(id).len()
    }

    /// 是否有任何池的锁正被持有
    pub fn any_locked(&self) -> bool {
        self.pools.iter().any(FreePool::is_locked)
    }
}

impl<const N: usize> Default for PoolTable<N> {
    fn default() -> Self {
        Self::new()
    }
}
