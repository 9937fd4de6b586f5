//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 禁止抢占的自旋锁
//!
//! 在 `spin::Mutex` 外包一层 [`PreemptGuard`]：持锁期间本 CPU 不会被
//! 中断或调度，避免同一 CPU 上的中断处理程序再次获取同一把锁而死锁。

use core::ops::{Deref, DerefMut};

use spin::{Mutex, MutexGuard};

use super::pin::PreemptGuard;
use crate::arch::Platform;

pub struct IrqSpinLock<T> {
    inner: Mutex<T>,
}

/// 锁守卫
///
/// 字段按声明顺序析构：先释放锁，再恢复抢占。
pub struct IrqSpinLockGuard<'a, P: Platform, T> {
    guard: MutexGuard<'a, T>,
    _preempt: PreemptGuard<P>,
}

impl<T> IrqSpinLock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            inner: Mutex::new(data),
        }
    }

    /// 获取锁，忙等直到成功
    #[inline]
    pub fn lock<P: Platform>(&self) -> IrqSpinLockGuard<'_, P, T> {
        let preempt = PreemptGuard::new();
        IrqSpinLockGuard {
            guard: self.inner.lock(),
            _preempt: preempt,
        }
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

impl<P: Platform, T> Deref for IrqSpinLockGuard<'_, P, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<P: Platform, T> DerefMut for IrqSpinLockGuard<'_, P, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
