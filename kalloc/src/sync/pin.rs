//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 抢占保护 RAII 守卫
//!
//! 对应 xv6 的 push_off()/pop_off() 与 Linux 的 preempt_disable()/preempt_enable()：
//! 在作用域内禁止抢占，离开作用域（包括提前返回与 panic 展开）时自动恢复。

use core::marker::PhantomData;

use crate::arch::Platform;

/// 禁止抢占守卫
///
/// 可嵌套，只有最外层守卫释放时才恢复抢占。
/// `!Send`/`!Sync`：守卫必须在创建它的 CPU 上释放。
#[must_use = "if unused, preemption will be immediately re-enabled"]
pub struct PreemptGuard<P: Platform> {
    _marker: PhantomData<(P, *mut ())>,
}

impl<P: Platform> PreemptGuard<P> {
    #[inline]
    pub fn new() -> Self {
        P::preempt_disable();
        Self {
            _marker: PhantomData,
        }
    }
}

impl<P: Platform> Drop for PreemptGuard<P> {
    #[inline]
    fn drop(&mut self) {
        P::preempt_enable();
    }
}

/// 绑定当前 CPU 的守卫
///
/// 先禁止抢占再读取 CPU 编号，因此守卫存活期间 `cpu()` 与实际
/// 执行的 CPU 始终一致。
#[must_use = "if unused, the task may migrate immediately"]
pub struct CpuPin<P: Platform> {
    cpu: usize,
    _preempt: PreemptGuard<P>,
}

impl<P: Platform> CpuPin<P> {
    #[inline]
    pub fn new() -> Self {
        let preempt = PreemptGuard::new();
        Self {
            cpu: P::cpu_id(),
            _preempt: preempt,
        }
    }

    /// 绑定时读取的 CPU 编号
    #[inline]
    pub fn cpu(&self) -> usize {
        self.cpu
    }
}
