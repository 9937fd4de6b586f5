//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 宿主机平台实现
//!
//! 每个 OS 线程扮演一个 CPU：线程通过 [`HostCpu::bind`] 绑定 CPU 编号，
//! 编号保存在线程局部变量中，线程被 OS 抢占也不会改变它。
//! 抢占嵌套深度同样按线程记录，用于检查 guard 是否成对释放。

use core::cell::Cell;
use core::fmt;

use super::Platform;

std::thread_local! {
    static CPU_ID: Cell<usize> = const { Cell::new(0) };
    static PREEMPT_DEPTH: Cell<usize> = const { Cell::new(0) };
}

pub struct HostCpu;

impl HostCpu {
    /// 将当前线程绑定为 CPU `cpu`
    pub fn bind(cpu: usize) {
        CPU_ID.with(|id| id.set(cpu));
    }

    /// 当前线程的抢占禁止嵌套深度
    pub fn preempt_depth() -> usize {
        PREEMPT_DEPTH.with(Cell::get)
    }
}

impl Platform for HostCpu {
    #[inline]
    fn cpu_id() -> usize {
        CPU_ID.with(Cell::get)
    }

    #[inline]
    fn preempt_disable() {
        PREEMPT_DEPTH.with(|depth| depth.set(depth.get() + 1));
    }

    #[inline]
    fn preempt_enable() {
        PREEMPT_DEPTH.with(|depth| {
            let current = depth.get();
            assert!(current > 0, "preempt_enable: unbalanced");
            depth.set(current - 1);
        });
    }

    fn fatal(args: fmt::Arguments<'_>) -> ! {
        log::error!("kalloc: fatal on cpu {}: {}", Self::cpu_id(), args);
        panic!("kalloc: {}", args);
    }
}
