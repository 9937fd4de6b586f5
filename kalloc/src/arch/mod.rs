//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! 平台抽象层
//!
//! 页分配器只依赖平台提供的四个原语：
//! - 读取当前 CPU 编号
//! - 禁止/恢复抢占（可嵌套）
//! - 致命错误停机
//!
//! 裸机 riscv64 使用 `tp` 寄存器与 `sstatus.SIE`；
//! 其它目标（宿主机测试、用户态模拟）使用线程局部状态模拟 CPU。

use core::fmt;

#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub mod riscv64;

#[cfg(not(all(target_arch = "riscv64", target_os = "none")))]
pub mod hosted;

/// 当前目标使用的平台实现
#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub type Cpu = riscv64::Riscv64;

/// 当前目标使用的平台实现
#[cfg(not(all(target_arch = "riscv64", target_os = "none")))]
pub type Cpu = hosted::HostCpu;

/// 平台原语
///
/// 所有方法都是关联函数：平台状态是每个 CPU 的全局状态，
/// 不属于某个分配器实例。
pub trait Platform {
    /// 当前执行的 CPU 编号
    ///
    /// 只有在抢占被禁止时结果才稳定。
    fn cpu_id() -> usize;

    /// 禁止抢占和迁移（对应 xv6 的 push_off）
    ///
    /// 必须可嵌套：只有最外层的 `preempt_enable` 恢复原状态。
    fn preempt_disable();

    /// 恢复抢占（对应 xv6 的 pop_off）
    fn preempt_enable();

    /// 不变量被破坏时停机
    ///
    /// 调用方不能也不应处理这种错误，因此不返回。
    fn fatal(args: fmt::Arguments<'_>) -> !;
}
