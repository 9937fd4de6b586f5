//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!

//! RISC-V 64 裸机平台实现
//!
//! - hart ID 由 boot.S 保存在 tp 寄存器中，trap.S 负责保存/恢复
//! - 禁止抢占 = 清除 sstatus.SIE；嵌套计数按 hart 保存
//! - 致命错误通过 SBI SRST 扩展关机

use core::arch::asm;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::Platform;
use crate::config::NCPU;

/// sstatus.SIE（S 模式全局中断使能）
const SSTATUS_SIE: usize = 1 << 1;

/// 每个 hart 的 preempt_disable 嵌套深度
static NOFF: [AtomicUsize; NCPU] = [const { AtomicUsize::new(0) }; NCPU];

/// 最外层 preempt_disable 之前的中断使能状态
static INTENA: [AtomicBool; NCPU] = [const { AtomicBool::new(false) }; NCPU];

pub struct Riscv64;

#[inline]
fn read_sstatus() -> usize {
    let sstatus: usize;
    unsafe {
        asm!("csrr {}, sstatus", out(reg) sstatus, options(nomem, nostack));
    }
    sstatus
}

#[inline]
fn intr_off() {
    unsafe {
        asm!("csrc sstatus, {}", in(reg) SSTATUS_SIE, options(nostack));
    }
}

#[inline]
fn intr_on() {
    unsafe {
        asm!("csrs sstatus, {}", in(reg) SSTATUS_SIE, options(nostack));
    }
}

#[inline]
fn hart_id() -> usize {
    let hartid: usize;
    unsafe {
        asm!("mv {}, tp", out(reg) hartid, options(nomem, nostack, pure));
    }
    hartid
}

impl Platform for Riscv64 {
    #[inline]
    fn cpu_id() -> usize {
        hart_id()
    }

    fn preempt_disable() {
        let old = read_sstatus() & SSTATUS_SIE != 0;
        intr_off();

        // 中断已关闭，hart ID 在此之后不会变化
        let hart = hart_id();
        if hart >= NCPU {
            Self::fatal(format_args!("preempt_disable: hart {} >= NCPU {}", hart, NCPU));
        }
        if NOFF[hart].load(Ordering::Relaxed) == 0 {
            INTENA[hart].store(old, Ordering::Relaxed);
        }
        NOFF[hart].fetch_add(1, Ordering::Relaxed);
    }

    fn preempt_enable() {
        if read_sstatus() & SSTATUS_SIE != 0 {
            Self::fatal(format_args!("preempt_enable: interruptible"));
        }
        let hart = hart_id();
        let noff = NOFF[hart].load(Ordering::Relaxed);
        if noff == 0 {
            Self::fatal(format_args!("preempt_enable: unbalanced on hart {}", hart));
        }
        NOFF[hart].store(noff - 1, Ordering::Relaxed);
        if noff == 1 && INTENA[hart].load(Ordering::Relaxed) {
            intr_on();
        }
    }

    fn fatal(args: fmt::Arguments<'_>) -> ! {
        intr_off();
        log::error!("kalloc: fatal on hart {}: {}", hart_id(), args);
        let _ = sbi_rt::system_reset(sbi_rt::Shutdown, sbi_rt::SystemFailure);

        // SBI 不支持 SRST 时停在这里
        loop {
            unsafe {
                asm!("wfi", options(nomem, nostack));
            }
        }
    }
}
