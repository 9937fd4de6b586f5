//! 同步原语 (Synchronization Primitives)
//!
//! - `pin`: 禁止抢占 / 绑定 CPU 的 RAII 守卫
//! - `spinlock`: 持锁期间禁止抢占的自旋锁
//!
//! 锁本身的实现来自 `spin` crate，这里只负责与抢占控制组合。

pub mod pin;
pub mod spinlock;

pub use pin::{CpuPin, PreemptGuard};
pub use spinlock::{IrqSpinLock, IrqSpinLockGuard};
