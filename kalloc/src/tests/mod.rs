//! 单元测试模块
//!
//! 所有测试在宿主机上运行：每个测试线程通过 `HostCpu::bind` 扮演一个 CPU，
//! 受管“物理内存”是一块按页对齐的宿主机缓冲区，借助 `direct_map_offset`
//! 映射到任意物理地址（例如 0x1000）。
//!
//! 运行测试：
//! ```bash
//! cargo test -p kalloc
//! ```

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::ptr::NonNull;

use crate::arch::hosted::HostCpu;
use crate::arch::Platform;
use crate::config::PAGE_SIZE;
use crate::mm::{MemoryLayout, PageAllocator, PhysAddr};

mod freelist;

/// 测试用“物理内存”
///
/// 析构时释放缓冲区；使用它的分配器必须先于它析构。
pub struct TestMemory {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl TestMemory {
    pub fn new(pages: usize) -> Self {
        assert!(pages > 0, "TestMemory needs at least one page");
        let layout = Layout::from_size_align(pages * PAGE_SIZE, PAGE_SIZE).unwrap();
        let ptr = unsafe { alloc(layout) };
        match NonNull::new(ptr) {
            Some(ptr) => Self { ptr, layout },
            None => handle_alloc_error(layout),
        }
    }

    pub fn pages(&self) -> usize {
        self.layout.size() / PAGE_SIZE
    }

    pub fn base(&self) -> NonNull<u8> {
        self.ptr
    }

    /// 将整块缓冲区映射到物理地址 `[phys_base, phys_base + size)`
    pub fn layout_at(&self, phys_base: usize) -> MemoryLayout {
        MemoryLayout::with_direct_map(
            PhysAddr::new(phys_base),
            PhysAddr::new(phys_base + self.layout.size()),
            (self.ptr.as_ptr() as usize).wrapping_sub(phys_base),
        )
    }

    /// 恒等映射：物理地址即缓冲区地址
    pub fn identity(&self) -> MemoryLayout {
        self.layout_at(self.ptr.as_ptr() as usize)
    }
}

impl Drop for TestMemory {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

/// 读取受管页的全部字节
pub fn page_bytes(layout: &MemoryLayout, pa: PhysAddr) -> &'static [u8] {
    assert!(layout.contains_page(pa), "page {} not managed", pa);
    unsafe { std::slice::from_raw_parts(layout.phys_to_virt(pa) as *const u8, PAGE_SIZE) }
}

pub fn page_bytes_mut(layout: &MemoryLayout, pa: PhysAddr) -> &'static mut [u8] {
    assert!(layout.contains_page(pa), "page {} not managed", pa);
    unsafe { std::slice::from_raw_parts_mut(layout.phys_to_virt(pa) as *mut u8, PAGE_SIZE) }
}

/// 按链表顺序（从头到尾）列出某个池中的页，不修改池
pub fn pool_pages<P: Platform, const N: usize>(
    alloc: &PageAllocator<P, N>,
    pool_id: usize,
) -> Vec<PhysAddr> {
    let layout = *alloc.layout();
    let pool = alloc.pools().lock::<P>(pool_id);
    let pages = pool
        .iter()
        .map(|page| layout.virt_to_phys(page.as_ptr() as usize))
        .collect();
    pages
}

/// 取空所有池，返回其中的全部页
pub fn drain_all<P: Platform, const N: usize>(alloc: &PageAllocator<P, N>) -> Vec<PhysAddr> {
    let layout = *alloc.layout();
    let mut pages = Vec::new();
    for id in 0..N {
        let mut pool = alloc.pools().lock::<P>(id);
        while let Some(page) = pool.pop() {
            pages.push(layout.virt_to_phys(page.as_ptr() as usize));
        }
    }
    pages
}

/// 断言页集合恰好是全部受管页，且没有重复
pub fn assert_exact_cover(layout: &MemoryLayout, pages: &[PhysAddr]) {
    let unique: HashSet<PhysAddr> = pages.iter().copied().collect();
    assert_eq!(unique.len(), pages.len(), "a page is owned twice");
    let expected: HashSet<PhysAddr> = layout.pages().collect();
    assert_eq!(unique, expected, "pages were lost or invented");
}

std::thread_local! {
    static FATAL_CALLS: Cell<usize> = const { Cell::new(0) };
}

/// 记录 fatal 调用次数的平台，其余行为同 HostCpu
pub struct CountingCpu;

impl CountingCpu {
    pub fn fatal_calls() -> usize {
        FATAL_CALLS.with(Cell::get)
    }

    pub fn reset() {
        FATAL_CALLS.with(|c| c.set(0));
    }
}

impl Platform for CountingCpu {
    fn cpu_id() -> usize {
        HostCpu::cpu_id()
    }

    fn preempt_disable() {
        HostCpu::preempt_disable();
    }

    fn preempt_enable() {
        HostCpu::preempt_enable();
    }

    fn fatal(args: fmt::Arguments<'_>) -> ! {
        FATAL_CALLS.with(|c| c.set(c.get() + 1));
        panic!("fatal: {}", args);
    }
}

/// 执行 `f`，期望它触发 fatal
pub fn expect_fatal<F: FnOnce()>(f: F) {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));
    assert!(result.is_err(), "expected a fatal halt");
}

std::thread_local! {
    static UNPIN_HOOK: RefCell<Option<Box<dyn FnOnce()>>> = const { RefCell::new(None) };
    static UNPIN_SKIP: Cell<usize> = const { Cell::new(0) };
}

/// 可在 preempt_enable 之后插入一次动作的平台，其余行为同 HostCpu
///
/// 池锁释放时会调用 preempt_enable，借此在分配器两步操作之间
/// 模拟另一个 CPU 的干扰。
pub struct HookCpu;

impl HookCpu {
    /// 跳过前 `skip` 次 preempt_enable，在下一次之后运行 `hook`
    pub fn after_unpin(skip: usize, hook: impl FnOnce() + 'static) {
        UNPIN_SKIP.with(|c| c.set(skip));
        UNPIN_HOOK.with(|h| *h.borrow_mut() = Some(Box::new(hook)));
    }

    pub fn hook_pending() -> bool {
        UNPIN_HOOK.with(|h| h.borrow().is_some())
    }
}

impl Platform for HookCpu {
    fn cpu_id() -> usize {
        HostCpu::cpu_id()
    }

    fn preempt_disable() {
        HostCpu::preempt_disable();
    }

    fn preempt_enable() {
        HostCpu::preempt_enable();

        let skip = UNPIN_SKIP.with(Cell::get);
        if skip > 0 {
            UNPIN_SKIP.with(|c| c.set(skip - 1));
            return;
        }
        // 先取出再调用：钩子内部加解锁时不会再次触发
        if let Some(hook) = UNPIN_HOOK.with(|h| h.borrow_mut().take()) {
            hook();
        }
    }

    fn fatal(args: fmt::Arguments<'_>) -> ! {
        panic!("fatal: {}", args);
    }
}
