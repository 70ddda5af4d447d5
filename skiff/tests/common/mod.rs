#![allow(dead_code)]
use skiff::prelude::*;
use skiff::{StackRegion, StackWord};
use skiff_khal_sim::Simulator;
use std::cell::Cell;

/// Scheduler whose decision is set by the test. Counts how often it was asked.
pub struct MockScheduler {
    pub ready: Cell<ThreadRef>,
    pub lock: Cell<usize>,
    pub queries: Cell<usize>,
}

impl MockScheduler {
    pub fn new(ready: ThreadRef) -> MockScheduler {
        MockScheduler {
            ready: Cell::new(ready),
            lock: Cell::new(0),
            queries: Cell::new(0),
        }
    }
}

impl SchedulerCore for MockScheduler {
    fn highest_priority_ready(&self, _key: CriticalKey<'_>) -> ThreadRef {
        self.queries.set(self.queries.get() + 1);
        self.ready.get()
    }

    fn lock_depth(&self, _key: CriticalKey<'_>) -> usize {
        self.lock.get()
    }
}

pub type Kernel = KernelContext<Simulator, MockScheduler>;

pub fn new_thread() -> ThreadRef {
    ThreadRef::new(Box::leak(Box::new(Thread::new())))
}

pub fn leak_stack(words: usize) -> StackRegion {
    StackRegion::new(Box::leak(vec![0 as StackWord; words].into_boxed_slice()))
}

/// Kernel fresh out of reset. Returns it with the thread the boot code runs as.
pub fn kernel() -> (Kernel, ThreadRef) {
    skiff_khal_sim::printk::init(log::LevelFilter::Debug);
    let boot = new_thread();
    (KernelContext::new(Simulator::new(), MockScheduler::new(boot), boot), boot)
}

/// Kernel after `platform_init`, with threads on the process stack.
pub fn booted() -> (Kernel, ThreadRef) {
    let (kernel, boot) = kernel();
    unsafe { kernel.platform_init(leak_stack(256)) };
    (kernel, boot)
}

/// Raises `irq` and runs `body` as a kernel-aware ISR. A switch requested on the
/// way out runs through the simulated PendSV before this returns.
pub fn interrupt<R>(kernel: &Kernel, irq: u16, body: impl FnOnce() -> R) -> R {
    kernel.hal().interrupt(
        irq,
        || unsafe { kernel.isr(body) },
        |sp| unsafe { kernel.switch_context(sp) },
    )
}

/// Runs a pending switch, as the core would on leaving a critical section.
pub fn take_pending(kernel: &Kernel) -> bool {
    kernel
        .hal()
        .take_pending(|sp| unsafe { kernel.switch_context(sp) })
}

pub fn running(kernel: &Kernel) -> ThreadRef {
    kernel.critical(|key| kernel.running_thread(key))
}

pub fn word_bytes(words: usize) -> usize {
    words * core::mem::size_of::<StackWord>()
}
