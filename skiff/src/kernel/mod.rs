//! Architecture mechanism layer of the kernel.
//!
//! All process-wide state lives in one [`KernelContext`]. Fields shared with
//! interrupt context are [`LockedCell`]s, so they can only be touched inside a
//! critical section or inside the switch exception, which runs with interrupts
//! masked.
pub mod critical;
pub mod fault;
pub mod frame;
pub mod isr;
pub mod platform;
pub(crate) mod stack;
pub mod switch;
pub(crate) mod tracing;

use crate::cell::LockedCell;
use crate::scheduler::SchedulerCore;
use crate::thread::ThreadRef;
use core::cell::Cell;
use skiff_khal::PortHal;
use switch::SwitchState;

pub struct KernelContext<H: PortHal, S: SchedulerCore> {
    hal: H,
    scheduler: S,

    // Only touched with interrupts already masked by `critical_enter`
    critical_nesting: Cell<usize>,
    critical_restore_state: Cell<bool>,

    isr_nesting: LockedCell<usize>,
    running: LockedCell<ThreadRef>,
    high_prio: LockedCell<ThreadRef>,
    switch_state: LockedCell<SwitchState>,
    context_switches: LockedCell<u32>,
    initialized: LockedCell<bool>,
}

// There is one core. Shared fields are serialized by masking interrupts.
unsafe impl<H: PortHal + Sync, S: SchedulerCore + Sync> Sync for KernelContext<H, S> {}

impl<H: PortHal, S: SchedulerCore> KernelContext<H, S> {
    /// Kernel state at boot: both counters zero, and both the running and the
    /// highest priority reference pointing at `initial`, the thread that the boot
    /// code continues as.
    pub const fn new(hal: H, scheduler: S, initial: ThreadRef) -> KernelContext<H, S> {
        KernelContext {
            hal,
            scheduler,
            critical_nesting: Cell::new(0),
            critical_restore_state: Cell::new(false),
            isr_nesting: LockedCell::new(0),
            running: LockedCell::new(initial),
            high_prio: LockedCell::new(initial),
            switch_state: LockedCell::new(SwitchState::Idle),
            context_switches: LockedCell::new(0),
            initialized: LockedCell::new(false),
        }
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn running_thread(&self, key: critical::CriticalKey<'_>) -> ThreadRef {
        self.running.get(key)
    }

    pub fn high_prio_thread(&self, key: critical::CriticalKey<'_>) -> ThreadRef {
        self.high_prio.get(key)
    }

    /// Scheduler-side write of the next thread to run. Picked up by the switch
    /// engine when the pending switch executes; the latest write wins.
    pub fn set_high_prio_thread(&self, key: critical::CriticalKey<'_>, thread: ThreadRef) {
        self.high_prio.set(key, thread)
    }

    pub fn isr_nesting(&self, key: critical::CriticalKey<'_>) -> usize {
        self.isr_nesting.get(key)
    }

    /// Number of switches that changed the running thread.
    pub fn context_switches(&self, key: critical::CriticalKey<'_>) -> u32 {
        self.context_switches.get(key)
    }

    pub fn is_initialized(&self, key: critical::CriticalKey<'_>) -> bool {
        self.initialized.get(key)
    }

    #[cold]
    pub(crate) fn fatal(&self, violation: fault::ContractViolation) -> ! {
        fault::report(&self.hal, violation)
    }
}

/// Glues a `'static` [`KernelContext`] to the architecture trampoline.
///
/// Declares the interrupt stack, exports the `_skiff_switch_context` symbol that
/// the PendSV handler calls with the outgoing thread's stack pointer, and defines
/// `platform_init()` for the boot code.
#[macro_export]
macro_rules! bind_port {
    ($port:path) => {
        static _SKIFF_ISR_STACK: $crate::Stack<{ $crate::config::ISR_STACK_WORDS }> =
            $crate::Stack::new();

        #[unsafe(no_mangle)]
        unsafe extern "C" fn _skiff_switch_context(
            outgoing_sp: *mut $crate::StackWord,
        ) -> *mut $crate::StackWord {
            unsafe { $port.switch_context(outgoing_sp) }
        }

        /// One-time port setup. Call once from the boot thread before starting the scheduler.
        pub fn platform_init() {
            unsafe { $port.platform_init(_SKIFF_ISR_STACK.init()) }
        }
    };
}
