//! Nestable global interrupt mask.
use super::KernelContext;
use super::fault::ContractViolation;
use crate::scheduler::SchedulerCore;
use core::marker::PhantomData;
use skiff_khal::PortHal;

/// Proof that maskable interrupts are disabled for the lifetime `'cs`.
#[derive(Clone, Copy, Debug)]
pub struct CriticalKey<'cs> {
    _private: PhantomData<&'cs ()>,
}

impl<'cs> CriticalKey<'cs> {
    /// SAFETY: maskable interrupts must stay disabled for as long as the key is used.
    pub unsafe fn new() -> CriticalKey<'cs> {
        CriticalKey {
            _private: PhantomData,
        }
    }
}

impl<H: PortHal, S: SchedulerCore> KernelContext<H, S> {
    /// Enters a critical section. Interrupts are masked on the outermost enter.
    ///
    /// SAFETY: every call must be matched by exactly one later `critical_leave`,
    /// nested in reverse order. Not callable from the switch trampoline.
    pub unsafe fn critical_enter(&self) {
        let restore_state = self.hal.acquire();
        let depth = self.critical_nesting.get();
        if depth == 0 {
            self.critical_restore_state.set(restore_state);
        }
        self.critical_nesting.set(depth + 1);
    }

    /// Leaves a critical section. On the outermost leave the interrupt mask returns
    /// to the state it had before the outermost enter.
    ///
    /// SAFETY: there must be an outstanding `critical_enter`.
    pub unsafe fn critical_leave(&self) {
        let depth = self.critical_nesting.get();
        if cfg!(debug_assertions) && depth == 0 {
            self.fatal(ContractViolation::CriticalNestingUnderflow);
        }
        let depth = depth.wrapping_sub(1);
        self.critical_nesting.set(depth);
        if depth == 0 {
            self.hal.restore(self.critical_restore_state.get());
        }
    }

    /// Runs `f` inside a critical section.
    pub fn critical<R>(&self, f: impl FnOnce(CriticalKey<'_>) -> R) -> R {
        unsafe { self.critical_enter() };
        let key = unsafe { CriticalKey::new() };
        let rval = f(key);
        unsafe { self.critical_leave() };
        rval
    }

    /// Current critical section depth.
    pub fn critical_nesting(&self) -> usize {
        self.critical_nesting.get()
    }
}

#[cfg(test)]
mod tests {
    use crate::kernel::KernelContext;
    use crate::scheduler::SchedulerCore;
    use crate::thread::{Thread, ThreadRef};
    use crate::CriticalKey;
    use skiff_khal::InterruptMask;
    use skiff_khal_sim::Simulator;

    struct Single(ThreadRef);

    impl SchedulerCore for Single {
        fn highest_priority_ready(&self, _key: CriticalKey<'_>) -> ThreadRef {
            self.0
        }

        fn lock_depth(&self, _key: CriticalKey<'_>) -> usize {
            0
        }
    }

    fn kernel() -> KernelContext<Simulator, Single> {
        let idle = ThreadRef::new(Box::leak(Box::new(Thread::new())));
        KernelContext::new(Simulator::new(), Single(idle), idle)
    }

    #[test]
    fn nested_sections_mask_until_outermost_leave() {
        let kernel = kernel();
        assert!(kernel.hal().interrupts_enabled());

        for depth in 1..=4 {
            unsafe { kernel.critical_enter() };
            assert_eq!(kernel.critical_nesting(), depth);
            assert!(!kernel.hal().interrupts_enabled());
        }
        for depth in (1..4).rev() {
            unsafe { kernel.critical_leave() };
            assert_eq!(kernel.critical_nesting(), depth);
            assert!(!kernel.hal().interrupts_enabled());
        }
        unsafe { kernel.critical_leave() };
        assert_eq!(kernel.critical_nesting(), 0);
        assert!(kernel.hal().interrupts_enabled());
    }

    #[test]
    fn outermost_leave_keeps_interrupts_masked_if_they_were() {
        let kernel = kernel();
        kernel.hal().acquire();

        kernel.critical(|_| kernel.critical(|_| ()));

        assert!(!kernel.hal().interrupts_enabled());
    }

    #[test]
    #[should_panic(expected = "critical section")]
    fn unbalanced_leave_is_fatal() {
        let kernel = kernel();
        unsafe { kernel.critical_leave() };
    }
}
