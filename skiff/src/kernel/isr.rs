//! Interrupt nesting bookkeeping and rescheduling on the outermost ISR exit.
use super::KernelContext;
use super::critical::CriticalKey;
use super::fault::ContractViolation;
use super::switch::SwitchState;
use super::tracing;
use crate::scheduler::SchedulerCore;
use skiff_khal::PortHal;
use skiff_khal::registers::ICSR_PENDSVSET;

impl<H: PortHal, S: SchedulerCore> KernelContext<H, S> {
    /// Marks the start of an interrupt service routine body.
    ///
    /// SAFETY: must be called from interrupt context and matched by `isr_leave`
    /// at the end of the same ISR.
    pub unsafe fn isr_enter(&self) {
        self.critical(|key| {
            let depth = self.isr_nesting.update(key, |depth| depth + 1);
            tracing::isr_enter(depth);
        })
    }

    /// Marks the end of an interrupt service routine body. On the outermost exit,
    /// and unless the scheduler is locked, re-evaluates which thread should run.
    ///
    /// SAFETY: there must be an outstanding `isr_enter` of the same ISR.
    pub unsafe fn isr_leave(&self) {
        self.critical(|key| {
            let depth = self.isr_nesting.get(key);
            if cfg!(debug_assertions) && depth == 0 {
                self.fatal(ContractViolation::IsrNestingUnderflow);
            }
            let depth = self.isr_nesting.update(key, |depth| depth.wrapping_sub(1));
            if depth == 0 {
                tracing::isr_exit_to_scheduler();
                if self.scheduler.lock_depth(key) == 0 {
                    self.reschedule(key);
                }
            } else {
                tracing::isr_exit(depth);
            }
        })
    }

    /// Brackets `f` with `isr_enter` and `isr_leave`.
    ///
    /// SAFETY: must be the body of an interrupt service routine.
    pub unsafe fn isr<R>(&self, f: impl FnOnce() -> R) -> R {
        unsafe { self.isr_enter() };
        let rval = f();
        unsafe { self.isr_leave() };
        rval
    }

    /// Asks the scheduler for the highest priority ready thread and records it as
    /// the next thread to run. Requests a switch if it is not the running thread.
    ///
    /// Also usable from thread context after the scheduler has made a thread ready;
    /// the switch is deferred the same way it is on ISR exit.
    pub fn reschedule(&self, key: CriticalKey<'_>) {
        let next = self.scheduler.highest_priority_ready(key);
        self.high_prio.set(key, next);

        let running = self.running.get(key);
        if next != running {
            tracing::switch_requested(running, next);
            self.request_switch(key);
        }
    }

    /// Pends the switch exception. While a request is pending further requests
    /// are absorbed; the engine reads the latest decision when it runs.
    fn request_switch(&self, key: CriticalKey<'_>) {
        match self.switch_state.get(key) {
            SwitchState::Pending => tracing::switch_coalesced(self.high_prio.get(key)),
            SwitchState::Idle | SwitchState::Executing => {
                self.switch_state.set(key, SwitchState::Pending);
                self.hal.write_field(&ICSR_PENDSVSET, 1);
            }
        }
    }

    pub fn switch_state(&self, key: CriticalKey<'_>) -> SwitchState {
        self.switch_state.get(key)
    }
}
