//! Context switch engine.
//!
//! The switch runs in the lowest priority exception (PendSV on Cortex-M), so it
//! starts only after every other active or pending interrupt has unwound. The
//! architecture trampoline does the register transfer around this code:
//!
//! 1. exception entry stacks r0-r3, r12, lr, pc, xPSR on the outgoing thread stack;
//! 2. the trampoline reads PSP and stores r4-r11 below the hardware frame, in
//!    [`SAVED_REGISTERS`](skiff_khal::SAVED_REGISTERS) order;
//! 3. [`KernelContext::switch_context`] records the resulting stack pointer in the
//!    running thread, hands the running designation to the high priority thread
//!    and returns that thread's saved stack pointer;
//! 4. the trampoline loads r4-r11 from it, points PSP past them, and the exception
//!    return unstacks the rest.
use super::KernelContext;
use super::critical::CriticalKey;
use super::fault::ContractViolation;
use super::tracing;
use crate::scheduler::SchedulerCore;
use skiff_khal::{PortHal, StackWord};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SwitchState {
    /// No switch requested
    Idle,
    /// Switch exception pended, waiting for all other interrupts to unwind
    Pending,
    /// Transferring the running designation
    Executing,
}

impl<H: PortHal, S: SchedulerCore> KernelContext<H, S> {
    /// Safe half of the switch trampoline. Takes the stack pointer of the outgoing
    /// thread after its full register image has been pushed, returns the stack
    /// pointer of the incoming thread's register image.
    ///
    /// SAFETY: only the switch exception trampoline may call this, after saving
    /// the outgoing registers as described in the module documentation.
    pub unsafe fn switch_context(&self, outgoing_sp: *mut StackWord) -> *mut StackWord {
        // Not the nesting counter: the trampoline must not touch thread-side
        // critical section state.
        let restore_state = self.hal.acquire();
        let key = unsafe { CriticalKey::new() };

        if self.switch_state.get(key) == SwitchState::Executing {
            self.fatal(ContractViolation::SwitchReentered);
        }
        self.switch_state.set(key, SwitchState::Executing);

        let outgoing = self.running.get(key);
        outgoing.set_stack_ptr(outgoing_sp);

        let incoming = self.high_prio.get(key);
        self.running.set(key, incoming);
        if incoming != outgoing {
            self.context_switches.update(key, |n| n.wrapping_add(1));
            tracing::context_switch(outgoing, incoming);
        }
        let incoming_sp = incoming.stack_ptr();

        self.switch_state.set(key, SwitchState::Idle);
        self.hal.restore(restore_state);
        incoming_sp
    }
}
