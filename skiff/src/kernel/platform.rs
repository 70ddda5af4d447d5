use super::KernelContext;
use super::fault::ContractViolation;
use crate::kernel::stack::StackRegion;
use crate::scheduler::SchedulerCore;
use skiff_khal::registers::{SHPR3_PRI_PENDSV, SHPR3_PRI_SYSTICK};
use skiff_khal::{PortHal, STACK_ALIGNMENT, StackWord};

impl<H: PortHal, S: SchedulerCore> KernelContext<H, S> {
    /// One-time port setup, before the scheduler starts switching threads.
    ///
    /// - The code running now keeps its stack, but as the process stack. It
    ///   continues as the initial thread the context was created with.
    /// - `isr_stack` becomes the main stack used by every exception handler.
    /// - PendSV and SysTick get the lowest priority, so a requested switch waits
    ///   until no application interrupt is active or pending.
    ///
    /// SAFETY: must be called from thread mode while still running on the main stack.
    pub unsafe fn platform_init(&self, isr_stack: StackRegion) {
        let (base, words) = isr_stack.into_raw();
        let last = base.wrapping_add(words.saturating_sub(1)) as usize;
        let isr_stack_top = (last & !(STACK_ALIGNMENT - 1)) as *mut StackWord;

        self.critical(|key| {
            if self.initialized.replace(key, true) {
                self.fatal(ContractViolation::PlatformReinit);
            }

            unsafe { self.hal.relocate_handler_stack(isr_stack_top) };

            // Writing all ones leaves the lowest level the hardware implements
            self.hal
                .modify_field(&SHPR3_PRI_PENDSV, SHPR3_PRI_PENDSV.max_value());
            self.hal
                .modify_field(&SHPR3_PRI_SYSTICK, SHPR3_PRI_SYSTICK.max_value());
        });

        log::debug!(
            "{}: isr stack {:p}+{} words, top {:p}",
            H::NAME,
            base,
            words,
            isr_stack_top
        );
    }
}
