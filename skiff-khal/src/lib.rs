#![no_std]
pub mod frame;
pub mod registers;
pub use frame::*;
pub use registers::{Field, Register, RegisterBus};

/// One slot of a thread stack. A 32-bit word on the target.
pub type StackWord = usize;

/// Stack pointers handed between the kernel and the hardware must keep this alignment.
pub const STACK_ALIGNMENT: usize = 8;

/// Global maskable-interrupt control.
pub trait InterruptMask {
    fn interrupts_enabled(&self) -> bool;

    /// Disables maskable interrupts and returns whether they were enabled before.
    fn acquire(&self) -> bool;

    /// Re-enables maskable interrupts if `restore_state` says they were enabled
    /// when the matching `acquire` was made.
    fn restore(&self, restore_state: bool);
}

/// Banked stack-pointer registers and the CONTROL register.
pub trait StackRegisters {
    fn main_stack_pointer(&self) -> usize;

    fn process_stack_pointer(&self) -> usize;

    fn control(&self) -> u32;

    /// Moves the running code onto the process stack (PSP takes over the current
    /// MSP value and CONTROL.SPSEL is set), then points MSP at `handler_stack_top`.
    ///
    /// SAFETY: `handler_stack_top` must be the 8-byte aligned top of a block that is
    /// reserved for exception handling for the lifetime of the program, and the caller
    /// must currently be running on MSP in thread mode.
    unsafe fn relocate_handler_stack(&self, handler_stack_top: *mut StackWord);
}

/// Hardware contract of one architecture port.
pub trait PortHal: InterruptMask + StackRegisters + RegisterBus {
    const NAME: &'static str;

    /// Terminal handler for kernel contract violations. Never unwinds into the kernel.
    fn on_fatal(&self, error: &dyn core::error::Error) -> !;
}
