//! ARMv6-M (Cortex-M0) port.
//!
//! Threads run in thread mode on PSP, exception handlers on MSP. The context
//! switch is the PendSV handler below: it saves r4-r11 of the outgoing thread on
//! its own stack, calls `_skiff_switch_context` (exported by `skiff::bind_port!`)
//! with the resulting stack pointer, and restores r4-r11 of the incoming thread
//! from the stack pointer it returns.
#![no_std]
#![cfg(target_arch = "arm")]
use core::arch::{asm, global_asm};
use cortex_m_rt::{ExceptionFrame, exception};
use log::{LevelFilter, Log, Metadata, Record};
pub use rtt_target::rprint as print;
pub use rtt_target::rprintln as println;
use rtt_target::rtt_init_print;
use skiff_khal::registers::CONTROL_SPSEL;
use skiff_khal::*;

pub struct CortexM0;

impl CortexM0 {
    pub const fn new() -> CortexM0 {
        CortexM0
    }
}

impl InterruptMask for CortexM0 {
    #[inline(always)]
    fn interrupts_enabled(&self) -> bool {
        cortex_m::register::primask::read().is_active()
    }

    #[inline(always)]
    fn acquire(&self) -> bool {
        let restore_state = cortex_m::register::primask::read().is_active();
        cortex_m::interrupt::disable();
        restore_state
    }

    #[inline(always)]
    fn restore(&self, restore_state: bool) {
        // Only re-enable interrupts if they were enabled before the critical section.
        if restore_state {
            unsafe { cortex_m::interrupt::enable() }
        }
    }
}

impl StackRegisters for CortexM0 {
    fn main_stack_pointer(&self) -> usize {
        cortex_m::register::msp::read() as usize
    }

    fn process_stack_pointer(&self) -> usize {
        cortex_m::register::psp::read() as usize
    }

    fn control(&self) -> u32 {
        cortex_m::register::control::read().bits()
    }

    unsafe fn relocate_handler_stack(&self, handler_stack_top: *mut StackWord) {
        let control = self.control() | CONTROL_SPSEL;
        unsafe {
            asm!(
                // PSP takes over the stack we are running on
                "mrs {tmp}, msp",
                "msr psp, {tmp}",
                "msr control, {control}",
                "isb",
                // Now on PSP, MSP is free to move
                "msr msp, {top}",
                tmp = out(reg) _,
                control = in(reg) control,
                top = in(reg) handler_stack_top,
            )
        }
    }
}

impl RegisterBus for CortexM0 {
    #[inline(always)]
    fn read(&self, register: Register) -> u32 {
        unsafe { core::ptr::read_volatile(register.address as *const u32) }
    }

    #[inline(always)]
    fn write(&self, register: Register, value: u32) {
        unsafe { core::ptr::write_volatile(register.address as *mut u32, value) }
    }
}

impl PortHal for CortexM0 {
    const NAME: &'static str = "Cortex-M0";

    fn on_fatal(&self, error: &dyn core::error::Error) -> ! {
        println!("{}", error);
        halt()
    }
}

pub fn halt() -> ! {
    #[cfg(feature = "semihosting")]
    semihosting::process::abort();

    #[cfg(not(feature = "semihosting"))]
    loop {
        cortex_m::asm::wfi();
    }
}

struct RttLogger;

impl Log for RttLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        println!("[{:<5}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: RttLogger = RttLogger;

/// Sets up the RTT channel and routes `log` records to it. Call once at boot.
pub fn init_logging(level: LevelFilter) {
    rtt_init_print!();
    // No compare-and-swap on ARMv6-M, and nothing else runs yet
    unsafe {
        let _ = log::set_logger_racy(&LOGGER);
    }
    log::set_max_level(level);
}

global_asm!(
    ".cfi_sections .debug_frame
     .section .PendSV.user, \"ax\"
     .global PendSV
     .type PendSV,%function
     .thumb_func",
    ".cfi_startproc
    PendSV:",
    "mrs    r0, psp",
    // Room for r4-r11 below the hardware frame
    "subs   r0, #32",
    "stmia  r0!, {{r4-r7}}",
    // High registers go through low ones on ARMv6-M
    "mov    r4, r8",
    "mov    r5, r9",
    "mov    r6, r10",
    "mov    r7, r11",
    "stmia  r0!, {{r4-r7}}",
    "subs   r0, #32",
    // Keep EXC_RETURN, and the stack 8-byte aligned for the call
    "push   {{r4, lr}}",
    "bl     _skiff_switch_context",
    "pop    {{r4, r5}}",
    "mov    lr, r5",
    // r0 is the saved stack pointer of the incoming thread
    "adds   r0, #16",
    "ldmia  r0!, {{r4-r7}}",
    "mov    r8, r4",
    "mov    r9, r5",
    "mov    r10, r6",
    "mov    r11, r7",
    "msr    psp, r0",
    "isb",
    "subs   r0, #32",
    "ldmia  r0!, {{r4-r7}}",
    "bx     lr",
    ".cfi_endproc
     .size PendSV, . - PendSV",
);

#[exception]
unsafe fn HardFault(frame: &ExceptionFrame) -> ! {
    log::error!(
        "HardFault: pc={:#010x} lr={:#010x} xpsr={:#010x}",
        frame.pc(),
        frame.lr(),
        frame.xpsr()
    );
    halt()
}
