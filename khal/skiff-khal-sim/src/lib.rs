//! Host simulator of the ARMv6-M exception model, enough of it to run the
//! kernel's context switch path on a development machine.
//!
//! The simulated core has a register file, banked MSP/PSP, CONTROL and PRIMASK,
//! and a mock register bank for the System Control Block. Stacks are ordinary
//! host memory: exception entry really writes the hardware frame below the active
//! stack pointer and exception return really reads it back, so a thread frame
//! built by the kernel is consumed exactly as the hardware would consume it.
//!
//! There is no instruction execution. The register file stands for the state of
//! whatever thread is "running", and tests set or inspect it directly.
pub mod printk;

use core::cell::{Cell, RefCell};
use skiff_khal::registers::{
    CONTROL_SPSEL, ICSR_PENDSVCLR, ICSR_PENDSVSET, SCB_ICSR, SCB_SHPR3, SHPR3_PRI_PENDSV,
    SHPR3_PRI_SYSTICK,
};
use skiff_khal::*;
use std::collections::BTreeMap;

/// Priority bits implemented per priority byte, as on Cortex-M0.
pub const PRIORITY_BITS: u32 = 2;
/// Most urgent configurable priority.
pub const HIGHEST_PRIORITY: u8 = 0x00;
/// Least urgent priority the simulated core implements.
pub const LOWEST_PRIORITY: u8 = 0xff << (8 - PRIORITY_BITS);

pub const PENDSV_EXCEPTION: u32 = 14;
pub const EXTERNAL_INTERRUPT_BASE: u32 = 16;

const BOOT_STACK_WORDS: usize = 1024;

/// Values left in caller-saved registers by handler code. Anything still holding
/// them after an exception return was not restored from the stack.
pub const CLOBBERED: StackWord = 0xDEAD_0000;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CoreRegisters([StackWord; 16]);

impl CoreRegisters {
    pub fn get(&self, register: CoreRegister) -> StackWord {
        self.0[register as usize]
    }

    pub fn set(&mut self, register: CoreRegister, value: StackWord) {
        self.0[register as usize] = value;
    }

    fn stacked(&self) -> HardwareFrame {
        HardwareFrame {
            r0: self.get(CoreRegister::R0),
            r1: self.get(CoreRegister::R1),
            r2: self.get(CoreRegister::R2),
            r3: self.get(CoreRegister::R3),
            r12: self.get(CoreRegister::R12),
            lr: self.get(CoreRegister::Lr),
            pc: self.get(CoreRegister::Pc),
            xpsr: self.get(CoreRegister::Xpsr),
        }
    }

    fn unstack(&mut self, frame: &HardwareFrame) {
        self.set(CoreRegister::R0, frame.r0);
        self.set(CoreRegister::R1, frame.r1);
        self.set(CoreRegister::R2, frame.r2);
        self.set(CoreRegister::R3, frame.r3);
        self.set(CoreRegister::R12, frame.r12);
        self.set(CoreRegister::Lr, frame.lr);
        self.set(CoreRegister::Pc, frame.pc);
        self.set(CoreRegister::Xpsr, frame.xpsr);
    }

    fn saved(&self) -> SoftwareFrame {
        SoftwareFrame {
            r4: self.get(CoreRegister::R4),
            r5: self.get(CoreRegister::R5),
            r6: self.get(CoreRegister::R6),
            r7: self.get(CoreRegister::R7),
            r8: self.get(CoreRegister::R8),
            r9: self.get(CoreRegister::R9),
            r10: self.get(CoreRegister::R10),
            r11: self.get(CoreRegister::R11),
        }
    }

    fn restore_saved(&mut self, frame: &SoftwareFrame) {
        self.set(CoreRegister::R4, frame.r4);
        self.set(CoreRegister::R5, frame.r5);
        self.set(CoreRegister::R6, frame.r6);
        self.set(CoreRegister::R7, frame.r7);
        self.set(CoreRegister::R8, frame.r8);
        self.set(CoreRegister::R9, frame.r9);
        self.set(CoreRegister::R10, frame.r10);
        self.set(CoreRegister::R11, frame.r11);
    }

    /// Active exception number, zero in thread mode.
    pub fn ipsr(&self) -> u32 {
        self.get(CoreRegister::Xpsr) as u32 & XPSR_IPSR_MASK
    }
}

pub struct Simulator {
    core: Cell<CoreRegisters>,
    msp: Cell<usize>,
    psp: Cell<usize>,
    control: Cell<u32>,
    // PRIMASK.PM, set when maskable interrupts are disabled
    primask: Cell<bool>,
    active_exceptions: Cell<usize>,

    scb: RefCell<BTreeMap<usize, u32>>,
    pendsv_pending: Cell<bool>,
    pendsv_requests: Cell<usize>,
    pendsv_dispatches: Cell<usize>,
}

// The simulated core is single threaded, like the hardware it stands for.
unsafe impl Sync for Simulator {}

impl Simulator {
    /// Core out of reset: thread mode on MSP at the top of a boot stack, interrupts
    /// enabled, every system handler priority zero.
    pub fn new() -> Simulator {
        let boot_stack: &'static mut [StackWord] =
            Box::leak(vec![0; BOOT_STACK_WORDS].into_boxed_slice());
        let boot_stack_top = boot_stack.as_mut_ptr_range().end as usize;

        let mut core = CoreRegisters([0; 16]);
        core.set(CoreRegister::Xpsr, XPSR_THUMB as StackWord);

        Simulator {
            core: Cell::new(core),
            msp: Cell::new(boot_stack_top & !(STACK_ALIGNMENT - 1)),
            psp: Cell::new(0),
            control: Cell::new(0),
            primask: Cell::new(false),
            active_exceptions: Cell::new(0),
            scb: RefCell::new(BTreeMap::new()),
            pendsv_pending: Cell::new(false),
            pendsv_requests: Cell::new(0),
            pendsv_dispatches: Cell::new(0),
        }
    }

    pub fn core_registers(&self) -> CoreRegisters {
        self.core.get()
    }

    pub fn register(&self, register: CoreRegister) -> StackWord {
        self.core.get().get(register)
    }

    pub fn set_register(&self, register: CoreRegister, value: StackWord) {
        let mut core = self.core.get();
        core.set(register, value);
        self.core.set(core);
    }

    pub fn in_thread_mode(&self) -> bool {
        self.active_exceptions.get() == 0
    }

    pub fn active_exceptions(&self) -> usize {
        self.active_exceptions.get()
    }

    pub fn pendsv_pending(&self) -> bool {
        self.pendsv_pending.get()
    }

    /// Number of writes that set ICSR.PENDSVSET.
    pub fn pendsv_requests(&self) -> usize {
        self.pendsv_requests.get()
    }

    /// Number of times the PendSV handler ran.
    pub fn pendsv_dispatches(&self) -> usize {
        self.pendsv_dispatches.get()
    }

    pub fn pendsv_priority(&self) -> u8 {
        self.read_field(&SHPR3_PRI_PENDSV) as u8
    }

    pub fn systick_priority(&self) -> u8 {
        self.read_field(&SHPR3_PRI_SYSTICK) as u8
    }

    /// Raises external interrupt `irq` and runs `handler` as its body. When the
    /// last active exception returns and PendSV is pending, PendSV tail-chains
    /// and `switch` is called as the kernel side of the switch trampoline.
    pub fn interrupt<R>(
        &self,
        irq: u16,
        handler: impl FnOnce() -> R,
        switch: impl FnMut(*mut StackWord) -> *mut StackWord,
    ) -> R {
        assert!(
            !self.primask.get(),
            "IRQ{} raised while interrupts are masked",
            irq
        );
        self.exception_entry(EXTERNAL_INTERRUPT_BASE + irq as u32);
        let rval = handler();
        self.exception_return();
        self.take_pending(switch);
        rval
    }

    /// Takes a pending PendSV if the core is in thread mode with interrupts enabled,
    /// as the hardware does right after the unmask or exception return that allows it.
    /// Returns whether PendSV ran.
    pub fn take_pending(&self, switch: impl FnMut(*mut StackWord) -> *mut StackWord) -> bool {
        if self.pendsv_pending.get() && self.in_thread_mode() && !self.primask.get() {
            self.dispatch_pendsv(switch);
            true
        } else {
            false
        }
    }

    fn dispatch_pendsv(&self, mut switch: impl FnMut(*mut StackWord) -> *mut StackWord) {
        assert!(
            self.control.get() & CONTROL_SPSEL != 0,
            "PendSV taken while threads run on the main stack"
        );
        self.pendsv_pending.set(false);
        self.exception_entry(PENDSV_EXCEPTION);

        // Trampoline: push r4-r11 below the hardware frame on the thread stack
        let mut core = self.core.get();
        let outgoing = (self.psp.get() as *mut SoftwareFrame).wrapping_sub(1);
        unsafe { outgoing.write(core.saved()) };

        let incoming = switch(outgoing as *mut StackWord) as *mut SoftwareFrame;

        core.restore_saved(&unsafe { incoming.read() });
        self.psp.set(incoming.wrapping_add(1) as usize);
        self.core.set(core);

        self.exception_return();
        self.pendsv_dispatches.set(self.pendsv_dispatches.get() + 1);
    }

    fn exception_entry(&self, exception: u32) {
        let mut core = self.core.get();
        let (stack, exc_return) = if !self.in_thread_mode() {
            (&self.msp, EXC_RETURN_HANDLER)
        } else if self.control.get() & CONTROL_SPSEL != 0 {
            (&self.psp, EXC_RETURN_THREAD_PSP)
        } else {
            (&self.msp, EXC_RETURN_THREAD_MSP)
        };

        let frame = (stack.get() as *mut HardwareFrame).wrapping_sub(1);
        unsafe { frame.write(core.stacked()) };
        stack.set(frame as usize);

        for register in [
            CoreRegister::R0,
            CoreRegister::R1,
            CoreRegister::R2,
            CoreRegister::R3,
            CoreRegister::R12,
        ] {
            core.set(register, CLOBBERED + register as StackWord);
        }
        core.set(CoreRegister::Lr, exc_return as StackWord);
        let xpsr = core.get(CoreRegister::Xpsr) as u32;
        core.set(
            CoreRegister::Xpsr,
            ((xpsr & !XPSR_IPSR_MASK) | exception) as StackWord,
        );
        self.core.set(core);
        self.active_exceptions.set(self.active_exceptions.get() + 1);
    }

    fn exception_return(&self) {
        let mut core = self.core.get();
        let stack = match core.get(CoreRegister::Lr) as u32 {
            EXC_RETURN_THREAD_PSP => &self.psp,
            EXC_RETURN_THREAD_MSP | EXC_RETURN_HANDLER => &self.msp,
            other => panic!("invalid EXC_RETURN {:#010x}", other),
        };

        let frame = stack.get() as *const HardwareFrame;
        core.unstack(&unsafe { frame.read() });
        stack.set(frame.wrapping_add(1) as usize);

        self.core.set(core);
        self.active_exceptions.set(self.active_exceptions.get() - 1);
    }
}

impl Default for Simulator {
    fn default() -> Simulator {
        Simulator::new()
    }
}

impl InterruptMask for Simulator {
    fn interrupts_enabled(&self) -> bool {
        !self.primask.get()
    }

    fn acquire(&self) -> bool {
        !self.primask.replace(true)
    }

    fn restore(&self, restore_state: bool) {
        // Only re-enable interrupts if they were enabled before the critical section.
        if restore_state {
            self.primask.set(false);
        }
    }
}

impl StackRegisters for Simulator {
    fn main_stack_pointer(&self) -> usize {
        self.msp.get()
    }

    fn process_stack_pointer(&self) -> usize {
        self.psp.get()
    }

    fn control(&self) -> u32 {
        self.control.get()
    }

    unsafe fn relocate_handler_stack(&self, handler_stack_top: *mut StackWord) {
        assert!(
            self.in_thread_mode() && self.control.get() & CONTROL_SPSEL == 0,
            "handler stack relocated outside thread mode on MSP"
        );
        self.psp.set(self.msp.get());
        self.control.set(self.control.get() | CONTROL_SPSEL);
        self.msp.set(handler_stack_top as usize);
    }
}

impl RegisterBus for Simulator {
    fn read(&self, register: Register) -> u32 {
        match register.address {
            address if address == SCB_ICSR.address => {
                ICSR_PENDSVSET.insert(0, self.pendsv_pending.get() as u32)
            }
            address => self.scb.borrow().get(&address).copied().unwrap_or(0),
        }
    }

    fn write(&self, register: Register, value: u32) {
        match register.address {
            address if address == SCB_ICSR.address => {
                if ICSR_PENDSVSET.extract(value) != 0 {
                    self.pendsv_pending.set(true);
                    self.pendsv_requests.set(self.pendsv_requests.get() + 1);
                } else if ICSR_PENDSVCLR.extract(value) != 0 {
                    self.pendsv_pending.set(false);
                }
            }
            address if address == SCB_SHPR3.address => {
                // Unimplemented low priority bits read as zero
                let mask = u32::from_ne_bytes([LOWEST_PRIORITY; 4]);
                self.scb.borrow_mut().insert(address, value & mask);
            }
            address => {
                self.scb.borrow_mut().insert(address, value);
            }
        }
    }
}

impl PortHal for Simulator {
    const NAME: &'static str = "Simulator";

    fn on_fatal(&self, error: &dyn core::error::Error) -> ! {
        panic!("{}", error)
    }
}

pub type HAL = Simulator;
