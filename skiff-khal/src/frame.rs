//! Register image of a suspended thread, as it lies on the thread's own stack.
//!
//! Lowest address first:
//!
//! ```text
//!  saved SP -> r4 r5 r6 r7 r8 r9 r10 r11 | r0 r1 r2 r3 r12 lr pc xpsr
//!              pushed by the trampoline  | stacked by exception entry
//! ```
//!
//! The hardware stacks and unstacks the upper half on exception entry and return.
//! The lower half is moved by the context switch trampoline, in [`SAVED_REGISTERS`]
//! order, and must be laid out identically by the initial frame of a new thread.
use super::StackWord;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CoreRegister {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
    R8,
    R9,
    R10,
    R11,
    R12,
    Lr,
    Pc,
    Xpsr,
}

impl CoreRegister {
    /// Fill pattern written into an unused slot of an initial frame when debug
    /// register fill is enabled. Each register repeats its own number.
    pub const fn sentinel(self) -> StackWord {
        match self {
            CoreRegister::R1 => 0x0101_0101,
            CoreRegister::R2 => 0x0202_0202,
            CoreRegister::R3 => 0x0303_0303,
            CoreRegister::R4 => 0x0404_0404,
            CoreRegister::R5 => 0x0505_0505,
            CoreRegister::R6 => 0x0606_0606,
            CoreRegister::R7 => 0x0707_0707,
            CoreRegister::R8 => 0x0808_0808,
            CoreRegister::R9 => 0x0909_0909,
            CoreRegister::R10 => 0x1010_1010,
            CoreRegister::R11 => 0x1111_1111,
            CoreRegister::R12 => 0x1212_1212,
            // Always carry real values in an initial frame
            CoreRegister::R0 | CoreRegister::Lr | CoreRegister::Pc | CoreRegister::Xpsr => 0,
        }
    }
}

/// Registers the trampoline saves and restores, lowest address first.
pub const SAVED_REGISTERS: [CoreRegister; SOFTWARE_FRAME_WORDS] = [
    CoreRegister::R4,
    CoreRegister::R5,
    CoreRegister::R6,
    CoreRegister::R7,
    CoreRegister::R8,
    CoreRegister::R9,
    CoreRegister::R10,
    CoreRegister::R11,
];

/// Registers stacked by exception entry, lowest address first.
pub const STACKED_REGISTERS: [CoreRegister; HARDWARE_FRAME_WORDS] = [
    CoreRegister::R0,
    CoreRegister::R1,
    CoreRegister::R2,
    CoreRegister::R3,
    CoreRegister::R12,
    CoreRegister::Lr,
    CoreRegister::Pc,
    CoreRegister::Xpsr,
];

pub const SOFTWARE_FRAME_WORDS: usize = 8;
pub const HARDWARE_FRAME_WORDS: usize = 8;
pub const FRAME_WORDS: usize = SOFTWARE_FRAME_WORDS + HARDWARE_FRAME_WORDS;

/// xPSR of a thread that has never run: Thumb state, IPSR = 0 (thread mode).
pub const INITIAL_XPSR: StackWord = 0x0100_0000;
/// xPSR.T, Thumb execution state
pub const XPSR_THUMB: u32 = 1 << 24;
/// xPSR.IPSR, number of the active exception. Zero in thread mode.
pub const XPSR_IPSR_MASK: u32 = 0x1ff;

/// EXC_RETURN values loaded into LR on exception entry.
pub const EXC_RETURN_HANDLER: u32 = 0xFFFF_FFF1;
pub const EXC_RETURN_THREAD_MSP: u32 = 0xFFFF_FFF9;
pub const EXC_RETURN_THREAD_PSP: u32 = 0xFFFF_FFFD;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SoftwareFrame {
    pub r4: StackWord,
    pub r5: StackWord,
    pub r6: StackWord,
    pub r7: StackWord,
    pub r8: StackWord,
    pub r9: StackWord,
    pub r10: StackWord,
    pub r11: StackWord,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HardwareFrame {
    pub r0: StackWord,
    pub r1: StackWord,
    pub r2: StackWord,
    pub r3: StackWord,
    pub r12: StackWord,
    pub lr: StackWord,
    pub pc: StackWord,
    pub xpsr: StackWord,
}

/// Full register image at the saved stack pointer of a suspended thread.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ThreadFrame {
    pub software: SoftwareFrame,
    pub hardware: HardwareFrame,
}

impl ThreadFrame {
    /// Slot value for `register`.
    pub fn get(&self, register: CoreRegister) -> StackWord {
        let sw = &self.software;
        let hw = &self.hardware;
        match register {
            CoreRegister::R0 => hw.r0,
            CoreRegister::R1 => hw.r1,
            CoreRegister::R2 => hw.r2,
            CoreRegister::R3 => hw.r3,
            CoreRegister::R4 => sw.r4,
            CoreRegister::R5 => sw.r5,
            CoreRegister::R6 => sw.r6,
            CoreRegister::R7 => sw.r7,
            CoreRegister::R8 => sw.r8,
            CoreRegister::R9 => sw.r9,
            CoreRegister::R10 => sw.r10,
            CoreRegister::R11 => sw.r11,
            CoreRegister::R12 => hw.r12,
            CoreRegister::Lr => hw.lr,
            CoreRegister::Pc => hw.pc,
            CoreRegister::Xpsr => hw.xpsr,
        }
    }
}

const _: () = assert!(core::mem::size_of::<ThreadFrame>() == FRAME_WORDS * core::mem::size_of::<StackWord>());
