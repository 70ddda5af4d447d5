//! Initial register image of a thread that has not run yet.
//!
//! The frame is laid out exactly as the switch trampoline leaves a suspended
//! thread (see [`skiff_khal::frame`]), so the first switch into the thread
//! "restores" it like any other: r4-r11 are popped by the trampoline, and the
//! exception return unstacks r0-r3, r12, lr, pc and xPSR, landing at the entry
//! function with the argument in r0.
use super::KernelContext;
use super::fault::ContractViolation;
use crate::config::DEBUG_REGISTER_FILL;
use crate::kernel::stack::StackRegion;
use crate::scheduler::SchedulerCore;
use crate::thread::{ThreadEntry, ThreadRef};
use core::ffi::c_void;
use skiff_khal::{CoreRegister, FRAME_WORDS, INITIAL_XPSR, PortHal, STACK_ALIGNMENT, StackWord};

/// Smallest stack accepted by `context_init`: the frame itself, the unused
/// top word and one word lost to alignment.
pub const MIN_STACK_WORDS: usize = FRAME_WORDS + 2;

struct FrameWriter {
    tos: *mut StackWord,
}

impl FrameWriter {
    #[inline(always)]
    unsafe fn push(&mut self, word: StackWord) {
        unsafe {
            self.tos = self.tos.sub(1);
            self.tos.write(word);
        }
    }

    #[inline(always)]
    unsafe fn push_unused<const FILL: bool>(&mut self, registers: &[CoreRegister]) {
        if FILL {
            for register in registers {
                unsafe { self.push(register.sentinel()) };
            }
        } else {
            self.tos = self.tos.wrapping_sub(registers.len());
        }
    }
}

/// Writes the initial frame below the 8-byte aligned top of `stack` and returns
/// the saved stack pointer for the thread.
///
/// With `FILL`, slots that carry no value get [`CoreRegister::sentinel`]s;
/// without it they are skipped and keep whatever the memory held.
///
/// SAFETY: `stack` must be valid for writes of `size_in_words` words, and
/// `size_in_words` at least [`MIN_STACK_WORDS`].
pub unsafe fn build_initial_frame<const FILL: bool>(
    stack: *mut StackWord,
    size_in_words: usize,
    entry: ThreadEntry,
    argument: *mut c_void,
) -> *mut StackWord {
    let last = stack.wrapping_add(size_in_words - 1) as usize;
    let mut frame = FrameWriter {
        tos: (last & !(STACK_ALIGNMENT - 1)) as *mut StackWord,
    };

    unsafe {
        frame.push(INITIAL_XPSR);
        frame.push(entry as usize);
        // Return address, entry functions never return
        frame.push(0);
        frame.push_unused::<FILL>(&[
            CoreRegister::R12,
            CoreRegister::R3,
            CoreRegister::R2,
            CoreRegister::R1,
        ]);
        frame.push(argument as usize);
        frame.push_unused::<FILL>(&[
            CoreRegister::R11,
            CoreRegister::R10,
            CoreRegister::R9,
            CoreRegister::R8,
            CoreRegister::R7,
            CoreRegister::R6,
            CoreRegister::R5,
            CoreRegister::R4,
        ]);
    }

    frame.tos
}

impl<H: PortHal, S: SchedulerCore> KernelContext<H, S> {
    /// Prepares `thread` to start at `entry(argument)` on `stack` the first time
    /// the switch engine picks it. Does not make the thread ready.
    pub fn context_init(
        &self,
        thread: ThreadRef,
        stack: StackRegion,
        entry: ThreadEntry,
        argument: *mut c_void,
    ) {
        if stack.len() < MIN_STACK_WORDS {
            self.fatal(ContractViolation::StackTooSmall {
                words: stack.len(),
                required: MIN_STACK_WORDS,
            });
        }
        if self.critical(|key| self.running.get(key) == thread) {
            self.fatal(ContractViolation::InitRunningThread);
        }

        let (base, size_in_words) = stack.into_raw();
        let stack_ptr = unsafe {
            build_initial_frame::<DEBUG_REGISTER_FILL>(base, size_in_words, entry, argument)
        };
        log::debug!(
            "{:?}: stack {:p}+{} words, entry {:#x}, sp {:p}",
            thread,
            base,
            size_in_words,
            entry as usize,
            stack_ptr
        );

        self.critical(|_key| thread.set_stack_ptr(stack_ptr));
    }
}
