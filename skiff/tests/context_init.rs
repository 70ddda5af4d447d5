mod common;

use common::*;
use core::ffi::c_void;
use skiff::{MIN_STACK_WORDS, build_initial_frame};
use skiff_khal::{CoreRegister, FRAME_WORDS, STACK_ALIGNMENT, STACKED_REGISTERS, SAVED_REGISTERS, ThreadFrame};

extern "C" fn entry(_: *mut c_void) {}

fn frame_at(sp: *mut skiff::StackWord) -> ThreadFrame {
    unsafe { (sp as *const ThreadFrame).read() }
}

#[test]
fn saved_pointer_is_aligned_frame_below_top() {
    let (kernel, _boot) = kernel();
    for words in [MIN_STACK_WORDS, 33, 64, 65] {
        let thread = new_thread();
        let stack = leak_stack(words);
        let base = stack.base_ptr() as usize;
        kernel.context_init(thread, stack, entry, core::ptr::null_mut());

        let top = (base + word_bytes(words - 1)) & !(STACK_ALIGNMENT - 1);
        let sp = thread.stack_ptr() as usize;
        assert_eq!(sp, top - word_bytes(FRAME_WORDS), "{} words", words);
        assert_eq!(sp % STACK_ALIGNMENT, 0);
        assert!(sp >= base);
    }
}

#[test]
fn filled_frame_carries_register_sentinels() {
    let mut stack = [0 as skiff::StackWord; 48];
    let argument = 0x1234 as *mut c_void;
    let sp = unsafe { build_initial_frame::<true>(stack.as_mut_ptr(), 48, entry, argument) };
    let frame = frame_at(sp);

    assert_eq!(frame.hardware.r0, 0x1234);
    assert_eq!(frame.hardware.r12, 0x1212_1212);
    assert_eq!(frame.software.r10, 0x1010_1010);
    for register in SAVED_REGISTERS.iter().chain(&STACKED_REGISTERS[1..5]) {
        assert_eq!(frame.get(*register), register.sentinel(), "{:?}", register);
    }
    assert_eq!(frame.get(CoreRegister::Pc), entry as usize);
    assert_eq!(frame.get(CoreRegister::Lr), 0);
}

#[test]
fn filled_and_unfilled_frames_agree_on_live_slots() {
    let mut filled = [0x77 as skiff::StackWord; 40];
    let mut plain = [0x77 as skiff::StackWord; 40];
    let argument = 9 as *mut c_void;
    let filled = frame_at(unsafe { build_initial_frame::<true>(filled.as_mut_ptr(), 40, entry, argument) });
    let plain = frame_at(unsafe { build_initial_frame::<false>(plain.as_mut_ptr(), 40, entry, argument) });

    assert_eq!(filled.hardware.r0, plain.hardware.r0);
    assert_eq!(filled.hardware.lr, plain.hardware.lr);
    assert_eq!(filled.hardware.pc, plain.hardware.pc);
    assert_eq!(filled.hardware.xpsr, plain.hardware.xpsr);
    assert_eq!(plain.software.r7, 0x77);
    assert_eq!(plain.hardware.r2, 0x77);
}

#[test]
#[should_panic(expected = "cannot hold an initial frame")]
fn too_small_stack_is_fatal() {
    let (kernel, _boot) = kernel();
    kernel.context_init(new_thread(), leak_stack(MIN_STACK_WORDS - 1), entry, core::ptr::null_mut());
}

#[test]
#[should_panic(expected = "context_init on the running thread")]
fn running_thread_cannot_be_reinitialized() {
    let (kernel, boot) = booted();
    kernel.context_init(boot, leak_stack(64), entry, core::ptr::null_mut());
}
