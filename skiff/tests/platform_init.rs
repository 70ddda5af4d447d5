mod common;

use common::*;
use skiff_khal::registers::CONTROL_SPSEL;
use skiff_khal::{STACK_ALIGNMENT, StackRegisters};
use skiff_khal_sim::LOWEST_PRIORITY;

#[test]
fn boot_stack_becomes_process_stack() {
    let (kernel, _boot) = kernel();
    let hal = kernel.hal();
    let boot_sp = hal.main_stack_pointer();
    assert_eq!(hal.control() & CONTROL_SPSEL, 0);

    let isr_stack = leak_stack(100);
    let (base, words) = (isr_stack.base_ptr() as usize, isr_stack.len());
    unsafe { kernel.platform_init(isr_stack) };

    assert_eq!(hal.process_stack_pointer(), boot_sp);
    assert_ne!(hal.control() & CONTROL_SPSEL, 0);
    let last = base + word_bytes(words - 1);
    assert_eq!(hal.main_stack_pointer(), last & !(STACK_ALIGNMENT - 1));
    assert!(kernel.critical(|key| kernel.is_initialized(key)));
}

#[test]
fn switch_exception_gets_lowest_priority() {
    let (kernel, _boot) = kernel();
    assert_eq!(kernel.hal().pendsv_priority(), 0);

    unsafe { kernel.platform_init(leak_stack(64)) };

    assert_eq!(kernel.hal().pendsv_priority(), LOWEST_PRIORITY);
    assert_eq!(kernel.hal().systick_priority(), LOWEST_PRIORITY);
}

#[test]
fn interrupts_use_the_isr_stack_after_init() {
    let (kernel, _boot) = booted();
    let isr_top = kernel.hal().main_stack_pointer();
    let psp = kernel.hal().process_stack_pointer();

    interrupt(&kernel, 1, || {
        // Outermost frame goes to the thread stack, nested ones to the isr stack
        assert!(kernel.hal().process_stack_pointer() < psp);
        interrupt(&kernel, 2, || {
            assert!(kernel.hal().main_stack_pointer() < isr_top);
        });
        assert_eq!(kernel.hal().main_stack_pointer(), isr_top);
    });

    assert_eq!(kernel.hal().process_stack_pointer(), psp);
}

#[test]
#[should_panic(expected = "platform_init called more than once")]
fn second_init_is_fatal() {
    let (kernel, _boot) = booted();
    unsafe { kernel.platform_init(leak_stack(64)) };
}
