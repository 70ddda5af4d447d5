mod common;

use common::*;
use skiff::SwitchState;
use skiff_khal::InterruptMask;

#[test]
fn nesting_counter_follows_interrupt_depth() {
    let (kernel, _boot) = booted();
    let depth = || kernel.critical(|key| kernel.isr_nesting(key));

    let inner = interrupt(&kernel, 3, || {
        assert_eq!(depth(), 1);
        interrupt(&kernel, 7, || {
            assert_eq!(depth(), 2);
            interrupt(&kernel, 9, depth)
        })
    });

    assert_eq!(inner, 3);
    assert_eq!(depth(), 0);
    assert!(kernel.hal().interrupts_enabled());
}

#[test]
fn scheduler_is_asked_once_per_outermost_exit() {
    let (kernel, _boot) = booted();

    interrupt(&kernel, 3, || {
        interrupt(&kernel, 7, || ());
        interrupt(&kernel, 8, || ());
        assert_eq!(kernel.scheduler().queries.get(), 0);
    });
    assert_eq!(kernel.scheduler().queries.get(), 1);

    interrupt(&kernel, 3, || ());
    assert_eq!(kernel.scheduler().queries.get(), 2);
}

#[test]
fn no_switch_request_when_running_thread_stays_best() {
    let (kernel, boot) = booted();

    interrupt(&kernel, 3, || ());

    assert_eq!(kernel.scheduler().queries.get(), 1);
    assert_eq!(kernel.hal().pendsv_requests(), 0);
    assert_eq!(kernel.hal().pendsv_dispatches(), 0);
    assert_eq!(running(&kernel), boot);
    assert_eq!(
        kernel.critical(|key| kernel.switch_state(key)),
        SwitchState::Idle
    );
}

#[test]
fn scheduler_lock_suppresses_rescheduling() {
    let (kernel, _boot) = booted();
    let other = new_thread();
    kernel.context_init(other, leak_stack(64), idle, core::ptr::null_mut());
    kernel.scheduler().ready.set(other);
    kernel.scheduler().lock.set(1);

    interrupt(&kernel, 3, || ());

    assert_eq!(kernel.scheduler().queries.get(), 0);
    assert_eq!(kernel.hal().pendsv_requests(), 0);
    assert_ne!(running(&kernel), other);
}

#[test]
fn requests_coalesce_until_the_switch_runs() {
    let (kernel, _boot) = booted();
    let other = new_thread();
    kernel.context_init(other, leak_stack(64), idle, core::ptr::null_mut());
    kernel.scheduler().ready.set(other);

    // Back-to-back ISR exits before the switch exception gets to run
    unsafe {
        kernel.isr(|| ());
        kernel.isr(|| ());
        kernel.isr(|| ());
    }

    assert_eq!(kernel.scheduler().queries.get(), 3);
    assert_eq!(kernel.hal().pendsv_requests(), 1);
    assert!(kernel.hal().pendsv_pending());
    assert_eq!(
        kernel.critical(|key| kernel.switch_state(key)),
        SwitchState::Pending
    );

    assert!(take_pending(&kernel));
    assert_eq!(kernel.hal().pendsv_dispatches(), 1);
    assert_eq!(running(&kernel), other);
    assert_eq!(
        kernel.critical(|key| kernel.switch_state(key)),
        SwitchState::Idle
    );
}

#[test]
fn latest_decision_wins_when_switch_runs() {
    let (kernel, _boot) = booted();
    let first = new_thread();
    let second = new_thread();
    kernel.context_init(first, leak_stack(64), idle, core::ptr::null_mut());
    kernel.context_init(second, leak_stack(64), idle, core::ptr::null_mut());

    kernel.scheduler().ready.set(first);
    unsafe { kernel.isr(|| ()) };
    kernel.scheduler().ready.set(second);
    unsafe { kernel.isr(|| ()) };

    assert_eq!(kernel.hal().pendsv_requests(), 1);
    assert!(take_pending(&kernel));
    assert_eq!(running(&kernel), second);
    assert_eq!(kernel.critical(|key| kernel.context_switches(key)), 1);
}

#[test]
fn reschedule_from_thread_context_waits_for_unmask() {
    let (kernel, _boot) = booted();
    let other = new_thread();
    kernel.context_init(other, leak_stack(64), idle, core::ptr::null_mut());
    kernel.scheduler().ready.set(other);

    kernel.critical(|key| {
        kernel.reschedule(key);
        assert!(!take_pending(&kernel));
    });

    assert!(take_pending(&kernel));
    assert_eq!(running(&kernel), other);
}

#[test]
#[should_panic(expected = "isr_leave without a matching isr_enter")]
fn unmatched_isr_leave_is_fatal() {
    let (kernel, _boot) = booted();
    unsafe { kernel.isr_leave() };
}

extern "C" fn idle(_: *mut core::ffi::c_void) {}
