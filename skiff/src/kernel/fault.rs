use skiff_khal::PortHal;
use thiserror::Error;

/// Kernel contract violations. None of these are recoverable: the corrupted
/// state they stand for cannot be unwound, so each one halts the system.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("critical section left without a matching enter")]
    CriticalNestingUnderflow,

    #[error("isr_leave without a matching isr_enter")]
    IsrNestingUnderflow,

    #[error("stack of {words} words cannot hold an initial frame, at least {required} words needed")]
    StackTooSmall { words: usize, required: usize },

    #[error("context_init on the running thread")]
    InitRunningThread,

    #[error("platform_init called more than once")]
    PlatformReinit,

    #[error("context switch re-entered while executing")]
    SwitchReentered,
}

pub(crate) fn report<H: PortHal>(hal: &H, violation: ContractViolation) -> ! {
    log::error!("{}: {}", H::NAME, violation);
    hal.on_fatal(&violation)
}
