//! Trace hooks on the interrupt and switch paths. Empty unless the `tracing`
//! feature is enabled, so they cost nothing inside interrupt-disabled windows.
#![allow(unused_variables)]
use crate::thread::ThreadRef;

#[inline(always)]
pub(crate) fn isr_enter(depth: usize) {
    #[cfg(feature = "tracing")]
    log::trace!("isr enter, depth {}", depth);
}

#[inline(always)]
pub(crate) fn isr_exit(depth: usize) {
    #[cfg(feature = "tracing")]
    log::trace!("isr exit, depth {}", depth);
}

#[inline(always)]
pub(crate) fn isr_exit_to_scheduler() {
    #[cfg(feature = "tracing")]
    log::trace!("isr exit to scheduler");
}

#[inline(always)]
pub(crate) fn switch_requested(from: ThreadRef, to: ThreadRef) {
    #[cfg(feature = "tracing")]
    log::trace!("switch requested {:?} -> {:?}", from, to);
}

#[inline(always)]
pub(crate) fn switch_coalesced(to: ThreadRef) {
    #[cfg(feature = "tracing")]
    log::trace!("switch already pending, now to {:?}", to);
}

#[inline(always)]
pub(crate) fn context_switch(from: ThreadRef, to: ThreadRef) {
    #[cfg(feature = "tracing")]
    log::trace!("context switch {:?} -> {:?}", from, to);
}
