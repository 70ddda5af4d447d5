use crate::kernel::critical::CriticalKey;
use crate::thread::ThreadRef;

/// What this layer needs from the priority scheduler.
///
/// Both methods are called with maskable interrupts disabled, from interrupt
/// context at the outermost ISR exit. They must be free of side effects and
/// finish in bounded time.
pub trait SchedulerCore {
    /// The thread that should run next.
    fn highest_priority_ready(&self, key: CriticalKey<'_>) -> ThreadRef;

    /// Scheduler lock depth. While nonzero, no rescheduling happens on ISR exit.
    fn lock_depth(&self, key: CriticalKey<'_>) -> usize;
}
