#![doc = include_str!("../../README.md")]
#![cfg_attr(not(test), no_std)]
#[macro_use]
pub mod kernel;
pub mod cell;
pub mod config;
pub mod scheduler;
pub mod thread;

pub use kernel::critical::CriticalKey;
pub use kernel::fault::ContractViolation;
pub use kernel::frame::{MIN_STACK_WORDS, build_initial_frame};
pub use kernel::stack::{Stack, StackRegion};
pub use kernel::switch::SwitchState;
pub use kernel::KernelContext;
pub use scheduler::SchedulerCore;
pub use skiff_khal as khal;
pub use skiff_khal::StackWord;
pub use thread::{Thread, ThreadEntry, ThreadRef};

pub mod prelude {
    pub use crate::kernel::KernelContext;
    pub use crate::kernel::critical::CriticalKey;
    pub use crate::scheduler::SchedulerCore;
    pub use crate::thread::{Thread, ThreadEntry, ThreadRef};
}
