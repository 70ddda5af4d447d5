//! Build-time configuration.
use const_env::from_env;

/// Size of the interrupt stack declared by [`bind_port!`](crate::bind_port), in words.
/// Override with the `SKIFF_ISR_STACK_WORDS` environment variable at build time.
#[from_env("SKIFF_ISR_STACK_WORDS")]
pub const ISR_STACK_WORDS: usize = 128;

/// Whether `context_init` fills unused initial-frame slots with register sentinels.
pub const DEBUG_REGISTER_FILL: bool = cfg!(feature = "debug-fill");
