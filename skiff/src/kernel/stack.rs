use aligned::{A8, Aligned};
use core::ops::DerefMut;
use skiff_khal::StackWord;
use static_cell::ConstStaticCell;

/// Statically allocated, 8-byte aligned stack memory of `WORDS` words.
pub struct Stack<const WORDS: usize>(ConstStaticCell<Aligned<A8, [StackWord; WORDS]>>);

impl<const WORDS: usize> Stack<WORDS> {
    pub const fn new() -> Stack<WORDS> {
        Stack(ConstStaticCell::new(Aligned([0; WORDS])))
    }

    /// Hands out the stack memory. Panics if called twice.
    pub fn init(&'static self) -> StackRegion {
        let aligned = self.0.take();
        StackRegion::new(aligned.deref_mut())
    }
}

/// StackRegion provides a size-erased, exclusive view to a stack block. Consumed by
/// `context_init` or `platform_init`; after that the memory belongs to the thread
/// or to exception handling for the rest of the program.
pub struct StackRegion {
    words: &'static mut [StackWord],
}

impl StackRegion {
    pub fn new(words: &'static mut [StackWord]) -> StackRegion {
        StackRegion { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn base_ptr(&self) -> *const StackWord {
        self.words.as_ptr()
    }

    /// Gives up the safe view. The memory stays reserved for the program lifetime.
    pub fn into_raw(self) -> (*mut StackWord, usize) {
        (self.words.as_mut_ptr(), self.words.len())
    }
}
