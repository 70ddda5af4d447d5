use crate::StackWord;
use core::cell::Cell;
use core::ffi::c_void;
use core::ptr::NonNull;

/// Entry function of a thread. Receives the argument given to `context_init` in r0.
pub type ThreadEntry = extern "C" fn(*mut c_void);

/// The part of a scheduler-owned thread that this layer touches: the saved stack pointer.
///
/// The field is only meaningful while the thread is not running. The stack pointer
/// of the running thread lives in PSP.
#[repr(C)]
pub struct Thread {
    stack_ptr: Cell<*mut StackWord>,
}

// Accessed only inside critical sections or the switch exception on a single core.
unsafe impl Sync for Thread {}

impl Thread {
    pub const fn new() -> Thread {
        Thread {
            stack_ptr: Cell::new(core::ptr::null_mut()),
        }
    }
}

impl Default for Thread {
    fn default() -> Thread {
        Thread::new()
    }
}

/// Non-owning handle to a thread record. Equality is identity.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct ThreadRef(NonNull<Thread>);

// Points to a thread record that outlives the kernel. Dereferenced only on the one core.
unsafe impl Send for ThreadRef {}
unsafe impl Sync for ThreadRef {}

impl ThreadRef {
    pub const fn new(thread: &'static Thread) -> ThreadRef {
        ThreadRef(unsafe { NonNull::new_unchecked(thread as *const Thread as *mut Thread) })
    }

    /// SAFETY: `ptr` must point to a `Thread` that outlives every use of the handle.
    pub const unsafe fn from_ptr(ptr: NonNull<Thread>) -> ThreadRef {
        ThreadRef(ptr)
    }

    pub fn as_ptr(&self) -> *const Thread {
        self.0.as_ptr()
    }

    pub fn stack_ptr(&self) -> *mut StackWord {
        unsafe { self.0.as_ref() }.stack_ptr.get()
    }

    pub(crate) fn set_stack_ptr(&self, stack_ptr: *mut StackWord) {
        unsafe { self.0.as_ref() }.stack_ptr.set(stack_ptr)
    }
}

impl core::fmt::Debug for ThreadRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Thread@{:p}", self.0.as_ptr())
    }
}
