use crate::kernel::critical::CriticalKey;
use core::cell::UnsafeCell;

/// Kernel state shared between thread and interrupt context.
///
/// Access requires a [`CriticalKey`], which only exists while maskable interrupts
/// are disabled. On a single core that makes every access exclusive.
#[repr(transparent)]
pub struct LockedCell<T: ?Sized> {
    value: UnsafeCell<T>,
}

unsafe impl<T: ?Sized + Send> Sync for LockedCell<T> {}

impl<T> LockedCell<T> {
    #[inline]
    pub const fn new(value: T) -> LockedCell<T> {
        LockedCell {
            value: UnsafeCell::new(value),
        }
    }

    #[inline]
    pub fn get(&self, _key: CriticalKey<'_>) -> T
    where
        T: Copy,
    {
        unsafe { *self.value.get() }
    }

    #[inline]
    pub fn set(&self, key: CriticalKey<'_>, value: T) {
        let old = self.replace(key, value);
        drop(old);
    }

    #[inline]
    pub fn replace(&self, _key: CriticalKey<'_>, value: T) -> T {
        let inner = unsafe { &mut *self.value.get() };
        core::mem::replace(inner, value)
    }
}

impl<T: Copy> LockedCell<T> {
    /// Applies `f` and returns the new value.
    #[inline]
    pub fn update<F>(&self, key: CriticalKey<'_>, f: F) -> T
    where
        F: FnOnce(T) -> T,
    {
        let new = f(self.get(key));
        self.set(key, new);
        new
    }
}

impl<T: Default> Default for LockedCell<T> {
    #[inline]
    fn default() -> LockedCell<T> {
        LockedCell::new(Default::default())
    }
}
