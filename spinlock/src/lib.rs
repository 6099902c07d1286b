//! Implements a simple spin-lock based mutex.
//!
//! The pool allocators perform no locking of their own; every pool instance
//! that is shared between contexts is wrapped in one of these mutexes, as is
//! the global pool registry.

#![cfg_attr(not(test), no_std)]

use core::cell::UnsafeCell;
use core::hint;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

pub struct Mutex<T> {
    guarded_value: UnsafeCell<T>,
    locked: AtomicBool,
}

impl<T> Mutex<T> {
    pub const fn new(value: T) -> Mutex<T> {
        Mutex {
            guarded_value: UnsafeCell::new(value),
            locked: AtomicBool::new(false),
        }
    }

    /// Acquire the mutex, spinning until it becomes available.
    pub fn lock(&self) -> MutexGuard<T> {
        loop {
            if let Some(guard) = self.try_lock() {
                return guard;
            }
            // spin on a plain load to avoid hammering the cache line with CAS
            while self.locked.load(Ordering::Relaxed) {
                hint::spin_loop();
            }
        }
    }

    /// Acquire the mutex if it is currently free.
    pub fn try_lock(&self) -> Option<MutexGuard<T>> {
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(MutexGuard { mutex: self })
        } else {
            None
        }
    }

    /// Run `callback` with the mutex held.
    pub fn with_lock<F, R>(&self, callback: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut guard = self.lock();
        callback(&mut *guard)
    }

    /// Access the value without locking. Safe because the exclusive borrow
    /// proves no other reference exists.
    pub fn get_mut(&mut self) -> &mut T {
        unsafe { &mut *self.guarded_value.get() }
    }

    pub fn into_inner(self) -> T {
        self.guarded_value.into_inner()
    }
}

unsafe impl<T: Send> Send for Mutex<T> {}
unsafe impl<T: Send> Sync for Mutex<T> {}

pub struct MutexGuard<'a, T> {
    mutex: &'a Mutex<T>,
}

impl<'a, T> Deref for MutexGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.mutex.guarded_value.get() }
    }
}

impl<'a, T> DerefMut for MutexGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.mutex.guarded_value.get() }
    }
}

impl<'a, T> Drop for MutexGuard<'a, T> {
    fn drop(&mut self) {
        self.mutex.locked.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::Mutex;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn lock_is_exclusive() {
        let mutex = Mutex::new(0_u32);

        {
            let guard = mutex.try_lock();
            assert!(guard.is_some(), "unlocked mutex must be lockable");

            let second = mutex.try_lock();
            assert!(second.is_none(), "mutex acquired twice");
        }

        // the guard going out of scope above must have released the lock
        assert!(mutex.try_lock().is_some());
    }

    #[test]
    fn with_lock_mutates() {
        let mut mutex = Mutex::new(40_u32);
        *mutex.get_mut() += 1;
        mutex.with_lock(|v| *v += 1);
        assert_eq!(mutex.into_inner(), 42);
    }

    #[test]
    fn contended_counter() {
        let mutex = Arc::new(Mutex::new(0_u64));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let mutex = Arc::clone(&mutex);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    *mutex.lock() += 1;
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*mutex.lock(), 4000);
    }
}
