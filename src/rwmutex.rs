//! A reader/writer mutex with writer preference.
//!
//! Unlike `hardy_async::sync::spin::RwLock` (a busy-wait lock meant for O(1)
//! critical sections on hot paths, per that module's own doc comment) this
//! lock is meant to be held across the potentially slow work a
//! [`SyncReaderDogpile`](crate::sync_reader::SyncReaderDogpile) creator does
//! while swapping a resource, so it blocks on a condition variable instead of
//! spinning. `sync::mod`'s own "Future Additions" note anticipates exactly
//! this: a blocking `Mutex`/`RwLock` pair for the O(n)/may-block case,
//! built on `std::sync`.
//!
//! Writer preference means: once a writer is waiting, new readers block
//! behind it, even if readers are already active. This bounds writer
//! starvation under a steady stream of readers, at the cost of a reader
//! occasionally waiting for a writer that arrived after it queued.

use std::sync::{Condvar, Mutex};

#[derive(Default)]
struct State {
    readers: usize,
    writer_active: bool,
    writer_pending: bool,
}

/// A multi-reader/single-writer lock with writer preference.
pub struct ReadWriteMutex {
    state: Mutex<State>,
    condvar: Condvar,
}

impl Default for ReadWriteMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadWriteMutex {
    /// Creates a new, unlocked read-write mutex.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            condvar: Condvar::new(),
        }
    }

    /// Blocks until a read lock can be taken, then takes it.
    ///
    /// Waits while a writer is active or pending.
    #[cfg_attr(feature = "instrument", tracing::instrument(skip(self)))]
    pub fn acquire_read(&self) -> ReadGuard<'_> {
        let mut guard = self.state.lock().expect("rwmutex poisoned");
        while guard.writer_active || guard.writer_pending {
            guard = self.condvar.wait(guard).expect("rwmutex poisoned");
        }
        guard.readers += 1;
        tracing::trace!(readers = guard.readers, "read lock acquired");
        ReadGuard { lock: self }
    }

    /// Attempts to take a read lock without blocking.
    pub fn try_acquire_read(&self) -> Option<ReadGuard<'_>> {
        let mut guard = self.state.lock().expect("rwmutex poisoned");
        if guard.writer_active || guard.writer_pending {
            return None;
        }
        guard.readers += 1;
        Some(ReadGuard { lock: self })
    }

    /// Blocks until the write lock can be taken, then takes it.
    ///
    /// Marks a writer as pending immediately, so no further readers are
    /// admitted while this call waits for existing readers to drain.
    #[cfg_attr(feature = "instrument", tracing::instrument(skip(self)))]
    pub fn acquire_write(&self) -> WriteGuard<'_> {
        let mut guard = self.state.lock().expect("rwmutex poisoned");
        guard.writer_pending = true;
        while guard.readers > 0 || guard.writer_active {
            guard = self.condvar.wait(guard).expect("rwmutex poisoned");
        }
        guard.writer_pending = false;
        guard.writer_active = true;
        tracing::trace!("write lock acquired");
        WriteGuard { lock: self }
    }

    fn release_read(&self) {
        let mut guard = self.state.lock().expect("rwmutex poisoned");
        guard.readers -= 1;
        if guard.readers == 0 {
            self.condvar.notify_all();
        }
    }

    fn release_write(&self) {
        let mut guard = self.state.lock().expect("rwmutex poisoned");
        guard.writer_active = false;
        self.condvar.notify_all();
    }
}

/// A held read lock. Releases on drop.
pub struct ReadGuard<'a> {
    lock: &'a ReadWriteMutex,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_read();
    }
}

/// A held write lock. Releases on drop.
pub struct WriteGuard<'a> {
    lock: &'a ReadWriteMutex,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_write();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn multiple_readers_concurrent() {
        let lock = ReadWriteMutex::new();
        let r1 = lock.acquire_read();
        let r2 = lock.acquire_read();
        assert!(lock.try_acquire_read().is_some());
        drop(r1);
        drop(r2);
    }

    #[test]
    fn writer_excludes_readers() {
        let lock = ReadWriteMutex::new();
        let _w = lock.acquire_write();
        assert!(lock.try_acquire_read().is_none());
    }

    #[test]
    fn reader_excludes_writer() {
        let lock = Arc::new(ReadWriteMutex::new());
        let r = lock.acquire_read();
        let lock2 = lock.clone();
        let wrote = Arc::new(AtomicUsize::new(0));
        let wrote2 = wrote.clone();
        let handle = std::thread::spawn(move || {
            let _w = lock2.acquire_write();
            wrote2.store(1, Ordering::SeqCst);
        });
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(wrote.load(Ordering::SeqCst), 0);
        drop(r);
        handle.join().unwrap();
        assert_eq!(wrote.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn writer_preference_blocks_new_readers() {
        let lock = Arc::new(ReadWriteMutex::new());
        let r1 = lock.acquire_read();

        let lock2 = lock.clone();
        let writer_done = Arc::new(AtomicUsize::new(0));
        let writer_done2 = writer_done.clone();
        let writer = std::thread::spawn(move || {
            let _w = lock2.acquire_write();
            writer_done2.store(1, Ordering::SeqCst);
        });

        // Give the writer time to mark itself pending.
        std::thread::sleep(Duration::from_millis(20));

        // A new reader must not jump the queue ahead of the pending writer.
        assert!(lock.try_acquire_read().is_none());

        drop(r1);
        writer.join().unwrap();
        assert_eq!(writer_done.load(Ordering::SeqCst), 1);
    }
}
