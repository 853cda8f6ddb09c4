//! The creation-mutex abstraction.
//!
//! [`Lock`](crate::lock::Lock) is generic over anything implementing
//! [`RawMutex`], so a caller can plug in a distributed lock instead of the
//! bundled [`StdMutex`]. This mirrors how `hardy_async` abstracts
//! runtime-specific primitives (`Notify`, `CancellationToken`, `JoinHandle`)
//! behind small wrapper types rather than assuming one concrete
//! implementation throughout.
//!
//! The contract is three operations: non-blocking acquire, blocking acquire,
//! and release. This crate expresses "release" as RAII: implementors
//! return a guard type whose `Drop` performs the release, so the state
//! machine in [`crate::lock`] never has to remember to call it explicitly.

/// Anything that can serve as the creation-mutex for a [`Lock`](crate::lock::Lock).
///
/// Implementations must not assume reentrancy: a single thread calling
/// `acquire` twice without releasing in between may deadlock.
pub trait RawMutex: Send + Sync {
    /// The guard returned by a successful acquisition. Dropping it releases
    /// the mutex.
    type Guard<'a>
    where
        Self: 'a;

    /// Acquires the mutex without blocking. Returns `None` if it is already
    /// held.
    fn try_acquire(&self) -> Option<Self::Guard<'_>>;

    /// Acquires the mutex, blocking the calling thread until it becomes
    /// available.
    fn acquire(&self) -> Self::Guard<'_>;
}

/// The bundled [`RawMutex`] implementation, backed by `std::sync::Mutex<()>`.
///
/// This is what every [`Dogpile`](crate::dogpile::Dogpile) uses unless the
/// caller supplies their own lock.
#[derive(Debug, Default)]
pub struct StdMutex(std::sync::Mutex<()>);

impl StdMutex {
    /// Creates a new, unlocked mutex.
    pub fn new() -> Self {
        Self(std::sync::Mutex::new(()))
    }
}

/// A held [`StdMutex`]; releases the lock when dropped.
pub struct StdMutexGuard<'a>(std::sync::MutexGuard<'a, ()>);

impl RawMutex for StdMutex {
    type Guard<'a> = StdMutexGuard<'a>;

    fn try_acquire(&self) -> Option<Self::Guard<'_>> {
        // A poisoned std mutex means a prior holder panicked while inside the
        // critical section it protects; there is no sound way to continue as
        // if nothing happened, so this propagates as a panic just like
        // `acquire` below, rather than being silently folded into the
        // "someone else holds it, serve stale" WouldBlock case.
        match self.0.try_lock() {
            Ok(guard) => Some(StdMutexGuard(guard)),
            Err(std::sync::TryLockError::WouldBlock) => None,
            Err(std::sync::TryLockError::Poisoned(_)) => {
                panic!("dogpile creation mutex poisoned by a prior panic")
            }
        }
    }

    fn acquire(&self) -> Self::Guard<'_> {
        // See the note on `try_acquire`: a poisoned mutex is a bug, not a
        // recoverable runtime condition.
        StdMutexGuard(
            self.0
                .lock()
                .unwrap_or_else(|_| panic!("dogpile creation mutex poisoned by a prior panic")),
        )
    }
}
