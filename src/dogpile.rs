//! The stateful facade most callers reach for: a [`Dogpile`] wraps a
//! [`Lock`] and tracks its own creation timestamp, so callers that have no
//! external cache of their own (and thus nothing to probe) still get
//! dogpile prevention for free.

use crate::lock::{Lock, Probe};
use crate::mutex::{RawMutex, StdMutex};
use crate::timestamp::{self, CreationTimestamp, ExpireTime};
use std::sync::atomic::{AtomicU64, Ordering};

/// A long-lived, reusable single-flight coordinator for one logical cached
/// resource.
///
/// Generic over the creation-mutex implementation `M` (see [`RawMutex`]);
/// defaults to the bundled [`StdMutex`] unless a caller supplies their own
/// via [`Dogpile::with_mutex`].
pub struct Dogpile<M: RawMutex = StdMutex> {
    mutex: M,
    expiretime: ExpireTime,
    created: AtomicU64,
}

impl Dogpile<StdMutex> {
    /// Creates a `Dogpile` with an internal [`StdMutex`] and `createdtime`
    /// starting at [`timestamp::NEVER`] (the next acquisition is a cold
    /// start).
    pub fn new(expiretime: ExpireTime) -> Self {
        Self::with_mutex(StdMutex::new(), expiretime)
    }

    /// Like [`new`](Self::new), but seeds `createdtime` to now, so the very
    /// first acquisition is already fresh. Corresponds to the `init` flag
    /// in the construction parameters table.
    pub fn new_initialized(expiretime: ExpireTime) -> Self {
        let dogpile = Self::new(expiretime);
        dogpile.created.store(timestamp::now().to_bits(), Ordering::Release);
        dogpile
    }
}

impl<M: RawMutex> Dogpile<M> {
    /// Creates a `Dogpile` around a caller-supplied creation-mutex, e.g. a
    /// distributed lock shared across processes.
    pub fn with_mutex(mutex: M, expiretime: ExpireTime) -> Self {
        Self {
            mutex,
            expiretime,
            created: AtomicU64::new(timestamp::NEVER.to_bits()),
        }
    }

    fn created(&self) -> CreationTimestamp {
        f64::from_bits(self.created.load(Ordering::Acquire))
    }

    fn set_created(&self, t: CreationTimestamp) {
        self.created.store(t.to_bits(), Ordering::Release);
    }

    /// Whether the last-observed creation is still within `expiretime`.
    pub fn is_fresh(&self) -> bool {
        timestamp::is_fresh(self.created(), self.expiretime)
    }

    /// The flavor for a caller that manages its own timestamps via
    /// `probe`/`creator`: this `Dogpile` is used purely for its
    /// creation-mutex and `expiretime` policy. Delegates straight to
    /// [`Lock::enter`].
    #[cfg_attr(feature = "instrument", tracing::instrument(skip_all))]
    pub fn acquire_value_and_created<V, E>(
        &self,
        probe: impl FnMut() -> Result<Probe<V>, E>,
        creator: impl FnMut() -> Result<(V, CreationTimestamp), E>,
    ) -> Result<V, E> {
        Lock::new(&self.mutex, self.expiretime).enter(probe, creator)
    }

    /// The `value_fn` flavor: `value_fn` returns the caller's idea of the
    /// current value (always treated as present: staleness is judged
    /// purely against this `Dogpile`'s own embedded `createdtime`), and
    /// `creator` returns a fresh value on a cache miss or expiry. On a
    /// successful creation, this `Dogpile`'s `createdtime` is updated to
    /// now.
    #[cfg_attr(feature = "instrument", tracing::instrument(skip_all))]
    pub fn acquire_value<V, E>(
        &self,
        mut value_fn: impl FnMut() -> Result<V, E>,
        mut creator: impl FnMut() -> Result<V, E>,
    ) -> Result<V, E> {
        let probe = || -> Result<Probe<V>, E> { Ok(Probe::Present(value_fn()?, self.created())) };
        let creator_wrapper = || -> Result<(V, CreationTimestamp), E> {
            let v = creator()?;
            let t = timestamp::now();
            self.set_created(t);
            Ok((v, t))
        };
        Lock::new(&self.mutex, self.expiretime).enter(probe, creator_wrapper)
    }

    /// The no-`value_fn` flavor: the scope exists purely for mutual
    /// exclusion (e.g. "regenerate this file on disk, but only one thread
    /// at a time, and skip it entirely if someone else is already on it").
    /// `creator` runs with the creation-mutex held exactly when this
    /// `Dogpile` judges itself expired, exactly as with the other flavors;
    /// it is simply not called at all when another thread already holds
    /// the mutex (no stale "value" exists to fall back to in this flavor).
    #[cfg_attr(feature = "instrument", tracing::instrument(skip_all))]
    pub fn acquire<E>(&self, mut creator: impl FnMut() -> Result<(), E>) -> Result<(), E> {
        let probe = || -> Result<Probe<()>, E> { Ok(Probe::Present((), self.created())) };
        let creator_wrapper = || -> Result<((), CreationTimestamp), E> {
            creator()?;
            let t = timestamp::now();
            self.set_created(t);
            Ok(((), t))
        };
        Lock::new(&self.mutex, self.expiretime).enter(probe, creator_wrapper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn repeat_acquire_runs_creator_once_until_expiry() {
        let dogpile = Dogpile::new(ExpireTime::After(0.2));
        let creates = AtomicUsize::new(0);

        for _ in 0..2 {
            let result: Result<(), Infallible> = dogpile.acquire(|| {
                creates.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
            result.unwrap();
        }
        assert_eq!(creates.load(Ordering::SeqCst), 1);

        std::thread::sleep(Duration::from_millis(210));

        let result: Result<(), Infallible> = dogpile.acquire(|| {
            creates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        result.unwrap();
        assert_eq!(creates.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn never_expires_creator_runs_once() {
        let dogpile = Dogpile::new(ExpireTime::Never);
        let creates = AtomicUsize::new(0);

        for _ in 0..2 {
            let result: Result<(), Infallible> = dogpile.acquire(|| {
                creates.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
            result.unwrap();
        }
        assert_eq!(creates.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn new_initialized_skips_first_creation() {
        let dogpile = Dogpile::new_initialized(ExpireTime::After(60.0));
        assert!(dogpile.is_fresh());
        let creates = AtomicUsize::new(0);
        let result: Result<(), Infallible> = dogpile.acquire(|| {
            creates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        result.unwrap();
        assert_eq!(creates.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn acquire_value_tracks_createdtime_and_returns_value() {
        let dogpile = Dogpile::new(ExpireTime::After(60.0));
        let creates = AtomicUsize::new(0);

        let value: Result<i32, Infallible> = dogpile.acquire_value(
            || Ok(0), // never consulted meaningfully on first call: createdtime is NEVER
            || {
                creates.fetch_add(1, Ordering::SeqCst);
                Ok(42)
            },
        );
        assert_eq!(value.unwrap(), 42);

        let value2: Result<i32, Infallible> = dogpile.acquire_value(
            || Ok(42),
            || {
                creates.fetch_add(1, Ordering::SeqCst);
                Ok(99)
            },
        );
        assert_eq!(value2.unwrap(), 42);
        assert_eq!(creates.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn warm_regeneration_across_many_threads_bounded_creator_calls() {
        let dogpile = Arc::new(Dogpile::new(ExpireTime::After(0.2)));
        let creates = Arc::new(AtomicUsize::new(0));
        let total_runtime = Duration::from_millis(900);
        let start = std::time::Instant::now();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let dogpile = dogpile.clone();
                let creates = creates.clone();
                std::thread::spawn(move || {
                    let mut uses = 0;
                    while start.elapsed() < total_runtime {
                        let result: Result<(), Infallible> = dogpile.acquire(|| {
                            creates.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_millis(200));
                            Ok(())
                        });
                        result.unwrap();
                        uses += 1;
                        std::thread::sleep(Duration::from_millis(5));
                    }
                    uses
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        // Over ~900ms with a 200ms creation + 200ms expiry window, at most a
        // small handful of creations should occur, never one per acquire.
        let total = creates.load(Ordering::SeqCst);
        assert!(total >= 1, "expected at least one creation, got {total}");
        assert!(total <= 6, "expected a bounded number of creations, got {total}");
    }
}
