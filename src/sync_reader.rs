//! [`SyncReaderDogpile`]: a [`Dogpile`] paired with a [`ReadWriteMutex`], for
//! callers whose "value" is a shared resource that readers use concurrently
//! with an in-place swap, rather than an immutable value handed back by
//! copy.
//!
//! The read lock is taken only after the value has been resolved (fresh or
//! freshly created) and is held for as long as the caller keeps the
//! returned guard alive, exactly mirroring the scope contract of the plain
//! [`Dogpile`] flavors but adding a second, independent lock that excludes
//! the creator's in-place swap from concurrent readers.

use crate::dogpile::Dogpile;
use crate::lock::Probe;
use crate::mutex::{RawMutex, StdMutex};
use crate::rwmutex::{ReadGuard, ReadWriteMutex, WriteGuard};
use crate::timestamp::{CreationTimestamp, ExpireTime};
use std::ops::Deref;

/// A [`Dogpile`] whose callers additionally want a reader/writer lock held
/// around their use of the resource, so a creator that mutates a resource
/// in place (rather than producing a brand new owned value) can exclude
/// readers while it does so.
pub struct SyncReaderDogpile<M: RawMutex = StdMutex> {
    dogpile: Dogpile<M>,
    rw: ReadWriteMutex,
}

impl SyncReaderDogpile<StdMutex> {
    /// Creates a `SyncReaderDogpile` with an internal [`StdMutex`] creation
    /// lock and a fresh [`ReadWriteMutex`].
    pub fn new(expiretime: ExpireTime) -> Self {
        Self {
            dogpile: Dogpile::new(expiretime),
            rw: ReadWriteMutex::new(),
        }
    }

    /// Like [`new`](Self::new), but the first acquisition is already fresh.
    pub fn new_initialized(expiretime: ExpireTime) -> Self {
        Self {
            dogpile: Dogpile::new_initialized(expiretime),
            rw: ReadWriteMutex::new(),
        }
    }
}

impl<M: RawMutex> SyncReaderDogpile<M> {
    /// Creates a `SyncReaderDogpile` around a caller-supplied creation-mutex.
    pub fn with_mutex(mutex: M, expiretime: ExpireTime) -> Self {
        Self {
            dogpile: Dogpile::with_mutex(mutex, expiretime),
            rw: ReadWriteMutex::new(),
        }
    }

    /// Takes the write side of the reader/writer lock directly, bypassing
    /// the creation-mutex and `expiretime` machinery entirely.
    ///
    /// Useful for a creator that wants to swap the resource in place: call
    /// this from inside the `creator` closure passed to one of the
    /// `acquire*` methods below to fence out any reader that is still
    /// holding a guard from a previous, now-stale acquisition.
    pub fn acquire_write_lock(&self) -> WriteGuard<'_> {
        self.rw.acquire_write()
    }

    /// The `value_and_created_fn` flavor, with a read lock additionally
    /// held for the lifetime of the returned guard.
    pub fn acquire_value_and_created<V, E>(
        &self,
        probe: impl FnMut() -> Result<Probe<V>, E>,
        creator: impl FnMut() -> Result<(V, CreationTimestamp), E>,
    ) -> Result<SyncReaderGuard<'_, V>, E> {
        let value = self.dogpile.acquire_value_and_created(probe, creator)?;
        Ok(SyncReaderGuard {
            value,
            read: self.rw.acquire_read(),
        })
    }

    /// The `value_fn` flavor, with a read lock additionally held for the
    /// lifetime of the returned guard.
    pub fn acquire_value<V, E>(
        &self,
        value_fn: impl FnMut() -> Result<V, E>,
        creator: impl FnMut() -> Result<V, E>,
    ) -> Result<SyncReaderGuard<'_, V>, E> {
        let value = self.dogpile.acquire_value(value_fn, creator)?;
        Ok(SyncReaderGuard {
            value,
            read: self.rw.acquire_read(),
        })
    }

    /// The mutual-exclusion-only flavor, with a read lock held for the
    /// lifetime of the returned guard so the caller can safely use whatever
    /// shared resource the creator just (re)built in place.
    pub fn acquire<E>(&self, creator: impl FnMut() -> Result<(), E>) -> Result<SyncReaderGuard<'_, ()>, E> {
        self.dogpile.acquire(creator)?;
        Ok(SyncReaderGuard {
            value: (),
            read: self.rw.acquire_read(),
        })
    }
}

/// A resolved value held alongside a read lock on its owning
/// [`SyncReaderDogpile`]. The read lock releases when this guard is
/// dropped.
pub struct SyncReaderGuard<'a, V> {
    value: V,
    read: ReadGuard<'a>,
}

impl<V> Deref for SyncReaderGuard<'_, V> {
    type Target = V;

    fn deref(&self) -> &V {
        &self.value
    }
}

impl<'a, V> SyncReaderGuard<'a, V> {
    /// Unwraps the guard, releasing the read lock and returning the value.
    pub fn into_inner(self) -> V {
        let Self { value, read } = self;
        drop(read);
        value
    }
}
