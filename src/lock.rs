//! The single-flight coordination primitive.
//!
//! [`Lock`] is the engine behind [`Dogpile`](crate::dogpile::Dogpile): given
//! a `probe` (reads the current value and its creation time, or signals that
//! regeneration is needed) and a `creator` (produces a fresh value), it
//! guarantees at most one concurrent `creator` invocation while serving a
//! stale value to everyone else during regeneration.

use crate::mutex::RawMutex;
use crate::timestamp::{self, CreationTimestamp, ExpireTime};
use trace_err::TraceErrOption;

/// What a probe observed.
pub enum Probe<V> {
    /// A value exists with a known creation time.
    Present(V, CreationTimestamp),
    /// No usable value right now (equivalent to "absent" for expiry
    /// purposes). Typically raised when an external cache was invalidated.
    NeedsRegeneration,
}

/// Internal control token distinguishing "a fresh value was produced" from
/// "nothing to do, go serve the stale value the caller already has"
/// (instead of a magic sentinel value).
enum CreateOutcome<V> {
    Regenerated(V, CreationTimestamp),
    NotRegenerated,
}

/// Logs and panics for a `DoubleRegenerationBug`: the creator ran (or a
/// concurrent creator was believed to be running) but the cache it should
/// have populated is still reporting `NeedsRegeneration`. This is a bug in
/// the caller's probe/creator pair, not a recoverable runtime condition.
#[cold]
fn double_regeneration_bug<V>() -> V {
    Option::<V>::None
        .trace_expect("dogpile: creator should have run concurrently but cache is still empty")
}

/// The single-flight coordination object.
///
/// Constructed fresh for each entry (it borrows its mutex, probe, and
/// creator only for the duration of one [`enter`](Lock::enter) call); it
/// stores no value of its own between uses.
pub struct Lock<'a, M: RawMutex> {
    mutex: &'a M,
    expiretime: ExpireTime,
}

impl<'a, M: RawMutex> Lock<'a, M> {
    /// Creates a `Lock` bound to the given creation-mutex and expiry policy.
    pub fn new(mutex: &'a M, expiretime: ExpireTime) -> Self {
        Self { mutex, expiretime }
    }

    /// Runs the single-flight entry algorithm, returning the value the
    /// caller should use (fresh, or a served-stale value from an in-flight
    /// regeneration elsewhere).
    ///
    /// `probe` and `creator` may return the caller's own error type `E`,
    /// which propagates unchanged. A creator-side `Err` leaves the mutex
    /// released for the next attempt (no poisoning of this primitive's own
    /// state: only the caller's external cache can be left inconsistent,
    /// which is the caller's concern, not this crate's).
    #[cfg_attr(feature = "instrument", tracing::instrument(skip_all))]
    pub fn enter<V, E>(
        &self,
        mut probe: impl FnMut() -> Result<Probe<V>, E>,
        mut creator: impl FnMut() -> Result<(V, CreationTimestamp), E>,
    ) -> Result<V, E> {
        let (value, created) = match probe()? {
            Probe::Present(v, t) => (Some(v), t),
            Probe::NeedsRegeneration => (None, timestamp::NEVER),
        };

        match self.enter_create(created, &mut probe, &mut creator)? {
            CreateOutcome::Regenerated(v, _) => Ok(v),
            CreateOutcome::NotRegenerated => match value {
                Some(v) => Ok(v),
                // `enter_create` only returns `NotRegenerated` when the
                // initial probe found `has_value(t)` true (or fresh), which
                // means `value` came from `Probe::Present` and can't be
                // `None` here. This branch guards against a future refactor
                // of `enter_create` breaking that coupling, not against a
                // reachable runtime state.
                None => {
                    if let Probe::Present(v, _) = probe()? {
                        Ok(v)
                    } else {
                        double_regeneration_bug()
                    }
                }
            },
        }
    }

    /// The cold-start / warm-regeneration decision point: decides whether
    /// the current value is still fresh, and if not, whether to block for
    /// a cold-start creation or hand off to an in-flight regeneration
    /// elsewhere.
    fn enter_create<V, E>(
        &self,
        created: CreationTimestamp,
        probe: &mut impl FnMut() -> Result<Probe<V>, E>,
        creator: &mut impl FnMut() -> Result<(V, CreationTimestamp), E>,
    ) -> Result<CreateOutcome<V>, E> {
        if timestamp::is_fresh(created, self.expiretime) {
            return Ok(CreateOutcome::NotRegenerated);
        }

        let _guard = if timestamp::has_value(created) {
            match self.mutex.try_acquire() {
                Some(guard) => guard,
                None => {
                    tracing::trace!("creation in progress elsewhere, serving stale value");
                    return Ok(CreateOutcome::NotRegenerated);
                }
            }
        } else {
            tracing::trace!("no value present, blocking for cold start");
            self.mutex.acquire()
        };

        // Double-check under the lock: another thread may have already
        // regenerated the value while we were waiting to acquire.
        match probe()? {
            Probe::Present(v, t) if timestamp::is_fresh(t, self.expiretime) => {
                Ok(CreateOutcome::Regenerated(v, t))
            }
            _ => {
                tracing::debug!("invoking creator");
                let (v, t) = creator()?;
                Ok(CreateOutcome::Regenerated(v, t))
            }
        }
    }
}
