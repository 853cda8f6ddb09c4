//! Wall-clock timestamps and expiry arithmetic shared by [`crate::lock`],
//! [`crate::dogpile`], and [`crate::sync_reader`].
//!
//! This module provides the `CreationTimestamp` / `ExpireTime` abstractions
//! that the rest of the crate builds the freshness predicate on top of,
//! matching the pattern `hardy_async::time` uses for its own
//! runtime-agnostic duration handling.

use std::time::{SystemTime, UNIX_EPOCH};

/// Sentinel meaning "no value has ever been created; treat as unconditionally
/// expired."
pub const NEVER: f64 = 0.0;

/// A real-valued wall-clock seconds epoch.
///
/// Any value `<= 0.0` is the [`NEVER`] sentinel. `CreationTimestamp` is
/// `Copy` and stored directly (as an `AtomicU64` bit-pattern where it needs
/// to be shared, see [`crate::dogpile::Dogpile`]).
pub type CreationTimestamp = f64;

/// Either a positive number of seconds, or "never expires".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExpireTime {
    /// Values older than this many seconds are considered expired.
    After(f64),
    /// Nothing ever expires; the first created value is fresh forever.
    Never,
}

/// Current wall-clock time, as seconds since the Unix epoch.
///
/// Falls back to `0.0` if the system clock is set before the epoch, which
/// only ever manifests as "treat everything as expired" (a safe direction
/// to fail in).
pub fn now() -> CreationTimestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// `has_value(t) ≡ t > 0`.
#[inline]
pub fn has_value(t: CreationTimestamp) -> bool {
    t > NEVER
}

/// `fresh(t) ≡ has_value(t) ∧ (expiretime = ∞ ∨ now − t ≤ expiretime)`.
#[inline]
pub fn is_fresh(t: CreationTimestamp, expiretime: ExpireTime) -> bool {
    if !has_value(t) {
        return false;
    }
    match expiretime {
        ExpireTime::Never => true,
        ExpireTime::After(secs) => now() - t <= secs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_is_not_fresh() {
        assert!(!has_value(NEVER));
        assert!(!is_fresh(NEVER, ExpireTime::Never));
        assert!(!is_fresh(NEVER, ExpireTime::After(10.0)));
    }

    #[test]
    fn never_expiry_is_always_fresh_once_present() {
        let t = now();
        assert!(is_fresh(t, ExpireTime::Never));
    }

    #[test]
    fn after_expiry_respects_window() {
        let t = now();
        assert!(is_fresh(t, ExpireTime::After(60.0)));
        let old = t - 120.0;
        assert!(!is_fresh(old, ExpireTime::After(60.0)));
    }

    #[test]
    fn negative_timestamp_is_never() {
        assert!(!has_value(-5.0));
    }
}
