//! The crate's own error type.
//!
//! Most failure modes in this crate are *not* represented here: a creator or
//! probe failure is the caller-supplied error type `E` propagating unchanged
//! through `Result<V, E>` (see the module docs on [`crate::lock`]), and a
//! [`DoubleRegenerationBug`](crate::lock) is a programmer error in the
//! supplied callbacks, reported via panic rather than a `Result`, since there
//! is no sound way to continue past it. This enum exists for conditions the
//! core itself may raise that are not a pass-through of a caller error.

use thiserror::Error;

/// Errors raised directly by this crate, as opposed to propagated from a
/// caller-supplied creator or probe.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A pluggable mutex implementation failed to acquire the creation lock
    /// (for example, a distributed lock that can time out or lose its lease).
    /// The bundled [`crate::mutex::StdMutex`] never produces this variant.
    #[error("failed to acquire creation mutex: {0}")]
    MutexFailure(String),
}
