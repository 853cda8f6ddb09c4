//! Single-flight cache-stampede prevention: coordinate concurrent callers
//! so that at most one of them regenerates an expired or missing value
//! while everyone else gets served a stale copy (or waits, for the cold
//! start with nothing stale to serve).
//!
//! # Layers
//!
//! - [`mutex`]: the [`RawMutex`](mutex::RawMutex) trait abstracting the
//!   creation-mutex, plus the bundled [`StdMutex`](mutex::StdMutex).
//! - [`rwmutex`]: [`ReadWriteMutex`](rwmutex::ReadWriteMutex), a
//!   writer-preferring reader/writer lock for
//!   [`SyncReaderDogpile`](sync_reader::SyncReaderDogpile).
//! - [`registry`]: [`NameRegistry`](registry::NameRegistry), a weakly-held
//!   identifier→object map for sharing one coordinator per cache key.
//! - [`lock`]: [`Lock`](lock::Lock), the probe/creator state machine at the
//!   core of everything else in this crate.
//! - [`dogpile`]: [`Dogpile`](dogpile::Dogpile), the stateful facade most
//!   callers reach for directly.
//! - [`sync_reader`]: [`SyncReaderDogpile`](sync_reader::SyncReaderDogpile),
//!   a `Dogpile` paired with a read/write lock for in-place resource swaps.
//!
//! # Example
//!
//! ```
//! use dogpile::dogpile::Dogpile;
//! use dogpile::timestamp::ExpireTime;
//!
//! let cache: Dogpile = Dogpile::new(ExpireTime::After(30.0));
//!
//! let value: Result<i32, std::convert::Infallible> = cache.acquire_value(
//!     || Ok(0), // the caller's own idea of "current value", always present
//!     || Ok(expensive_regeneration()),
//! );
//! assert_eq!(value.unwrap(), 42);
//!
//! fn expensive_regeneration() -> i32 {
//!     42
//! }
//! ```

pub mod dogpile;
pub mod error;
pub mod lock;
pub mod mutex;
pub mod registry;
pub mod rwmutex;
pub mod sync_reader;
pub mod timestamp;

pub use dogpile::Dogpile;
pub use error::Error;
pub use lock::{Lock, Probe};
pub use registry::NameRegistry;
pub use rwmutex::ReadWriteMutex;
pub use sync_reader::SyncReaderDogpile;
pub use timestamp::ExpireTime;
