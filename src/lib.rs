//! Lazy value holders driven by providers.
//!
//! A holder pairs a value slot with a [`Provider`]: a capability that
//! computes the value on demand. The provider runs at most once per holder,
//! on first access; the result is cached and every later access returns it.
//! Two variants cover the two sharing regimes:
//!
//! - [`unsync::Lazy`]: single-threaded, no synchronization. The type is not
//!   `Sync`, so cross-thread sharing is a compile error rather than a race.
//! - [`sync::Lazy`]: thread-safe. Concurrent first accesses are arbitrated
//!   by an atomic state machine with futex-style parking; exactly one
//!   caller runs the provider and everyone sees the same cached value.
//!   Reads of a produced value are wait-free.
//!
//! Fallible production goes through [`TryProvider`]: an `Err` is never
//! cached, the holder stays unproduced, and the next call retries. Sources
//! that yield `Option<T>` but are required to deliver can be wrapped in
//! [`Required`], which maps `None` to the [`NoValue`] error.
//!
//! # Examples
//!
//! Shared, produced once across threads:
//!
//! ```rust
//! use std::thread;
//!
//! use lazy_provide::sync::Lazy;
//!
//! static TABLE: Lazy<Vec<u64>> = Lazy::new(|| (0..64).map(|i| 1 << (i % 8)).collect());
//!
//! thread::scope(|scope| {
//!    for _ in 0..4 {
//!       scope.spawn(|| assert_eq!(TABLE.force().len(), 64));
//!    }
//! });
//! assert!(TABLE.has_value());
//! ```
//!
//! Teardown that never produces an unused resource:
//!
//! ```rust
//! use lazy_provide::unsync::Lazy;
//!
//! struct Conn;
//! impl Conn {
//!    fn close(self) {}
//! }
//!
//! let conn: Lazy<Conn, _> = Lazy::new(|| Conn).inspect(|holder| {
//!    assert!(!holder.has_value()); // nothing opened yet
//! });
//!
//! // ... the connection may or may not get used ...
//!
//! if conn.has_value() {
//!    if let Ok(conn) = conn.into_inner() {
//!       conn.close();
//!    }
//! }
//! ```
//!
//! Holders can also be *hidden* behind a capability trait their value
//! implements, so consumers never learn the value is produced lazily; see
//! the [`hide!`] macro.

/// Capability masking macro.
mod hide;

/// Provider contract and adapters.
mod provider;

/// Internal synchronization state management.
mod state;

/// Thread-safe holder.
pub mod sync;

/// Single-threaded holder.
pub mod unsync;

pub use provider::{NoValue, Provider, Required, TryProvider};
