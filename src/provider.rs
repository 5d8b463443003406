//! The provider contract: capabilities that compute a value on demand.
//!
//! A holder owns exactly one provider and promises to run it at most once.
//! Two shapes of that promise exist:
//!
//! - [`Provider`] is consumed by value when invoked. The signature itself
//!   guarantees "at most once": after a successful production the provider
//!   no longer exists.
//! - [`TryProvider`] is invoked through `&mut self` and may fail. A failed
//!   attempt leaves the provider in place, so the holder can retry on the
//!   next call instead of caching the failure.
//!
//! Plain closures work out of the box: any `FnOnce() -> T` is a `Provider`
//! and any `FnMut() -> Result<T, E>` is a `TryProvider`. Sources that yield
//! `Option<T>` but are expected to eventually deliver can be wrapped in
//! [`Required`], which maps `None` to the [`NoValue`] error.

/// A capability that computes and returns a value.
///
/// Invoked at most once per holder; the provider is consumed by the call,
/// so it may move captured state into the produced value.
pub trait Provider {
   /// The type of the produced value.
   type Output;

   /// Computes the value. Runs on the caller's thread.
   fn provide(self) -> Self::Output;
}

impl<T, F> Provider for F
where
   F: FnOnce() -> T,
{
   type Output = T;

   #[inline]
   fn provide(self) -> T {
      self()
   }
}

/// A capability that computes a value but may fail to.
///
/// Invoked through `&mut self`: failure does not consume the provider, and
/// the holder will invoke it again on the next production attempt.
pub trait TryProvider {
   /// The type of the produced value.
   type Output;

   /// The error reported when no value could be produced.
   type Error;

   /// Attempts to compute the value. Runs on the caller's thread.
   fn try_provide(&mut self) -> Result<Self::Output, Self::Error>;
}

impl<T, E, F> TryProvider for F
where
   F: FnMut() -> Result<T, E>,
{
   type Output = T;
   type Error = E;

   #[inline]
   fn try_provide(&mut self) -> Result<T, E> {
      self()
   }
}

/// Error returned by [`Required`] when its source yields nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("provider returned no value")]
pub struct NoValue;

/// Adapter declaring an `Option`-yielding source as required to deliver.
///
/// `None` is treated as a production failure ([`NoValue`]) rather than a
/// produced value: the holder stays unproduced and retries the source on
/// the next call. To cache an intentionally absent value instead, hold an
/// `Option<T>` directly; a cached `None` counts as produced there.
///
/// ```
/// use lazy_provide::{unsync::Lazy, NoValue, Required};
///
/// let mut attempts = 0;
/// let lazy = Lazy::new(Required::new(|| {
///    attempts += 1;
///    if attempts < 2 { None } else { Some(attempts) }
/// }));
///
/// assert_eq!(lazy.try_force(), Err(NoValue));
/// assert!(!lazy.has_value());
/// assert_eq!(lazy.try_force(), Ok(&2));
/// assert!(lazy.has_value());
/// ```
pub struct Required<F>(F);

impl<F> Required<F> {
   /// Wraps an `FnMut() -> Option<T>` source.
   #[inline]
   #[must_use]
   pub const fn new(source: F) -> Self {
      Self(source)
   }
}

impl<T, F> TryProvider for Required<F>
where
   F: FnMut() -> Option<T>,
{
   type Output = T;
   type Error = NoValue;

   #[inline]
   fn try_provide(&mut self) -> Result<T, NoValue> {
      (self.0)().ok_or(NoValue)
   }
}
