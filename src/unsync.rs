//! Single-threaded lazy holder.
//!
//! [`Lazy<T, P>`] owns a provider and runs it on the first call to
//! [`force`](Lazy::force) (or [`try_force`](Lazy::try_force)), caching the
//! result for every later call. There is no synchronization: the type is not
//! `Sync`, so the compiler rejects sharing it across threads instead of
//! leaving a first-access race to the documentation. Holders that need to be
//! shared are promoted with [`sync::Lazy::from`](crate::sync::Lazy).
//!
//! ```
//! use lazy_provide::unsync::Lazy;
//!
//! let mut runs = 0;
//! let lazy = Lazy::new(|| {
//!    runs += 1;
//!    21 * 2
//! });
//!
//! assert!(!lazy.has_value());
//! assert_eq!(*lazy.force(), 42);
//! assert_eq!(*lazy.force(), 42);
//! assert!(lazy.has_value());
//! drop(lazy);
//! assert_eq!(runs, 1);
//! ```

use core::cell::{RefCell, UnsafeCell};
use core::fmt;

use crate::provider::{Provider, TryProvider};

const POISONED: &str = "lazy holder poisoned: its provider panicked";
const REENTRANT: &str = "reentrant production of a lazy holder";

/// A single-threaded holder that produces its value on first access.
///
/// The provider slot doubles as the health marker: while unproduced it holds
/// the provider; it is emptied exactly once, either committing a value or,
/// if the provider panicked away, leaving the holder poisoned. The borrow
/// held on it during production turns reentrant access into a panic.
pub struct Lazy<T, P = fn() -> T> {
   value: UnsafeCell<Option<T>>,
   provider: RefCell<Option<P>>,
}

impl<T, P> Lazy<T, P> {
   /// Creates a holder around `provider` without running it.
   #[inline]
   #[must_use]
   pub const fn new(provider: P) -> Self {
      Self {
         value: UnsafeCell::new(None),
         provider: RefCell::new(Some(provider)),
      }
   }

   /// Creates a holder that is already produced with `value`.
   #[inline]
   #[must_use]
   pub const fn with_value(value: T) -> Self {
      Self {
         value: UnsafeCell::new(Some(value)),
         provider: RefCell::new(None),
      }
   }

   /// Whether the provider has completed and the value is cached.
   ///
   /// No side effects; never triggers production.
   #[inline]
   pub fn has_value(&self) -> bool {
      self.get().is_some()
   }

   /// Returns the cached value if produced, without producing.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      // SAFETY: the slot is written exactly once, while empty and with the
      // provider borrow excluding reentrant writers; it is never written
      // again, so shared references into it stay valid for `&self`.
      unsafe { (*self.value.get()).as_ref() }
   }

   /// Mutable access to the cached value if produced.
   #[inline]
   pub fn get_mut(&mut self) -> Option<&mut T> {
      self.value.get_mut().as_mut()
   }

   /// Calls `visitor` with the holder, then hands the holder back.
   ///
   /// Lets construction-time configuration observe the holder itself (not
   /// the value), typically to register teardown logic that will check
   /// [`has_value`](Self::has_value) before touching the value, so an
   /// unused resource is never produced just to be released.
   #[inline]
   pub fn inspect<V>(self, visitor: V) -> Self
   where
      V: FnOnce(&Self),
   {
      visitor(&self);
      self
   }

   /// Dismantles the holder into its value, or its provider if the value
   /// was never produced.
   ///
   /// # Panics
   ///
   /// Panics if the holder is poisoned.
   pub fn into_inner(self) -> Result<T, P> {
      match self.into_parts() {
         (Some(value), _) => Ok(value),
         (None, Some(provider)) => Err(provider),
         (None, None) => panic!("{POISONED}"),
      }
   }

   /// (value slot, provider slot); at most one of the two is occupied,
   /// except for a poisoned holder where both are empty.
   pub(crate) fn into_parts(self) -> (Option<T>, Option<P>) {
      (self.value.into_inner(), self.provider.into_inner())
   }

   fn is_poisoned(&self) -> bool {
      !self.has_value()
         && self
            .provider
            .try_borrow()
            .map_or(false, |slot| slot.is_none())
   }
}

impl<T, P> Lazy<T, P>
where
   P: Provider<Output = T>,
{
   /// Returns the value, running the provider on the first call.
   ///
   /// # Panics
   ///
   /// Panics if production re-enters this holder, or if the provider
   /// panicked on an earlier call (the holder is then poisoned); the
   /// provider's own panic propagates.
   #[inline]
   pub fn force(&self) -> &T {
      if let Some(value) = self.get() {
         return value;
      }
      self.produce()
   }

   #[cold]
   fn produce(&self) -> &T {
      let Ok(mut slot) = self.provider.try_borrow_mut() else {
         panic!("{REENTRANT}");
      };
      let provider = slot.take().expect(POISONED);
      let value = provider.provide();
      // SAFETY: the slot is still empty (the held provider borrow panics
      // any reentrant producer) and no reference into it exists yet; this
      // is its single write.
      unsafe { (*self.value.get()).insert(value) }
   }
}

impl<T, P> Lazy<T, P>
where
   P: TryProvider<Output = T>,
{
   /// Returns the value, attempting production on the first call.
   ///
   /// An `Err` from the provider is not cached: the provider stays in
   /// place and the next call invokes it again.
   ///
   /// # Panics
   ///
   /// Panics if production re-enters this holder, or if the holder is
   /// poisoned.
   #[inline]
   pub fn try_force(&self) -> Result<&T, P::Error> {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      self.try_produce()
   }

   #[cold]
   fn try_produce(&self) -> Result<&T, P::Error> {
      let Ok(mut slot) = self.provider.try_borrow_mut() else {
         panic!("{REENTRANT}");
      };
      // Borrowed, not taken: on `Err` (or a panic) the provider survives
      // for the next attempt.
      let value = slot.as_mut().expect(POISONED).try_provide()?;
      *slot = None;
      // SAFETY: same single-write argument as `produce`.
      Ok(unsafe { (*self.value.get()).insert(value) })
   }
}

// --- Trait Implementations ---

impl<T, P> core::ops::Deref for Lazy<T, P>
where
   P: Provider<Output = T>,
{
   type Target = T;

   /// Equivalent to [`force`](Lazy::force).
   #[inline]
   fn deref(&self) -> &T {
      self.force()
   }
}

impl<T, P: Default> Default for Lazy<T, P> {
   /// Creates an unproduced holder with a default provider.
   #[inline]
   fn default() -> Self {
      Self::new(P::default())
   }
}

impl<T> From<T> for Lazy<T> {
   /// Creates an already-produced holder from the given value.
   #[inline]
   fn from(value: T) -> Self {
      Self::with_value(value)
   }
}

impl<T: fmt::Debug, P> fmt::Debug for Lazy<T, P> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("Lazy");
      match self.get() {
         Some(value) => d.field(value),
         None if self.is_poisoned() => d.field(&format_args!("<poisoned>")),
         None => d.field(&format_args!("<unproduced>")),
      };
      d.finish()
   }
}

impl<T: fmt::Display, P> fmt::Display for Lazy<T, P> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self.get() {
         Some(value) => fmt::Display::fmt(value, f),
         None => f.write_str("<unproduced>"),
      }
   }
}

impl<T: Clone, P: Clone> Clone for Lazy<T, P> {
   /// Clones the holder without producing.
   fn clone(&self) -> Self {
      if let Some(value) = self.get() {
         return Self::with_value(value.clone());
      }
      match &*self.provider.borrow() {
         Some(provider) => Self::new(provider.clone()),
         None => Self {
            value: UnsafeCell::new(None),
            provider: RefCell::new(None),
         },
      }
   }
}

impl<T: PartialEq, P> PartialEq for Lazy<T, P> {
   /// Two holders are equal if both are unproduced, or both produced with
   /// equal values.
   #[inline]
   fn eq(&self, other: &Self) -> bool {
      self.get() == other.get()
   }
}

impl<T: Eq, P> Eq for Lazy<T, P> {}
