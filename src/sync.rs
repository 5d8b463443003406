//! Thread-safe lazy holder.
//!
//! [`Lazy<T, P>`] owns a provider and defers running it until the first call
//! to [`force`](Lazy::force) (or [`try_force`](Lazy::try_force)). The result
//! is cached in place and every later call returns a reference to the same
//! value; the provider runs at most once no matter how many threads race on
//! the first access.
//!
//! The first thread to acquire the production lock runs the provider; other
//! threads asking for the value park until the attempt settles. Reads of an
//! already-produced value are wait-free. A failed fallible attempt releases
//! the lock and leaves the holder unproduced, so the next call retries.
//!
//! The holder is `const`-constructible and usable in statics:
//!
//! ```
//! use lazy_provide::sync::Lazy;
//!
//! static MOTD: Lazy<String> = Lazy::new(|| "hello".to_owned());
//!
//! assert!(!MOTD.has_value());
//! assert_eq!(MOTD.force(), "hello");
//! assert!(MOTD.has_value());
//! ```

use core::cell::UnsafeCell;
use core::mem::ManuallyDrop;
use core::{fmt, mem};

use crate::provider::{Provider, TryProvider};
use crate::state::{Acquire, ProduceState};

const POISONED: &str = "lazy holder poisoned: its provider panicked";

/// Slot holding whichever of the provider or the produced value is live,
/// as discriminated by the state machine. `empty` is the poisoned case.
union Slot<P, T> {
   pending: ManuallyDrop<P>,
   value: ManuallyDrop<T>,
   empty: (),
}

/// A thread-safe holder that produces its value on first access.
///
/// Callers needing the value go through [`force`](Self::force) (infallible
/// providers) or [`try_force`](Self::try_force) (fallible ones);
/// [`has_value`](Self::has_value) and [`get`](Self::get) peek without ever
/// triggering production. The holder also derefs to `T`, which makes it
/// usable behind a capability trait; see [`hide!`].
pub struct Lazy<T, P = fn() -> T> {
   slot: UnsafeCell<Slot<P, T>>,
   state: ProduceState,
}

impl<T, P> Lazy<T, P> {
   /// Creates a holder around `provider` without running it.
   #[inline]
   #[must_use]
   pub const fn new(provider: P) -> Self {
      Self {
         slot: UnsafeCell::new(Slot {
            pending: ManuallyDrop::new(provider),
         }),
         state: ProduceState::new(),
      }
   }

   /// Creates a holder that is already produced with `value`.
   #[inline]
   #[must_use]
   pub const fn with_value(value: T) -> Self {
      Self {
         slot: UnsafeCell::new(Slot {
            value: ManuallyDrop::new(value),
         }),
         state: ProduceState::produced(),
      }
   }

   const fn vacant(state: ProduceState) -> Self {
      Self {
         slot: UnsafeCell::new(Slot { empty: () }),
         state,
      }
   }

   /// Whether the provider has completed and the value is cached.
   ///
   /// Never blocks, never triggers production; during a concurrent
   /// production attempt this returns `false` until the attempt commits.
   #[inline]
   pub fn has_value(&self) -> bool {
      self.state.is_produced()
   }

   /// Returns the cached value if produced. Never blocks, never produces.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      if self.state.is_produced() {
         // SAFETY: the produced flag is committed with Release after the
         // value write; the Acquire load ordered us behind it.
         Some(unsafe { self.value_unchecked() })
      } else {
         None
      }
   }

   /// Mutable access to the cached value if produced.
   #[inline]
   pub fn get_mut(&mut self) -> Option<&mut T> {
      if self.state.is_produced() {
         // SAFETY: produced, and `&mut self` rules out concurrent access.
         Some(unsafe { &mut self.slot.get_mut().value })
      } else {
         None
      }
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
      let mut this = mem::ManuallyDrop::new(self);
      assert!(!this.state.is_poisoned(), "{POISONED}");
      let produced = this.state.is_produced();
      let slot = this.slot.get_mut();
      // SAFETY: `self` is never dropped (ManuallyDrop) and exactly the live
      // union field, per the state flag, is taken exactly once.
      unsafe {
         if produced {
            Ok(ManuallyDrop::take(&mut slot.value))
         } else {
            Err(ManuallyDrop::take(&mut slot.pending))
         }
      }
   }

   /// # Safety
   ///
   /// The value field must be live (state PRODUCED observed with Acquire,
   /// or exclusive access after a commit).
   #[inline]
   unsafe fn value_unchecked(&self) -> &T {
      debug_assert!(self.state.is_produced());
      // SAFETY: per the contract above.
      unsafe { &(*self.slot.get()).value }
   }
}

impl<T, P> Lazy<T, P>
where
   P: Provider<Output = T>,
{
   /// Returns the value, running the provider on the first call.
   ///
   /// Concurrent callers block until the one holding the production lock
   /// finishes; all of them then see the same cached value.
   ///
   /// # Panics
   ///
   /// Panics if the provider panicked on an earlier call (the holder is
   /// then poisoned), and propagates the provider's own panic. A provider
   /// that re-enters its own holder deadlocks.
   #[inline]
   pub fn force(&self) -> &T {
      if let Some(value) = self.get() {
         return value;
      }
      self.produce();
      // SAFETY: produce() only returns once the value is committed.
      unsafe { self.value_unchecked() }
   }

   #[cold]
   fn produce(&self) {
      let mut guard = match self.state.lock() {
         Acquire::Produced => return,
         Acquire::Poisoned => panic!("{POISONED}"),
         Acquire::Locked(guard) => guard,
      };
      // SAFETY: the lock grants exclusive slot access, and an unproduced
      // holder keeps its provider in the pending field.
      let provider = unsafe { ManuallyDrop::take(&mut (*self.slot.get()).pending) };
      // The provider has left the slot: if it unwinds, the holder must not
      // look retryable.
      guard.poison_on_drop();
      let value = provider.provide();
      // SAFETY: still exclusive; the pending field was vacated above.
      unsafe { (*self.slot.get()).value = ManuallyDrop::new(value) };
      guard.commit();
   }
}

impl<T, P> Lazy<T, P>
where
   P: TryProvider<Output = T>,
{
   /// Returns the value, attempting production on the first call.
   ///
   /// An `Err` from the provider is not cached: the holder stays
   /// unproduced, the lock is released, and the next call invokes the
   /// provider again. Concurrent callers block while an attempt is in
   /// flight, then either see the committed value or race to retry.
   ///
   /// # Panics
   ///
   /// Panics if the holder is poisoned.
   pub fn try_force(&self) -> Result<&T, P::Error> {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      self.try_produce()?;
      debug_assert!(self.has_value());
      // SAFETY: try_produce succeeded, so the value is committed.
      Ok(unsafe { self.value_unchecked() })
   }

   #[cold]
   fn try_produce(&self) -> Result<(), P::Error> {
      let guard = match self.state.lock() {
         Acquire::Produced => return Ok(()),
         Acquire::Poisoned => panic!("{POISONED}"),
         Acquire::Locked(guard) => guard,
      };
      // SAFETY: the lock grants exclusive slot access; unproduced means the
      // pending field is live.
      let slot = unsafe { &mut *self.slot.get() };
      // The provider is borrowed, not taken: on `Err` the guard drops,
      // resetting the state so a later call can retry with it.
      let value = unsafe { slot.pending.try_provide() }?;
      // SAFETY: success; retire the provider before the slot is reused.
      unsafe { ManuallyDrop::drop(&mut slot.pending) };
      slot.value = ManuallyDrop::new(value);
      guard.commit();
      Ok(())
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

// SAFETY:
// Production is internally synchronized, so `&Lazy` may be shared across
// threads when `&T` may (`T: Sync`). `T: Send` is required because the value
// produced on one thread may be dropped or taken on another; `P: Send` for
// the same reason applied to the provider. The provider is only ever touched
// by the single thread holding the production lock, so `P: Sync` is not
// needed.
unsafe impl<T: Send + Sync, P: Send> Sync for Lazy<T, P> {}
// SAFETY:
// Ownership of both the provider and the value moves with the holder.
unsafe impl<T: Send, P: Send> Send for Lazy<T, P> {}

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

impl<T, P> From<crate::unsync::Lazy<T, P>> for Lazy<T, P> {
   /// Promotes a single-threaded holder, preserving its production state.
   ///
   /// Produced stays produced (the cached value carries over verbatim),
   /// unproduced keeps its provider un-run, and a poisoned holder stays
   /// poisoned.
   fn from(holder: crate::unsync::Lazy<T, P>) -> Self {
      match holder.into_parts() {
         (Some(value), _) => Self::with_value(value),
         (None, Some(provider)) => Self::new(provider),
         (None, None) => Self::vacant(ProduceState::poisoned()),
      }
   }
}

impl<T: fmt::Debug, P> fmt::Debug for Lazy<T, P> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("Lazy");
      match self.get() {
         Some(value) => d.field(value),
         None if self.state.is_poisoned() => d.field(&format_args!("<poisoned>")),
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
   ///
   /// A produced holder clones as produced; an unproduced one clones its
   /// provider, leaving both holders to produce independently.
   fn clone(&self) -> Self {
      if let Some(value) = self.get() {
         return Self::with_value(value.clone());
      }
      match self.state.lock() {
         Acquire::Produced => Self::with_value(
            self
               .get()
               .expect("produced state without a readable value")
               .clone(),
         ),
         Acquire::Poisoned => Self::vacant(ProduceState::poisoned()),
         Acquire::Locked(_guard) => {
            // The guard's drop resets the state: we only read the provider.
            // SAFETY: the lock grants exclusive access and the holder is
            // unproduced, so pending is live.
            Self::new(unsafe { (*(*self.slot.get()).pending).clone() })
         }
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

impl<T, P> Drop for Lazy<T, P> {
   fn drop(&mut self) {
      let produced = self.state.is_produced();
      let poisoned = self.state.is_poisoned();
      let slot = self.slot.get_mut();
      // SAFETY: exclusive access; the state flag names the live field.
      // A poisoned slot holds neither a provider nor a value.
      unsafe {
         if produced {
            ManuallyDrop::drop(&mut slot.value);
         } else if !poisoned {
            ManuallyDrop::drop(&mut slot.pending);
         }
      }
   }
}
