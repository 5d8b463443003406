//! Internal synchronization for the synchronized holder.
//!
//! The production state is packed into a single `AtomicU8`:
//! - Bit 0: PRODUCED - the slot holds the cached value
//! - Bit 1: LOCKED - a thread is running the provider
//! - Bit 2: WAITING - at least one thread is parked on this state
//! - Bit 3: POISONED - the provider was consumed but production never completed
//! - Bits 4-7: EPOCH - generation counter so parked threads never miss a wake
//!
//! Reads of a produced value are wait-free; threads that lose the race to
//! produce park on the state word via `parking_lot_core` and are woken by
//! whichever transition ends the production attempt.

use core::sync::atomic::{AtomicU8, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

/// Atomic production state for [`Lazy`](crate::sync::Lazy).
#[repr(transparent)]
pub(crate) struct ProduceState(AtomicU8);

/// Outcome of [`ProduceState::lock`].
pub(crate) enum Acquire<'a> {
   /// The value was produced while we were acquiring; nothing left to do.
   Produced,
   /// A previous production attempt consumed the provider and died.
   Poisoned,
   /// Lock held; the caller must run the provider and settle the guard.
   Locked(LockGuard<'a>),
}

impl ProduceState {
   const PRODUCED: u8 = 1;
   const LOCKED: u8 = 2;
   const WAITING: u8 = 4;
   const POISONED: u8 = 8;
   /// Start of the epoch bits.
   const EPOCH_1: u8 = 16;
   const EPOCH_MASK: u8 = !(Self::PRODUCED | Self::LOCKED | Self::WAITING | Self::POISONED);

   #[inline(always)]
   const fn next_epoch(current_state: u8) -> u8 {
      (current_state & Self::EPOCH_MASK).wrapping_add(Self::EPOCH_1) & Self::EPOCH_MASK
   }

   /// State of a holder that has not produced yet.
   #[inline]
   pub(crate) const fn new() -> Self {
      Self(AtomicU8::new(0))
   }

   /// State of a holder constructed around an existing value.
   #[inline]
   pub(crate) const fn produced() -> Self {
      Self(AtomicU8::new(Self::PRODUCED))
   }

   /// State of a holder whose provider is gone without a produced value.
   #[inline]
   pub(crate) const fn poisoned() -> Self {
      Self(AtomicU8::new(Self::POISONED))
   }

   /// Whether the value is produced. `Acquire`, so a `true` result orders
   /// the caller's slot read after the producing thread's slot write.
   #[inline]
   pub(crate) fn is_produced(&self) -> bool {
      self.0.load(Ordering::Acquire) & Self::PRODUCED != 0
   }

   #[inline]
   pub(crate) fn is_poisoned(&self) -> bool {
      self.0.load(Ordering::Acquire) & Self::POISONED != 0
   }

   /// Wakes every thread parked on this state word.
   #[inline]
   fn notify_all(&self) {
      // SAFETY: the unpark address matches the address used for park below.
      unsafe {
         parking_lot_core::unpark_all(self.0.as_ptr() as usize, DEFAULT_UNPARK_TOKEN);
      }
   }

   /// Parks the calling thread until the state moves off `expected_state`.
   #[inline]
   fn wait(&self, expected_state: u8) {
      // SAFETY: see `notify_all`.
      unsafe {
         // park() re-checks the condition before sleeping, so a transition
         // landing between our load and the park is not missed.
         let _ = parking_lot_core::park(
            self.0.as_ptr() as usize,
            || self.0.load(Ordering::Acquire) == expected_state,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            None,
         );
         // Wake-ups may be spurious; callers loop and re-examine the state.
      }
   }

   /// Transition that ends a production attempt. Bumps the epoch, stores
   /// `flags`, and wakes waiters if any were parked.
   #[inline]
   fn settle(&self, flags: u8) {
      let current_state = self.0.load(Ordering::Relaxed);
      let new_state = flags | Self::next_epoch(current_state);

      // Release: the slot write (or the decision that there is none) must
      // be visible before other threads observe this state.
      let prev_state = self.0.swap(new_state, Ordering::Release);

      if prev_state & Self::WAITING != 0 {
         self.notify_all();
      }
   }

   /// Acquires the production lock, parking if another thread holds it.
   pub(crate) fn lock(&self) -> Acquire<'_> {
      loop {
         match self.lock_step() {
            Ok(acquired) => return acquired,
            Err(observed_state) => self.wait(observed_state),
         }
      }
   }

   /// One acquisition attempt.
   ///
   /// `Err(state)` means the lock is held elsewhere and the WAITING flag is
   /// set; the caller should park against `state` and retry.
   fn lock_step(&self) -> Result<Acquire<'_>, u8> {
      loop {
         let current_state = self.0.load(Ordering::Acquire);
         if current_state & Self::PRODUCED != 0 {
            return Ok(Acquire::Produced);
         }
         if current_state & Self::POISONED != 0 {
            return Ok(Acquire::Poisoned);
         }

         if current_state & Self::LOCKED == 0 {
            let new_state = current_state | Self::LOCKED;
            match self.0.compare_exchange_weak(
               current_state,
               new_state,
               Ordering::Acquire,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Ok(Acquire::Locked(LockGuard::new(self))),
               Err(_) => {
                  std::hint::spin_loop();
                  continue;
               }
            }
         }

         // Locked by another thread; make sure WAITING is set before parking
         // so the winner knows to notify.
         if current_state & Self::WAITING == 0 {
            let new_state = current_state | Self::WAITING;
            match self.0.compare_exchange_weak(
               current_state,
               new_state,
               Ordering::Relaxed,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Err(new_state),
               Err(_) => {
                  std::hint::spin_loop();
                  continue;
               }
            }
         }
         return Err(current_state);
      }
   }
}

/// RAII guard for a held production lock.
///
/// Settled one of three ways:
/// - [`commit`](Self::commit): the slot now holds a value, state PRODUCED.
/// - Plain drop: the attempt failed but the provider survives, state reset
///   to unproduced so a later call retries.
/// - Drop after [`poison_on_drop`](Self::poison_on_drop): the provider was
///   consumed and cannot run again, state POISONED.
pub(crate) struct LockGuard<'a> {
   state: &'a ProduceState,
   poison: bool,
}

impl<'a> LockGuard<'a> {
   /// Assumes LOCKED is already set on `state`.
   #[inline(always)]
   const fn new(state: &'a ProduceState) -> Self {
      Self {
         state,
         poison: false,
      }
   }

   /// Arms the guard to poison instead of reset if dropped before commit.
   ///
   /// Called right after the provider is moved out of the slot: from that
   /// point an unwind must not present the holder as retryable.
   #[inline(always)]
   pub(crate) fn poison_on_drop(&mut self) {
      self.poison = true;
   }

   /// Marks production complete and wakes waiters.
   #[inline(always)]
   pub(crate) fn commit(self) {
      self.state.settle(ProduceState::PRODUCED);
      core::mem::forget(self); // skip Drop, the state is settled
   }
}

impl Drop for LockGuard<'_> {
   #[inline(always)]
   fn drop(&mut self) {
      let flags = if self.poison {
         ProduceState::POISONED
      } else {
         0
      };
      self.state.settle(flags);
   }
}
