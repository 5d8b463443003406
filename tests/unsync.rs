use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};

use lazy_provide::unsync::Lazy;
use lazy_provide::{NoValue, Required};

#[test]
fn test_new_has_no_value() {
   let lazy: Lazy<i32> = Lazy::new(|| 42);
   assert!(!lazy.has_value());
   assert_eq!(lazy.get(), None);
}

#[test]
fn test_with_value_is_produced() {
   let lazy: Lazy<i32> = Lazy::with_value(42);
   assert!(lazy.has_value());
   assert_eq!(lazy.get(), Some(&42));
}

#[test]
fn test_peek_never_produces() {
   let calls = Cell::new(0);
   let lazy: Lazy<i32, _> = Lazy::new(|| {
      calls.set(calls.get() + 1);
      7
   });

   assert_eq!(lazy.get(), None);
   assert!(!lazy.has_value());
   assert_eq!(calls.get(), 0);
}

#[test]
fn test_force_runs_provider_once() {
   let calls = Cell::new(0);
   let lazy = Lazy::new(|| {
      calls.set(calls.get() + 1);
      String::from("produced")
   });

   assert_eq!(lazy.force(), "produced");
   assert!(lazy.has_value());
   assert_eq!(lazy.force(), "produced");
   assert_eq!(calls.get(), 1); // second call hit the cache
}

#[test]
fn test_try_force_error_not_cached() {
   let calls = Cell::new(0);
   let lazy = Lazy::new(|| {
      calls.set(calls.get() + 1);
      if calls.get() == 1 {
         Err("not yet")
      } else {
         Ok(55)
      }
   });

   assert_eq!(lazy.try_force(), Err("not yet"));
   assert!(!lazy.has_value()); // failure leaves the holder unproduced
   assert_eq!(lazy.try_force(), Ok(&55));
   assert!(lazy.has_value());
   assert_eq!(lazy.try_force(), Ok(&55));
   assert_eq!(calls.get(), 2);
}

#[test]
fn test_required_retries_until_value() {
   let calls = Cell::new(0);
   let lazy = Lazy::new(Required::new(|| {
      calls.set(calls.get() + 1);
      if calls.get() < 3 {
         None
      } else {
         Some("ready")
      }
   }));

   assert_eq!(lazy.try_force(), Err(NoValue));
   assert!(!lazy.has_value());
   assert_eq!(lazy.try_force(), Err(NoValue));
   assert_eq!(lazy.try_force(), Ok(&"ready"));
   assert!(lazy.has_value());

   // Produced: the source is no longer consulted.
   assert_eq!(lazy.try_force(), Ok(&"ready"));
   assert_eq!(calls.get(), 3);
}

#[test]
fn test_inspect_receives_the_holder_itself() {
   let lazy = Lazy::new(|| 3).inspect(|holder| {
      assert!(!holder.has_value());
      assert_eq!(*holder.force(), 3);
   });

   // The production the visitor triggered is visible through the returned
   // holder: it is the same instance.
   assert!(lazy.has_value());
   assert_eq!(lazy.get(), Some(&3));
}

#[test]
fn test_into_inner() {
   let produced: Lazy<String, fn() -> String> = Lazy::new(|| String::from("a"));
   produced.force();
   assert_eq!(produced.into_inner(), Ok(String::from("a")));

   let pending: Lazy<String, _> = Lazy::new(|| String::from("b"));
   match pending.into_inner() {
      Ok(_) => panic!("holder was never produced"),
      Err(provider) => assert_eq!(provider(), "b"),
   }
}

#[test]
fn test_deref_forces() {
   let lazy = Lazy::new(|| vec![1, 2, 3]);
   assert_eq!(lazy.len(), 3);
   assert!(lazy.has_value());
}

#[test]
fn test_clone_does_not_produce() {
   let calls = Cell::new(0);
   let lazy = Lazy::new(|| {
      calls.set(calls.get() + 1);
      10
   });

   let clone = lazy.clone();
   assert_eq!(calls.get(), 0);
   assert_eq!(*lazy.force(), 10);
   assert_eq!(*clone.force(), 10);
   // Each holder ran its own copy of the provider.
   assert_eq!(calls.get(), 2);

   let produced_clone = lazy.clone();
   assert!(produced_clone.has_value());
   assert_eq!(calls.get(), 2);
}

#[test]
fn test_from_value() {
   let lazy = Lazy::from(5);
   assert!(lazy.has_value());
   assert_eq!(lazy.get(), Some(&5));
}

#[test]
fn test_eq_compares_produced_values() {
   let a = Lazy::new(|| 1);
   let b = Lazy::with_value(1);
   assert_ne!(a, b); // unproduced vs produced
   a.force();
   assert_eq!(a, b);
}

#[test]
fn test_debug_and_display() {
   let lazy = Lazy::new(|| 9);
   assert_eq!(format!("{lazy:?}"), "Lazy(<unproduced>)");
   assert_eq!(lazy.to_string(), "<unproduced>");
   lazy.force();
   assert_eq!(format!("{lazy:?}"), "Lazy(9)");
   assert_eq!(lazy.to_string(), "9");
}

#[test]
fn test_panicking_provider_poisons() {
   let lazy: Lazy<i32> = Lazy::new(|| panic!("boom"));

   let first = catch_unwind(AssertUnwindSafe(|| lazy.force()));
   assert!(first.is_err());
   assert!(!lazy.has_value());

   // The provider was consumed by the panicked call; the holder cannot
   // produce anymore and says so.
   let second = catch_unwind(AssertUnwindSafe(|| lazy.force()));
   assert!(second.is_err());
}

#[test]
fn test_panicking_try_provider_stays_retryable() {
   let calls = Cell::new(0);
   let lazy = Lazy::new(|| {
      calls.set(calls.get() + 1);
      if calls.get() == 1 {
         panic!("first attempt dies");
      }
      Ok::<_, NoValue>(13)
   });

   let first = catch_unwind(AssertUnwindSafe(|| lazy.try_force()));
   assert!(first.is_err());
   assert!(!lazy.has_value());

   // The provider was only borrowed: it survives the unwind.
   assert_eq!(lazy.try_force(), Ok(&13));
   assert_eq!(calls.get(), 2);
}

#[test]
#[should_panic(expected = "reentrant production")]
fn test_reentrant_production_panics() {
   thread_local! {
      static HOLDER: Lazy<i32> = Lazy::new(|| HOLDER.with(|holder| *holder.force()));
   }
   HOLDER.with(|holder| *holder.force());
}
