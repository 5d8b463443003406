use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lazy_provide::{hide, sync, unsync, Provider};

/// The capability the produced value satisfies; holders get masked as this.
trait Adder {
   fn add(&self, a: i32, b: i32) -> i32;
   fn label(&self) -> &'static str;
   fn identity(&self) -> *const Machine;
}

struct Machine {
   bias: i32,
}

impl Adder for Machine {
   fn add(&self, a: i32, b: i32) -> i32 {
      a + b + self.bias
   }

   fn label(&self) -> &'static str {
      "machine"
   }

   fn identity(&self) -> *const Machine {
      self
   }
}

impl<P: Provider<Output = Machine>> Adder for sync::Lazy<Machine, P> {
   hide! {
      fn add(&self, a: i32, b: i32) -> i32;
      fn label(&self) -> &'static str;
      fn identity(&self) -> *const Machine;
   }
}

impl<P: Provider<Output = Machine>> Adder for unsync::Lazy<Machine, P> {
   hide! {
      fn add(&self, a: i32, b: i32) -> i32;
      fn label(&self) -> &'static str;
      fn identity(&self) -> *const Machine;
   }
}

#[test]
fn test_masked_call_produces_once_and_forwards() {
   let calls = AtomicUsize::new(0);
   let lazy = unsync::Lazy::new(|| {
      calls.fetch_add(1, Ordering::SeqCst);
      Machine { bias: 100 }
   });

   // Masking is free: nothing is produced until a capability call lands.
   let masked: &dyn Adder = &lazy;
   assert_eq!(calls.load(Ordering::SeqCst), 0);

   // First call produces and forwards arguments to the real value.
   assert_eq!(masked.add(1, 2), 103);
   assert_eq!(calls.load(Ordering::SeqCst), 1);

   // Later calls hit the cache.
   assert_eq!(masked.label(), "machine");
   assert_eq!(masked.add(4, 4), 108);
   assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_masking_a_produced_holder_hits_the_exact_value() {
   let calls = AtomicUsize::new(0);
   let lazy = sync::Lazy::new(|| {
      calls.fetch_add(1, Ordering::SeqCst);
      Machine { bias: 0 }
   });

   let cached = lazy.force() as *const Machine;
   assert_eq!(calls.load(Ordering::SeqCst), 1);

   // Calls through the capability reach the identical cached value: no
   // copy, no further production.
   let masked: &dyn Adder = &lazy;
   assert_eq!(masked.identity(), cached);
   assert_eq!(masked.add(2, 3), 5);
   assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_boxed_proxy_object() {
   let masked: Box<dyn Adder> = Box::new(unsync::Lazy::new(|| Machine { bias: -1 }));
   assert_eq!(masked.add(1, 1), 1);
   assert_eq!(masked.label(), "machine");
}

#[test]
fn test_shared_mask_produces_once_across_threads() {
   let calls = Arc::new(AtomicUsize::new(0));
   let lazy = Arc::new(sync::Lazy::new({
      let calls = Arc::clone(&calls);
      move || {
         calls.fetch_add(1, Ordering::SeqCst);
         Machine { bias: 1 }
      }
   }));

   let threads: Vec<_> = (0..8)
      .map(|i| {
         let lazy = Arc::clone(&lazy);
         std::thread::spawn(move || {
            let masked: &dyn Adder = &*lazy;
            masked.add(i, 0)
         })
      })
      .collect();

   for (i, handle) in threads.into_iter().enumerate() {
      assert_eq!(handle.join().unwrap(), i as i32 + 1);
   }
   assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_deref_coercion_masks_as_the_value_type() {
   fn run(machine: &Machine) -> i32 {
      machine.add(5, 5)
   }

   let lazy = unsync::Lazy::new(|| Machine { bias: 7 });
   assert!(!lazy.has_value());
   assert_eq!(run(&lazy), 17);
   assert!(lazy.has_value());
}
