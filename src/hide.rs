//! Capability masking: presenting a holder as the trait its value
//! implements, so callers cannot tell they are talking to a not-yet-produced
//! value.
//!
//! Both holder variants deref to `T`, which covers direct method calls. The
//! [`hide!`] macro builds on that to implement a whole capability trait for
//! a holder: each listed method materializes the value (first call produces,
//! later calls hit the cache) and delegates to it.

/// Masks a lazy holder behind a capability trait.
///
/// Written inside an `impl Capability for Lazy<..>` block, `hide!` expands
/// each listed method signature into a forwarding body: the holder is
/// dereferenced, which produces the value on the very first such call, and
/// the listed operation is applied to the real value with its original
/// arguments, returning whatever it returns.
///
/// Only traits can head an `impl .. for` block, so masking a concrete type
/// is rejected by the compiler before any question of production state
/// arises. If the holder has already produced, calls go straight to the
/// cached value over the wait-free read path.
///
/// Listed methods must take `&self` (a shared holder cannot hand out
/// `&mut` access), and generic methods cannot be forwarded this way.
///
/// ```
/// use lazy_provide::{hide, sync::Lazy, Provider};
///
/// trait Greeter {
///    fn greet(&self, name: &str) -> String;
/// }
///
/// struct English;
///
/// impl Greeter for English {
///    fn greet(&self, name: &str) -> String {
///       format!("hello, {name}")
///    }
/// }
///
/// impl<P: Provider<Output = English>> Greeter for Lazy<English, P> {
///    hide! {
///       fn greet(&self, name: &str) -> String;
///    }
/// }
///
/// // The holder is the proxy: nothing is produced until the first call.
/// let masked: Box<dyn Greeter> = Box::new(Lazy::new(|| English));
/// assert_eq!(masked.greet("dude"), "hello, dude");
/// ```
#[macro_export]
macro_rules! hide {
   ($(
      $(#[$attr:meta])*
      fn $method:ident(&self $(, $arg:ident: $argty:ty)* $(,)?) $(-> $ret:ty)?;
   )+) => {
      $(
         $(#[$attr])*
         fn $method(&self $(, $arg: $argty)*) $(-> $ret)? {
            ::core::ops::Deref::deref(self).$method($($arg),*)
         }
      )+
   };
}
