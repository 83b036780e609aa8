pub mod payfast;

pub use payfast::{ItnReconciler, PayFastCheckout};
