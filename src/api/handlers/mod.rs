pub mod health;
pub mod orders;
pub mod payfast;

pub use health::*;
pub use orders::*;
pub use payfast::*;
