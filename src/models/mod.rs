pub mod itn;
pub mod money;
pub mod order;

pub use itn::*;
pub use money::*;
pub use order::*;
