pub mod signature;

pub use signature::{encode_value, PayFastFields, PayFastSignature, SIGNATURE_FIELD};
