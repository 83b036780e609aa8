use std::collections::BTreeMap;

use md5::{Digest, Md5};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Flat key/value payload exchanged with PayFast. `BTreeMap` keeps keys in
/// byte order, which is the order the gateway signs them in.
pub type PayFastFields = BTreeMap<String, String>;

/// Name of the field carrying the signature on inbound notifications.
pub const SIGNATURE_FIELD: &str = "signature";

const PASSPHRASE_FIELD: &str = "passphrase";

/// Characters `encodeURIComponent` leaves untouched.
const FORM_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Encode a value the way PayFast does before hashing: trim, percent-encode,
/// then spaces as `+`.
pub fn encode_value(value: &str) -> String {
    utf8_percent_encode(value.trim(), FORM_VALUE)
        .to_string()
        .replace("%20", "+")
}

/// MD5 signature generation and verification for PayFast payloads
pub struct PayFastSignature;

impl PayFastSignature {
    /// Build the canonical `key=value&...` string that gets hashed.
    ///
    /// Blank values are dropped, keys are in byte order and the passphrase,
    /// when present, is appended last.
    pub fn canonical_string(fields: &PayFastFields, passphrase: Option<&str>) -> String {
        Self::canonicalize(fields.iter(), passphrase)
    }

    /// Sign a payload, returning the 32 character lowercase hex digest
    pub fn sign(fields: &PayFastFields, passphrase: Option<&str>) -> String {
        Self::digest(&Self::canonical_string(fields, passphrase))
    }

    /// Verify a claimed signature against the payload. Any `signature` entry
    /// in `fields` is left out of the recomputation.
    pub fn verify(fields: &PayFastFields, claimed: &str, passphrase: Option<&str>) -> bool {
        let canonical = Self::canonicalize(
            fields.iter().filter(|(key, _)| key.as_str() != SIGNATURE_FIELD),
            passphrase,
        );

        Self::digest(&canonical).eq_ignore_ascii_case(claimed.trim())
    }

    fn canonicalize<'a>(
        fields: impl Iterator<Item = (&'a String, &'a String)>,
        passphrase: Option<&str>,
    ) -> String {
        let mut pairs: Vec<String> = fields
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(key, value)| format!("{}={}", key, encode_value(value)))
            .collect();

        if let Some(passphrase) = passphrase.filter(|p| !p.trim().is_empty()) {
            pairs.push(format!("{}={}", PASSPHRASE_FIELD, encode_value(passphrase)));
        }

        pairs.join("&")
    }

    fn digest(canonical: &str) -> String {
        hex::encode(Md5::digest(canonical.as_bytes()))
    }
}
