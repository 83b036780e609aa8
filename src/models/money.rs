use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Rand amount held as integer cents.
///
/// Parsed from decimal text and rendered with exactly two decimals, never
/// through floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid amount '{0}': expected a decimal with at most two fraction digits")]
pub struct ParseMoneyError(pub String);

impl Money {
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMoneyError(s.to_string());
        let trimmed = s.trim();

        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (whole, fraction) = match unsigned.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (unsigned, ""),
        };

        if whole.is_empty()
            || fraction.len() > 2
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(err());
        }

        let whole: i64 = whole.parse().map_err(|_| err())?;
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| err())? * 10,
            _ => fraction.parse().map_err(|_| err())?,
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(fraction))
            .ok_or_else(err)?;

        Ok(Self(if negative { -cents } else { cents }))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(serde_json::Number),
            Text(String),
        }

        let text = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n.to_string(),
            Raw::Text(s) => s,
        };

        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format() {
        assert_eq!("129.99".parse::<Money>().unwrap().cents(), 12999);
        assert_eq!("100".parse::<Money>().unwrap().to_string(), "100.00");
        assert_eq!("100.5".parse::<Money>().unwrap().to_string(), "100.50");
        assert_eq!("0.07".parse::<Money>().unwrap().to_string(), "0.07");
        assert_eq!("-3.10".parse::<Money>().unwrap().to_string(), "-3.10");
    }

    #[test]
    fn test_rejects_malformed_amounts() {
        for bad in ["", ".50", "1.234", "12,50", "abc", "1e3", "--1"] {
            assert!(bad.parse::<Money>().is_err(), "{} should not parse", bad);
        }
    }

    #[test]
    fn test_deserialize_from_number_or_string() {
        let from_number: Money = serde_json::from_str("100.00").unwrap();
        let from_float: Money = serde_json::from_str("129.99").unwrap();
        let from_text: Money = serde_json::from_str("\"42.10\"").unwrap();

        assert_eq!(from_number.to_string(), "100.00");
        assert_eq!(from_float.cents(), 12999);
        assert_eq!(from_text.cents(), 4210);
        assert_eq!(serde_json::to_string(&from_text).unwrap(), "\"42.10\"");
    }
}
