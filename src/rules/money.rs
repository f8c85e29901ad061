use std::fmt;

use serde::{Deserialize, Serialize};

pub const SATS_PER_BTC: i64 = 100_000_000;

/// Bitcoin balance held as whole satoshis so snapshots round-trip exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Btc {
    sats: i64,
}

impl Btc {
    pub fn zero() -> Self {
        Self { sats: 0 }
    }

    pub fn from_sats(sats: i64) -> Self {
        Self { sats }
    }

    pub fn from_btc(btc: f64) -> Self {
        Self {
            sats: (btc * SATS_PER_BTC as f64).round() as i64,
        }
    }

    pub fn sats(self) -> i64 {
        self.sats
    }

    pub fn as_btc(self) -> f64 {
        self.sats as f64 / SATS_PER_BTC as f64
    }

    pub fn add(self, other: Btc) -> Self {
        Self {
            sats: self.sats.saturating_add(other.sats),
        }
    }

    pub fn sub(self, other: Btc) -> Self {
        Self {
            sats: self.sats.saturating_sub(other.sats),
        }
    }

    pub fn scale(self, factor: f64) -> Self {
        Self {
            sats: (self.sats as f64 * factor).round() as i64,
        }
    }
}

impl fmt::Display for Btc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.sats < 0 { "-" } else { "" };
        let abs = self.sats.unsigned_abs();
        let whole = abs / SATS_PER_BTC as u64;
        let frac = abs % SATS_PER_BTC as u64;
        write!(f, "{}{}.{:08} BTC", sign, whole, frac)
    }
}

/// Catalog files write BTC amounts as decimals (`0.0025`); this converts them to satoshis.
pub mod btc_decimal {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Btc;

    pub fn serialize<S: Serializer>(value: &Btc, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_btc())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Btc, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        if !raw.is_finite() {
            return Err(serde::de::Error::custom("btc amount must be finite"));
        }
        Ok(Btc::from_btc(raw))
    }
}

/// A catalog price, denominated in exactly one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Price {
    Btc(#[serde(with = "btc_decimal")] Btc),
    Usd(i64),
}

impl Price {
    pub fn scale(self, factor: f64) -> Self {
        match self {
            Price::Btc(btc) => Price::Btc(btc.scale(factor)),
            Price::Usd(usd) => Price::Usd((usd as f64 * factor).round() as i64),
        }
    }

    pub fn is_negative(self) -> bool {
        match self {
            Price::Btc(btc) => btc.sats() < 0,
            Price::Usd(usd) => usd < 0,
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Btc(btc) => write!(f, "{}", btc),
            Price::Usd(usd) => write!(f, "{}", format_usd(*usd)),
        }
    }
}

pub fn format_usd(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    format!("{}${}", sign, format_thousands(value.unsigned_abs()))
}

fn format_thousands(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut parts = Vec::new();
    while value > 0 {
        parts.push(format!("{:03}", value % 1000));
        value /= 1000;
    }
    if let Some(last) = parts.last_mut() {
        *last = last.trim_start_matches('0').to_string();
        if last.is_empty() {
            *last = "0".to_string();
        }
    }
    parts.reverse();
    parts.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn btc_decimal_rounds_to_nearest_satoshi() {
        assert_eq!(Btc::from_btc(0.0025).sats(), 250_000);
        assert_eq!(Btc::from_btc(0.00000002).sats(), 2);
        assert_eq!(Btc::from_sats(250_000).to_string(), "0.00250000 BTC");
    }

    #[test]
    fn usd_formatting_groups_thousands() {
        assert_eq!(format_usd(0), "$0");
        assert_eq!(format_usd(1_234_567), "$1,234,567");
        assert_eq!(format_usd(-1_005), "-$1,005");
    }

    #[test]
    fn price_parses_either_currency() {
        let btc: Price = serde_json::from_str(r#"{"btc": 0.01}"#).unwrap();
        assert_eq!(btc, Price::Btc(Btc::from_sats(1_000_000)));
        let usd: Price = serde_json::from_str(r#"{"usd": 450}"#).unwrap();
        assert_eq!(usd.scale(1.5), Price::Usd(675));
    }
}
