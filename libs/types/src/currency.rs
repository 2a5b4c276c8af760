//! Currencies and trading pairs
//!
//! Currency order is significant: it is the canonical order in which one
//! owner's accounts are locked, so it must never depend on call sites.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;

/// Supported currency
///
/// Declaration order defines `Ord` (BTC < ETH), which is the canonical
/// account lock order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    BTC,
    ETH,
}

impl Currency {
    /// All currencies in canonical order
    pub const ALL: [Currency; 2] = [Currency::BTC, Currency::ETH];

    /// Lowercase wire code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::BTC => "btc",
            Currency::ETH => "eth",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "btc" => Ok(Currency::BTC),
            "eth" => Ok(Currency::ETH),
            other => Err(ValidationError::Malformed(format!(
                "not available currency '{other}'"
            ))),
        }
    }
}

/// Trading pair `primary_secondary`
///
/// Prices are primary per one unit of secondary. An order's `amount` is a
/// secondary quantity and its `total` a primary value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pair {
    primary: Currency,
    secondary: Currency,
}

impl Pair {
    /// Create a pair; both legs must differ
    pub fn new(primary: Currency, secondary: Currency) -> Result<Self, ValidationError> {
        if primary == secondary {
            return Err(ValidationError::Malformed(format!(
                "pair legs must differ, got {primary}_{secondary}"
            )));
        }
        Ok(Self { primary, secondary })
    }

    /// The BTC/ETH market
    pub fn btc_eth() -> Self {
        Self {
            primary: Currency::BTC,
            secondary: Currency::ETH,
        }
    }

    pub fn primary(&self) -> Currency {
        self.primary
    }

    pub fn secondary(&self) -> Currency {
        self.secondary
    }

    /// Both legs, in canonical lock order
    pub fn currencies(&self) -> [Currency; 2] {
        let mut legs = [self.primary, self.secondary];
        legs.sort();
        legs
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.primary, self.secondary)
    }
}

impl FromStr for Pair {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (primary, secondary) = s
            .split_once('_')
            .ok_or_else(|| ValidationError::Malformed(format!("malformed pair '{s}'")))?;
        Pair::new(primary.parse()?, secondary.parse()?)
    }
}

impl TryFrom<String> for Pair {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pair> for String {
    fn from(pair: Pair) -> Self {
        pair.to_string()
    }
}
