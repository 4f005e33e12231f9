//! Symbol and currency classification

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trading currency of a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Domestic (Tokyo-listed) equities, settled in yen
    Jpy,
    /// Foreign (US-listed) equities, settled in dollars
    Usd,
}

impl Currency {
    /// Classify a raw code: digit-prefixed codes are domestic
    pub fn classify(code: &str) -> Self {
        match code.chars().next() {
            Some(c) if c.is_ascii_digit() => Currency::Jpy,
            _ => Currency::Usd,
        }
    }

    /// ISO code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Jpy => "JPY",
            Currency::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A stock code tagged with its currency at ingestion
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol {
    code: String,
    currency: Currency,
}

impl Symbol {
    /// Parse a stock code, classifying its currency. Blank codes are rejected.
    pub fn parse(code: &str) -> Option<Self> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }
        Some(Self {
            code: code.to_string(),
            currency: Currency::classify(code),
        })
    }

    /// Build a symbol whose currency is already known (e.g. held in a currency book)
    pub fn with_currency(code: impl Into<String>, currency: Currency) -> Self {
        Self {
            code: code.into(),
            currency,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_domestic(&self) -> bool {
        self.currency == Currency::Jpy
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

/// What a cached price is denominated in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceKind {
    /// Share close in the symbol's currency
    Equity(Currency),
    /// JPY per USD exchange rate
    Fx,
}

impl PriceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceKind::Equity(currency) => currency.code(),
            PriceKind::Fx => "FX",
        }
    }
}
