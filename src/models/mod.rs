use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigError;

/// Largest scale `rust_decimal` can represent
pub const MAX_PRICE_PRECISION: u32 = 28;

/// Tradable instrument reference data
///
/// Prices travel through the system as raw integers; `price_precision` is the
/// number of decimal places the raw value is scaled by (3730 at precision 2 is 37.30).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instrument {
    symbol: String,
    price_precision: u32,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, price_precision: u32) -> Result<Self, ConfigError> {
        let symbol = symbol.into();
        if symbol.is_empty() {
            return Err(ConfigError::Invalid("instrument symbol is empty".to_string()));
        }
        if price_precision > MAX_PRICE_PRECISION {
            return Err(ConfigError::Invalid(format!(
                "price precision {} for {} exceeds {}",
                price_precision, symbol, MAX_PRICE_PRECISION
            )));
        }
        Ok(Self {
            symbol,
            price_precision,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn price_precision(&self) -> u32 {
        self.price_precision
    }

    /// Convert a raw integer price into its decimal value
    pub fn descale_price(&self, raw: i64) -> Decimal {
        Decimal::new(raw, self.price_precision)
    }
}

/// Latest moving-average point supplied by the indicator service
///
/// The value is expressed in raw price units, like `PriceUpdate::price`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IndicatorReading {
    /// Not warmed up yet
    #[default]
    Empty,
    Value { value: f64 },
}

impl IndicatorReading {
    pub fn value(value: f64) -> Self {
        Self::Value { value }
    }

    /// Truncated raw value used for comparisons; `None` while empty.
    /// Non-finite values are treated as empty.
    pub fn raw_value(&self) -> Option<i64> {
        match self {
            Self::Empty => None,
            Self::Value { value } if !value.is_finite() => None,
            Self::Value { value } => Some(value.trunc() as i64),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.raw_value().is_none()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Split a signed broker quantity into direction and magnitude.
    /// Returns `None` for a flat (zero) quantity.
    pub fn from_signed(quantity: i64) -> Option<(Self, u64)> {
        match quantity {
            0 => None,
            q if q > 0 => Some((Self::Long, q.unsigned_abs())),
            q => Some((Self::Short, q.unsigned_abs())),
        }
    }

    /// Side of the order that opens a position in this direction
    pub fn open_side(self) -> Side {
        match self {
            Self::Long => Side::Buy,
            Self::Short => Side::Sell,
        }
    }

    /// Side of the order that closes a position in this direction
    pub fn close_side(self) -> Side {
        match self {
            Self::Long => Side::Sell,
            Self::Short => Side::Buy,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

/// Output of the crossover rule before sizing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Signal {
    Enter(Direction),
    Exit,
    Hold,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PriceMode {
    Market,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderIntent {
    Open,
    Close,
}

/// Order parameters owned by the execution engine, passed through untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderParams(BTreeMap<String, String>);

impl OrderParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Order handed to the execution collaborator. Not retained after submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderRequest {
    pub position_id: Uuid,
    pub symbol: String,
    pub intent: OrderIntent,
    pub side: Side,
    pub quantity: u64,
    pub price: PriceMode,
    pub params: OrderParams,
}

/// Last-trade update for an instrument
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceUpdate {
    pub symbol: String,
    pub price: i64,
    pub time: DateTime<Utc>,
}

/// New moving-average point for an instrument
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndicatorUpdate {
    pub symbol: String,
    pub reading: IndicatorReading,
    pub time: DateTime<Utc>,
}

/// Position reported by the broker
///
/// `is_initial` is set for the startup snapshot and cleared for live changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrokerPositionEvent {
    pub symbol: String,
    pub quantity: i64,
    pub is_initial: bool,
}

/// Fill or rejection reported back by the execution collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionUpdate {
    pub symbol: String,
    pub position_id: Uuid,
    pub kind: PositionUpdateKind,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PositionUpdateKind {
    OpenFilled { price: i64 },
    OpenRejected { reason: String },
    CloseFilled { price: i64 },
    CloseRejected { reason: String },
}
