//! Inclusive price bands used by catalog filtering.
//!
//! Bands travel over the wire as `min-max` pairs joined by commas, e.g.
//! `0-10,50-1000`. A product matches a set of bands when its price falls in
//! any one of them.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors produced while parsing a [`PriceBand`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceBandError {
    /// The band is not of the form `min-max`.
    #[error("price band '{0}' must look like min-max")]
    Shape(String),
    /// One of the bounds is not a decimal number.
    #[error("price band '{0}' has a non-numeric bound")]
    NotANumber(String),
    /// A bound is negative or `min > max`.
    #[error("price band '{0}' must have 0 <= min <= max")]
    Range(String),
}

/// An inclusive `[min, max]` price range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBand {
    pub min: Decimal,
    pub max: Decimal,
}

impl PriceBand {
    /// Create a band, rejecting negative or inverted bounds.
    ///
    /// # Errors
    ///
    /// Returns [`PriceBandError::Range`] if `min < 0` or `min > max`.
    pub fn new(min: Decimal, max: Decimal) -> Result<Self, PriceBandError> {
        if min.is_sign_negative() || min > max {
            return Err(PriceBandError::Range(format!("{min}-{max}")));
        }
        Ok(Self { min, max })
    }

    /// Whether `price` lies inside the band (both ends inclusive).
    #[must_use]
    pub fn contains(&self, price: Decimal) -> bool {
        price >= self.min && price <= self.max
    }

    /// Parse a comma-separated list of bands. Empty segments are ignored.
    ///
    /// # Errors
    ///
    /// Returns the first band that fails to parse.
    pub fn parse_list(s: &str) -> Result<Vec<Self>, PriceBandError> {
        s.split(',')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for PriceBand {
    type Err = PriceBandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (min, max) = s
            .split_once('-')
            .ok_or_else(|| PriceBandError::Shape(s.to_owned()))?;
        let parse = |bound: &str| {
            bound
                .trim()
                .parse::<Decimal>()
                .map_err(|_| PriceBandError::NotANumber(s.to_owned()))
        };
        Self::new(parse(min)?, parse(max)?).map_err(|_| PriceBandError::Range(s.to_owned()))
    }
}

impl fmt::Display for PriceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}
