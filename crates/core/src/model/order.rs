use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RumshopError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Paid,
    Failed,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Paid => "PAID",
            OrderStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = RumshopError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PAID" => Ok(Self::Paid),
            "FAILED" => Ok(Self::Failed),
            _ => Err(RumshopError::Parse(format!("unknown order status: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewOrder {
    pub product: String,
    pub status: OrderStatus,
    pub amount: f64,
    pub created_at: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: i64,
    pub product: String,
    pub status: OrderStatus,
    pub amount: f64,
    pub created_at: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrips_through_text() {
        assert_eq!(OrderStatus::from_str("paid").unwrap(), OrderStatus::Paid);
        assert_eq!(OrderStatus::Failed.to_string(), "FAILED");
        assert!(OrderStatus::from_str("refunded").is_err());
    }
}
