use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Time-in-force mode of an exit order, as understood by the broker.
///
/// The mode also decides the price policy of the order: `Rod` orders are
/// placed as limit orders at the instrument's limit-down price, while `Ioc`
/// and `Fok` orders go out at market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Rest of day.
    #[default]
    Rod,
    /// Immediate or cancel.
    Ioc,
    /// Fill or kill.
    Fok,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Rod => "ROD",
            OrderType::Ioc => "IOC",
            OrderType::Fok => "FOK",
        }
    }

    /// The price policy implied by this order type.
    pub fn price_type(&self) -> PriceType {
        match self {
            OrderType::Rod => PriceType::Limit,
            OrderType::Ioc | OrderType::Fok => PriceType::Market,
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ROD" => Ok(OrderType::Rod),
            "IOC" => Ok(OrderType::Ioc),
            "FOK" => Ok(OrderType::Fok),
            other => Err(CoreError::UnknownOrderType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceType {
    /// Limit order at an explicit price.
    #[serde(rename = "LMT")]
    Limit,
    /// Market order, the price field is ignored by the broker.
    #[serde(rename = "MKT")]
    Market,
}

impl PriceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceType::Limit => "LMT",
            PriceType::Market => "MKT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_type_parses_case_insensitively() {
        assert_eq!("rod".parse::<OrderType>().unwrap(), OrderType::Rod);
        assert_eq!(" IOC ".parse::<OrderType>().unwrap(), OrderType::Ioc);
        assert_eq!("Fok".parse::<OrderType>().unwrap(), OrderType::Fok);
        assert!(matches!(
            "GTC".parse::<OrderType>(),
            Err(CoreError::UnknownOrderType(s)) if s == "GTC"
        ));
    }

    #[test]
    fn only_rod_uses_a_limit_price() {
        assert_eq!(OrderType::Rod.price_type(), PriceType::Limit);
        assert_eq!(OrderType::Ioc.price_type(), PriceType::Market);
        assert_eq!(OrderType::Fok.price_type(), PriceType::Market);
    }

    #[test]
    fn order_type_uses_broker_codes_on_the_wire() {
        let json = serde_json::to_string(&OrderType::Fok).unwrap();
        assert_eq!(json, "\"FOK\"");
        let parsed: OrderType = serde_json::from_str("\"ROD\"").unwrap();
        assert_eq!(parsed, OrderType::Rod);
        assert_eq!(serde_json::to_string(&PriceType::Market).unwrap(), "\"MKT\"");
    }
}
