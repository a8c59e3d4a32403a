//! Position and ordering keys
//!
//! Keys are tagged structures; the legacy string forms (`right_1`,
//! `right_2_totright_3`, `average_totleft_2`, `xvx_left_1`, `right_2_0`,
//! `right_2_total`) are only produced by `Display` and read back by
//! `FromStr`, and they are what serialized reports use as map keys.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized key: {0}")]
pub struct KeyParseError(pub String);

/// Side of the head a dependent sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    fn parse(s: &str) -> Option<Side> {
        match s {
            "left" => Some(Side::Left),
            "right" => Some(Side::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of a size observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PositionKey {
    /// `{side}_{offset}`
    Position { side: Side, offset: usize },
    /// `{side}_{offset}_tot{side}_{total}`
    InContext { side: Side, offset: usize, total: usize },
    /// `average_tot{side}_{total}`: one observation per head
    Average { side: Side, total: usize },
    /// `xvx_{side}_1`: heads with exactly one dependent on each side
    Xvx { side: Side },
}

impl PositionKey {
    /// Keys a dependent at `offset` (1 = adjacent) out of `total` populates
    pub fn for_dependent(side: Side, offset: usize, total: usize) -> [PositionKey; 2] {
        [
            PositionKey::Position { side, offset },
            PositionKey::InContext {
                side,
                offset,
                total,
            },
        ]
    }

    pub fn side(&self) -> Side {
        match *self {
            PositionKey::Position { side, .. }
            | PositionKey::InContext { side, .. }
            | PositionKey::Average { side, .. }
            | PositionKey::Xvx { side } => side,
        }
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            PositionKey::Position { side, offset } => write!(f, "{side}_{offset}"),
            PositionKey::InContext {
                side,
                offset,
                total,
            } => write!(f, "{side}_{offset}_tot{side}_{total}"),
            PositionKey::Average { side, total } => write!(f, "average_tot{side}_{total}"),
            PositionKey::Xvx { side } => write!(f, "xvx_{side}_1"),
        }
    }
}

impl FromStr for PositionKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || KeyParseError(s.to_string());
        let parts: Vec<&str> = s.split('_').collect();
        let key = match parts.as_slice() {
            ["xvx", side, "1"] => PositionKey::Xvx {
                side: Side::parse(side).ok_or_else(err)?,
            },
            ["average", tot, total] => {
                let side = tot.strip_prefix("tot").and_then(Side::parse).ok_or_else(err)?;
                PositionKey::Average {
                    side,
                    total: total.parse().map_err(|_| err())?,
                }
            }
            [side, offset] => PositionKey::Position {
                side: Side::parse(side).ok_or_else(err)?,
                offset: offset.parse().map_err(|_| err())?,
            },
            [side, offset, tot, total] => {
                let side = Side::parse(side).ok_or_else(err)?;
                if tot.strip_prefix("tot").and_then(Side::parse) != Some(side) {
                    return Err(err());
                }
                PositionKey::InContext {
                    side,
                    offset: offset.parse().map_err(|_| err())?,
                    total: total.parse().map_err(|_| err())?,
                }
            }
            _ => return Err(err()),
        };
        Ok(key)
    }
}

/// Side component of an ordering key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OrderSide {
    Left,
    Right,
    /// Single left dependent compared with single right dependent
    Xvx,
}

impl OrderSide {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderSide::Left => "left",
            OrderSide::Right => "right",
            OrderSide::Xvx => "xvx",
        }
    }

    fn parse(s: &str) -> Option<OrderSide> {
        match s {
            "left" => Some(OrderSide::Left),
            "right" => Some(OrderSide::Right),
            "xvx" => Some(OrderSide::Xvx),
            _ => None,
        }
    }
}

impl From<Side> for OrderSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Left => OrderSide::Left,
            Side::Right => OrderSide::Right,
        }
    }
}

/// Heads with exactly `total` dependents on `side`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey {
    pub side: OrderSide,
    pub total: usize,
}

/// Comparison of the adjacent pair `pair` (0 = nearest the head) in a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    pub side: OrderSide,
    pub total: usize,
    pub pair: usize,
}

/// Row of the single-left versus single-right comparison
pub const XVX_ROW: RowKey = RowKey {
    side: OrderSide::Xvx,
    total: 2,
};

impl RowKey {
    pub fn new(side: impl Into<OrderSide>, total: usize) -> Self {
        Self {
            side: side.into(),
            total,
        }
    }

    pub fn pair(self, pair: usize) -> PairKey {
        PairKey {
            side: self.side,
            total: self.total,
            pair,
        }
    }
}

impl PairKey {
    pub fn row(self) -> RowKey {
        RowKey {
            side: self.side,
            total: self.total,
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_total", self.side.as_str(), self.total)
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.side.as_str(), self.total, self.pair)
    }
}

impl FromStr for RowKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || KeyParseError(s.to_string());
        match s.split('_').collect::<Vec<_>>().as_slice() {
            [side, total, "total"] => Ok(RowKey {
                side: OrderSide::parse(side).ok_or_else(err)?,
                total: total.parse().map_err(|_| err())?,
            }),
            _ => Err(err()),
        }
    }
}

impl FromStr for PairKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || KeyParseError(s.to_string());
        match s.split('_').collect::<Vec<_>>().as_slice() {
            [side, total, pair] => Ok(PairKey {
                side: OrderSide::parse(side).ok_or_else(err)?,
                total: total.parse().map_err(|_| err())?,
                pair: pair.parse().map_err(|_| err())?,
            }),
            _ => Err(err()),
        }
    }
}

macro_rules! string_keyed {
    ($($ty:ty),*) => {$(
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    )*};
}

string_keyed!(PositionKey, RowKey, PairKey);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_strings() {
        assert_eq!(
            PositionKey::Position { side: Side::Right, offset: 1 }.to_string(),
            "right_1"
        );
        assert_eq!(
            PositionKey::InContext { side: Side::Left, offset: 2, total: 3 }.to_string(),
            "left_2_totleft_3"
        );
        assert_eq!(
            PositionKey::Average { side: Side::Right, total: 2 }.to_string(),
            "average_totright_2"
        );
        assert_eq!(PositionKey::Xvx { side: Side::Left }.to_string(), "xvx_left_1");
        assert_eq!(RowKey::new(Side::Right, 3).pair(1).to_string(), "right_3_1");
        assert_eq!(XVX_ROW.to_string(), "xvx_2_total");
    }

    #[test]
    fn test_parse_keys() {
        for s in ["right_1", "left_3_totleft_4", "average_totleft_1", "xvx_right_1"] {
            assert_eq!(s.parse::<PositionKey>().unwrap().to_string(), s);
        }
        assert!("left_1_totright_2".parse::<PositionKey>().is_err());
        assert!("middle_1".parse::<PositionKey>().is_err());
        assert!("right_x".parse::<PositionKey>().is_err());

        assert_eq!("xvx_2_0".parse::<PairKey>().unwrap(), XVX_ROW.pair(0));
        assert_eq!("left_2_total".parse::<RowKey>().unwrap(), RowKey::new(Side::Left, 2));
        assert!("left_2_0".parse::<RowKey>().is_err());
    }

    #[test]
    fn test_dependent_keys() {
        let [bare, ctx] = PositionKey::for_dependent(Side::Left, 2, 3);
        assert_eq!(bare.to_string(), "left_2");
        assert_eq!(ctx.to_string(), "left_2_totleft_3");
        assert_eq!(ctx.side(), Side::Left);
    }

    #[test]
    fn test_serde_as_map_keys() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(PositionKey::Xvx { side: Side::Right }, 2.5);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"xvx_right_1":2.5}"#);

        let back: std::collections::BTreeMap<PositionKey, f64> =
            serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
