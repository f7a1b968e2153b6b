use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange a symbol is listed on.
///
/// The vendor's directory layout and CLI both identify markets by a small
/// integer: 0 for Shenzhen, 1 for Shanghai.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    /// Shenzhen Stock Exchange (market code 0)
    Shenzhen,
    /// Shanghai Stock Exchange (market code 1)
    Shanghai,
}

impl Market {
    /// Numeric market code used in files, tables and on the CLI
    pub fn code(&self) -> u8 {
        match self {
            Market::Shenzhen => 0,
            Market::Shanghai => 1,
        }
    }

    /// Parse the numeric market code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Market::Shenzhen),
            1 => Some(Market::Shanghai),
            _ => None,
        }
    }

    /// Subdirectory name under `vipdoc/` for this market
    pub fn folder(&self) -> &'static str {
        match self {
            Market::Shenzhen => "sz",
            Market::Shanghai => "sh",
        }
    }

    /// Display-name prefix for catalog entries
    pub fn display_prefix(&self) -> &'static str {
        match self {
            Market::Shenzhen => "SZA",
            Market::Shanghai => "SHA",
        }
    }

    /// Code prefixes of the primary A-share boards on this market.
    ///
    /// Anything else found on disk (funds, B-shares, warrants) is not part
    /// of the catalog.
    pub fn board_prefixes(&self) -> &'static [&'static str] {
        match self {
            Market::Shenzhen => &["000", "001", "002", "300"],
            Market::Shanghai => &["60", "688"],
        }
    }

    /// Whether a 6-digit code belongs to a primary listing board.
    pub fn is_primary_board(&self, code: &str) -> bool {
        code.len() == 6
            && code.bytes().all(|b| b.is_ascii_digit())
            && self.board_prefixes().iter().any(|p| code.starts_with(p))
    }

    /// Both markets, in code order
    pub fn all() -> [Market; 2] {
        [Market::Shenzhen, Market::Shanghai]
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.folder())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_codes_round_trip() {
        assert_eq!(Market::from_code(0), Some(Market::Shenzhen));
        assert_eq!(Market::from_code(1), Some(Market::Shanghai));
        assert_eq!(Market::from_code(2), None);
        assert_eq!(Market::Shenzhen.code(), 0);
        assert_eq!(Market::Shanghai.code(), 1);
    }

    #[test]
    fn test_primary_board_filter() {
        let sz = Market::Shenzhen;
        assert!(sz.is_primary_board("000001"));
        assert!(sz.is_primary_board("002415"));
        assert!(sz.is_primary_board("300750"));
        assert!(!sz.is_primary_board("900001")); // B-share
        assert!(!sz.is_primary_board("159915")); // fund
        assert!(!sz.is_primary_board("00001")); // too short
        assert!(!sz.is_primary_board("00000a"));

        let sh = Market::Shanghai;
        assert!(sh.is_primary_board("600519"));
        assert!(sh.is_primary_board("688981"));
        assert!(!sh.is_primary_board("510300")); // ETF
        assert!(!sh.is_primary_board("900901")); // B-share
    }
}
