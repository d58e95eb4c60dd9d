use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Supported blockchain networks. Adding a chain means wiring a tracked
/// token contract and a quote-provider mapping here, not at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Chain {
    Eth,
    Pol,
}

impl Chain {
    /// Canonical string stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Eth => "ETH",
            Chain::Pol => "POL",
        }
    }

    /// Human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Chain::Eth => "Ethereum",
            Chain::Pol => "Polygon",
        }
    }

    /// ERC-20 contract address of the tracked token for this chain.
    /// Both contracts live on Ethereum mainnet (WETH and the POL token).
    pub fn token_address(&self) -> &'static str {
        match self {
            Chain::Eth => "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2",
            Chain::Pol => "0x455e53CBB86018Ac2B8092FdCd39d8444aFFC3F6",
        }
    }

    /// Chain id the quote provider expects for the token contract lookup.
    pub fn quote_chain_id(&self) -> &'static str {
        match self {
            Chain::Eth => "0x1",
            Chain::Pol => "0x1",
        }
    }

    pub fn all() -> &'static [Chain] {
        &[Chain::Eth, Chain::Pol]
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ETH" | "ETHEREUM" => Ok(Chain::Eth),
            "POL" | "POLYGON" | "MATIC" => Ok(Chain::Pol),
            _ => Err(AppError::InvalidInput(format!(
                "Unsupported chain: {}. Supported: ETH, POL",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_round_trip() {
        for &chain in Chain::all() {
            assert_eq!(chain.as_str().parse::<Chain>().unwrap(), chain);
        }
    }

    #[test]
    fn test_chain_aliases() {
        assert_eq!("ethereum".parse::<Chain>().unwrap(), Chain::Eth);
        assert_eq!("matic".parse::<Chain>().unwrap(), Chain::Pol);
        assert!("DOGE".parse::<Chain>().is_err());
    }
}
