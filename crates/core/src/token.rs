//! Token identity types.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Display information for a tracked token.
///
/// The address is the canonical key everywhere in the engine; symbol and
/// name are only used when rendering alert messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// On-chain token address (opaque string, chain-agnostic)
    pub address: CompactString,
    /// Ticker symbol, e.g. "BONK"
    pub symbol: CompactString,
    /// Human-readable name
    pub name: String,
}

impl TokenInfo {
    pub fn new(
        address: impl Into<CompactString>,
        symbol: impl Into<CompactString>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            symbol: symbol.into(),
            name: name.into(),
        }
    }
}
