use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{Symbol, ValidationError};

/// A watchlist entry: the name used as the report key and the ticker sent to
/// the provider (the name plus an optional exchange suffix such as `.NS`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Company {
    name: String,
    symbol: Symbol,
}

impl Company {
    pub fn new(name: &str, exchange_suffix: Option<&str>) -> Result<Self, ValidationError> {
        let name = name.trim();
        let ticker = match exchange_suffix {
            Some(suffix) if !suffix.trim().is_empty() => format!("{name}{}", suffix.trim()),
            _ => name.to_owned(),
        };
        let symbol = Symbol::parse(&ticker)?;

        Ok(Self {
            name: name.to_owned(),
            symbol,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }
}

impl Display for Company {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
