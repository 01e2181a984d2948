use std::path::PathBuf;

use thiserror::Error;

use crate::types::{TemplateId, TraderId};

/// Configuration the pipeline expected but did not find.
/// Always recoverable: the caller either falls back to a default or skips
/// the affected trader for this cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationGap {
    #[error("no insurance multiplier configured for trader {trader}")]
    MissingMultiplier { trader: TraderId },

    #[error("no insurance settings configured for trader {trader}")]
    MissingTraderConfig { trader: TraderId },

    #[error("no insurance dialogue templates configured for trader {trader}")]
    MissingDialogue { trader: TraderId },

    #[error("no blacklisted equipment slots configured")]
    MissingExclusionSlots,

    #[error("no base price known for template {template}")]
    MissingBasePrice { template: TemplateId },
}

/// A configuration lookup result: either the configured value, or a default
/// that was substituted because of a gap.
#[derive(Debug, Clone, PartialEq)]
pub enum Configured<T> {
    Found(T),
    Defaulted { value: T, gap: ConfigurationGap },
}

impl<T> Configured<T> {
    pub fn value(self) -> T {
        match self {
            Configured::Found(value) | Configured::Defaulted { value, .. } => value,
        }
    }

    pub fn gap(&self) -> Option<&ConfigurationGap> {
        match self {
            Configured::Found(_) => None,
            Configured::Defaulted { gap, .. } => Some(gap),
        }
    }

    /// Split into the value and the gap, if any.
    pub fn into_parts(self) -> (T, Option<ConfigurationGap>) {
        match self {
            Configured::Found(value) => (value, None),
            Configured::Defaulted { value, gap } => (value, Some(gap)),
        }
    }
}

#[derive(Debug, Error)]
pub enum InsuranceError {
    #[error(transparent)]
    ConfigurationGap(#[from] ConfigurationGap),

    /// Registry contents contradict what the dispatcher expected.
    /// Logged and worked around, never fatal.
    #[error("insurance registry state corrupted: {0}")]
    StateCorruption(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl InsuranceError {
    pub fn state_corruption(msg: impl Into<String>) -> Self {
        Self::StateCorruption(msg.into())
    }
}
