use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub String);

            impl $name {
                pub fn new(id: impl Into<String>) -> Self {
                    $name(id.into())
                }

                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.pad(&self.0)
                }
            }
        )*
    };
}

string_id! {
    PlayerId,
    ItemId,
    TemplateId,
    /// A trader the player can insure gear with.
    TraderId,
    SessionId,
}

/// Wall-clock time in unix seconds.
/// Delivery times are logical: something outside this crate polls the
/// pending-returns list and compares against its own clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const SECONDS_PER_HOUR: u64 = 3_600;

    pub fn offset(self, seconds: u64) -> Self {
        Timestamp(self.0.saturating_add(seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = TraderId::new("prapor");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""prapor""#);
        let back: TraderId = serde_json::from_str(r#""prapor""#).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn timestamp_offset_saturates() {
        assert_eq!(Timestamp(10).offset(5), Timestamp(15));
        assert_eq!(Timestamp(u64::MAX).offset(1), Timestamp(u64::MAX));
    }
}
