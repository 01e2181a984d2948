use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationGap, Configured, InsuranceError};
use crate::types::{Timestamp, TraderId};

/// Multiplier applied when a trader has no `insurance_multiplier` entry.
pub const DEFAULT_INSURANCE_MULTIPLIER: f64 = 0.3;

/// Slots never eligible for return when no blacklist is configured.
pub const DEFAULT_BLACKLISTED_SLOTS: [&str; 3] = ["SpecialSlot1", "SpecialSlot2", "SpecialSlot3"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoyaltyLevel {
    /// Percentage discount on insurance premiums at this level.
    pub insurance_price_coef: f64,
}

/// Template ids a trader draws from for each insurance message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsuranceDialogue {
    pub insurance_start: Vec<String>,
    pub insurance_found: Vec<String>,
    pub insurance_failed: Vec<String>,
    pub insurance_failed_labs: Vec<String>,
}

/// Bounds on how long a trader takes to return recovered gear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnWindow {
    pub min_hours: u64,
    pub max_hours: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraderConfig {
    pub min_return_hours: u64,
    pub max_return_hours: u64,
    /// How long returned gear waits in the mailbox before it expires.
    pub max_storage_time_hours: u64,
    #[serde(default)]
    pub loyalty_levels: Vec<LoyaltyLevel>,
    #[serde(default)]
    pub dialogue: Option<InsuranceDialogue>,
}

impl TraderConfig {
    pub fn return_window(&self) -> ReturnWindow {
        ReturnWindow { min_hours: self.min_return_hours, max_hours: self.max_return_hours }
    }

    pub fn max_storage_time_seconds(&self) -> u64 {
        self.max_storage_time_hours.saturating_mul(Timestamp::SECONDS_PER_HOUR)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsuranceConfig {
    /// When non-zero, every return is scheduled exactly this many seconds out.
    pub return_time_override_seconds: u64,
    pub blacklisted_equipment_slots: Option<Vec<String>>,
    pub insurance_multiplier: HashMap<TraderId, f64>,
    pub traders: HashMap<TraderId, TraderConfig>,
}

impl InsuranceConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InsuranceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| InsuranceError::Io { path: path.to_path_buf(), source })?;
        serde_json::from_str(&text)
            .map_err(|source| InsuranceError::Parse { path: path.to_path_buf(), source })
    }

    pub fn multiplier_for(&self, trader: &TraderId) -> Configured<f64> {
        match self.insurance_multiplier.get(trader) {
            Some(&m) => Configured::Found(m),
            None => Configured::Defaulted {
                value: DEFAULT_INSURANCE_MULTIPLIER,
                gap: ConfigurationGap::MissingMultiplier { trader: trader.clone() },
            },
        }
    }

    pub fn excluded_slots(&self) -> Configured<HashSet<String>> {
        match &self.blacklisted_equipment_slots {
            Some(slots) => Configured::Found(slots.iter().cloned().collect()),
            None => Configured::Defaulted {
                value: DEFAULT_BLACKLISTED_SLOTS.iter().map(|s| s.to_string()).collect(),
                gap: ConfigurationGap::MissingExclusionSlots,
            },
        }
    }

    pub fn trader(&self, trader: &TraderId) -> Result<&TraderConfig, ConfigurationGap> {
        self.traders
            .get(trader)
            .ok_or_else(|| ConfigurationGap::MissingTraderConfig { trader: trader.clone() })
    }

    /// Dialogue templates for `trader`. An entry with no start or found
    /// templates counts as missing: neither message could be composed.
    pub fn dialogue(&self, trader: &TraderId) -> Result<&InsuranceDialogue, ConfigurationGap> {
        let missing = || ConfigurationGap::MissingDialogue { trader: trader.clone() };
        let dialogue = self.trader(trader)?.dialogue.as_ref().ok_or_else(missing)?;
        if dialogue.insurance_start.is_empty() || dialogue.insurance_found.is_empty() {
            return Err(missing());
        }
        Ok(dialogue)
    }

    pub fn canonical() -> Self {
        fn dialogue(trader: &str) -> InsuranceDialogue {
            let ids = |kind: &str, n: usize| -> Vec<String> {
                (1..=n).map(|i| format!("{trader}_insurance_{kind}_{i}")).collect()
            };
            InsuranceDialogue {
                insurance_start: ids("start", 3),
                insurance_found: ids("found", 3),
                insurance_failed: ids("failed", 2),
                insurance_failed_labs: ids("failed_labs", 1),
            }
        }

        let loyalty = |coefs: &[f64]| -> Vec<LoyaltyLevel> {
            coefs.iter().map(|&c| LoyaltyLevel { insurance_price_coef: c }).collect()
        };

        let prapor = TraderId::new("prapor");
        let therapist = TraderId::new("therapist");

        InsuranceConfig {
            return_time_override_seconds: 0,
            blacklisted_equipment_slots: Some(
                DEFAULT_BLACKLISTED_SLOTS.iter().map(|s| s.to_string()).collect(),
            ),
            // ── Premium multipliers ───────────────────────────────────────────
            // Fraction of the item's base price charged per insurance.
            insurance_multiplier: HashMap::from([
                (prapor.clone(), 0.25),
                (therapist.clone(), 0.4),
            ]),
            // ── Traders ───────────────────────────────────────────────────────
            // Prapor is cheap and slow; Therapist is expensive and quick.
            traders: HashMap::from([
                (
                    prapor,
                    TraderConfig {
                        min_return_hours: 24,
                        max_return_hours: 36,
                        max_storage_time_hours: 96,
                        loyalty_levels: loyalty(&[0.0, 5.0, 10.0, 15.0]),
                        dialogue: Some(dialogue("prapor")),
                    },
                ),
                (
                    therapist,
                    TraderConfig {
                        min_return_hours: 12,
                        max_return_hours: 24,
                        max_storage_time_hours: 144,
                        loyalty_levels: loyalty(&[0.0, 4.0, 8.0, 12.0]),
                        dialogue: Some(dialogue("therapist")),
                    },
                ),
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_multiplier_defaults_with_gap() {
        let config = InsuranceConfig::default();
        let m = config.multiplier_for(&TraderId::new("unknown"));
        assert!(matches!(m.gap(), Some(ConfigurationGap::MissingMultiplier { .. })));
        assert_eq!(m.value(), DEFAULT_INSURANCE_MULTIPLIER);
    }

    #[test]
    fn configured_multiplier_is_found() {
        let config = InsuranceConfig::canonical();
        assert_eq!(config.multiplier_for(&TraderId::new("prapor")), Configured::Found(0.25));
    }

    #[test]
    fn missing_blacklist_falls_back_to_special_slots() {
        let config = InsuranceConfig::default();
        let (slots, gap) = config.excluded_slots().into_parts();
        assert_eq!(gap, Some(ConfigurationGap::MissingExclusionSlots));
        assert!(slots.contains("SpecialSlot1"));
        assert_eq!(slots.len(), DEFAULT_BLACKLISTED_SLOTS.len());
    }

    #[test]
    fn empty_blacklist_is_honoured_without_gap() {
        let config =
            InsuranceConfig { blacklisted_equipment_slots: Some(vec![]), ..Default::default() };
        assert_eq!(config.excluded_slots(), Configured::Found(HashSet::new()));
    }

    #[test]
    fn dialogue_without_found_templates_is_missing() {
        let mut config = InsuranceConfig::canonical();
        let prapor = TraderId::new("prapor");
        if let Some(d) = config.traders.get_mut(&prapor).and_then(|t| t.dialogue.as_mut()) {
            d.insurance_found.clear();
        }
        assert_eq!(
            config.dialogue(&prapor).unwrap_err(),
            ConfigurationGap::MissingDialogue { trader: prapor }
        );
    }

    #[test]
    fn unknown_trader_dialogue_reports_missing_trader() {
        let config = InsuranceConfig::canonical();
        assert!(matches!(
            config.dialogue(&TraderId::new("nobody")),
            Err(ConfigurationGap::MissingTraderConfig { .. })
        ));
    }

    #[test]
    fn load_reports_missing_file_with_path() {
        let err = InsuranceConfig::load("/nonexistent/gearins.json").unwrap_err();
        assert!(matches!(err, InsuranceError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/gearins.json"));
    }

    #[test]
    fn absurd_storage_time_saturates() {
        let trader = TraderConfig {
            min_return_hours: 0,
            max_return_hours: 0,
            max_storage_time_hours: u64::MAX,
            loyalty_levels: Vec::new(),
            dialogue: None,
        };
        assert_eq!(trader.max_storage_time_seconds(), u64::MAX);
    }

    #[test]
    fn config_parses_from_partial_json() {
        let json = r#"{
            "return_time_override_seconds": 60,
            "insurance_multiplier": {"prapor": 0.5},
            "traders": {"prapor": {"min_return_hours": 1, "max_return_hours": 2,
                                   "max_storage_time_hours": 3}}
        }"#;
        let config: InsuranceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.return_time_override_seconds, 60);
        assert!(config.blacklisted_equipment_slots.is_none());
        let prapor = config.trader(&TraderId::new("prapor")).unwrap();
        assert_eq!(prapor.return_window(), ReturnWindow { min_hours: 1, max_hours: 2 });
        assert_eq!(prapor.max_storage_time_seconds(), 3 * 3_600);
        assert!(prapor.dialogue.is_none());
    }
}
