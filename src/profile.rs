use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::InsuranceConfig;
use crate::item::{InsuredItemReference, ItemSnapshot};
use crate::mail::InsuranceRecord;
use crate::types::{ItemId, PlayerId, TraderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BonusType {
    /// Percentage reduction of insurance return time (hideout upgrades).
    InsuranceReturnTime,
    /// Not read by the insurance pipeline.
    SkillGroupLevelingBoost,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bonus {
    #[serde(rename = "type")]
    pub bonus_type: BonusType,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraderStanding {
    /// 1-based loyalty level.
    pub loyalty_level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    /// Root item every equipped item hangs off.
    pub equipment: ItemId,
    pub items: Vec<ItemSnapshot>,
}

impl Inventory {
    /// Items the player carries into a raid: the equipment root and all of its
    /// descendants, in inventory order. Stash contents are excluded.
    pub fn carried_gear(&self) -> Vec<ItemSnapshot> {
        let mut children: HashMap<&ItemId, Vec<&ItemId>> = HashMap::new();
        for item in &self.items {
            if let Some(parent) = &item.parent_id {
                children.entry(parent).or_default().push(&item.id);
            }
        }

        let mut carried: HashSet<&ItemId> = HashSet::new();
        let mut stack = vec![&self.equipment];
        while let Some(id) = stack.pop() {
            if !carried.insert(id) {
                continue;
            }
            if let Some(kids) = children.get(id) {
                stack.extend(kids.iter().copied());
            }
        }

        self.items.iter().filter(|i| carried.contains(&i.id)).cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub id: PlayerId,
    pub inventory: Inventory,
    #[serde(default)]
    pub insured_items: Vec<InsuredItemReference>,
    #[serde(default)]
    pub bonuses: Vec<Bonus>,
    #[serde(default)]
    pub trader_standing: HashMap<TraderId, TraderStanding>,
    /// Returns waiting for delivery.
    #[serde(default)]
    pub insurance_pending: Vec<InsuranceRecord>,
}

impl PlayerProfile {
    pub fn new(id: impl Into<String>, equipment: impl Into<String>) -> Self {
        PlayerProfile {
            id: PlayerId::new(id),
            inventory: Inventory { equipment: ItemId::new(equipment), items: Vec::new() },
            insured_items: Vec::new(),
            bonuses: Vec::new(),
            trader_standing: HashMap::new(),
            insurance_pending: Vec::new(),
        }
    }

    /// Percentage discount on premiums from the player's loyalty level with
    /// `trader`. Zero when either the standing or the level is unknown.
    pub fn loyalty_discount(&self, trader: &TraderId, config: &InsuranceConfig) -> f64 {
        let Some(standing) = self.trader_standing.get(trader) else {
            return 0.0;
        };
        let Ok(trader_config) = config.trader(trader) else {
            return 0.0;
        };
        (standing.loyalty_level as usize)
            .checked_sub(1)
            .and_then(|idx| trader_config.loyalty_levels.get(idx))
            .map(|level| level.insurance_price_coef)
            .unwrap_or(0.0)
    }

    pub fn return_time_bonus(&self) -> Option<f64> {
        self.bonuses
            .iter()
            .find(|b| b.bonus_type == BonusType::InsuranceReturnTime)
            .map(|b| b.value)
    }

    pub fn is_insured(&self, item: &ItemId) -> bool {
        self.insured_items.iter().any(|r| &r.item_id == item)
    }

    /// Drop the insurance references for `items`.
    pub fn consume_insured(&mut self, items: &HashSet<ItemId>) {
        self.insured_items.retain(|r| !items.contains(&r.item_id));
    }
}
