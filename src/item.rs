use serde::{Deserialize, Serialize};

use crate::types::{ItemId, TemplateId, TraderId};

/// Where an item sits inside its parent container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemLocation {
    Grid {
        x: i32,
        y: i32,
        r: u8,
        #[serde(rename = "isSearched", default, skip_serializing_if = "Option::is_none")]
        is_searched: Option<bool>,
    },
    /// Position of a round inside a magazine.
    Cartridge(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Repairable {
    pub durability: f64,
    pub max_durability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FaceShield {
    pub hits: u32,
}

/// Mutable per-item state: wear and session flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemUpd {
    /// Set on items picked up during the current raid ("found in raid").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawned_in_session: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repairable: Option<Repairable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_shield: Option<FaceShield>,
}

/// An item as it existed in an inventory at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    #[serde(rename = "_id")]
    pub id: ItemId,
    #[serde(rename = "_tpl")]
    pub template_id: TemplateId,
    #[serde(rename = "parentId", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ItemId>,
    #[serde(rename = "slotId", default, skip_serializing_if = "Option::is_none")]
    pub slot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ItemLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upd: Option<ItemUpd>,
}

impl ItemSnapshot {
    pub fn new(id: impl Into<String>, template_id: impl Into<String>) -> Self {
        ItemSnapshot {
            id: ItemId::new(id),
            template_id: TemplateId::new(template_id),
            parent_id: None,
            slot_id: None,
            location: None,
            upd: None,
        }
    }

    /// Place the item in `slot` of `parent`.
    pub fn in_slot(mut self, parent: &ItemId, slot: impl Into<String>) -> Self {
        self.parent_id = Some(parent.clone());
        self.slot_id = Some(slot.into());
        self
    }

    pub fn at(mut self, location: ItemLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_upd(mut self, upd: ItemUpd) -> Self {
        self.upd = Some(upd);
        self
    }

    pub fn slot(&self) -> Option<&str> {
        self.slot_id.as_deref()
    }

    pub fn upd_mut(&mut self) -> &mut ItemUpd {
        self.upd.get_or_insert_with(ItemUpd::default)
    }
}

/// Profile-held record that an item was insured with a trader.
/// Created at purchase time; consumed once the dispatcher has processed it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InsuredItemReference {
    #[serde(rename = "itemId")]
    pub item_id: ItemId,
    #[serde(rename = "tid")]
    pub trader_id: TraderId,
}

impl InsuredItemReference {
    pub fn new(item_id: impl Into<String>, trader_id: impl Into<String>) -> Self {
        InsuredItemReference { item_id: ItemId::new(item_id), trader_id: TraderId::new(trader_id) }
    }
}
