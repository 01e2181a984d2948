use crate::item::{FaceShield, ItemSnapshot, ItemUpd, Repairable};
use crate::types::ItemId;

/// Slot given to items that have left active inventory placement.
pub const NEUTRAL_SLOT: &str = "hideout";

pub const POCKET_SLOTS: [&str; 4] = ["pocket1", "pocket2", "pocket3", "pocket4"];

/// Turn a pre-raid snapshot into an item that can be mailed back.
///
/// `client_state` is the client's post-raid view of the same item, if it
/// reported one; only its wear state is taken from it.
pub fn normalize_return_item(
    inventory_root: &ItemId,
    snapshot: &ItemSnapshot,
    client_state: Option<&ItemUpd>,
) -> ItemSnapshot {
    let mut item = snapshot.clone();

    if item.slot().is_none_or(|slot| POCKET_SLOTS.contains(&slot)) {
        item.slot_id = Some(NEUTRAL_SLOT.to_string());
    }

    if item.parent_id.as_ref() == Some(inventory_root) {
        item.slot_id = Some(NEUTRAL_SLOT.to_string());
    }

    if item.slot() == Some(NEUTRAL_SLOT) {
        item.location = None;
    }

    if let Some(upd) = item.upd.as_mut() {
        upd.spawned_in_session = None;
    }

    if let Some(client) = client_state {
        merge_wear(&mut item, client);
    }

    item
}

fn merge_wear(item: &mut ItemSnapshot, client: &ItemUpd) {
    if let Some(reported) = client.repairable {
        let repairable = item
            .upd_mut()
            .repairable
            .get_or_insert(Repairable { durability: 0.0, max_durability: 0.0 });
        repairable.durability = reported.durability;
        repairable.max_durability = reported.max_durability;
    }
    if let Some(reported) = client.face_shield {
        item.upd_mut().face_shield.get_or_insert(FaceShield { hits: 0 }).hits = reported.hits;
    }
}
