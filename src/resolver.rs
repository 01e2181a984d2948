use std::collections::{HashMap, HashSet};

use crate::item::ItemSnapshot;
use crate::normalizer::normalize_return_item;
use crate::profile::PlayerProfile;
use crate::types::{ItemId, PlayerId, SessionId, TraderId};

/// An insured item that qualifies for return, already normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct LostGear {
    pub player_id: PlayerId,
    pub item: ItemSnapshot,
    pub trader_id: TraderId,
    pub session_id: SessionId,
}

/// Decide which insured items the player lost in a raid.
///
/// `pre_session` is the gear carried into the raid, `post_session` the
/// inventory the client reported on exit. An insured item qualifies when it
/// was carried, sat outside `excluded_slots`, and either went missing or the
/// player died. Output follows the order of the profile's insurance list.
pub fn resolve_lost_gear(
    profile: &PlayerProfile,
    pre_session: &[ItemSnapshot],
    post_session: &[ItemSnapshot],
    player_died: bool,
    session_id: &SessionId,
    excluded_slots: &HashSet<String>,
) -> Vec<LostGear> {
    let pre: HashMap<&ItemId, &ItemSnapshot> = pre_session.iter().map(|i| (&i.id, i)).collect();
    let post: HashMap<&ItemId, &ItemSnapshot> = post_session.iter().map(|i| (&i.id, i)).collect();
    let root = &profile.inventory.equipment;

    let mut lost = Vec::new();
    for insured in &profile.insured_items {
        let Some(&before) = pre.get(&insured.item_id) else {
            tracing::trace!(item = %insured.item_id, "insured item not carried into raid");
            continue;
        };

        if before.slot().is_some_and(|slot| excluded_slots.contains(slot)) {
            tracing::debug!(item = %insured.item_id, slot = ?before.slot_id, "slot never returned");
            continue;
        }

        let after = post.get(&insured.item_id).copied();
        if after.is_some() && !player_died {
            continue;
        }

        let client_state = after.and_then(|i| i.upd.as_ref());
        lost.push(LostGear {
            player_id: profile.id.clone(),
            item: normalize_return_item(root, before, client_state),
            trader_id: insured.trader_id.clone(),
            session_id: session_id.clone(),
        });
    }
    lost
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{InsuredItemReference, ItemUpd, Repairable};
    use crate::normalizer::NEUTRAL_SLOT;

    struct Raid {
        profile: PlayerProfile,
        pre: Vec<ItemSnapshot>,
    }

    /// Player wearing a rifle, a vest and a pouch in a special slot, with a
    /// grenade in the first pocket. Everything insured with "prapor", plus a
    /// reference to an item left in the stash.
    fn raid() -> Raid {
        let mut profile = PlayerProfile::new("p1", "equip");
        let equip = profile.inventory.equipment.clone();
        let pockets = ItemId::new("pockets");
        let pre = vec![
            ItemSnapshot::new("rifle", "ak").in_slot(&equip, "FirstPrimaryWeapon"),
            ItemSnapshot::new("vest", "rig").in_slot(&equip, "TacticalVest"),
            ItemSnapshot::new("pouch", "pouch").in_slot(&equip, "SpecialSlot1"),
            ItemSnapshot::new("pockets", "pockets").in_slot(&equip, "Pockets"),
            ItemSnapshot::new("nade", "f1").in_slot(&pockets, "pocket1"),
        ];
        profile.insured_items = ["rifle", "vest", "pouch", "nade", "stashed"]
            .iter()
            .map(|id| InsuredItemReference::new(*id, "prapor"))
            .collect();
        Raid { profile, pre }
    }

    fn excluded() -> HashSet<String> {
        HashSet::from(["SpecialSlot1".to_string()])
    }

    fn ids(lost: &[LostGear]) -> Vec<&str> {
        lost.iter().map(|l| l.item.id.as_str()).collect()
    }

    #[test]
    fn survivor_keeps_items_still_present() {
        let r = raid();
        let post = r.pre.clone();
        let lost =
            resolve_lost_gear(&r.profile, &r.pre, &post, false, &SessionId::new("s"), &excluded());
        assert!(lost.is_empty());
    }

    #[test]
    fn survivor_gets_back_only_missing_items() {
        let r = raid();
        let post: Vec<_> = r.pre.iter().filter(|i| i.id.as_str() != "rifle").cloned().collect();
        let lost =
            resolve_lost_gear(&r.profile, &r.pre, &post, false, &SessionId::new("s"), &excluded());
        assert_eq!(ids(&lost), vec!["rifle"]);
        assert_eq!(lost[0].trader_id, TraderId::new("prapor"));
        assert_eq!(lost[0].session_id, SessionId::new("s"));
        assert_eq!(lost[0].item.slot(), Some(NEUTRAL_SLOT));
    }

    #[test]
    fn death_returns_every_eligible_item_in_insurance_order() {
        let r = raid();
        let post = r.pre.clone();
        let lost =
            resolve_lost_gear(&r.profile, &r.pre, &post, true, &SessionId::new("s"), &excluded());
        assert_eq!(ids(&lost), vec!["rifle", "vest", "nade"]);
    }

    #[test]
    fn excluded_slot_is_never_returned() {
        let r = raid();
        let lost =
            resolve_lost_gear(&r.profile, &r.pre, &[], true, &SessionId::new("s"), &excluded());
        assert!(!ids(&lost).contains(&"pouch"));
    }

    #[test]
    fn stale_reference_is_skipped() {
        let r = raid();
        let lost =
            resolve_lost_gear(&r.profile, &r.pre, &[], true, &SessionId::new("s"), &excluded());
        assert!(!ids(&lost).contains(&"stashed"));
    }

    #[test]
    fn client_wear_from_post_raid_is_merged_on_death() {
        let r = raid();
        let mut post = r.pre.clone();
        if let Some(vest) = post.iter_mut().find(|i| i.id.as_str() == "vest") {
            vest.upd = Some(ItemUpd {
                repairable: Some(Repairable { durability: 7.0, max_durability: 35.0 }),
                ..Default::default()
            });
        }
        let lost =
            resolve_lost_gear(&r.profile, &r.pre, &post, true, &SessionId::new("s"), &excluded());
        let vest = lost.iter().find(|l| l.item.id.as_str() == "vest").unwrap();
        let repairable = vest.item.upd.as_ref().and_then(|u| u.repairable).unwrap();
        assert_eq!(repairable.durability, 7.0);
    }
}
