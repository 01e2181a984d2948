use std::collections::{BTreeMap, HashMap};

use crate::error::InsuranceError;
use crate::item::ItemSnapshot;
use crate::types::{PlayerId, TraderId};

/// Items currently being processed for return, per player and trader.
///
/// Buckets are created on the first loss for a player and removed wholesale
/// by [`flush_and_clear`](Self::flush_and_clear). An item id is held under at
/// most one trader per player.
#[derive(Debug, Default)]
pub struct InsuredItemRegistry {
    insured: HashMap<PlayerId, BTreeMap<TraderId, Vec<ItemSnapshot>>>,
}

impl InsuredItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket for (`player`, `trader`), created empty if absent.
    pub fn ensure_bucket(&mut self, player: &PlayerId, trader: &TraderId) -> &mut Vec<ItemSnapshot> {
        self.insured.entry(player.clone()).or_default().entry(trader.clone()).or_default()
    }

    /// Append `item` to the trader's bucket. Refuses an item already held for
    /// this player under any trader, the same one included; the registry is
    /// left unchanged in that case.
    pub fn add_item(
        &mut self,
        player: &PlayerId,
        trader: &TraderId,
        item: ItemSnapshot,
    ) -> Result<(), InsuranceError> {
        let holder = self.insured.get(player).and_then(|buckets| {
            buckets.iter().find_map(|(t, items)| items.iter().any(|i| i.id == item.id).then_some(t))
        });
        if let Some(holder) = holder {
            return Err(InsuranceError::state_corruption(format!(
                "item {} for player {player} already held by trader {holder}, not adding for {trader}",
                item.id
            )));
        }
        self.ensure_bucket(player, trader).push(item);
        Ok(())
    }

    pub fn has_player(&self, player: &PlayerId) -> bool {
        self.insured.contains_key(player)
    }

    pub fn items(&self, player: &PlayerId, trader: &TraderId) -> Option<&[ItemSnapshot]> {
        self.insured.get(player)?.get(trader).map(Vec::as_slice)
    }

    /// Traders with a bucket for `player`, in id order.
    pub fn traders(&self, player: &PlayerId) -> Vec<TraderId> {
        self.insured.get(player).map(|b| b.keys().cloned().collect()).unwrap_or_default()
    }

    /// Remove and return every bucket held for `player`.
    pub fn flush_and_clear(&mut self, player: &PlayerId) -> BTreeMap<TraderId, Vec<ItemSnapshot>> {
        self.insured.remove(player).unwrap_or_default()
    }

    pub fn clear_player(&mut self, player: &PlayerId) {
        self.insured.remove(player);
    }

    pub fn is_empty(&self) -> bool {
        self.insured.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (PlayerId, TraderId, TraderId) {
        (PlayerId::new("p"), TraderId::new("prapor"), TraderId::new("therapist"))
    }

    #[test]
    fn ensure_bucket_creates_empty_bucket_once() {
        let (p, prapor, _) = ids();
        let mut reg = InsuredItemRegistry::new();
        assert!(!reg.has_player(&p));
        assert!(reg.ensure_bucket(&p, &prapor).is_empty());
        reg.ensure_bucket(&p, &prapor).push(ItemSnapshot::new("a", "t"));
        assert_eq!(reg.ensure_bucket(&p, &prapor).len(), 1);
        assert_eq!(reg.traders(&p), vec![prapor]);
    }

    #[test]
    fn add_item_appends_in_order() {
        let (p, prapor, _) = ids();
        let mut reg = InsuredItemRegistry::new();
        reg.add_item(&p, &prapor, ItemSnapshot::new("a", "t")).unwrap();
        reg.add_item(&p, &prapor, ItemSnapshot::new("b", "t")).unwrap();
        let items: Vec<&str> =
            reg.items(&p, &prapor).unwrap().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(items, vec!["a", "b"]);
    }

    #[test]
    fn item_cannot_be_held_by_two_traders() {
        let (p, prapor, therapist) = ids();
        let mut reg = InsuredItemRegistry::new();
        reg.add_item(&p, &prapor, ItemSnapshot::new("a", "t")).unwrap();
        let err = reg.add_item(&p, &therapist, ItemSnapshot::new("a", "t")).unwrap_err();
        assert!(matches!(err, InsuranceError::StateCorruption(_)));
        assert!(reg.items(&p, &therapist).is_none());
    }

    #[test]
    fn item_is_not_added_twice_for_the_same_trader() {
        let (p, prapor, _) = ids();
        let mut reg = InsuredItemRegistry::new();
        reg.add_item(&p, &prapor, ItemSnapshot::new("a", "t")).unwrap();
        let err = reg.add_item(&p, &prapor, ItemSnapshot::new("a", "t")).unwrap_err();
        assert!(matches!(err, InsuranceError::StateCorruption(_)));
        assert_eq!(reg.items(&p, &prapor).unwrap().len(), 1);
    }

    #[test]
    fn flush_and_clear_returns_buckets_sorted_and_empties_player() {
        let (p, prapor, therapist) = ids();
        let other = PlayerId::new("other");
        let mut reg = InsuredItemRegistry::new();
        reg.add_item(&p, &therapist, ItemSnapshot::new("b", "t")).unwrap();
        reg.add_item(&p, &prapor, ItemSnapshot::new("a", "t")).unwrap();
        reg.add_item(&other, &prapor, ItemSnapshot::new("c", "t")).unwrap();

        let flushed = reg.flush_and_clear(&p);
        assert_eq!(flushed.keys().cloned().collect::<Vec<_>>(), vec![prapor.clone(), therapist]);
        assert!(!reg.has_player(&p));
        assert!(reg.has_player(&other), "other players' buckets must survive");
        assert!(reg.flush_and_clear(&p).is_empty());
    }

    #[test]
    fn clear_player_leaves_registry_empty() {
        let (p, prapor, _) = ids();
        let mut reg = InsuredItemRegistry::new();
        reg.ensure_bucket(&p, &prapor);
        reg.clear_player(&p);
        assert!(reg.is_empty());
    }
}
