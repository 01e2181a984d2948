use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::InsuranceConfig;
use crate::error::{ConfigurationGap, Configured};
use crate::item::ItemSnapshot;
use crate::profile::PlayerProfile;
use crate::types::{ItemId, TemplateId, TraderId};

/// Base (handbook) price per item template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceTable(pub HashMap<TemplateId, u64>);

impl PriceTable {
    pub fn base_price(&self, template: &TemplateId) -> Configured<u64> {
        match self.0.get(template) {
            Some(&price) => Configured::Found(price),
            None => Configured::Defaulted {
                value: 0,
                gap: ConfigurationGap::MissingBasePrice { template: template.clone() },
            },
        }
    }
}

pub struct PremiumCalculator<'a> {
    config: &'a InsuranceConfig,
    prices: &'a PriceTable,
}

impl<'a> PremiumCalculator<'a> {
    pub fn new(config: &'a InsuranceConfig, prices: &'a PriceTable) -> Self {
        PremiumCalculator { config, prices }
    }

    /// Cost to insure `item` with `trader`:
    /// base price × trader multiplier × (1 − loyalty discount %), rounded.
    /// A missing multiplier or base price is substituted and reported.
    pub fn premium(
        &self,
        profile: &PlayerProfile,
        item: &ItemSnapshot,
        trader: &TraderId,
    ) -> Configured<u64> {
        let (base, price_gap) = self.prices.base_price(&item.template_id).into_parts();
        let (multiplier, multiplier_gap) = self.config.multiplier_for(trader).into_parts();
        if let Some(gap) = &multiplier_gap {
            tracing::warn!(%trader, "{gap}, using {multiplier}");
        }
        if let Some(gap) = &price_gap {
            tracing::warn!(item = %item.id, "{gap}, pricing at zero");
        }

        let mut premium = base as f64 * multiplier;
        let discount = profile.loyalty_discount(trader, self.config);
        if discount > 0.0 {
            premium *= 1.0 - discount / 100.0;
        }
        let premium = premium.round().max(0.0) as u64;

        match multiplier_gap.or(price_gap) {
            None => Configured::Found(premium),
            Some(gap) => Configured::Defaulted { value: premium, gap },
        }
    }

    /// Premiums for every (trader, item) pair, keyed by trader then item id.
    pub fn quote(
        &self,
        profile: &PlayerProfile,
        items: &[ItemSnapshot],
        traders: &[TraderId],
    ) -> BTreeMap<TraderId, BTreeMap<ItemId, u64>> {
        traders
            .iter()
            .map(|trader| {
                let per_item = items
                    .iter()
                    .map(|item| (item.id.clone(), self.premium(profile, item, trader).value()))
                    .collect();
                (trader.clone(), per_item)
            })
            .collect()
    }
}
