//! Raid-exit handling for insured gear.
//!
//! Per player the dispatcher moves `Idle → Resolving → Flushed → Idle`:
//! [`resolve`](InsuranceDispatcher::resolve) fills the registry with lost
//! gear, [`flush`](InsuranceDispatcher::flush) turns every trader bucket into
//! a pending return on the profile and empties the registry again.
//!
//! All methods take `&mut self`, so one player's resolve/flush pair can never
//! interleave with another flush. Hosts that share a dispatcher across worker
//! threads must wrap it in a mutex. Two raid exits for the same player handled
//! back to back without a flush in between are last-writer-wins: the second
//! resolve discards the first one's buckets and reports `StateCorruption`.

use std::collections::HashSet;

use rand::SeedableRng;
use rand::seq::IndexedRandom;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::config::InsuranceConfig;
use crate::error::{ConfigurationGap, InsuranceError};
use crate::item::ItemSnapshot;
use crate::mail::{InsuranceRecord, Mail, MailSender, MessageContent, MessageType, SystemData};
use crate::profile::PlayerProfile;
use crate::registry::InsuredItemRegistry;
use crate::resolver::resolve_lost_gear;
use crate::scheduler::{Clock, ReturnScheduler};
use crate::types::{PlayerId, SessionId, Timestamp, TraderId};

/// Location whose failed-insurance message uses the alternate template.
pub const LABS_LOCATION: &str = "laboratory";

/// Per-player dispatch phase. `Flushed` only lasts while a flush is composing
/// messages inside [`InsuranceDispatcher::flush`], so
/// [`InsuranceDispatcher::state`] never reports it; it shows up in the
/// transition log only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Resolving,
    Flushed,
}

/// What the client reports when a player leaves a raid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaidExit {
    pub session_id: SessionId,
    pub location_name: String,
    pub player_died: bool,
    /// Inventory as the client saw it on exit, including live wear state.
    pub post_session: Vec<ItemSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledReturn {
    pub trader_id: TraderId,
    pub scheduled_time: Timestamp,
    pub item_count: usize,
}

/// Outcome of one raid exit. `issues` are non-fatal: each one cost at most a
/// single item or trader this cycle.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub scheduled: Vec<ScheduledReturn>,
    pub issues: Vec<InsuranceError>,
}

pub struct InsuranceDispatcher<M: MailSender, C: Clock> {
    config: InsuranceConfig,
    registry: InsuredItemRegistry,
    scheduler: ReturnScheduler,
    rng: ChaCha20Rng,
    mail: M,
    clock: C,
}

impl<M: MailSender, C: Clock> InsuranceDispatcher<M, C> {
    pub fn new(config: InsuranceConfig, mail: M, clock: C, seed: u64) -> Self {
        InsuranceDispatcher {
            scheduler: ReturnScheduler::new(config.return_time_override_seconds),
            config,
            registry: InsuredItemRegistry::new(),
            rng: ChaCha20Rng::seed_from_u64(seed),
            mail,
            clock,
        }
    }

    pub fn config(&self) -> &InsuranceConfig {
        &self.config
    }

    pub fn registry(&self) -> &InsuredItemRegistry {
        &self.registry
    }

    pub fn mail(&self) -> &M {
        &self.mail
    }

    /// `Resolving` while the player has registry buckets awaiting a flush,
    /// `Idle` otherwise.
    pub fn state(&self, player: &PlayerId) -> DispatchState {
        if self.registry.has_player(player) { DispatchState::Resolving } else { DispatchState::Idle }
    }

    /// Resolve and flush a raid exit in one go.
    pub fn on_raid_exit(&mut self, profile: &mut PlayerProfile, exit: &RaidExit) -> DispatchReport {
        let mut issues = self.resolve(profile, exit);
        let mut report = self.flush(profile, &exit.location_name);
        issues.append(&mut report.issues);
        report.issues = issues;
        report
    }

    /// Register every insured item lost in the raid and drop its insurance
    /// reference from the profile.
    pub fn resolve(&mut self, profile: &mut PlayerProfile, exit: &RaidExit) -> Vec<InsuranceError> {
        let mut issues = Vec::new();

        if self.registry.has_player(&profile.id) {
            let err = InsuranceError::state_corruption(format!(
                "player {} still has unflushed gear from an earlier raid, discarding it",
                profile.id
            ));
            tracing::error!("{err}");
            self.registry.clear_player(&profile.id);
            issues.push(err);
        }
        transition(&profile.id, DispatchState::Idle, DispatchState::Resolving);

        let (excluded, gap) = self.config.excluded_slots().into_parts();
        if let Some(gap) = gap {
            tracing::warn!("{gap}, using default blacklist");
            issues.push(gap.into());
        }

        let carried = profile.inventory.carried_gear();
        let lost = resolve_lost_gear(
            profile,
            &carried,
            &exit.post_session,
            exit.player_died,
            &exit.session_id,
            &excluded,
        );

        let mut consumed = HashSet::new();
        for gear in lost {
            let item_id = gear.item.id.clone();
            tracing::debug!(player = %gear.player_id, item = %item_id, trader = %gear.trader_id, "insured item lost");
            match self.registry.add_item(&gear.player_id, &gear.trader_id, gear.item) {
                Ok(()) => {
                    consumed.insert(item_id);
                }
                Err(err) => {
                    tracing::error!("{err}");
                    issues.push(err);
                }
            }
        }
        profile.consume_insured(&consumed);

        issues
    }

    /// Send each trader's "searching" message and queue its return on the
    /// profile. The player's registry buckets are always cleared, including
    /// for traders that could not be processed.
    pub fn flush(&mut self, profile: &mut PlayerProfile, location_name: &str) -> DispatchReport {
        let mut report = DispatchReport::default();
        let buckets = self.registry.flush_and_clear(&profile.id);
        transition(&profile.id, DispatchState::Resolving, DispatchState::Flushed);

        for (trader, items) in buckets {
            if items.is_empty() {
                continue;
            }
            match self.schedule_return(profile, &trader, items, location_name) {
                Ok(scheduled) => {
                    tracing::info!(
                        player = %profile.id,
                        %trader,
                        items = scheduled.item_count,
                        at = scheduled.scheduled_time.0,
                        "insurance return scheduled"
                    );
                    report.scheduled.push(scheduled);
                }
                Err(gap) => {
                    tracing::error!(player = %profile.id, "{gap}, gear will not be returned");
                    report.issues.push(gap.into());
                }
            }
        }

        transition(&profile.id, DispatchState::Flushed, DispatchState::Idle);
        report
    }

    fn schedule_return(
        &mut self,
        profile: &mut PlayerProfile,
        trader: &TraderId,
        items: Vec<ItemSnapshot>,
        location_name: &str,
    ) -> Result<ScheduledReturn, ConfigurationGap> {
        let trader_config = self.config.trader(trader)?;
        let dialogue = self.config.dialogue(trader)?;
        let now = self.clock.now();

        let mut content = MessageContent {
            template_id: pick_template(&dialogue.insurance_start, &mut self.rng, trader)?,
            message_type: MessageType::NpcTrader,
            max_storage_time: trader_config.max_storage_time_seconds(),
            system_data: None,
        };
        let found_template = pick_template(&dialogue.insurance_found, &mut self.rng, trader)?;

        self.mail.send(Mail {
            player_id: profile.id.clone(),
            trader_id: trader.clone(),
            content: content.clone(),
            items: Vec::new(),
            scheduled_time: None,
        });

        let scheduled_time =
            self.scheduler.return_time(profile, trader_config.return_window(), now, &mut self.rng);

        content.template_id = found_template;
        content.message_type = MessageType::InsuranceReturn;
        content.system_data = Some(system_data(now, location_name));

        let scheduled =
            ScheduledReturn { trader_id: trader.clone(), scheduled_time, item_count: items.len() };
        profile.insurance_pending.push(InsuranceRecord {
            trader_id: trader.clone(),
            scheduled_time,
            message_content: content,
            items,
        });
        Ok(scheduled)
    }

    /// Tell the player that `trader` could not recover any of their gear.
    pub fn send_lost_insurance_message(
        &mut self,
        player: &PlayerId,
        trader: &TraderId,
        location_name: &str,
    ) -> Result<(), ConfigurationGap> {
        let result = self.compose_lost_message(player, trader, location_name);
        match result {
            Ok(mail) => {
                self.mail.send(mail);
                Ok(())
            }
            Err(gap) => {
                tracing::error!(%player, "{gap}, lost-insurance message not sent");
                Err(gap)
            }
        }
    }

    fn compose_lost_message(
        &mut self,
        player: &PlayerId,
        trader: &TraderId,
        location_name: &str,
    ) -> Result<Mail, ConfigurationGap> {
        let trader_config = self.config.trader(trader)?;
        let dialogue = trader_config
            .dialogue
            .as_ref()
            .ok_or_else(|| ConfigurationGap::MissingDialogue { trader: trader.clone() })?;

        let templates = if location_name.eq_ignore_ascii_case(LABS_LOCATION)
            && !dialogue.insurance_failed_labs.is_empty()
        {
            &dialogue.insurance_failed_labs
        } else {
            &dialogue.insurance_failed
        };

        Ok(Mail {
            player_id: player.clone(),
            trader_id: trader.clone(),
            content: MessageContent {
                template_id: pick_template(templates, &mut self.rng, trader)?,
                message_type: MessageType::NpcTrader,
                max_storage_time: trader_config.max_storage_time_seconds(),
                system_data: None,
            },
            items: Vec::new(),
            scheduled_time: None,
        })
    }
}

fn transition(player: &PlayerId, from: DispatchState, to: DispatchState) {
    tracing::debug!(%player, ?from, ?to, "insurance dispatch state");
}

fn pick_template(
    templates: &[String],
    rng: &mut ChaCha20Rng,
    trader: &TraderId,
) -> Result<String, ConfigurationGap> {
    templates
        .choose(rng)
        .cloned()
        .ok_or_else(|| ConfigurationGap::MissingDialogue { trader: trader.clone() })
}

fn system_data(now: Timestamp, location_name: &str) -> SystemData {
    let at = chrono::DateTime::from_timestamp(now.0 as i64, 0).unwrap_or_default();
    SystemData {
        date: at.format("%Y-%m-%d").to_string(),
        time: at.format("%H:%M:%S").to_string(),
        location: location_name.to_string(),
    }
}
