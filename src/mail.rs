use serde::{Deserialize, Serialize};

use crate::item::ItemSnapshot;
use crate::types::{PlayerId, Timestamp, TraderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    /// Plain trader chat message, no attachments.
    NpcTrader,
    /// Carries returned insured items.
    InsuranceReturn,
}

/// Extra context rendered into the "found your gear" message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemData {
    pub date: String,
    pub time: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    pub template_id: String,
    pub message_type: MessageType,
    /// Seconds the attachments stay claimable once delivered.
    pub max_storage_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_data: Option<SystemData>,
}

/// A message handed to the delivery system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mail {
    pub player_id: PlayerId,
    pub trader_id: TraderId,
    pub content: MessageContent,
    pub items: Vec<ItemSnapshot>,
    /// `None` means deliver immediately.
    pub scheduled_time: Option<Timestamp>,
}

/// A pending insurance return, stored on the player profile until the
/// delivery scheduler picks it up at `scheduled_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceRecord {
    pub trader_id: TraderId,
    pub scheduled_time: Timestamp,
    pub message_content: MessageContent,
    pub items: Vec<ItemSnapshot>,
}

/// External mail/dialogue delivery.
pub trait MailSender {
    fn send(&mut self, mail: Mail);
}

/// Collects sent mail in memory.
#[derive(Debug, Default)]
pub struct Outbox {
    pub sent: Vec<Mail>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_trader<'a>(&'a self, trader: &'a TraderId) -> impl Iterator<Item = &'a Mail> + 'a {
        self.sent.iter().filter(move |m| &m.trader_id == trader)
    }
}

impl MailSender for Outbox {
    fn send(&mut self, mail: Mail) {
        self.sent.push(mail);
    }
}
