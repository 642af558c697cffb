// 9.0: every committed state change produces an event. used for audit trails and
// notifying external systems. the EventPayload enum lists all event types.
// events of a failed operation are dropped together with its state changes.

use crate::types::{serde_u256, AccountId, Amount, PositionId, Ppm, Timestamp, TokenId};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    // Position events
    LiquidityAdded(LiquidityAddedEvent),
    LiquidityRemoved(LiquidityRemovedEvent),
    LiquidityUnprotected(LiquidityUnprotectedEvent),

    // Locked balance events
    BalanceLocked(BalanceLockedEvent),
    BalancesClaimed(BalancesClaimedEvent),

    // Supply events
    NetworkTokensMinted(NetworkTokensEvent),
    NetworkTokensBurned(NetworkTokensEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityAddedEvent {
    pub position_id: PositionId,
    pub provider: AccountId,
    pub pool: TokenId,
    pub reserve: TokenId,
    #[serde(with = "serde_u256")]
    pub pool_amount: Amount,
    #[serde(with = "serde_u256")]
    pub reserve_amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityRemovedEvent {
    pub position_id: PositionId,
    pub provider: AccountId,
    pub pool: TokenId,
    pub reserve: TokenId,
    pub portion: Ppm,
    #[serde(with = "serde_u256")]
    pub pool_amount: Amount,
    #[serde(with = "serde_u256")]
    pub reserve_amount: Amount,
    #[serde(with = "serde_u256")]
    pub target_amount: Amount,
    // reserve tokens paid out immediately
    #[serde(with = "serde_u256")]
    pub paid_amount: Amount,
    // network tokens placed under lock
    #[serde(with = "serde_u256")]
    pub locked_amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityUnprotectedEvent {
    pub provider: AccountId,
    pub pool: TokenId,
    pub position_ids: (PositionId, PositionId),
    #[serde(with = "serde_u256")]
    pub pool_amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceLockedEvent {
    pub provider: AccountId,
    #[serde(with = "serde_u256")]
    pub amount: Amount,
    pub expiration_time: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancesClaimedEvent {
    pub provider: AccountId,
    pub count: usize,
    #[serde(with = "serde_u256")]
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkTokensEvent {
    pub pool: TokenId,
    #[serde(with = "serde_u256")]
    pub amount: Amount,
}

/// What a subscriber learns about a position change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityNotice {
    pub position_id: PositionId,
    pub provider: AccountId,
    pub pool: TokenId,
    pub reserve: TokenId,
    pub pool_amount: Amount,
    pub reserve_amount: Amount,
}

/// External listener (rewards, analytics). Called only after the operation
/// committed, so a subscriber never observes state that is later rolled back.
pub trait LiquidityEventSubscriber: Debug {
    fn on_adding_liquidity(&mut self, notice: &LiquidityNotice);

    fn on_removing_liquidity(&mut self, notice: &LiquidityNotice);
}

// lets the caller keep a handle on a subscriber it hands to the engine
impl<T: LiquidityEventSubscriber> LiquidityEventSubscriber for Rc<RefCell<T>> {
    fn on_adding_liquidity(&mut self, notice: &LiquidityNotice) {
        self.borrow_mut().on_adding_liquidity(notice);
    }

    fn on_removing_liquidity(&mut self, notice: &LiquidityNotice) {
        self.borrow_mut().on_removing_liquidity(notice);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    Adding(LiquidityNotice),
    Removing(LiquidityNotice),
}

impl Notification {
    pub fn deliver(&self, subscriber: &mut dyn LiquidityEventSubscriber) {
        match self {
            Notification::Adding(notice) => subscriber.on_adding_liquidity(notice),
            Notification::Removing(notice) => subscriber.on_removing_liquidity(notice),
        }
    }
}

/// Bounded audit log. The oldest events are dropped past `max_events`.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: Vec<Event>,
    next_id: u64,
    max_events: usize,
}

impl EventLog {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
            max_events,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn emit(&mut self, timestamp: Timestamp, payload: EventPayload) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.events.push(Event::new(id, timestamp, payload));

        if self.events.len() > self.max_events {
            let excess = self.events.len() - self.max_events;
            self.events.drain(..excess);
        }
        id
    }
}

/// Subscriber that remembers every notice. Handy for tests and the simulator.
#[derive(Debug, Default)]
pub struct RecordingSubscriber {
    pub added: Vec<LiquidityNotice>,
    pub removed: Vec<LiquidityNotice>,
}

impl LiquidityEventSubscriber for RecordingSubscriber {
    fn on_adding_liquidity(&mut self, notice: &LiquidityNotice) {
        self.added.push(*notice);
    }

    fn on_removing_liquidity(&mut self, notice: &LiquidityNotice) {
        self.removed.push(*notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::U256;

    fn burned(amount: u64) -> EventPayload {
        EventPayload::NetworkTokensBurned(NetworkTokensEvent {
            pool: TokenId(10),
            amount: U256::from(amount),
        })
    }

    #[test]
    fn log_is_bounded() {
        let mut log = EventLog::new(2);
        for i in 0..5 {
            log.emit(Timestamp::from_secs(i), burned(i));
        }
        assert_eq!(log.events().len(), 2);
        assert_eq!(log.events()[0].id, EventId(4));
        assert_eq!(log.recent(1)[0].id, EventId(5));
    }

    #[test]
    fn events_serialize_amounts_as_strings() {
        let event = Event::new(EventId(1), Timestamp::from_secs(0), burned(500));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"500\""));

        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn notifications_reach_subscriber() {
        let notice = LiquidityNotice {
            position_id: PositionId(1),
            provider: AccountId(7),
            pool: TokenId(10),
            reserve: TokenId(3),
            pool_amount: U256::from(353u64),
            reserve_amount: U256::from(1_000u64),
        };
        let mut subscriber = RecordingSubscriber::default();
        Notification::Adding(notice).deliver(&mut subscriber);
        Notification::Removing(notice).deliver(&mut subscriber);

        assert_eq!(subscriber.added, vec![notice]);
        assert_eq!(subscriber.removed, vec![notice]);
    }
}
