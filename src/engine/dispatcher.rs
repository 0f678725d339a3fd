use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

use crate::error::StrategyError;
use crate::models::{BrokerPositionEvent, IndicatorUpdate, PositionUpdate, PriceUpdate};
use crate::strategy::{Decision, Strategy};

/// Everything the surrounding engine can deliver to a strategy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Price(PriceUpdate),
    Indicator(IndicatorUpdate),
    BrokerPosition(BrokerPositionEvent),
    Position(PositionUpdate),
}

impl Event {
    pub fn symbol(&self) -> &str {
        match self {
            Self::Price(e) => &e.symbol,
            Self::Indicator(e) => &e.symbol,
            Self::BrokerPosition(e) => &e.symbol,
            Self::Position(e) => &e.symbol,
        }
    }

    fn is_market_data(&self) -> bool {
        matches!(self, Self::Price(_) | Self::Indicator(_))
    }
}

#[derive(Debug, Clone)]
pub enum EventOutcome {
    /// Held back until restoration finishes
    Queued,
    Decision(Decision),
    Restored(Option<Uuid>),
    PositionUpdated,
}

/// Feeds events to a strategy one at a time
///
/// Starts in the restoring phase: broker snapshot and lifecycle events go
/// straight through, market data is queued. `finish_restoration` replays the
/// queue in arrival order and from then on market data is delivered directly.
pub struct Dispatcher<S> {
    strategy: S,
    restoring: bool,
    pending: VecDeque<Event>,
}

impl<S: Strategy> Dispatcher<S> {
    pub fn new(strategy: S) -> Self {
        Self {
            strategy,
            restoring: true,
            pending: VecDeque::new(),
        }
    }

    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn handle(&mut self, event: Event) -> Result<EventOutcome, StrategyError> {
        if self.restoring && event.is_market_data() {
            self.pending.push_back(event);
            return Ok(EventOutcome::Queued);
        }
        self.deliver(&event)
    }

    /// Leave the restoring phase and replay queued market data
    ///
    /// A failing event does not stop the replay; every outcome is returned in order.
    pub fn finish_restoration(&mut self) -> Vec<Result<EventOutcome, StrategyError>> {
        if !self.restoring {
            return Vec::new();
        }
        self.restoring = false;

        tracing::info!(
            strategy = %self.strategy.name(),
            queued = self.pending.len(),
            "Position restoration finished, starting signal processing"
        );

        let pending = std::mem::take(&mut self.pending);
        pending.iter().map(|event| self.deliver(event)).collect()
    }

    fn deliver(&mut self, event: &Event) -> Result<EventOutcome, StrategyError> {
        let outcome = match event {
            Event::Price(update) => EventOutcome::Decision(self.strategy.on_price_update(update)?),
            Event::Indicator(update) => {
                EventOutcome::Decision(self.strategy.on_indicator_update(update)?)
            }
            Event::BrokerPosition(report) => {
                EventOutcome::Restored(self.strategy.on_restore_event(report)?)
            }
            Event::Position(update) => {
                self.strategy.on_position_update(update)?;
                EventOutcome::PositionUpdated
            }
        };
        Ok(outcome)
    }
}
