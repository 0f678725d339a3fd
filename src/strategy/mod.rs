// Trading strategy module
pub mod heartbeat;
pub mod moving_average;
pub mod restoration;
pub mod signals;

use uuid::Uuid;

use crate::error::StrategyError;
use crate::models::{
    BrokerPositionEvent, Direction, IndicatorUpdate, PositionUpdate, PriceUpdate,
};

pub use heartbeat::Heartbeat;
pub use moving_average::MovingAverageStrategy;
pub use restoration::RestorationReconciler;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    NoAction,
    Open {
        position_id: Uuid,
        direction: Direction,
        quantity: u64,
    },
    Close {
        position_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct Decision {
    pub action: Action,
    pub reason: String,
}

impl Decision {
    pub fn no_action(reason: impl Into<String>) -> Self {
        Self {
            action: Action::NoAction,
            reason: reason.into(),
        }
    }
}

/// Callbacks the surrounding engine invokes on a strategy
///
/// Events for one instrument must be delivered one at a time, in order.
pub trait Strategy {
    fn name(&self) -> &str;

    /// New last-trade price; may emit at most one order
    fn on_price_update(&mut self, update: &PriceUpdate) -> Result<Decision, StrategyError>;

    /// New moving-average point; may emit at most one order
    fn on_indicator_update(&mut self, update: &IndicatorUpdate) -> Result<Decision, StrategyError>;

    /// Broker position report. Returns the id of a restored position, if any.
    fn on_restore_event(
        &mut self,
        event: &BrokerPositionEvent,
    ) -> Result<Option<Uuid>, StrategyError>;

    /// Fill or rejection for an order this strategy submitted
    fn on_position_update(&mut self, update: &PositionUpdate) -> Result<(), StrategyError>;
}
