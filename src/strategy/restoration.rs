use uuid::Uuid;

use crate::error::StrategyError;
use crate::execution::PositionBook;
use crate::models::{BrokerPositionEvent, Direction};

/// Rebuilds internal positions from the broker's startup snapshot
///
/// Only snapshot events (`is_initial`) are adopted. Live position changes are
/// handled by the regular fill lifecycle and are ignored here. A restored
/// position is bookkeeping only; no order is submitted for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestorationReconciler;

impl RestorationReconciler {
    pub fn new() -> Self {
        Self
    }

    /// Returns the id of the restored position, or `None` if the event was ignored
    pub fn reconcile(
        &self,
        book: &mut PositionBook,
        event: &BrokerPositionEvent,
    ) -> Result<Option<Uuid>, StrategyError> {
        if !event.is_initial {
            tracing::trace!(
                symbol = %event.symbol,
                quantity = event.quantity,
                "Ignoring live broker position update"
            );
            return Ok(None);
        }

        let Some((direction, quantity)) = Direction::from_signed(event.quantity) else {
            return Ok(None);
        };

        let id = book.restore_position(&event.symbol, direction, quantity)?;

        tracing::info!(
            "Restoring {} position for {} (qty: {})",
            direction,
            event.symbol,
            quantity
        );

        Ok(Some(id))
    }
}
