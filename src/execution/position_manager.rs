use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::StrategyError;
use crate::models::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    /// Open order submitted, waiting for the fill
    Opening,
    Open,
    Closed,
}

#[derive(Debug, Clone)]
pub struct Position {
    pub id: Uuid,
    pub symbol: String,
    pub direction: Direction,
    pub quantity: u64,
    pub entry_price: i64, // Raw price; 0 when restored from the broker
    pub entry_time: Option<DateTime<Utc>>,
    pub status: PositionStatus,
    pub has_active_close_order: bool,
    pub restored: bool, // Adopted from an existing broker position, no order was sent
    pub exit_price: Option<i64>,
    pub exit_time: Option<DateTime<Utc>>,
}

impl Position {
    fn new(symbol: String, direction: Direction, quantity: u64, entry_price: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol,
            direction,
            quantity,
            entry_price,
            entry_time: None,
            status: PositionStatus::Opening,
            has_active_close_order: false,
            restored: false,
            exit_price: None,
            exit_time: None,
        }
    }

    pub fn is_opened(&self) -> bool {
        self.status == PositionStatus::Open
    }
}

/// Non-closed positions keyed by instrument symbol
///
/// The map holds at most one position per symbol, so the
/// one-position-per-instrument rule cannot be broken by construction. Closing
/// a position removes it from the book and hands it back to the caller.
#[derive(Debug, Default)]
pub struct PositionBook {
    positions: HashMap<String, Position>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-closed position for the symbol
    pub fn get(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    /// Number of non-closed positions for the symbol (0 or 1)
    pub fn count(&self, symbol: &str) -> usize {
        usize::from(self.positions.contains_key(symbol))
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Track a position whose open order is about to be submitted
    pub fn open_position(
        &mut self,
        symbol: &str,
        direction: Direction,
        quantity: u64,
        requested_price: i64,
    ) -> Result<Uuid, StrategyError> {
        self.ensure_vacant(symbol)?;

        let position = Position::new(symbol.to_string(), direction, quantity, requested_price);
        let id = position.id;
        self.positions.insert(symbol.to_string(), position);
        Ok(id)
    }

    /// Adopt a position that already exists at the broker
    pub fn restore_position(
        &mut self,
        symbol: &str,
        direction: Direction,
        quantity: u64,
    ) -> Result<Uuid, StrategyError> {
        self.ensure_vacant(symbol)?;

        let mut position = Position::new(symbol.to_string(), direction, quantity, 0);
        position.status = PositionStatus::Open;
        position.restored = true;
        let id = position.id;
        self.positions.insert(symbol.to_string(), position);
        Ok(id)
    }

    /// Open order filled
    pub fn mark_opened(
        &mut self,
        symbol: &str,
        position_id: Uuid,
        fill_price: i64,
        time: DateTime<Utc>,
    ) -> Result<&Position, StrategyError> {
        let position = self.get_position_mut(symbol, position_id)?;
        if position.status != PositionStatus::Opening {
            return Err(StrategyError::InvalidTransition {
                id: position_id,
                details: format!("open fill for position in state {:?}", position.status),
            });
        }

        position.status = PositionStatus::Open;
        position.entry_price = fill_price;
        position.entry_time = Some(time);
        Ok(&*position)
    }

    /// Open order rejected or failed before reaching the broker; frees the slot
    pub fn cancel_open(&mut self, symbol: &str, position_id: Uuid) -> Result<Position, StrategyError> {
        let position = self.get_position(symbol, position_id)?;
        if position.status != PositionStatus::Opening {
            return Err(StrategyError::InvalidTransition {
                id: position_id,
                details: format!("open rejection for position in state {:?}", position.status),
            });
        }
        self.take(symbol)
    }

    /// Flag the position as having a close order in flight
    pub fn request_close(&mut self, symbol: &str, position_id: Uuid) -> Result<(), StrategyError> {
        let position = self.get_position_mut(symbol, position_id)?;
        if !position.is_opened() || position.has_active_close_order {
            return Err(StrategyError::InvalidTransition {
                id: position_id,
                details: format!(
                    "close request for position in state {:?} (close order active: {})",
                    position.status, position.has_active_close_order
                ),
            });
        }
        position.has_active_close_order = true;
        Ok(())
    }

    /// Close order rejected; the position becomes eligible for a new close request
    pub fn cancel_close(&mut self, symbol: &str, position_id: Uuid) -> Result<(), StrategyError> {
        let position = self.get_position_mut(symbol, position_id)?;
        if !position.has_active_close_order {
            return Err(StrategyError::InvalidTransition {
                id: position_id,
                details: "close rejection without an active close order".to_string(),
            });
        }
        position.has_active_close_order = false;
        Ok(())
    }

    /// Close order filled; removes the position from the book
    pub fn close_position(
        &mut self,
        symbol: &str,
        position_id: Uuid,
        exit_price: i64,
        time: DateTime<Utc>,
    ) -> Result<Position, StrategyError> {
        let position = self.get_position(symbol, position_id)?;
        if !position.is_opened() {
            return Err(StrategyError::InvalidTransition {
                id: position_id,
                details: format!("close fill for position in state {:?}", position.status),
            });
        }

        let mut position = self.take(symbol)?;
        position.status = PositionStatus::Closed;
        position.has_active_close_order = false;
        position.exit_price = Some(exit_price);
        position.exit_time = Some(time);
        Ok(position)
    }

    fn ensure_vacant(&self, symbol: &str) -> Result<(), StrategyError> {
        match self.positions.get(symbol) {
            Some(existing) => Err(StrategyError::PositionInvariant {
                symbol: symbol.to_string(),
                details: format!(
                    "already holding {} {} position {} ({:?})",
                    existing.direction, existing.quantity, existing.id, existing.status
                ),
            }),
            None => Ok(()),
        }
    }

    fn take(&mut self, symbol: &str) -> Result<Position, StrategyError> {
        self.positions
            .remove(symbol)
            .ok_or_else(|| StrategyError::UnknownInstrument(symbol.to_string()))
    }

    fn get_position(&self, symbol: &str, position_id: Uuid) -> Result<&Position, StrategyError> {
        self.positions
            .get(symbol)
            .filter(|p| p.id == position_id)
            .ok_or(StrategyError::UnknownPosition(position_id))
    }

    fn get_position_mut(
        &mut self,
        symbol: &str,
        position_id: Uuid,
    ) -> Result<&mut Position, StrategyError> {
        self.positions
            .get_mut(symbol)
            .filter(|p| p.id == position_id)
            .ok_or(StrategyError::UnknownPosition(position_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_position() {
        let mut book = PositionBook::new();
        let id = book.open_position("AAPL", Direction::Long, 100, 3730).unwrap();

        assert!(book.has_position("AAPL"));
        assert_eq!(book.count("AAPL"), 1);

        let position = book.get("AAPL").unwrap();
        assert_eq!(position.id, id);
        assert_eq!(position.direction, Direction::Long);
        assert_eq!(position.quantity, 100);
        assert_eq!(position.entry_price, 3730);
        assert_eq!(position.status, PositionStatus::Opening);
        assert!(!position.is_opened());
        assert!(!position.restored);
    }

    #[test]
    fn test_second_position_violates_invariant() {
        let mut book = PositionBook::new();
        book.open_position("AAPL", Direction::Long, 100, 3730).unwrap();

        let result = book.open_position("AAPL", Direction::Long, 100, 3800);
        assert!(matches!(result, Err(StrategyError::PositionInvariant { .. })));
        assert_eq!(book.count("AAPL"), 1);

        let result = book.restore_position("AAPL", Direction::Short, 50);
        assert!(matches!(result, Err(StrategyError::PositionInvariant { .. })));
    }

    #[test]
    fn test_positions_are_per_symbol() {
        let mut book = PositionBook::new();
        book.open_position("AAPL", Direction::Long, 100, 3730).unwrap();
        book.open_position("MSFT", Direction::Long, 200, 4100).unwrap();

        assert_eq!(book.len(), 2);
        assert_eq!(book.count("AAPL"), 1);
        assert_eq!(book.count("MSFT"), 1);
        assert_eq!(book.count("TSLA"), 0);
    }

    #[test]
    fn test_restore_position_is_open() {
        let mut book = PositionBook::new();
        let id = book.restore_position("AAPL", Direction::Short, 50).unwrap();

        let position = book.get("AAPL").unwrap();
        assert_eq!(position.id, id);
        assert!(position.is_opened());
        assert!(position.restored);
        assert_eq!(position.entry_price, 0);
        assert_eq!(position.quantity, 50);
    }

    #[test]
    fn test_full_lifecycle() {
        let mut book = PositionBook::new();
        let id = book.open_position("AAPL", Direction::Long, 100, 3730).unwrap();

        let opened = book.mark_opened("AAPL", id, 3731, Utc::now()).unwrap();
        assert!(opened.is_opened());
        assert_eq!(opened.entry_price, 3731);

        book.request_close("AAPL", id).unwrap();
        assert!(book.get("AAPL").unwrap().has_active_close_order);

        // Second close request is refused while one is in flight
        assert!(book.request_close("AAPL", id).is_err());

        let closed = book.close_position("AAPL", id, 3650, Utc::now()).unwrap();
        assert_eq!(closed.status, PositionStatus::Closed);
        assert_eq!(closed.exit_price, Some(3650));
        assert!(!book.has_position("AAPL"));
    }

    #[test]
    fn test_cancel_close_rearms_position() {
        let mut book = PositionBook::new();
        let id = book.restore_position("AAPL", Direction::Long, 100).unwrap();

        book.request_close("AAPL", id).unwrap();
        book.cancel_close("AAPL", id).unwrap();

        let position = book.get("AAPL").unwrap();
        assert!(!position.has_active_close_order);
        assert!(book.request_close("AAPL", id).is_ok());
    }

    #[test]
    fn test_cancel_open_frees_slot() {
        let mut book = PositionBook::new();
        let id = book.open_position("AAPL", Direction::Long, 100, 3730).unwrap();

        let cancelled = book.cancel_open("AAPL", id).unwrap();
        assert_eq!(cancelled.id, id);
        assert!(!book.has_position("AAPL"));
        assert!(book.open_position("AAPL", Direction::Long, 100, 3730).is_ok());
    }

    #[test]
    fn test_cannot_close_pending_position() {
        let mut book = PositionBook::new();
        let id = book.open_position("AAPL", Direction::Long, 100, 3730).unwrap();

        assert!(book.request_close("AAPL", id).is_err());
        let result = book.close_position("AAPL", id, 3700, Utc::now());
        assert!(matches!(result, Err(StrategyError::InvalidTransition { .. })));
    }

    #[test]
    fn test_unknown_position_id() {
        let mut book = PositionBook::new();
        book.open_position("AAPL", Direction::Long, 100, 3730).unwrap();

        let other = Uuid::new_v4();
        let result = book.mark_opened("AAPL", other, 3730, Utc::now());
        assert_eq!(result.unwrap_err(), StrategyError::UnknownPosition(other));
    }
}
