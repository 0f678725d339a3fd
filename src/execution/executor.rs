use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::ExecutionError;
use crate::execution::{ExecutionSink, Position};
use crate::models::{OrderIntent, OrderParams, OrderRequest, PriceMode};

/// Calculate order quantity for a new position
///
/// Target notional is `cash_balance * allocation_fraction`; the share count is
/// `floor(target / price)` rounded down to a whole number of lots.
///
/// # Example
/// ```
/// use rust_decimal::Decimal;
/// use trendbot::execution::calculate_position_size;
///
/// // 5% of 100000 = 5000; 5000 / 37.30 = 134 shares -> 100 in lots of 100
/// let qty = calculate_position_size(
///     Decimal::from(100_000),
///     Decimal::new(5, 2),
///     Decimal::new(3730, 2),
///     100,
/// );
/// assert_eq!(qty, 100);
/// ```
pub fn calculate_position_size(
    cash_balance: Decimal,
    allocation_fraction: Decimal,
    price: Decimal,
    lot_size: u64,
) -> u64 {
    if price <= Decimal::ZERO || cash_balance <= Decimal::ZERO || lot_size == 0 {
        return 0;
    }

    let raw_quantity = cash_balance
        .checked_mul(allocation_fraction)
        .and_then(|target| target.checked_div(price))
        .map(|shares| shares.floor())
        .and_then(|shares| shares.to_u64())
        .unwrap_or(0);

    raw_quantity / lot_size * lot_size
}

/// Builds market orders for positions and hands them to the execution sink
pub struct Executor<E> {
    sink: E,
    open_params: OrderParams,
    close_params: OrderParams,
}

impl<E: ExecutionSink> Executor<E> {
    pub fn new(sink: E, open_params: OrderParams, close_params: OrderParams) -> Self {
        Self {
            sink,
            open_params,
            close_params,
        }
    }

    /// Submit the market order that opens `position`
    pub fn open_at_market_price(&self, position: &Position) -> Result<OrderRequest, ExecutionError> {
        let request = OrderRequest {
            position_id: position.id,
            symbol: position.symbol.clone(),
            intent: OrderIntent::Open,
            side: position.direction.open_side(),
            quantity: position.quantity,
            price: PriceMode::Market,
            params: self.open_params.clone(),
        };
        self.sink.submit(request.clone())?;
        Ok(request)
    }

    /// Submit the market order that closes `position`
    pub fn close_at_market_price(
        &self,
        position: &Position,
    ) -> Result<OrderRequest, ExecutionError> {
        let request = OrderRequest {
            position_id: position.id,
            symbol: position.symbol.clone(),
            intent: OrderIntent::Close,
            side: position.direction.close_side(),
            quantity: position.quantity,
            price: PriceMode::Market,
            params: self.close_params.clone(),
        };
        self.sink.submit(request.clone())?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{ChannelSink, PositionBook};
    use crate::models::{Direction, Side};

    #[test]
    fn test_position_sizing() {
        // 100000 * 5% = 5000; 5000 / 37.30 = 134.05 -> 134 -> 100
        let qty = calculate_position_size(
            Decimal::from(100_000),
            Decimal::new(5, 2),
            Decimal::new(3730, 2),
            100,
        );
        assert_eq!(qty, 100);

        // 5000 / 10.00 = 500 exactly
        let qty = calculate_position_size(
            Decimal::from(100_000),
            Decimal::new(5, 2),
            Decimal::from(10),
            100,
        );
        assert_eq!(qty, 500);
    }

    #[test]
    fn test_position_sizing_rounds_below_one_lot_to_zero() {
        // 10000 * 5% = 500; 500 / 37.30 = 13 shares, less than one lot
        let qty = calculate_position_size(
            Decimal::from(10_000),
            Decimal::new(5, 2),
            Decimal::new(3730, 2),
            100,
        );
        assert_eq!(qty, 0);
    }

    #[test]
    fn test_position_sizing_degenerate_inputs() {
        let cash = Decimal::from(100_000);
        let fraction = Decimal::new(5, 2);

        assert_eq!(calculate_position_size(cash, fraction, Decimal::ZERO, 100), 0);
        assert_eq!(calculate_position_size(cash, fraction, Decimal::from(-5), 100), 0);
        assert_eq!(calculate_position_size(Decimal::ZERO, fraction, Decimal::ONE, 100), 0);
        assert_eq!(calculate_position_size(cash, fraction, Decimal::ONE, 1), 5000);
    }

    #[test]
    fn test_open_and_close_requests() {
        let (sink, mut rx) = ChannelSink::new();
        let open_params = OrderParams::new().with("route", "smart");
        let close_params = OrderParams::new().with("route", "close-only");
        let executor = Executor::new(sink, open_params.clone(), close_params.clone());

        let mut book = PositionBook::new();
        book.restore_position("AAPL", Direction::Short, 50).unwrap();
        let position = book.get("AAPL").unwrap();

        let open = executor.open_at_market_price(position).unwrap();
        assert_eq!(open.side, Side::Sell);
        assert_eq!(open.intent, OrderIntent::Open);
        assert_eq!(open.params, open_params);

        let close = executor.close_at_market_price(position).unwrap();
        assert_eq!(close.side, Side::Buy);
        assert_eq!(close.intent, OrderIntent::Close);
        assert_eq!(close.quantity, 50);
        assert_eq!(close.price, PriceMode::Market);
        assert_eq!(close.params, close_params);

        assert_eq!(rx.try_recv().unwrap(), open);
        assert_eq!(rx.try_recv().unwrap(), close);
    }
}
