use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use super::{signals::evaluate_crossover, Action, Decision, Heartbeat, RestorationReconciler, Strategy};
use crate::config::StrategyConfig;
use crate::error::StrategyError;
use crate::execution::{calculate_position_size, Account, ExecutionSink, Executor, PositionBook};
use crate::models::{
    BrokerPositionEvent, IndicatorReading, IndicatorUpdate, Instrument, PositionUpdate,
    PositionUpdateKind, PriceUpdate, Signal,
};

/// Per-instrument state owned by the strategy
#[derive(Debug)]
struct InstrumentState {
    instrument: Instrument,
    last_price: Option<i64>,
    reading: IndicatorReading,
    heartbeat: Heartbeat,
    blocked: bool,
}

/// Moving-average trend strategy
///
/// Buys when the last price is above the moving average and closes when it
/// falls below, holding at most one position per instrument. Each position is
/// sized as a fixed share of the account cash balance, rounded down to whole
/// lots.
///
/// Positions already held at the broker on startup are adopted through
/// `on_restore_event` so the rule keeps managing them.
pub struct MovingAverageStrategy<A, E> {
    name: String,
    config: StrategyConfig,
    account: A,
    executor: Executor<E>,
    positions: PositionBook,
    instruments: HashMap<String, InstrumentState>,
    reconciler: RestorationReconciler,
}

impl<A: Account, E: ExecutionSink> MovingAverageStrategy<A, E> {
    pub fn new(name: impl Into<String>, config: StrategyConfig, account: A, sink: E) -> Self {
        let executor = Executor::new(
            sink,
            config.open_order_params.clone(),
            config.close_order_params.clone(),
        );
        Self {
            name: name.into(),
            config,
            account,
            executor,
            positions: PositionBook::new(),
            instruments: HashMap::new(),
            reconciler: RestorationReconciler::new(),
        }
    }

    /// Start tracking an instrument. Returns false if it was already registered.
    pub fn register_instrument(&mut self, instrument: Instrument) -> bool {
        if self.instruments.contains_key(instrument.symbol()) {
            return false;
        }

        tracing::info!(
            strategy = %self.name,
            symbol = %instrument.symbol(),
            "Tracking instrument"
        );

        let heartbeat = Heartbeat::new(self.config.heartbeat_interval());
        self.instruments.insert(
            instrument.symbol().to_string(),
            InstrumentState {
                instrument,
                last_price: None,
                reading: IndicatorReading::Empty,
                heartbeat,
                blocked: false,
            },
        );
        true
    }

    pub fn positions(&self) -> &PositionBook {
        &self.positions
    }

    pub fn is_blocked(&self, symbol: &str) -> bool {
        self.instruments.get(symbol).is_some_and(|s| s.blocked)
    }

    /// Time of the last heartbeat or order for the instrument
    pub fn last_heartbeat(&self, symbol: &str) -> Option<DateTime<Utc>> {
        self.instruments
            .get(symbol)
            .and_then(|s| s.heartbeat.last_beat())
    }

    fn active_state_mut(&mut self, symbol: &str) -> Result<&mut InstrumentState, StrategyError> {
        let state = self
            .instruments
            .get_mut(symbol)
            .ok_or_else(|| StrategyError::UnknownInstrument(symbol.to_string()))?;
        if state.blocked {
            return Err(StrategyError::InstrumentBlocked(symbol.to_string()));
        }
        Ok(state)
    }

    /// Stop processing an instrument after a logic fault
    fn block(&mut self, symbol: &str, error: &StrategyError) {
        tracing::error!(
            strategy = %self.name,
            symbol = %symbol,
            "Blocking instrument: {}",
            error
        );
        if let Some(state) = self.instruments.get_mut(symbol) {
            state.blocked = true;
        }
    }

    /// Run the crossover rule against the latest price and average
    fn evaluate(&mut self, symbol: &str, now: DateTime<Utc>) -> Result<Decision, StrategyError> {
        let cash_balance = self.account.cash_balance();
        let Self {
            name,
            config,
            executor,
            positions,
            instruments,
            ..
        } = self;

        let state = instruments
            .get_mut(symbol)
            .ok_or_else(|| StrategyError::UnknownInstrument(symbol.to_string()))?;

        if state.heartbeat.poll(now) {
            let price = state
                .last_price
                .map(|p| state.instrument.descale_price(p).to_string())
                .unwrap_or_else(|| "none".to_string());
            let average = state
                .reading
                .raw_value()
                .map(|v| state.instrument.descale_price(v).to_string())
                .unwrap_or_else(|| "none".to_string());
            tracing::debug!(
                strategy = %name,
                symbol = %symbol,
                price = %price,
                ma = %average,
                cash = %cash_balance,
                "Ping"
            );
        }

        let Some(last_price) = state.last_price else {
            return Ok(Decision::no_action("No price yet"));
        };

        let signal = evaluate_crossover(
            last_price,
            &state.reading,
            positions.get(symbol),
            config,
        );

        match signal {
            Signal::Hold => Ok(Decision::no_action(hold_reason(
                &state.reading,
                positions.get(symbol).map(|p| (p.is_opened(), p.has_active_close_order)),
            ))),

            Signal::Enter(direction) => {
                let descaled_price = state.instrument.descale_price(last_price);
                let quantity = calculate_position_size(
                    cash_balance,
                    config.allocation_fraction,
                    descaled_price,
                    config.lot_size,
                );

                if quantity == 0 {
                    tracing::warn!(
                        strategy = %name,
                        symbol = %symbol,
                        price = %descaled_price,
                        cash = %cash_balance,
                        "Skipping {} entry: position size rounds to zero lots",
                        direction
                    );
                    return Ok(Decision::no_action("Position size rounds to zero"));
                }

                let average = state.reading.raw_value().unwrap_or_default();
                let position_id = positions.open_position(symbol, direction, quantity, last_price)?;
                let position = positions
                    .get(symbol)
                    .ok_or(StrategyError::UnknownPosition(position_id))?;

                if let Err(e) = executor.open_at_market_price(position) {
                    tracing::warn!(
                        strategy = %name,
                        symbol = %symbol,
                        "Failed to submit open order: {}",
                        e
                    );
                    positions.cancel_open(symbol, position_id)?;
                    return Ok(Decision::no_action(format!("Open order not submitted: {}", e)));
                }

                tracing::info!(
                    strategy = %name,
                    "Opening {} {} position: last price {} vs moving average {} (qty: {}, cash: {})",
                    symbol,
                    direction,
                    descaled_price,
                    state.instrument.descale_price(average),
                    quantity,
                    cash_balance
                );
                state.heartbeat.touch(now);

                Ok(Decision {
                    action: Action::Open {
                        position_id,
                        direction,
                        quantity,
                    },
                    reason: format!("{} entry: price crossed the moving average", direction),
                })
            }

            Signal::Exit => {
                let position_id = positions
                    .get(symbol)
                    .map(|p| p.id)
                    .ok_or_else(|| StrategyError::UnknownInstrument(symbol.to_string()))?;
                positions.request_close(symbol, position_id)?;
                let position = positions
                    .get(symbol)
                    .ok_or(StrategyError::UnknownPosition(position_id))?;

                if let Err(e) = executor.close_at_market_price(position) {
                    tracing::warn!(
                        strategy = %name,
                        symbol = %symbol,
                        "Failed to submit close order: {}",
                        e
                    );
                    positions.cancel_close(symbol, position_id)?;
                    return Ok(Decision::no_action(format!("Close order not submitted: {}", e)));
                }

                tracing::info!(
                    strategy = %name,
                    "Closing {} {} position: last price {} vs moving average {}",
                    symbol,
                    position.direction,
                    state.instrument.descale_price(last_price),
                    state
                        .instrument
                        .descale_price(state.reading.raw_value().unwrap_or_default())
                );
                state.heartbeat.touch(now);

                Ok(Decision {
                    action: Action::Close { position_id },
                    reason: "Exit: price crossed back through the moving average".to_string(),
                })
            }
        }
    }

    /// Evaluate and block the instrument if the position invariant breaks
    fn evaluate_guarded(&mut self, symbol: &str, now: DateTime<Utc>) -> Result<Decision, StrategyError> {
        match self.evaluate(symbol, now) {
            Err(e @ StrategyError::PositionInvariant { .. }) => {
                self.block(symbol, &e);
                Err(e)
            }
            other => other,
        }
    }
}

fn hold_reason(reading: &IndicatorReading, position: Option<(bool, bool)>) -> &'static str {
    if reading.is_empty() {
        return "Moving average not ready";
    }
    match position {
        None => "Price not across the moving average",
        Some((false, _)) => "Position is not opened yet",
        Some((true, true)) => "Close order already active",
        Some((true, false)) => "Position still on the right side of the moving average",
    }
}

impl<A: Account, E: ExecutionSink> Strategy for MovingAverageStrategy<A, E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_price_update(&mut self, update: &PriceUpdate) -> Result<Decision, StrategyError> {
        let state = self.active_state_mut(&update.symbol)?;
        state.last_price = Some(update.price);
        self.evaluate_guarded(&update.symbol, update.time)
    }

    fn on_indicator_update(&mut self, update: &IndicatorUpdate) -> Result<Decision, StrategyError> {
        let state = self.active_state_mut(&update.symbol)?;
        state.reading = update.reading;
        self.evaluate_guarded(&update.symbol, update.time)
    }

    fn on_restore_event(
        &mut self,
        event: &BrokerPositionEvent,
    ) -> Result<Option<Uuid>, StrategyError> {
        // Live reports are ignored even for unknown or blocked instruments
        if event.is_initial {
            self.active_state_mut(&event.symbol)?;
        }

        match self.reconciler.reconcile(&mut self.positions, event) {
            Err(e @ StrategyError::PositionInvariant { .. }) => {
                self.block(&event.symbol, &e);
                Err(e)
            }
            other => other,
        }
    }

    fn on_position_update(&mut self, update: &PositionUpdate) -> Result<(), StrategyError> {
        self.active_state_mut(&update.symbol)?;
        let symbol = update.symbol.as_str();
        let id = update.position_id;

        match &update.kind {
            PositionUpdateKind::OpenFilled { price } => {
                let position = self.positions.mark_opened(symbol, id, *price, update.time)?;
                tracing::info!(
                    strategy = %self.name,
                    "Opened {} {} position {} (qty: {})",
                    symbol,
                    position.direction,
                    id,
                    position.quantity
                );
            }
            PositionUpdateKind::OpenRejected { reason } => {
                self.positions.cancel_open(symbol, id)?;
                tracing::warn!(
                    strategy = %self.name,
                    "Open order for {} position {} rejected: {}",
                    symbol,
                    id,
                    reason
                );
            }
            PositionUpdateKind::CloseFilled { price } => {
                let position = self.positions.close_position(symbol, id, *price, update.time)?;
                tracing::info!(
                    strategy = %self.name,
                    "Closed {} {} position {} (qty: {}, entry: {}, exit: {})",
                    symbol,
                    position.direction,
                    id,
                    position.quantity,
                    position.entry_price,
                    price
                );
            }
            PositionUpdateKind::CloseRejected { reason } => {
                self.positions.cancel_close(symbol, id)?;
                tracing::warn!(
                    strategy = %self.name,
                    "Close order for {} position {} rejected: {}",
                    symbol,
                    id,
                    reason
                );
            }
        }

        Ok(())
    }
}
