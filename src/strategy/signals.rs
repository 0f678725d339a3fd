use crate::config::StrategyConfig;
use crate::execution::Position;
use crate::models::{Direction, IndicatorReading, Signal};

/// Apply the price / moving-average crossover rule
///
/// Prices and the average are compared in raw units.
///
/// Without a position: enter long when price is above the average; with
/// `allow_short`, enter short when price is below it. Equal prices never enter.
///
/// With a position: hold while it is still opening or a close order is in
/// flight. Otherwise exit when price drops below the average, whatever the
/// direction. With `mirror_short_exit`, a short exits when price rises above
/// the average instead.
pub fn evaluate_crossover(
    last_price: i64,
    reading: &IndicatorReading,
    position: Option<&Position>,
    config: &StrategyConfig,
) -> Signal {
    let Some(average) = reading.raw_value() else {
        return Signal::Hold;
    };

    match position {
        None => {
            if last_price > average {
                Signal::Enter(Direction::Long)
            } else if config.allow_short && last_price < average {
                Signal::Enter(Direction::Short)
            } else {
                Signal::Hold
            }
        }
        Some(position) => {
            if !position.is_opened() || position.has_active_close_order {
                return Signal::Hold;
            }
            let crossed = match position.direction {
                Direction::Short if config.mirror_short_exit => last_price > average,
                _ => last_price < average,
            };
            if crossed {
                Signal::Exit
            } else {
                Signal::Hold
            }
        }
    }
}
