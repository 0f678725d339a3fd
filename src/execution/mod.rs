// Position bookkeeping and order hand-off
pub mod account;
pub mod executor;
pub mod position_manager;
pub mod sink;

pub use account::{Account, SharedAccount};
pub use executor::{calculate_position_size, Executor};
pub use position_manager::{Position, PositionBook, PositionStatus};
pub use sink::{ChannelSink, ExecutionSink};
