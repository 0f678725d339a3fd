use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the decision layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    /// More than one non-closed position was about to exist for an instrument.
    /// The instrument is blocked after this.
    #[error("position invariant violated for {symbol}: {details}")]
    PositionInvariant { symbol: String, details: String },

    #[error("instrument {0} is blocked after an invariant violation")]
    InstrumentBlocked(String),

    #[error("instrument {0} is not registered with the strategy")]
    UnknownInstrument(String),

    #[error("position {0} not found")]
    UnknownPosition(Uuid),

    #[error("invalid position transition for {id}: {details}")]
    InvalidTransition { id: Uuid, details: String },
}

/// Errors raised while handing an order request to the execution collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("execution channel closed")]
    ChannelClosed,

    #[error("order rejected by execution engine: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
