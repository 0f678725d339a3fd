// Event routing between the surrounding engine and a strategy
pub mod dispatcher;

pub use dispatcher::{Dispatcher, Event, EventOutcome};
