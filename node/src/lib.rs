//! The strand node facade: subsystem wiring, message dispatch, and the
//! deferred-execution alarm.

pub mod alarm;
pub mod config;
pub mod error;
pub mod logging;
pub mod node;
pub mod observers;

pub use alarm::Alarm;
pub use config::{LoggingConfig, NodeConfig, CONFIG_VERSION, KEEPALIVE_PERIOD_SECS};
pub use error::NodeError;
pub use node::{Node, NodeInit};
pub use observers::{NodeObservers, ObserverSet};
