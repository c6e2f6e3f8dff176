
#[cfg(test)]
macro_rules! assert_approx {
    ($real:expr, $expected:expr, $delta:expr) => {
	if $real < $expected - $delta || $real > $expected + $delta {
	    panic!( "Violate {:.4} == {:.4} (+-{:.4})", $real, $expected, $delta );
	}
    }
}

pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod miner;
pub mod model;
pub mod predict;

use tracing::*;

pub use config::{Exactness, MiningParameters};
pub use data::{AttributeId, AttributeTable, Count, Instance, Label, Value};
pub use error::MineError;
pub use miner::{DepthFirstMiner, MinedRules, Miner};
pub use model::{Rule, RuleStore};

/// Objects that can be recorded in the log
pub trait Loggable {
    fn log( &self, message: &str, level: tracing::Level );
}

/// Emits the message at a level chosen at runtime
pub fn log_at( level: Level, message: &str ) {
    if level == Level::ERROR { error!( "{message}" ) }
    else if level == Level::WARN { warn!( "{message}" ) }
    else if level == Level::INFO { info!( "{message}" ) }
    else if level == Level::DEBUG { debug!( "{message}" ) }
    else { trace!( "{message}" ) }
}
