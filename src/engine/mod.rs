// 11.0: protection engine. coordinates deposits, removals with compensation,
// locked balance claims and the protocol's own pool token holdings.
// deterministic, every operation is atomic and no external I/O happens here.

mod add;
mod claim;
mod config;
mod core;
mod remove;
mod results;

pub use config::EngineConfig;
pub use core::{Collaborators, Engine};
pub use results::{EngineError, RemoveOutcome, RemoveReturn};
