//! Session module: build policy, watch mode, and collaborators.

mod assets;
mod notify;
mod runner;
mod state;
mod watch;

pub use assets::*;
pub use notify::*;
pub use runner::*;
pub use state::*;
pub use watch::*;
