//! Compiler process layer: spawning, output classification, and the
//! compile/post-process pipeline.

mod args;
mod events;
mod pipeline;
mod report;
mod stage;

pub use args::*;
pub use events::*;
pub use pipeline::*;
pub use report::*;
pub use stage::*;
