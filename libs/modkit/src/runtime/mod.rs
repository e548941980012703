mod runner;
pub mod shutdown;

pub use runner::{run, ModuleEntry, RunOptions, ShutdownOptions};
