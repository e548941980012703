//! # ModKit - module wiring for the ledger server
//!
//! A small kit shared by the server and its modules:
//!
//! - **Contracts**: capability traits a module implements (`db`, `rest`, `rest_host`)
//! - **Context**: the per-module view of the DB handle, config section and cancellation
//! - **Problem Details**: RFC 9457 error bodies for REST handlers
//! - **Runtime**: phase runner (init → db → rest → start → wait) and shutdown signals
//!
//! ## Example
//!
//! ```rust,ignore
//! use modkit::{ModuleEntry, RunOptions, ShutdownOptions};
//!
//! let entry = ModuleEntry::new("subscriptions", module.clone())
//!     .with_db(module.clone())
//!     .with_rest(module);
//! ```

pub mod context;
pub use context::{ConfigProvider, ModuleCtx};

// Core module contracts and traits
pub mod contracts;
pub use crate::contracts::*;

pub mod api;
pub use api::problem::{Problem, ProblemResponse, ValidationError};

pub mod runtime;
pub use runtime::{run, ModuleEntry, RunOptions, ShutdownOptions};
