//! Shared REST plumbing for modules.

pub mod problem;
