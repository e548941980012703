// === PUBLIC CONTRACT ===
// Other modules consume subscriptions only through the contract.
pub mod contract;
pub use contract::{client, error, model};

// === MODULE DEFINITION ===
pub mod module;
pub use module::Subscriptions;

// === INTERNAL MODULES ===
// Exposed for integration tests; not a stable API.
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod gateways;
#[doc(hidden)]
pub mod infra;
