pub mod error;
pub mod period;
pub mod query;
pub mod repo;
pub mod service;
pub mod subscription;
