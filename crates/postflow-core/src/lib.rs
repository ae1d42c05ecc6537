//! # Postflow Core
//!
//! The domain layer of Postflow: posts, the deferred tweet job payload,
//! validation, and the ports that infrastructure implements.
//! This crate has no infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod ports;
pub mod validation;

pub use error::DomainError;
pub use validation::ValidationErrors;
