//! # filestore-core
//!
//! Core crate for the filestore backend. Contains configuration schemas,
//! the domain events emitted by the storage and database layers, and the
//! unified error system.
//!
//! This crate has **no** internal dependencies on other filestore crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
