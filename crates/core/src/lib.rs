#![deny(unused)]
//! Core types, traits, and error definitions for the consultation engine.
//!
//! This crate provides the building blocks shared by the model gateway,
//! the request gateway and the telemetry layer.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::*;
pub use types::*;
