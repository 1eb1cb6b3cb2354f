//! Core type definitions for the consultation engine.

pub mod message;
pub mod model;
pub mod request;
pub mod result;

pub use message::*;
pub use model::*;
pub use request::*;
pub use result::*;
