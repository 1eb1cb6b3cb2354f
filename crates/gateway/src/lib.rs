#![deny(unused)]
//! Request gateway for the consultation engine.
//!
//! This crate provides the per-request pipeline (rate limiting, response
//! caching, conversation history, orchestration) and its HTTP entry point.

pub mod history;
pub mod orchestrator;
pub mod rate_limit;
pub mod response_cache;
pub mod server;

pub use history::ConversationHistory;
pub use orchestrator::{ConsultationOrchestrator, GLOBAL_RATE_LIMIT_ID};
pub use rate_limit::RateLimiter;
pub use response_cache::ResponseCache;
pub use server::{GatewayConfig, GatewayServer};
