//! Core building blocks shared by the client and the tool agents

pub mod rate_limiter;
pub mod types;
