//! Gmail Send MCP Server Library
//!
//! A Model Context Protocol (MCP) server focused on sending email through
//! the Gmail API, with sliding-window rate limiting protecting the account
//! from abuse.

pub mod config;
pub mod error;
pub mod gmail;
pub mod mcp;
pub mod ratelimit;

pub use config::Config;
pub use error::{GmailSendError, Result};
pub use ratelimit::{RateLimiter, SendLimits};
