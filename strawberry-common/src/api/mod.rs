//! API module for shared HTTP API functionality
//!
//! Contains only pure functions and shared types. Services wrap these with
//! their own framework-specific handlers.

pub mod auth;
pub mod types;

pub use auth::{calculate_sign, hash_token, is_valid, LaunchParams, PLATFORM_PREFIX};
pub use types::{GroupStatus, OpStatus, ParamScalar, ParamValue};
