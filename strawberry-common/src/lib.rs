//! # Strawberry Common Library
//!
//! Shared code for strawberry services:
//! - Launch-parameter signature verification and token hashing
//! - Status codes and request/response types
//! - Configuration loading
//! - Database schema initialization

pub mod api;
pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
