//! Core types and state for mockchat
//!
//! This crate provides the mock session store, the chat session
//! controller and the ambient configuration/logging used by the
//! `mockchat` binary.

pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod logging;
pub mod storage;
pub mod utils;

pub use error::{Error, Result};
