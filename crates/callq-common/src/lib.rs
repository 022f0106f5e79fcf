//! callq Common Types
//!
//! Shared error type for the callq crates.
//!
//! # Overview
//!
//! callq embeds a single-threaded Boa JavaScript context in a multi-threaded
//! host. Background threads marshal calls onto the engine thread through a
//! call queue (see `callq-runtime`). This crate holds the pieces every other
//! crate needs:
//!
//! - [`CallqError`] - the error enum used at every host boundary
//! - [`Result`] - alias over [`CallqError`]

pub mod error;

pub use error::{CallqError, Result};
