//! Core types and trait definitions for the Vellum page lifecycle engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::PageStore`]; the engine consumes it
//! together with the collaborator traits in [`collab`].

pub mod catalog;
pub mod collab;
pub mod error;
pub mod page;
pub mod schedule;
pub mod slug;
pub mod store;

pub use error::{Error, Result};

/// Logical identity shared by every version of one page.
pub type PageNumber = i64;
