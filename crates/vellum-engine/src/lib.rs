//! The Vellum page lifecycle engine.
//!
//! Turns a sequence of edited document versions into a consistent,
//! time-correct live view of a site. The engine is generic over a
//! [`PageStore`] backend and a [`Collaborators`] bundle; it owns the
//! publication rules, the rename cascade, the catalog and live-page
//! projections, the trash, and the reconciliation sweep.
//!
//! The store offers no multi-row transactions, so every operation is a
//! sequence of idempotent steps. Operations on the same page number are
//! serialised in-process by [`locks::PageLocks`]; side effects on
//! collaborators (cache purge, static export, notifications) are best-effort
//! and never fail an operation.
//!
//! [`PageStore`]: vellum_core::store::PageStore
//! [`Collaborators`]: vellum_core::collab::Collaborators

pub mod config;
mod engine;
pub mod error;
pub mod locks;
mod projection;
mod publish;
mod rename;
mod sweep;
mod trash;
mod versions;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{Error, Result};
pub use sweep::SweepReport;

#[cfg(test)]
mod tests;
