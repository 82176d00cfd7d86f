//! Client data layer for the Checkpointer game tracker.
//!
//! The [`api`] module talks to the REST API, [`cache`] holds fetched results
//! for the session, and [`query`] drives loading states for the terminal UI.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod pagination;
pub mod query;
