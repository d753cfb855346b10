//! Client-side kanban board with optimistic drag-and-drop reordering.
//!
//! Moves are applied to a local [`application::TaskStore`] immediately,
//! persisted to the task service in the background and rolled back from a
//! snapshot if any remote call fails.

pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;
