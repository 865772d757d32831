//! API-compatible types.
//!
//! The types in this module are what the HTTP surface sends, e.g.:
//!
//! - Actors are summarised for listing and expanded for detail views.
//! - Presentation defaults are applied here, never to stored actors.

pub mod actor;
