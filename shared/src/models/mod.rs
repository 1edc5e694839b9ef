//! Shared data models for iconbridge
//!
//! This module contains the value types both execution contexts agree on:
//! the fixed repository catalogue, export requests, stored credentials and
//! the geometry snapshot of selected design nodes.

pub mod credential;
pub mod export;
pub mod node;
pub mod repository;

pub use credential::*;
pub use export::*;
pub use node::*;
pub use repository::*;
