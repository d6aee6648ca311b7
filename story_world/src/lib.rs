//! # Story World
//!
//! The "Story Bible" crate - the data contracts the narrative engine consumes.
//! Loaders for catalog, exemplar and norm files build these types; the engine
//! only reads them. This crate contains no generation logic.
//!
//! ## Contents
//!
//! - **entities** / **world_state**: character and location ids, the cast arena
//! - **facts**: anonymized and bound emotion/tension/position facts
//! - **actions**: action templates, the catalog, and bound action instances
//! - **corpus**: exemplar stories used to steer generation
//! - **norms**: social norms used to classify committed actions

pub mod actions;
pub mod corpus;
pub mod entities;
pub mod error;
pub mod facts;
pub mod norms;
pub mod world_state;

pub use actions::*;
pub use corpus::*;
pub use entities::*;
pub use error::*;
pub use facts::*;
pub use norms::*;
pub use world_state::*;
