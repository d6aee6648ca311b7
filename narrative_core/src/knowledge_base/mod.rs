//! Knowledge Base module - what characters know and what the corpus suggests.
//!
//! - **Character contexts**: each active character's working memory, history,
//!   linked characters and missing conditions
//! - **Atoms**: anonymized situations mined from exemplar stories, each with
//!   the actions that followed
//! - **Atom index**: atoms partitioned into cells by shape

mod abstraction;
mod atom;
mod connectivity;
mod context;
mod index;

pub use abstraction::*;
pub use atom::*;
pub use connectivity::*;
pub use context::*;
pub use index::*;
