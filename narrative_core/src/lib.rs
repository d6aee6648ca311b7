//! # Narrative Core (The Cortex)
//!
//! A case-based story generator. Exemplar stories are compiled offline into
//! atoms (anonymized situations paired with the actions that followed them).
//! A new story grows by alternating two phases until the guidelines call for
//! an ending:
//!
//! - **Engagement**: match each representative character's context against
//!   the atom index and tell the first admissible suggested action
//! - **Reflection**: break impasses from the exemplar corpus, repair missing
//!   preconditions, and retune tension/social/novelty guidance
//!
//! ## Core Components
//!
//! - **knowledge_base**: character contexts, atoms and the cell-partitioned atom index
//! - **retrieval**: graph-based similarity matching with cascading precision tiers
//! - **instantiation**: binding template roles to concrete characters
//! - **guidelines**: the guideline set and the curve/novelty analyzers
//! - **story**: run state and the commit pipeline that propagates facts
//! - **engagement** / **reflection** / **generator**: the control loop
//!
//! All randomness comes from a caller-supplied [`rand::Rng`], so a fixed seed
//! reproduces a run exactly.

pub mod config;
pub mod engagement;
pub mod error;
pub mod generator;
pub mod guidelines;
pub mod instantiation;
pub mod knowledge_base;
pub mod reflection;
pub mod retrieval;
pub mod story;

#[cfg(test)]
pub(crate) mod testing;

pub use config::*;
pub use engagement::*;
pub use error::*;
pub use generator::*;
pub use guidelines::*;
pub use instantiation::*;
pub use knowledge_base::*;
pub use reflection::*;
pub use retrieval::*;
pub use story::*;
