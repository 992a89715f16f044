//! Papergraph Domain Layer
//!
//! Value types shared by every stage of the pipeline. Infrastructure
//! (providers, graph backends, file formats) lives in other crates.
//!
//! ## Key Concepts
//!
//! - **SourceRecord**: one row of the research tracker, immutable once read
//! - **NaturalKey**: the stable identity used for diffing and upserts
//! - **ExtractionResult**: entities and relations extracted from one record
//! - **EntityType / RelationType**: the closed vocabulary of the graph schema
//! - **Graph keys**: how Paper and Entity nodes are matched on merge

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod extraction;
pub mod graph;
pub mod record;
pub mod schema;

// Re-exports for convenience
pub use extraction::{EntityMention, ExtractionResult, RelationMention};
pub use graph::{EntityKey, GraphCounts, PaperNode, RelationEdge};
pub use record::{NaturalKey, SourceRecord};
pub use schema::{EntityType, RelationType};
