//! Papergraph Ingestion
//!
//! Loads the cumulative extraction store into a graph backend with merge
//! semantics: running the same ingestion twice changes nothing.
//!
//! # Ordering
//!
//! Within one extraction result the Paper node and every Entity node are
//! merged before the MENTIONS and RELATION edges that reference them.
//! Results are independent of each other.
//!
//! # Failures
//!
//! A write the backend rejects fails only the current record; it is listed
//! in [`IngestStats::failures`] with the record key and the operation, and
//! ingestion moves on. A connection failure aborts the run. Because every
//! write is a merge, re-running the whole ingestion is always safe.

#![warn(missing_docs)]

mod ingestor;

pub use ingestor::{IngestFailure, IngestOptions, IngestStats, Ingestor};

use papergraph_graph::GraphError;
use thiserror::Error;

/// Errors that abort an ingestion run
#[derive(Error, Debug)]
pub enum IngestError {
    /// The graph store became unreachable
    #[error("Ingestion aborted at record '{key}' during {operation}: {source}")]
    Connection {
        /// Record being ingested (empty before the first record)
        key: String,
        /// Operation that failed
        operation: &'static str,
        /// Underlying error
        source: GraphError,
    },

    /// Schema setup or the initial clear failed
    #[error("Graph preparation failed during {operation}: {source}")]
    Setup {
        /// `ensure_schema` or `clear`
        operation: &'static str,
        /// Underlying error
        source: GraphError,
    },
}
