//! Token divergence graphs.
//!
//! This crate compresses many independently sampled token sequences into a
//! weighted directed graph and lays it out in 2D:
//! - Three merge policies: token, token+position and a divergence-aware tree
//! - A deterministic breadth-first layout with per-step de-overlapping
//! - Node-link interchange (JSON and postcard)
//! - Loading of cached generation captures
//!
//! Everything is computed in one synchronous pass over fully loaded input.
//! The same sequences in the same order always give identical output.

/// Error type shared by the whole crate.
pub mod error;

/// Sequences, graphs and the graph builder.
pub mod model;

/// Breadth-first layout with per-step de-overlapping.
pub mod layout;

/// Node-link interchange format.
pub mod export;

/// Capture file parsing.
pub mod capture;

/// I/O utilities (file loading, path helpers).
pub mod io;

pub use error::{GraphError, Result};
pub use export::NodeLinkData;
pub use layout::{Layout, Point, layout};
pub use model::builder::{BuildOptions, build, build_graph};
pub use model::graph::{Edge, Graph, GraphMode, Node, NodeId};
pub use model::sequence::{Sequence, Token};
