//! Token graph model.
//!
//! This module provides the in-memory side of the system:
//! - Generated token sequences (`Sequence`, `Token`)
//! - The weighted directed graph (`Graph`, `Node`, `Edge`)
//! - The graph builder and its three merge policies (`build`)

/// Tokens and sequences, with capture validation.
pub mod sequence;

/// Arena-backed weighted directed graph.
///
/// Nodes are addressed by dense `NodeId`s and edges are looked up by
/// `(source, target)`. Iteration always follows insertion order.
pub mod graph;

/// Folds sequences into a graph under a `GraphMode`.
pub mod builder;

/// Divergence-aware tree construction used by `GraphMode::TokenPositionTree`.
///
/// Not exposed publicly.
mod tree;
