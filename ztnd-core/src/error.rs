use thiserror::Error;

use crate::model::graph::NodeId;

/// Errors raised while building, laying out or exchanging token graphs.
///
/// Malformed input and tree invariant violations are fatal for the whole
/// batch. Unreachable nodes during layout are not errors: they are reported
/// by [`crate::layout::Layout::unreachable`].
#[derive(Error, Debug)]
pub enum GraphError {
	/// A token of the sequence carries no probability.
	#[error("sequence `{sequence}` has no logprob for token {index}")]
	MissingLogprob { sequence: String, index: usize },

	/// The whole per-token probability block of a captured choice is absent.
	#[error("sequence `{sequence}` carries no logprobs content")]
	MissingLogprobs { sequence: String },

	/// Tokens must be numbered 0, 1, 2, ... in order.
	#[error("sequence `{sequence}` has token {index} at position {position}")]
	PositionMismatch { sequence: String, index: usize, position: usize },

	/// More than one child of the cursor matches the same prefix.
	#[error(
		"tree invariant violated for sequence `{sequence}`: {candidates} children of node {cursor} match `{text}`@{position}"
	)]
	AmbiguousPrefix { sequence: String, cursor: NodeId, text: String, position: usize, candidates: usize },

	#[error("unknown node {0}")]
	UnknownNode(NodeId),

	#[error("unknown graph mode `{0}`")]
	UnknownMode(String),

	/// A node-link document that cannot be turned back into a graph.
	#[error("invalid node-link data: {0}")]
	InvalidInterchange(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Postcard(#[from] postcard::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, GraphError>;
