//! Reading cached generation captures.
//!
//! A capture file is a JSON array of raw chat-completion responses, each
//! carrying one or more choices with per-token logprobs. Every choice becomes
//! one [`Sequence`] identified by `"{completion id}-{choice index}"`.
//!
//! A plain JSON array of [`Sequence`] records is accepted as well.

use std::path::Path;

use serde::Deserialize;

use crate::error::{GraphError, Result};
use crate::io::read_to_string;
use crate::model::sequence::{Sequence, Token};

#[derive(Deserialize, Clone, Debug)]
pub struct Completion {
	pub id: String,
	pub choices: Vec<Choice>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Choice {
	pub index: usize,
	#[serde(default)]
	pub logprobs: Option<ChoiceLogprobs>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ChoiceLogprobs {
	#[serde(default)]
	pub content: Option<Vec<TokenLogprob>>,
}

/// One token of a choice. Extra fields (`bytes`, `top_logprobs`) are ignored.
#[derive(Deserialize, Clone, Debug)]
pub struct TokenLogprob {
	pub token: String,
	#[serde(default)]
	pub logprob: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CaptureFile {
	Completions(Vec<Completion>),
	Sequences(Vec<Sequence>),
}

/// Converts completions into sequences, one per choice, in capture order.
///
/// # Errors
/// Returns `MissingLogprobs` for the first choice whose `logprobs` or
/// `logprobs.content` is absent. No sequences are returned in that case.
pub fn sequences_from_completions(completions: &[Completion]) -> Result<Vec<Sequence>> {
	let mut sequences = Vec::new();
	for completion in completions {
		for choice in &completion.choices {
			let id = format!("{}-{}", completion.id, choice.index);
			let content = match choice.logprobs.as_ref().and_then(|logprobs| logprobs.content.as_ref()) {
				Some(content) => content,
				None => return Err(GraphError::MissingLogprobs { sequence: id }),
			};
			let tokens = content
				.iter()
				.enumerate()
				.map(|(position, token)| Token { text: token.token.clone(), position, logprob: token.logprob })
				.collect();
			sequences.push(Sequence { id, tokens });
		}
	}
	Ok(sequences)
}

/// Parses a capture document (completions or plain sequences).
pub fn parse_sequences(json: &str) -> Result<Vec<Sequence>> {
	match serde_json::from_str::<CaptureFile>(json)? {
		CaptureFile::Completions(completions) => sequences_from_completions(&completions),
		CaptureFile::Sequences(sequences) => Ok(sequences),
	}
}

/// Loads every sequence of a capture file.
pub fn load_sequences<P: AsRef<Path>>(path: P) -> Result<Vec<Sequence>> {
	parse_sequences(&read_to_string(path)?)
}

#[cfg(test)]
mod tests {
	use super::*;

	const CAPTURE: &str = r#"[
		{
			"id": "chatcmpl-1",
			"object": "chat.completion",
			"choices": [
				{
					"index": 0,
					"finish_reason": "length",
					"logprobs": { "content": [
						{ "token": "Once", "logprob": -0.01, "bytes": [79, 110, 99, 101], "top_logprobs": [] },
						{ "token": " upon", "logprob": -0.02, "bytes": null, "top_logprobs": [] }
					]}
				},
				{
					"index": 1,
					"logprobs": { "content": [ { "token": "Long", "logprob": -1.5 } ] }
				}
			]
		}
	]"#;

	#[test]
	fn completions_become_sequences() {
		let sequences = parse_sequences(CAPTURE).unwrap();
		assert_eq!(sequences.len(), 2);
		assert_eq!(sequences[0].id, "chatcmpl-1-0");
		assert_eq!(sequences[0].tokens[1].text, " upon");
		assert_eq!(sequences[0].tokens[1].position, 1);
		assert_eq!(sequences[1].id, "chatcmpl-1-1");
		assert!(sequences.iter().all(|s| s.validate().is_ok()));
	}

	#[test]
	fn null_logprobs_reject_the_batch() {
		let json = r#"[{"id": "c", "choices": [{"index": 0, "logprobs": {"content": [{"token": "a", "logprob": 0.0}]}}, {"index": 3, "logprobs": null}]}]"#;
		match parse_sequences(json) {
			Err(GraphError::MissingLogprobs { sequence }) => assert_eq!(sequence, "c-3"),
			other => panic!("unexpected {other:?}"),
		}
	}

	#[test]
	fn null_content_is_malformed_too() {
		let json = r#"[{"id": "c", "choices": [{"index": 0, "logprobs": {"content": null}}]}]"#;
		assert!(matches!(parse_sequences(json), Err(GraphError::MissingLogprobs { .. })));
	}

	#[test]
	fn plain_sequences_are_accepted() {
		let json = r#"[{"id": "s0", "tokens": [{"text": "a", "position": 0, "logprob": -0.3}]}]"#;
		let sequences = parse_sequences(json).unwrap();
		assert_eq!(sequences, vec![Sequence::new("s0", vec![Token::new("a", 0, -0.3)])]);
	}
}
