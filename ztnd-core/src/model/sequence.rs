use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// A single generated token.
///
/// `position` is the generation step, starting at 0 for the first token of
/// its sequence. `logprob` is only optional so that incomplete captures can
/// be represented and rejected; it is never used for weighting.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Token {
	pub text: String,
	pub position: usize,
	#[serde(default)]
	pub logprob: Option<f64>,
}

impl Token {
	pub fn new(text: &str, position: usize, logprob: f64) -> Self {
		Self { text: text.to_owned(), position, logprob: Some(logprob) }
	}
}

/// One complete generated continuation (one "choice" of one call).
///
/// # Invariants
/// - `tokens[i].position == i`
/// - every token carries a logprob
///
/// Both are checked by [`Sequence::validate`] before any graph is built.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Sequence {
	/// Identifier derived from the originating call and choice index.
	pub id: String,
	pub tokens: Vec<Token>,
}

impl Sequence {
	pub fn new(id: &str, tokens: Vec<Token>) -> Self {
		Self { id: id.to_owned(), tokens }
	}

	/// Builds a sequence from bare token texts.
	///
	/// Positions are assigned in order and every logprob is `0.0`.
	pub fn from_texts(id: &str, texts: &[&str]) -> Self {
		let tokens = texts
			.iter()
			.enumerate()
			.map(|(position, text)| Token::new(text, position, 0.0))
			.collect();
		Self::new(id, tokens)
	}

	pub fn len(&self) -> usize {
		self.tokens.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}

	/// Checks that the sequence is a well-formed capture.
	///
	/// # Errors
	/// - `MissingLogprob` if any token has no probability
	/// - `PositionMismatch` if positions are not exactly `0..len`
	pub fn validate(&self) -> Result<()> {
		for (index, token) in self.tokens.iter().enumerate() {
			if token.logprob.is_none() {
				return Err(GraphError::MissingLogprob { sequence: self.id.clone(), index });
			}
			if token.position != index {
				return Err(GraphError::PositionMismatch {
					sequence: self.id.clone(),
					index,
					position: token.position,
				});
			}
		}
		Ok(())
	}
}

/// Renders whitespace with visible glyphs so labels stay legible.
///
/// - `' '` → `'␣'`
/// - `'\n'` → `'↵'`
/// - `'\t'` → `'⇥'`
pub fn visible_whitespace(text: &str) -> String {
	text.chars()
		.map(|c| match c {
			' ' => '␣',
			'\n' => '↵',
			'\t' => '⇥',
			other => other,
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn from_texts_numbers_positions() {
		let sequence = Sequence::from_texts("s0", &["Once", " upon", " a"]);
		assert_eq!(sequence.len(), 3);
		assert_eq!(sequence.tokens[2].position, 2);
		assert!(sequence.validate().is_ok());
	}

	#[test]
	fn missing_logprob_is_rejected() {
		let mut sequence = Sequence::from_texts("s1", &["a", "b"]);
		sequence.tokens[1].logprob = None;
		match sequence.validate() {
			Err(GraphError::MissingLogprob { sequence, index }) => {
				assert_eq!(sequence, "s1");
				assert_eq!(index, 1);
			}
			other => panic!("unexpected {other:?}"),
		}
	}

	#[test]
	fn out_of_order_positions_are_rejected() {
		let sequence = Sequence::new("s2", vec![Token::new("a", 0, -0.1), Token::new("b", 2, -0.2)]);
		assert!(matches!(
			sequence.validate(),
			Err(GraphError::PositionMismatch { index: 1, position: 2, .. })
		));
	}

	#[test]
	fn whitespace_becomes_visible() {
		assert_eq!(visible_whitespace(" upon"), "␣upon");
		assert_eq!(visible_whitespace("\n\n"), "↵↵");
		assert_eq!(visible_whitespace("a\tb"), "a⇥b");
		assert_eq!(visible_whitespace("plain"), "plain");
	}

	#[test]
	fn logprob_defaults_to_none_when_absent() {
		let token: Token = serde_json::from_str(r#"{"text":"a","position":0}"#).unwrap();
		assert_eq!(token.logprob, None);
	}
}
