//! Error types for building, parsing and loading diagrams.

/// Invalid graph declaration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecError {
	/// A node was declared without an identifier.
	#[error("node identifier must not be empty")]
	EmptyId,

	/// Two nodes share one identifier.
	#[error("duplicate node identifier `{0}`")]
	DuplicateNode(String),

	/// An edge names a node that was never declared.
	#[error("edge {from} -> {to} references undeclared node `{missing}`")]
	UnknownEndpoint {
		/// Edge source identifier.
		from: String,
		/// Edge target identifier.
		to: String,
		/// The endpoint that is not declared.
		missing: String,
	},
}

/// Flowchart notation that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
	/// 1-based line of the offending statement.
	pub line: usize,
	/// What went wrong.
	pub message: String,
}

impl ParseError {
	pub(crate) fn new(line: usize, message: impl Into<String>) -> Self {
		Self {
			line,
			message: message.into(),
		}
	}
}

/// Anything that can go wrong between a diagram source and a rendered scene.
#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
	/// Graph declaration rejected.
	#[error("invalid graph: {0}")]
	Spec(#[from] SpecError),

	/// Flowchart notation rejected.
	#[error("invalid flowchart: {0}")]
	Parse(#[from] ParseError),

	/// Data document is not valid JSON for the expected shape.
	#[error("malformed data document: {0}")]
	Json(#[from] serde_json::Error),

	/// The browser fetch failed or returned a non-success status.
	#[error("fetch failed: {0}")]
	Fetch(String),
}

pub(crate) type Result<T, E = DiagramError> = std::result::Result<T, E>;
