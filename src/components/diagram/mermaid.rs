//! Parser for the flowchart subset of Mermaid notation.
//!
//! Handles the header, node shapes with plain or quoted labels, `:::class`
//! suffixes, chained edges with `|labels|`, `classDef` and `class`
//! statements. Subgraphs are flattened. `style`, `linkStyle` and `click`
//! statements are accepted and ignored.

use indexmap::IndexMap;

use super::error::ParseError;
use super::types::{ClassStyle, Direction, EdgeKind, GraphSpec, NodeShape, NodeSpec};

const EDGE_TOKENS: &[(&str, EdgeKind)] = &[
	("-.->", EdgeKind::DottedArrow),
	("-.-", EdgeKind::DottedOpen),
	("==>", EdgeKind::ThickArrow),
	("===", EdgeKind::ThickOpen),
	("-->", EdgeKind::Arrow),
	("---", EdgeKind::Open),
];

const IGNORED_STATEMENTS: &[&str] = &["style", "linkStyle", "click", "direction"];

struct Cursor {
	src: Vec<char>,
	pos: usize,
	line: usize,
}

impl Cursor {
	fn new(src: &str, line: usize) -> Self {
		Self {
			src: src.chars().collect(),
			pos: 0,
			line,
		}
	}

	fn eof(&self) -> bool {
		self.pos >= self.src.len()
	}

	fn ch(&self) -> char {
		self.src[self.pos]
	}

	fn peek_str(&self, s: &str) -> bool {
		let mut i = self.pos;
		for c in s.chars() {
			if i >= self.src.len() || self.src[i] != c {
				return false;
			}
			i += 1;
		}
		true
	}

	fn consume_str(&mut self, s: &str) -> bool {
		if self.peek_str(s) {
			self.pos += s.chars().count();
			true
		} else {
			false
		}
	}

	fn skip_ws(&mut self) {
		while !self.eof() && self.ch().is_whitespace() {
			self.pos += 1;
		}
	}

	fn rest(&self) -> String {
		self.src[self.pos..].iter().collect()
	}

	fn error(&self, message: impl Into<String>) -> ParseError {
		ParseError::new(self.line, message)
	}

	fn node_id(&mut self) -> Option<String> {
		let start = self.pos;
		if self.eof() || !(self.ch().is_ascii_alphanumeric() || self.ch() == '_') {
			return None;
		}
		while !self.eof() {
			let word = |c: char| c.is_ascii_alphanumeric() || c == '_';
			if word(self.ch()) {
				self.pos += 1;
			} else if self.ch() == '-' && self.src.get(self.pos + 1).is_some_and(|&c| word(c)) {
				// a single hyphen joins words; `--`, `-.` start an edge
				self.pos += 1;
			} else {
				break;
			}
		}
		Some(self.src[start..self.pos].iter().collect())
	}

	fn quoted(&mut self) -> Result<String, ParseError> {
		self.pos += 1;
		let mut buf = String::new();
		while !self.eof() && self.ch() != '"' {
			if self.ch() == '\\' && self.pos + 1 < self.src.len() {
				match self.src[self.pos + 1] {
					'n' => buf.push('\n'),
					other => buf.push(other),
				}
				self.pos += 2;
			} else {
				buf.push(self.ch());
				self.pos += 1;
			}
		}
		if !self.consume_str("\"") {
			return Err(self.error("unterminated quoted label"));
		}
		Ok(buf)
	}

	fn label(&mut self, closer: &str) -> Result<String, ParseError> {
		self.skip_ws();
		let text = if !self.eof() && self.ch() == '"' {
			let quoted = self.quoted()?;
			self.skip_ws();
			quoted
		} else {
			let start = self.pos;
			while !self.eof() && !self.peek_str(closer) {
				self.pos += 1;
			}
			self.src[start..self.pos].iter().collect::<String>().trim().to_owned()
		};
		if !self.consume_str(closer) {
			return Err(self.error(format!("expected `{closer}` to close node label")));
		}
		Ok(normalize_breaks(&text))
	}
}

fn normalize_breaks(text: &str) -> String {
	text.replace("\\n", "\n")
		.replace("<br/>", "\n")
		.replace("<br />", "\n")
		.replace("<br>", "\n")
}

#[derive(Default)]
struct Declared {
	nodes: IndexMap<String, NodeSpec>,
	edges: Vec<(String, String, Option<String>, EdgeKind)>,
	classes: IndexMap<String, ClassStyle>,
}

impl Declared {
	fn upsert(&mut self, node: NodeRef) {
		let entry = self
			.nodes
			.entry(node.id.clone())
			.or_insert_with(|| NodeSpec::new(node.id.clone(), node.id.clone()));
		if let Some((shape, label)) = node.shape {
			entry.shape = shape;
			entry.label = label;
		}
		if node.class.is_some() {
			entry.class = node.class;
		}
	}
}

struct NodeRef {
	id: String,
	shape: Option<(NodeShape, String)>,
	class: Option<String>,
}

fn parse_node_ref(c: &mut Cursor) -> Result<Option<NodeRef>, ParseError> {
	c.skip_ws();
	let Some(id) = c.node_id() else {
		return Ok(None);
	};

	let shape = if c.consume_str("((") {
		Some((NodeShape::Circle, c.label("))")?))
	} else if c.consume_str("([") {
		Some((NodeShape::Stadium, c.label("])")?))
	} else if c.consume_str("(") {
		Some((NodeShape::Rounded, c.label(")")?))
	} else if c.consume_str("{") {
		Some((NodeShape::Diamond, c.label("}")?))
	} else if c.consume_str("[") {
		Some((NodeShape::Rect, c.label("]")?))
	} else {
		None
	};

	let class = if c.consume_str(":::") {
		let class = c.node_id().ok_or_else(|| c.error("expected class name after `:::`"))?;
		Some(class)
	} else {
		None
	};

	Ok(Some(NodeRef { id, shape, class }))
}

fn parse_connector(c: &mut Cursor) -> Option<EdgeKind> {
	c.skip_ws();
	EDGE_TOKENS
		.iter()
		.find(|(token, _)| c.consume_str(token))
		.map(|(_, kind)| *kind)
}

fn parse_edge_label(c: &mut Cursor) -> Result<Option<String>, ParseError> {
	c.skip_ws();
	if !c.consume_str("|") {
		return Ok(None);
	}
	c.skip_ws();
	let text = if !c.eof() && c.ch() == '"' {
		let quoted = c.quoted()?;
		c.skip_ws();
		quoted
	} else {
		let start = c.pos;
		while !c.eof() && c.ch() != '|' {
			c.pos += 1;
		}
		c.src[start..c.pos].iter().collect()
	};
	if !c.consume_str("|") {
		return Err(c.error("unterminated edge label"));
	}
	let text = normalize_breaks(text.trim());
	Ok((!text.is_empty()).then_some(text))
}

fn parse_chain(c: &mut Cursor, declared: &mut Declared) -> Result<(), ParseError> {
	let first = parse_node_ref(c)?
		.ok_or_else(|| c.error(format!("unexpected `{}`", c.rest().trim())))?;
	let mut prev = first.id.clone();
	declared.upsert(first);

	loop {
		c.skip_ws();
		if c.eof() {
			return Ok(());
		}
		let kind = parse_connector(c)
			.ok_or_else(|| c.error(format!("expected edge, found `{}`", c.rest().trim())))?;
		let label = parse_edge_label(c)?;
		let target = parse_node_ref(c)?.ok_or_else(|| c.error("edge has no target node"))?;
		let target_id = target.id.clone();
		declared.upsert(target);
		declared.edges.push((prev, target_id.clone(), label, kind));
		prev = target_id;
	}
}

fn parse_class_def(rest: &str) -> Option<(String, ClassStyle)> {
	let (name, props) = rest.trim().split_once(char::is_whitespace)?;
	let mut style = ClassStyle::default();
	for prop in props.split(',') {
		let Some((key, value)) = prop.split_once(':') else {
			continue;
		};
		let value = Some(value.trim().to_owned());
		match key.trim() {
			"fill" => style.fill = value,
			"stroke" => style.stroke = value,
			"color" => style.color = value,
			_ => {}
		}
	}
	Some((name.to_owned(), style))
}

fn parse_header(statement: &str) -> Option<Direction> {
	let mut words = statement.split_whitespace();
	if !matches!(words.next(), Some("flowchart" | "graph")) {
		return None;
	}
	Some(match words.next() {
		Some("BT") => Direction::BT,
		Some("LR") => Direction::LR,
		Some("RL") => Direction::RL,
		_ => Direction::TD,
	})
}

/// Splits source into `(line, statement)` pairs on newlines and unquoted `;`.
fn statements(src: &str) -> Vec<(usize, String)> {
	let mut out = Vec::new();
	for (i, line) in src.lines().enumerate() {
		let mut current = String::new();
		let mut quoted = false;
		let mut chars = line.chars().peekable();
		while let Some(ch) = chars.next() {
			match ch {
				'"' => {
					quoted = !quoted;
					current.push(ch);
				}
				'%' if !quoted && chars.peek() == Some(&'%') => break,
				';' if !quoted => out.push((i + 1, std::mem::take(&mut current))),
				_ => current.push(ch),
			}
		}
		out.push((i + 1, current));
	}
	out.retain(|(_, s)| !s.trim().is_empty());
	out
}

fn first_word(statement: &str) -> &str {
	statement.split_whitespace().next().unwrap_or("")
}

/// Parses flowchart notation into a validated [`GraphSpec`].
pub fn parse_flowchart(src: &str) -> Result<GraphSpec, ParseError> {
	let mut statements = statements(src).into_iter();
	let (header_line, header) = statements
		.next()
		.ok_or_else(|| ParseError::new(1, "empty flowchart"))?;
	let direction = parse_header(&header)
		.ok_or_else(|| ParseError::new(header_line, "expected `flowchart` or `graph` header"))?;

	let mut declared = Declared::default();
	let mut depth = 0usize;

	for (line, statement) in statements {
		let trimmed = statement.trim();
		let keyword = first_word(trimmed);
		match keyword {
			"classDef" => {
				let (name, style) = parse_class_def(&trimmed["classDef".len()..])
					.ok_or_else(|| ParseError::new(line, "classDef needs a name and properties"))?;
				declared.classes.insert(name, style);
			}
			"class" => {
				let mut parts = trimmed["class".len()..].split_whitespace();
				let (Some(ids), Some(class)) = (parts.next(), parts.next()) else {
					return Err(ParseError::new(line, "class needs node ids and a class name"));
				};
				for id in ids.split(',').filter(|id| !id.is_empty()) {
					declared.upsert(NodeRef {
						id: id.to_owned(),
						shape: None,
						class: Some(class.to_owned()),
					});
				}
			}
			"subgraph" => depth += 1,
			"end" => {
				depth = depth
					.checked_sub(1)
					.ok_or_else(|| ParseError::new(line, "`end` without `subgraph`"))?;
			}
			k if IGNORED_STATEMENTS.contains(&k) => {}
			_ => parse_chain(&mut Cursor::new(trimmed, line), &mut declared)?,
		}
	}

	if depth > 0 {
		return Err(ParseError::new(src.lines().count(), "unclosed `subgraph`"));
	}

	let mut builder = GraphSpec::builder().direction(direction);
	for node in declared.nodes.into_values() {
		builder = builder.node(node);
	}
	for (source, target, label, kind) in declared.edges {
		builder = builder.edge_with(source, target, label, kind);
	}
	for (name, style) in declared.classes {
		builder = builder.class(name, style);
	}
	// every endpoint was upserted while parsing
	builder.build().map_err(|e| ParseError::new(1, e.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;

	const WORKFLOW: &str = r#"
flowchart TD
  Start(["200 concepts enumerated"]):::blue --> Found["Identify foundational concepts\n(10-15 marked)"]:::blue
  Found --> Chain["Map sequential chains"]:::green
  Chain --> Dag{"DAG validation:\ncycles detected?"}:::purple
  Dag -->|Yes| Fix["Resolve cycles"]:::purple
  Fix --> Dag
  Dag -->|No| End(["Valid DAG"]):::green

  classDef blue fill:#3b82f6,stroke:#1e3a8a,color:#fff,font-size:16px
  classDef green fill:#22c55e,stroke:#166534,color:#fff
  linkStyle default stroke:#1f2937,stroke-width:2px
"#;

	#[test]
	fn parses_workflow() {
		let spec = parse_flowchart(WORKFLOW).unwrap();
		assert_eq!(spec.direction(), Direction::TD);

		let ids: Vec<_> = spec.nodes().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, ["Start", "Found", "Chain", "Dag", "Fix", "End"]);

		let start = spec.node("Start").unwrap();
		assert_eq!(start.shape, NodeShape::Stadium);
		assert_eq!(start.label, "200 concepts enumerated");
		assert_eq!(start.class.as_deref(), Some("blue"));

		assert_eq!(
			spec.node("Found").unwrap().label,
			"Identify foundational concepts\n(10-15 marked)"
		);
		assert_eq!(spec.node("Dag").unwrap().shape, NodeShape::Diamond);

		assert_eq!(spec.edges().len(), 6);
		let yes = &spec.edges()[3];
		assert_eq!((yes.source.as_str(), yes.target.as_str()), ("Dag", "Fix"));
		assert_eq!(yes.label.as_deref(), Some("Yes"));

		let blue = spec.class_style("blue").unwrap();
		assert_eq!(blue.fill.as_deref(), Some("#3b82f6"));
		assert_eq!(blue.color.as_deref(), Some("#fff"));
	}

	#[test]
	fn chains_connectors_and_semicolons() {
		let spec = parse_flowchart("graph LR; a-.->b==>c---d; e((Hub)) -.- a").unwrap();
		assert_eq!(spec.direction(), Direction::LR);
		let kinds: Vec<_> = spec.edges().iter().map(|e| e.kind).collect();
		assert_eq!(
			kinds,
			[
				EdgeKind::DottedArrow,
				EdgeKind::ThickArrow,
				EdgeKind::Open,
				EdgeKind::DottedOpen
			]
		);
		assert_eq!(spec.node("e").unwrap().shape, NodeShape::Circle);
		assert_eq!(spec.node("b").unwrap().label, "b");
	}

	#[test]
	fn hyphenated_ids_and_later_labels() {
		let spec = parse_flowchart(
			"flowchart TD\n  step-one --> step-two\n  step-one[First step<br>of two]\n  \
			 class step-two done",
		)
		.unwrap();
		assert_eq!(spec.node("step-one").unwrap().label, "First step\nof two");
		assert_eq!(spec.node("step-two").unwrap().class.as_deref(), Some("done"));
		assert_eq!(spec.edges()[0].target, "step-two");
	}

	#[test]
	fn quoted_edge_labels_may_contain_pipes() {
		let spec = parse_flowchart(
			"flowchart LR\n  C3 -->|\"split by |\"| E1\n  E1 -->| plain |E2",
		)
		.unwrap();
		let split = &spec.edges()[0];
		assert_eq!((split.source.as_str(), split.target.as_str()), ("C3", "E1"));
		assert_eq!(split.label.as_deref(), Some("split by |"));
		assert_eq!(spec.edges()[1].label.as_deref(), Some("plain"));

		let err = parse_flowchart("flowchart LR\n  A -->|\"open| B").unwrap_err();
		assert_eq!(err.line, 2);
	}

	#[test]
	fn subgraphs_are_flattened() {
		let spec = parse_flowchart(
			"flowchart TD\nsubgraph Inputs\n  direction LR\n  a --> b\nend\nb --> c %% trailing",
		)
		.unwrap();
		assert_eq!(spec.nodes().len(), 3);
		assert_eq!(spec.edges().len(), 2);
	}

	#[test]
	fn errors_carry_line_numbers() {
		let err = parse_flowchart("flowchart TD\n  A --> B\n  A --> \n").unwrap_err();
		assert_eq!(err.line, 3);

		let err = parse_flowchart("flowchart TD\n  A[never closed\n").unwrap_err();
		assert_eq!(err.line, 2);

		let err = parse_flowchart("sequenceDiagram\n  A->>B: hi").unwrap_err();
		assert_eq!(err.line, 1);

		assert!(parse_flowchart("flowchart TD\nend").is_err());
		assert!(parse_flowchart("flowchart TD\nsubgraph X\na-->b").is_err());
	}
}
