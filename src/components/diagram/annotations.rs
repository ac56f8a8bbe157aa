use std::collections::{BTreeSet, HashMap};

/// Static node identifier to description table. Never mutated after construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnnotationMap {
	entries: HashMap<String, String>,
}

impl AnnotationMap {
	pub fn get(&self, id: &str) -> Option<&str> {
		self.entries.get(id).map(String::as_str)
	}

	#[cfg(test)]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Compares the annotated keys with the identifiers that were actually rendered.
	pub fn drift<'a>(&self, rendered: impl IntoIterator<Item = &'a str>) -> AnnotationDrift {
		let rendered: BTreeSet<&str> = rendered.into_iter().collect();
		let unannotated = rendered
			.iter()
			.filter(|id| !self.entries.contains_key(**id))
			.map(|id| id.to_string())
			.collect();
		let mut orphaned: Vec<String> = self
			.entries
			.keys()
			.filter(|k| !rendered.contains(k.as_str()))
			.cloned()
			.collect();
		orphaned.sort();
		AnnotationDrift {
			unannotated,
			orphaned,
		}
	}
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AnnotationMap {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self {
			entries: iter
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		}
	}
}

/// Mismatch between an annotation table and a rendered graph.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnnotationDrift {
	/// Rendered nodes without a description, sorted.
	pub unannotated: Vec<String>,
	/// Descriptions whose node was never rendered, sorted.
	pub orphaned: Vec<String>,
}

impl AnnotationDrift {
	pub fn is_clean(&self) -> bool {
		self.unannotated.is_empty() && self.orphaned.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn drift_reports_both_directions() {
		let map: AnnotationMap = [("A", "desc A"), ("Gone", "stale")].into_iter().collect();
		let drift = map.drift(["A", "C", "B"]);
		assert_eq!(drift.unannotated, ["B", "C"]);
		assert_eq!(drift.orphaned, ["Gone"]);
		assert!(!drift.is_clean());

		assert!(map.drift(["A", "Gone"]).is_clean());
	}

	#[test]
	fn later_entries_win() {
		let map: AnnotationMap = [("A", "first"), ("A", "second")].into_iter().collect();
		assert_eq!(map.get("A"), Some("second"));
		assert_eq!(map.len(), 1);
	}
}
