use leptos::prelude::*;
use leptos::task::spawn_local;
use log::error;

use crate::components::diagram::{
	AnnotatedDiagram, AnnotationMap, DiagramDocument, GraphSpec, fetch_document,
};

const DATA_URL: &str = "data/learning-graph.json";

/// Learning graph loaded from a data document.
///
/// Open with `?enable-save=true` to drag nodes and download the new layout.
#[component]
pub fn LearningGraph() -> impl IntoView {
	let spec = RwSignal::new(GraphSpec::default());
	let annotations = RwSignal::new(AnnotationMap::default());
	let document = RwSignal::new(None::<DiagramDocument>);
	let load_error = RwSignal::new(None::<String>);
	let config = Signal::derive(move || {
		document
			.with(|d| d.as_ref().and_then(|d| d.config.clone()))
			.unwrap_or_default()
	});

	spawn_local(async move {
		let loaded = match fetch_document(DATA_URL).await {
			Ok(doc) => doc.to_parts().map(|parts| (doc, parts)),
			Err(e) => Err(e),
		};
		match loaded {
			Ok((doc, (graph, notes))) => {
				spec.set(graph);
				annotations.set(notes);
				document.set(Some(doc));
			}
			Err(e) => {
				error!("Error loading graph data: {e}");
				load_error.set(Some(e.to_string()));
			}
		}
	});

	view! {
		<main class="diagram-page">
			<h2>"Learning Graph"</h2>
			{move || {
				load_error.get().map(|e| {
					view! { <p class="load-error">"Could not load diagram data: " {e}</p> }
				})
			}}
			<AnnotatedDiagram
				spec=spec
				annotations=annotations
				config=config
				document=document
				title="Concept"
				height=Some(560.0)
			/>
			<p>
				<a href="/">"Back"</a>
			</p>
		</main>
	}
}
