//! Annotated diagrams: a declared graph, rendered and bound to per-node
//! descriptions that a detail panel shows on hover.
//!
//! Rendering and binding are two explicit steps. [`scene::SceneRenderer`]
//! lays a [`GraphSpec`] out into a scene whose handle lists every rendered
//! node; [`binder::AnnotationBinder`] binds that handle to an
//! [`AnnotationMap`] and turns pointer events into panel text.

mod annotations;
mod binder;
mod component;
mod config;
mod data;
mod error;
mod handle;
mod mermaid;
mod panel;
mod query;
mod render;
mod scene;
mod state;
mod svg;
mod types;

pub use annotations::AnnotationMap;
pub use component::AnnotatedDiagram;
pub use config::DiagramConfig;
pub use data::{DiagramDocument, fetch_document};
pub use error::DiagramError;
pub use mermaid::parse_flowchart;
pub use svg::SvgDiagram;
pub use types::GraphSpec;
