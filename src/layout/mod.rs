mod color;
mod dot;
mod geometry;
mod hierarchical;

pub use color::parse_color;
pub use dot::{html_to_text, parse_dot, Attrs, DotCluster, DotEdge, DotGraph, DotNode, DotParseError};
pub use geometry::{ClusterGeometry, EdgeGeometry, Geometry, NodeGeometry, NodeShape, Style};
pub use hierarchical::Orientation;

use crate::{error::ViewerError, settings::SettingsLayout};

/// Turns a textual graph description into renderable geometry.
///
/// Implementations keep no state between calls and return the same geometry for the
/// same description.
pub trait LayoutEngine: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ViewerError::Layout`] when the description is not a well-formed graph.
    fn layout(&self, description: &str) -> Result<Geometry, ViewerError>;
}

/// Layered layout of DOT descriptions.
#[derive(Debug, Clone, Default)]
pub struct DotLayout {
    settings: SettingsLayout,
}

impl DotLayout {
    pub fn new(settings: SettingsLayout) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SettingsLayout {
        &self.settings
    }
}

impl LayoutEngine for DotLayout {
    fn layout(&self, description: &str) -> Result<Geometry, ViewerError> {
        let graph = parse_dot(description)?;
        log::debug!(
            "laying out graph with {} nodes, {} edges and {} subgraphs",
            graph.node_count(),
            graph.edge_count(),
            graph.subgraphs.len()
        );
        Ok(hierarchical::layout(&graph, &self.settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULE_GRAPH: &str = r#"digraph G {
        rankdir=TB; ranksep=0.4; nodesep=0.3;
        node [shape=box, style=filled, fillcolor=lightyellow, fontname="Courier", width=1];
        subgraph cluster_module {
            label=<<B>module</B>>; style=filled; fillcolor=lightblue;
            Module [label=<Module<BR/>body: 3>];
            subgraph cluster_func {
                label="FunctionDef"; style="filled,dashed"; fillcolor=lightpink;
                f [label=<FunctionDef<BR/>name: main>];
                r [label="Return"];
            }
        }
        legend_anchor [style=invis, label=""];
        Module -> f;
        f -> r [label="body"];
    }"#;

    #[test]
    fn test_layout_is_deterministic() {
        let engine = DotLayout::default();
        let a = engine.layout(MODULE_GRAPH).unwrap();
        let b = engine.layout(MODULE_GRAPH).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_layout_of_module_graph() {
        let g = DotLayout::default().layout(MODULE_GRAPH).unwrap();
        assert!(g.directed);
        assert_eq!(g.nodes.len(), 4);
        assert_eq!(g.edges.len(), 2);
        assert_eq!(g.clusters.len(), 2);
        assert_eq!(g.node("f").unwrap().label, "FunctionDef\nname: main");
        assert!(g.node("legend_anchor").unwrap().style.invisible);
        assert_eq!(g.edges[1].label.as_deref(), Some("body"));
        assert!(g.bounds().is_positive());
    }

    #[test]
    fn test_layout_error_on_malformed_input() {
        let err = DotLayout::default().layout("digraph { a -> }").unwrap_err();
        assert!(matches!(err, ViewerError::Layout(_)));
    }
}
