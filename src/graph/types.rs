//! Graph data types for an ontology class neighbourhood.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::layout::LayoutError;
use crate::theme;

/// Role of a node relative to the selected class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Focal,
    Superclass,
    Subclass,
}

impl NodeRole {
    pub fn color(&self) -> egui::Color32 {
        match self {
            NodeRole::Focal => theme::role::FOCAL,
            NodeRole::Superclass => theme::role::SUPERCLASS,
            NodeRole::Subclass => theme::role::SUBCLASS,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeRole::Focal => "Selected",
            NodeRole::Superclass => "Superclass",
            NodeRole::Subclass => "Subclass",
        }
    }
}

/// A node in the class graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub role: NodeRole,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, role: NodeRole) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            role,
        }
    }
}

/// Arrow decoration of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arrow {
    #[default]
    To,
    None,
}

/// A directed edge between two node ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub arrows: Arrow,
}

impl GraphEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            arrows: Arrow::To,
        }
    }
}

/// Nodes and edges for one layout run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphModel {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Check that every edge endpoint names a node in `nodes`
pub(crate) fn validate_edges(nodes: &[GraphNode], edges: &[GraphEdge]) -> Result<(), LayoutError> {
    let ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    for edge in edges {
        for endpoint in [&edge.from, &edge.to] {
            if !ids.contains(endpoint.as_str()) {
                return Err(LayoutError::InvalidGraph {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                    missing: endpoint.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Build the neighbourhood graph of `focal`.
///
/// Superclass edges point from the focal class to the superclass and
/// subclass edges point from the subclass to the focal class, so every
/// arrow reads "is a".
pub fn build_graph_model<S: AsRef<str>>(focal: &str, superclasses: &[S], subclasses: &[S]) -> GraphModel {
    let mut nodes = Vec::with_capacity(1 + superclasses.len() + subclasses.len());
    let mut edges = Vec::with_capacity(superclasses.len() + subclasses.len());

    nodes.push(GraphNode::new(focal, NodeRole::Focal));

    for sc in superclasses {
        let sc = sc.as_ref();
        nodes.push(GraphNode::new(sc, NodeRole::Superclass));
        edges.push(GraphEdge::new(focal, sc));
    }

    for sc in subclasses {
        let sc = sc.as_ref();
        nodes.push(GraphNode::new(sc, NodeRole::Subclass));
        edges.push(GraphEdge::new(sc, focal));
    }

    GraphModel { nodes, edges }
}
