//! Graph model, layout and plot primitives for class neighbourhoods.

pub mod layout;
pub mod render;
pub mod types;

pub use layout::{compute_layout, Layout, LayoutError, LayoutOptions, UpdateMode};
pub use render::{render_scene_scaled, Scene};
pub use types::{build_graph_model, GraphModel, NodeRole};
