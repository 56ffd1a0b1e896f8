//! Conversion of a laid-out graph into plot primitives.

use super::layout::{Layout, Position};
use super::types::{Arrow, GraphModel, NodeRole};
use std::f64::consts::PI;

/// Arrowhead geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowStyle {
    /// Distance from the target node to the arrow tip
    pub node_offset: f64,
    /// Length of the arrowhead sides
    pub size: f64,
    /// Half-angle of the arrowhead in radians
    pub angle: f64,
}

impl Default for ArrowStyle {
    fn default() -> Self {
        Self {
            node_offset: 10.0,
            size: 5.0,
            angle: PI / 6.0,
        }
    }
}

impl ArrowStyle {
    /// Default proportions shrunk to a drawing whose larger side is `extent`
    pub fn for_extent(extent: f64) -> Self {
        let extent = if extent.is_finite() && extent > 0.0 { extent } else { 1.0 };
        Self {
            node_offset: extent / 40.0,
            size: extent / 80.0,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeMarker {
    pub position: Position,
    pub label: String,
    pub role: NodeRole,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeSegment {
    pub from: Position,
    pub to: Position,
}

/// Filled triangle drawn as `[left, tip, right]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrowhead {
    pub points: [Position; 3],
}

/// Everything needed to draw one layout run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub markers: Vec<NodeMarker>,
    pub segments: Vec<EdgeSegment>,
    pub arrowheads: Vec<Arrowhead>,
}

/// Bounding box of the finite points as `(min, max)`
fn bounds_of(points: impl Iterator<Item = Position>) -> Option<(Position, Position)> {
    let mut finite = points.filter(Position::is_finite);
    let first = finite.next()?;
    Some(finite.fold((first, first), |(min, max), p| {
        (
            Position::new(min.x.min(p.x), min.y.min(p.y)),
            Position::new(max.x.max(p.x), max.y.max(p.y)),
        )
    }))
}

/// Build plot primitives for `model` positioned by `layout`.
pub fn render_scene(model: &GraphModel, layout: &Layout, style: &ArrowStyle) -> Scene {
    let mut scene = Scene::default();

    for node in &model.nodes {
        if let Some(position) = layout.position(&node.id) {
            scene.markers.push(NodeMarker {
                position,
                label: node.label.clone(),
                role: node.role,
            });
        }
    }

    for edge in &model.edges {
        let (Some(from), Some(to)) = (layout.position(&edge.from), layout.position(&edge.to)) else {
            continue;
        };
        if !from.is_finite() || !to.is_finite() {
            continue;
        }

        scene.segments.push(EdgeSegment { from, to });

        if edge.arrows == Arrow::To {
            if let Some(head) = arrowhead(from, to, style) {
                scene.arrowheads.push(head);
            }
        }
    }

    scene
}

/// Like [`render_scene`], with arrowheads sized to the layout's extent
pub fn render_scene_scaled(model: &GraphModel, layout: &Layout) -> Scene {
    let extent = bounds_of(layout.positions.values().copied())
        .map(|(min, max)| (max.x - min.x).max(max.y - min.y))
        .unwrap_or(1.0);

    render_scene(model, layout, &ArrowStyle::for_extent(extent))
}

/// Arrowhead near `to`, or `None` for a zero-length edge
pub fn arrowhead(from: Position, to: Position, style: &ArrowStyle) -> Option<Arrowhead> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len <= 0.0 {
        return None;
    }

    let nx = dx / len;
    let ny = dy / len;

    let end = Position::new(to.x - nx * style.node_offset, to.y - ny * style.node_offset);

    let (sin, cos) = style.angle.sin_cos();
    let s = style.size;

    let left = Position::new(
        end.x - s * (nx * cos + ny * sin),
        end.y - s * (ny * cos - nx * sin),
    );
    let right = Position::new(
        end.x - s * (nx * cos - ny * sin),
        end.y - s * (ny * cos + nx * sin),
    );

    Some(Arrowhead {
        points: [left, end, right],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::layout::LayoutReport;
    use crate::graph::types::build_graph_model;
    use std::collections::HashMap;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn layout_of(points: &[(&str, f64, f64)]) -> Layout {
        Layout {
            positions: points
                .iter()
                .map(|(id, x, y)| (id.to_string(), Position::new(*x, *y)))
                .collect::<HashMap<_, _>>(),
            report: LayoutReport {
                seed: None,
                iterations_run: 0,
                converged: false,
                last_max_movement: 0.0,
                is_finite: true,
            },
        }
    }

    #[test]
    fn test_arrowhead_on_horizontal_edge() {
        let head = arrowhead(Position::new(0.0, 0.0), Position::new(100.0, 0.0), &ArrowStyle::default()).unwrap();
        let [left, tip, right] = head.points;

        assert!(approx(tip.x, 90.0) && approx(tip.y, 0.0));

        let back = 5.0 * (PI / 6.0).cos();
        let side = 5.0 * (PI / 6.0).sin();
        assert!(approx(left.x, 90.0 - back) && approx(left.y, side));
        assert!(approx(right.x, 90.0 - back) && approx(right.y, -side));
    }

    #[test]
    fn test_arrowhead_sides_have_arrow_size() {
        let head = arrowhead(Position::new(-3.0, 4.0), Position::new(40.0, -12.0), &ArrowStyle::default()).unwrap();
        let [left, tip, right] = head.points;
        let dist = |a: Position, b: Position| Position::new(a.x - b.x, a.y - b.y).length();
        assert!(approx(dist(left, tip), 5.0));
        assert!(approx(dist(right, tip), 5.0));
    }

    #[test]
    fn test_zero_length_edge_has_no_arrowhead() {
        let p = Position::new(1.0, 1.0);
        assert!(arrowhead(p, p, &ArrowStyle::default()).is_none());
    }

    #[test]
    fn test_render_scene_counts() {
        let model = build_graph_model("A", &["B"], &["C"]);
        let layout = layout_of(&[("A", 0.0, 0.0), ("B", 50.0, 0.0), ("C", 0.0, 50.0)]);
        let scene = render_scene(&model, &layout, &ArrowStyle::default());

        assert_eq!(scene.markers.len(), 3);
        assert_eq!(scene.segments.len(), 2);
        assert_eq!(scene.arrowheads.len(), 2);
        assert_eq!(scene.markers[0].role, NodeRole::Focal);
        assert_eq!(scene.segments[1].from, Position::new(0.0, 50.0));

        let (min, max) = bounds_of(scene.markers.iter().map(|m| m.position)).unwrap();
        assert_eq!(min, Position::new(0.0, 0.0));
        assert_eq!(max, Position::new(50.0, 50.0));
    }

    #[test]
    fn test_scaled_arrowheads_follow_extent() {
        let model = build_graph_model("A", &["B"], &[] as &[&str]);
        let layout = layout_of(&[("A", 0.0, 0.0), ("B", 2.0, 0.0)]);
        let scene = render_scene_scaled(&model, &layout);

        assert_eq!(scene.arrowheads.len(), 1);
        let [left, tip, _] = scene.arrowheads[0].points;
        assert!(approx(tip.x, 2.0 - 2.0 / 40.0));
        let side = Position::new(left.x - tip.x, left.y - tip.y).length();
        assert!(approx(side, 2.0 / 80.0));
    }

    #[test]
    fn test_for_extent_guards_degenerate_extent() {
        assert_eq!(ArrowStyle::for_extent(0.0), ArrowStyle::for_extent(1.0));
        assert_eq!(ArrowStyle::for_extent(f64::NAN).size, 1.0 / 80.0);
    }

    #[test]
    fn test_render_scene_skips_non_finite_edges() {
        let model = build_graph_model("A", &["B"], &[] as &[&str]);
        let layout = layout_of(&[("A", f64::NAN, 0.0), ("B", 1.0, 1.0)]);
        let scene = render_scene(&model, &layout, &ArrowStyle::default());

        assert_eq!(scene.markers.len(), 2);
        assert!(scene.segments.is_empty());
        assert!(scene.arrowheads.is_empty());
        assert_eq!(
            bounds_of(layout.positions.values().copied()),
            Some((Position::new(1.0, 1.0), Position::new(1.0, 1.0)))
        );
    }
}
