//! Force-directed (spring embedding) layout.
//!
//! Every iteration runs two passes:
//! - Repulsion between all node pairs, inverse-square in distance
//! - Attraction along edges, linear in distance
//!
//! Updates are applied to positions directly. There is no velocity,
//! damping or target edge length, so with default options the attraction
//! pass overshoots and separations grow every iteration. `max_displacement`
//! bounds each individual update when finite output matters more than
//! matching the classic numerics.

use super::types::{validate_edges, GraphEdge, GraphNode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Errors raised before a layout run starts
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("edge {from} -> {to} references unknown node '{missing}'")]
    InvalidGraph {
        from: String,
        to: String,
        missing: String,
    },
    #[error("invalid layout option: {0}")]
    InvalidOptions(String),
}

/// A 2D position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// How updates within a pass become visible to the rest of the pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// Each node/edge update is applied immediately, later ones see it
    #[default]
    Sequential,
    /// All contributions of a pass are computed from the same snapshot
    Batched,
}

impl UpdateMode {
    pub fn label(&self) -> &'static str {
        match self {
            UpdateMode::Sequential => "Sequential",
            UpdateMode::Batched => "Batched",
        }
    }
}

/// Layout parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Number of iterations
    pub iterations: usize,
    /// Spring constant: repulsion is `k / d²`, attraction is `d / k`
    pub k: f64,
    /// Added to every distance to avoid division by zero
    pub epsilon: f64,
    /// Seed for the initial placement; `None` seeds from the clock
    pub seed: Option<u64>,
    pub mode: UpdateMode,
    /// Stop once no node moves further than this in one iteration
    pub tolerance: Option<f64>,
    /// Upper bound on the length of any single position update
    pub max_displacement: Option<f64>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            iterations: 50,
            k: 0.1,
            epsilon: 0.01,
            seed: None,
            mode: UpdateMode::Sequential,
            tolerance: None,
            max_displacement: None,
        }
    }
}

impl LayoutOptions {
    fn validate(&self) -> Result<(), LayoutError> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(LayoutError::InvalidOptions(format!("{} must be finite and positive, got {}", name, v)))
            }
        };
        positive("k", self.k)?;
        positive("epsilon", self.epsilon)?;
        if let Some(t) = self.tolerance {
            positive("tolerance", t)?;
        }
        if let Some(m) = self.max_displacement {
            positive("max_displacement", m)?;
        }
        Ok(())
    }
}

/// Diagnostics for one layout run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutReport {
    /// Seed used for the initial placement, when the RNG was seeded here
    pub seed: Option<u64>,
    pub iterations_run: usize,
    /// True when the run stopped early because of `tolerance`
    pub converged: bool,
    /// Largest distance any node moved during the last iteration
    pub last_max_movement: f64,
    /// False when any coordinate overflowed to infinity or NaN
    pub is_finite: bool,
}

/// Result of a layout run
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub positions: HashMap<String, Position>,
    pub report: LayoutReport,
}

impl Layout {
    pub fn position(&self, id: &str) -> Option<Position> {
        self.positions.get(id).copied()
    }
}

/// Compute positions for `nodes` using the RNG described by `options.seed`.
pub fn compute_layout(
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    options: &LayoutOptions,
) -> Result<Layout, LayoutError> {
    let seed = options.seed.unwrap_or_else(clock_seed);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut layout = compute_layout_with_rng(nodes, edges, options, &mut rng)?;
    layout.report.seed = Some(seed);
    Ok(layout)
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// Compute positions drawing the initial placement from `rng`.
///
/// `options.seed` is ignored here.
pub fn compute_layout_with_rng<R: Rng + ?Sized>(
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    options: &LayoutOptions,
    rng: &mut R,
) -> Result<Layout, LayoutError> {
    options.validate()?;
    validate_edges(nodes, edges)?;

    let mut sim = Simulation::new(nodes, edges, options, rng);

    let mut iterations_run = 0;
    let mut converged = false;
    let mut last_max_movement = 0.0;

    for _ in 0..options.iterations {
        let before = sim.positions.clone();

        match options.mode {
            UpdateMode::Sequential => {
                sim.repel_sequential();
                sim.attract_sequential();
            }
            UpdateMode::Batched => {
                sim.repel_batched();
                sim.attract_batched();
            }
        }

        iterations_run += 1;
        last_max_movement = max_movement(&before, &sim.positions);

        if let Some(tolerance) = options.tolerance {
            if last_max_movement < tolerance {
                converged = true;
                break;
            }
        }
    }

    let is_finite = sim.positions.iter().all(Position::is_finite);
    if !is_finite {
        tracing::warn!(
            nodes = sim.ids.len(),
            edges = edges.len(),
            iterations_run,
            "Layout diverged to non-finite coordinates"
        );
    } else {
        tracing::debug!(
            nodes = sim.ids.len(),
            edges = edges.len(),
            iterations_run,
            converged,
            last_max_movement,
            "Layout finished"
        );
    }

    let positions = sim.ids.into_iter().zip(sim.positions).collect();

    Ok(Layout {
        positions,
        report: LayoutReport {
            seed: None,
            iterations_run,
            converged,
            last_max_movement,
            is_finite,
        },
    })
}

/// Largest move between two snapshots; infinite once any coordinate is
/// non-finite, so a diverged run never counts as settled
fn max_movement(before: &[Position], after: &[Position]) -> f64 {
    let mut max = 0.0_f64;
    for (b, a) in before.iter().zip(after) {
        let moved = Position::new(a.x - b.x, a.y - b.y).length();
        if !moved.is_finite() {
            return f64::INFINITY;
        }
        max = max.max(moved);
    }
    max
}

/// Working state of one run.
///
/// Positions are stored once per distinct id. `order` holds one slot index
/// per input node entry, so a duplicated id shares its slot and is visited
/// once per entry, like the input list.
struct Simulation {
    ids: Vec<String>,
    positions: Vec<Position>,
    order: Vec<usize>,
    edges: Vec<(usize, usize)>,
    k: f64,
    epsilon: f64,
    max_displacement: Option<f64>,
}

impl Simulation {
    fn new<R: Rng + ?Sized>(nodes: &[GraphNode], edges: &[GraphEdge], options: &LayoutOptions, rng: &mut R) -> Self {
        let mut slots: HashMap<&str, usize> = HashMap::new();
        let mut ids = Vec::new();
        let mut positions = Vec::new();
        let mut order = Vec::with_capacity(nodes.len());

        for node in nodes {
            let x = rng.gen_range(-1.0..1.0);
            let y = rng.gen_range(-1.0..1.0);
            let initial = Position::new(x, y);

            let slot = match slots.get(node.id.as_str()) {
                Some(&slot) => {
                    positions[slot] = initial;
                    slot
                }
                None => {
                    let slot = ids.len();
                    slots.insert(node.id.as_str(), slot);
                    ids.push(node.id.clone());
                    positions.push(initial);
                    slot
                }
            };
            order.push(slot);
        }

        // Endpoints were validated by the caller.
        let edges = edges
            .iter()
            .filter_map(|e| Some((*slots.get(e.from.as_str())?, *slots.get(e.to.as_str())?)))
            .collect();

        Self {
            ids,
            positions,
            order,
            edges,
            k: options.k,
            epsilon: options.epsilon,
            max_displacement: options.max_displacement,
        }
    }

    fn clamp(&self, dx: f64, dy: f64) -> (f64, f64) {
        match self.max_displacement {
            Some(max) => {
                let len = (dx * dx + dy * dy).sqrt();
                if len > max {
                    (dx / len * max, dy / len * max)
                } else {
                    (dx, dy)
                }
            }
            None => (dx, dy),
        }
    }

    /// Repulsive push on `slot` from every other slot in `order`
    fn repulsion_on(&self, slot: usize, positions: &[Position]) -> (f64, f64) {
        let p = positions[slot];
        let mut fx = 0.0;
        let mut fy = 0.0;

        for &other in &self.order {
            if other == slot {
                continue;
            }
            let q = positions[other];
            let dx = p.x - q.x;
            let dy = p.y - q.y;
            let distance = (dx * dx + dy * dy).sqrt() + self.epsilon;
            let repulsive = self.k / (distance * distance);

            fx += dx / distance * repulsive;
            fy += dy / distance * repulsive;
        }

        (fx, fy)
    }

    /// Half of the spring displacement for an edge, pointing from `to` towards `from`
    fn attraction_on(&self, from: usize, to: usize, positions: &[Position]) -> (f64, f64) {
        let a = positions[from];
        let b = positions[to];
        let dx = a.x - b.x;
        let dy = a.y - b.y;
        let distance = (dx * dx + dy * dy).sqrt() + self.epsilon;
        let attractive = distance / self.k;

        (dx / distance * attractive / 2.0, dy / distance * attractive / 2.0)
    }

    fn repel_sequential(&mut self) {
        for i in 0..self.order.len() {
            let slot = self.order[i];
            let (fx, fy) = self.repulsion_on(slot, &self.positions);
            let (fx, fy) = self.clamp(fx, fy);
            self.positions[slot].x += fx;
            self.positions[slot].y += fy;
        }
    }

    fn repel_batched(&mut self) {
        let snapshot = self.positions.clone();
        for &slot in &self.order {
            let (fx, fy) = self.repulsion_on(slot, &snapshot);
            let (fx, fy) = self.clamp(fx, fy);
            self.positions[slot].x += fx;
            self.positions[slot].y += fy;
        }
    }

    fn attract_sequential(&mut self) {
        for i in 0..self.edges.len() {
            let (from, to) = self.edges[i];
            let (hx, hy) = self.attraction_on(from, to, &self.positions);
            let (hx, hy) = self.clamp(hx, hy);
            self.positions[from].x -= hx;
            self.positions[from].y -= hy;
            self.positions[to].x += hx;
            self.positions[to].y += hy;
        }
    }

    fn attract_batched(&mut self) {
        let snapshot = self.positions.clone();
        for &(from, to) in &self.edges {
            let (hx, hy) = self.attraction_on(from, to, &snapshot);
            let (hx, hy) = self.clamp(hx, hy);
            self.positions[from].x -= hx;
            self.positions[from].y -= hy;
            self.positions[to].x += hx;
            self.positions[to].y += hy;
        }
    }
}
