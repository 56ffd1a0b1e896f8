//! Color constants for the ontology viewer.
//!
//! Graph roles and UI panels draw from the same palette so the legend,
//! the detail lists and the plot agree.

use egui::Color32;

/// Background colors for different layers
pub mod bg {
    use super::*;

    /// Plot area background - darkest layer
    pub const GRAPH: Color32 = Color32::from_rgb(14, 17, 23);

    /// Panel backgrounds
    pub const PANEL: Color32 = Color32::from_rgb(20, 22, 28);

    /// Card/elevated surface backgrounds
    pub const SURFACE: Color32 = Color32::from_rgb(28, 30, 38);
}

/// Accent colors
pub mod accent {
    use super::*;

    pub const GREEN: Color32 = Color32::from_rgb(34, 197, 94);

    pub const BLUE: Color32 = Color32::from_rgb(59, 130, 246);

    pub const RED: Color32 = Color32::from_rgb(239, 68, 68);
}

/// Node colors per graph role
pub mod role {
    use super::*;

    /// Selected class
    pub const FOCAL: Color32 = super::accent::RED;

    pub const SUPERCLASS: Color32 = super::accent::BLUE;

    pub const SUBCLASS: Color32 = super::accent::GREEN;
}

/// Edge and arrowhead colors
pub mod edge {
    use super::*;

    pub const LINE: Color32 = Color32::from_rgb(136, 136, 136);
}

/// Text colors at different emphasis levels
pub mod text {
    use super::*;

    pub const PRIMARY: Color32 = Color32::from_rgb(240, 240, 245);

    /// Muted text - low contrast for less important info
    pub const MUTED: Color32 = Color32::from_rgb(120, 125, 135);
}

/// State colors for status lines
pub mod state {
    use super::*;

    pub const SUCCESS: Color32 = super::accent::GREEN;

    pub const ERROR: Color32 = super::accent::RED;

    pub const WARNING: Color32 = Color32::from_rgb(245, 158, 11);
}

/// Skeleton loading placeholder colors
pub mod skeleton {
    use super::*;

    pub const BASE: Color32 = Color32::from_rgb(35, 38, 48);

    pub const SHIMMER: Color32 = Color32::from_rgb(50, 53, 63);
}

/// Create a skeleton rectangle for loading placeholders
pub fn skeleton_rect(ui: &mut egui::Ui, width: f32, height: f32) {
    let (rect, _) = ui.allocate_exact_size(egui::Vec2::new(width, height), egui::Sense::hover());

    let time = ui.ctx().input(|i| i.time);
    let phase = ((time * 2.0).sin() * 0.5 + 0.5) as f32; // 0 to 1 oscillation

    let color = Color32::from_rgb(
        lerp_u8(skeleton::BASE.r(), skeleton::SHIMMER.r(), phase),
        lerp_u8(skeleton::BASE.g(), skeleton::SHIMMER.g(), phase),
        lerp_u8(skeleton::BASE.b(), skeleton::SHIMMER.b(), phase),
    );

    ui.painter().rect_filled(rect, 4.0, color);
    ui.ctx().request_repaint();
}

/// Several skeleton text lines of varying width
pub fn skeleton_lines(ui: &mut egui::Ui, count: usize, base_width: f32) {
    for i in 0..count {
        let width_factor = match i % 3 {
            0 => 1.0,
            1 => 0.85,
            _ => 0.7,
        };
        skeleton_rect(ui, base_width * width_factor, 14.0);
        if i + 1 < count {
            ui.add_space(4.0);
        }
    }
}

fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    let result = a as f32 + (b as f32 - a as f32) * t;
    result.clamp(0.0, 255.0) as u8
}
