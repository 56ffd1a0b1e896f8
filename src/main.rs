//! Native ontology viewer
//!
//! Browse the class hierarchy of a digital twin platform and see each
//! class laid out with its superclasses and subclasses.

mod api;
mod app;
mod graph;
mod ontology;
mod settings;
mod theme;

use eframe::egui;
use settings::Settings;

fn main() -> eframe::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let settings = Settings::load();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_title("Ontology Graph"),
        persist_window: true,
        ..Default::default()
    };

    eframe::run_native(
        "Ontology Graph",
        options,
        Box::new(|cc| Ok(Box::new(app::OntologyApp::new(cc, settings)))),
    )
}
