//! Main application state and UI.

use crate::api::ApiClient;
use crate::graph::{build_graph_model, compute_layout, render_scene_scaled, GraphModel, Layout, LayoutError, LayoutOptions, NodeRole, Scene, UpdateMode};
use crate::ontology::{ClassHierarchy, ClassInfo, OntologySource, SourceError};
use crate::settings::Settings;
use crate::theme;
use eframe::egui::{self, Align2, RichText, Stroke};
use egui_plot::{Line, Plot, PlotPoint, PlotPoints, Points, Polygon, Text};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Instant;

/// Shown whenever a source call fails; details go to the log
pub(crate) const DATA_UNAVAILABLE: &str = "Data unavailable. Check the connection and try again.";

const NOT_AVAILABLE: &str = "N/A";

/// The selected class, its graph and the latest layout run
pub(crate) struct Selection {
    pub info: ClassInfo,
    pub model: GraphModel,
    pub layout: Result<Layout, LayoutError>,
    pub scene: Scene,
    /// Last drawn sample reading for the class
    pub sample: Option<f64>,
    /// Sensor type typed into the compatibility check
    pub sensor_query: String,
}

impl Selection {
    pub fn new(info: ClassInfo, options: &LayoutOptions) -> Self {
        let model = build_graph_model(&info.name, info.superclasses.as_slice(), info.subclasses.as_slice());
        let (layout, scene) = run_layout(&info.name, &model, options);
        Self {
            info,
            model,
            layout,
            scene,
            sample: None,
            sensor_query: String::new(),
        }
    }

    /// Run a fresh layout with `options`
    pub fn relayout(&mut self, options: &LayoutOptions) {
        let (layout, scene) = run_layout(&self.info.name, &self.model, options);
        self.layout = layout;
        self.scene = scene;
    }
}

fn run_layout(class: &str, model: &GraphModel, options: &LayoutOptions) -> (Result<Layout, LayoutError>, Scene) {
    match compute_layout(&model.nodes, &model.edges, options) {
        Ok(layout) => {
            let scene = render_scene_scaled(model, &layout);
            (Ok(layout), scene)
        }
        Err(e) => {
            tracing::error!(class, error = %e, "Layout failed");
            (Err(e), Scene::default())
        }
    }
}

/// Generation counter that lets stale background responses be dropped
#[derive(Debug, Default)]
pub(crate) struct RequestTracker {
    generation: u64,
}

impl RequestTracker {
    /// Start a new request, invalidating all earlier ones
    pub fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }
}

struct ClassResponse {
    generation: u64,
    name: String,
    result: Result<ClassInfo, SourceError>,
}

pub(crate) struct ListsResponse {
    pub roots: Result<Vec<String>, SourceError>,
    pub all: Result<Vec<String>, SourceError>,
}

impl ListsResponse {
    pub fn fetch(source: &dyn OntologySource) -> Self {
        Self {
            roots: source.root_classes(),
            all: source.all_classes(),
        }
    }

    /// The source answered both list queries
    pub fn is_connected(&self) -> bool {
        self.roots.is_ok() && self.all.is_ok()
    }
}

/// Main ontology viewer application
pub struct OntologyApp {
    // Data source
    source: Arc<dyn OntologySource>,
    source_connected: bool,
    status_error: Option<String>,

    // Class lists
    root_classes: Vec<String>,
    all_classes: Vec<String>,
    root_choice: Option<String>,
    all_choice: Option<String>,
    lists_receiver: Option<Receiver<ListsResponse>>,

    // Selected class
    selection: Option<Selection>,
    requests: RequestTracker,
    class_tx: Sender<ClassResponse>,
    class_rx: Receiver<ClassResponse>,
    class_loading: bool,

    // Settings persistence
    settings: Settings,
    settings_dirty: bool,
    last_settings_save: Instant,
}

/// Pick the local hierarchy when configured, the REST API otherwise
pub(crate) fn open_source(settings: &Settings) -> Result<Arc<dyn OntologySource>, SourceError> {
    match settings.effective_hierarchy_path() {
        Some(path) => {
            let hierarchy = ClassHierarchy::load(path)?;
            Ok(Arc::new(hierarchy))
        }
        None => Ok(Arc::new(ApiClient::new(
            settings.effective_api_base_url(),
            settings.api_token.clone(),
        ))),
    }
}

impl OntologyApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, settings: Settings) -> Self {
        let (source, status_error): (Arc<dyn OntologySource>, Option<String>) = match open_source(&settings) {
            Ok(source) => (source, None),
            Err(e) => {
                tracing::error!(error = %e, "Failed to open ontology source, falling back to API");
                let api: Arc<dyn OntologySource> =
                    Arc::new(ApiClient::new(settings.effective_api_base_url(), settings.api_token.clone()));
                (api, Some(DATA_UNAVAILABLE.to_string()))
            }
        };
        tracing::info!(source = %source.describe(), "Using ontology source");

        let last_class = settings.last_class.clone();
        let (class_tx, class_rx) = mpsc::channel();

        let mut app = Self {
            source,
            source_connected: false,
            status_error,
            root_classes: Vec::new(),
            all_classes: Vec::new(),
            root_choice: None,
            all_choice: None,
            lists_receiver: None,
            selection: None,
            requests: RequestTracker::default(),
            class_tx,
            class_rx,
            class_loading: false,
            settings,
            settings_dirty: false,
            last_settings_save: Instant::now(),
        };

        app.load_lists();
        if let Some(name) = last_class {
            app.all_choice = Some(name.clone());
            app.request_class(name);
        }

        app
    }

    /// Mark settings as needing to be saved
    fn mark_settings_dirty(&mut self) {
        self.settings_dirty = true;
    }

    /// Save settings if dirty and enough time has passed (debounce)
    fn maybe_save_settings(&mut self) {
        if self.settings_dirty && self.last_settings_save.elapsed().as_secs() >= 2 {
            self.settings.save();
            self.settings_dirty = false;
            self.last_settings_save = Instant::now();
        }
    }

    /// Fetch root and full class lists in the background
    fn load_lists(&mut self) {
        let (tx, rx) = mpsc::channel();
        self.lists_receiver = Some(rx);

        let source = Arc::clone(&self.source);
        std::thread::spawn(move || {
            let _ = tx.send(ListsResponse::fetch(source.as_ref()));
        });
    }

    /// Fetch details for `name`; any earlier pending request becomes stale
    fn request_class(&mut self, name: String) {
        let generation = self.requests.begin();
        self.class_loading = true;

        let tx = self.class_tx.clone();
        let source = Arc::clone(&self.source);
        std::thread::spawn(move || {
            let result = source.class_info(&name);
            let _ = tx.send(ClassResponse {
                generation,
                name,
                result,
            });
        });
    }

    fn clear_selection(&mut self) {
        self.requests.begin();
        self.class_loading = false;
        self.selection = None;
        self.root_choice = None;
        self.all_choice = None;
        self.settings.last_class = None;
        self.mark_settings_dirty();
    }

    fn poll_responses(&mut self) {
        if let Some(rx) = &self.lists_receiver {
            if let Ok(response) = rx.try_recv() {
                self.lists_receiver = None;
                self.apply_lists(response);
            }
        }

        let responses: Vec<ClassResponse> = self.class_rx.try_iter().collect();
        for response in responses {
            self.apply_class(response);
        }
    }

    fn apply_lists(&mut self, response: ListsResponse) {
        self.source_connected = response.is_connected();

        match response.roots {
            Ok(roots) => self.root_classes = roots,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load root classes");
                self.status_error = Some(DATA_UNAVAILABLE.to_string());
            }
        }

        match response.all {
            Ok(mut all) => {
                all.sort();
                self.all_classes = all;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load classes");
                self.status_error = Some(DATA_UNAVAILABLE.to_string());
            }
        }
    }

    fn apply_class(&mut self, response: ClassResponse) {
        if !self.requests.is_current(response.generation) {
            tracing::debug!(class = %response.name, "Dropping stale class response");
            return;
        }
        self.class_loading = false;

        match response.result {
            Ok(info) => {
                self.status_error = None;
                self.settings.last_class = Some(info.name.clone());
                self.mark_settings_dirty();
                self.selection = Some(Selection::new(info, &self.settings.layout));
            }
            Err(e) => {
                // Keep whatever was displayed before.
                tracing::error!(class = %response.name, error = %e, "Failed to load class details");
                self.status_error = Some(DATA_UNAVAILABLE.to_string());
            }
        }
    }

    fn relayout(&mut self) {
        if let Some(selection) = &mut self.selection {
            selection.relayout(&self.settings.layout);
        }
    }

    fn render_sidebar(&mut self, ui: &mut egui::Ui) {
        ui.heading("Ontology");
        ui.add_space(10.0);

        // Source status
        ui.horizontal(|ui| {
            if self.source_connected {
                ui.colored_label(theme::state::SUCCESS, "● Connected");
            } else if self.lists_receiver.is_some() {
                ui.colored_label(theme::text::MUTED, "● Connecting…");
            } else {
                ui.colored_label(theme::state::ERROR, "● Disconnected");
            }
        });
        ui.label(RichText::new(self.source.describe()).small().color(theme::text::MUTED));

        if let Some(err) = &self.status_error {
            ui.colored_label(theme::state::ERROR, err.as_str());
        }

        ui.add_space(10.0);
        ui.separator();

        let mut picked_root: Option<String> = None;
        let mut picked_any: Option<String> = None;

        egui::ComboBox::from_label("Root class")
            .selected_text(self.root_choice.as_deref().unwrap_or("Select a root class…"))
            .width(200.0)
            .show_ui(ui, |ui| {
                for cls in &self.root_classes {
                    if ui.selectable_label(self.root_choice.as_deref() == Some(cls.as_str()), cls.as_str()).clicked() {
                        picked_root = Some(cls.clone());
                    }
                }
            });

        egui::ComboBox::from_label("Class")
            .selected_text(self.all_choice.as_deref().unwrap_or("Select a class…"))
            .width(200.0)
            .show_ui(ui, |ui| {
                for cls in &self.all_classes {
                    if ui.selectable_label(self.all_choice.as_deref() == Some(cls.as_str()), cls.as_str()).clicked() {
                        picked_any = Some(cls.clone());
                    }
                }
            });

        if let Some(cls) = picked_root {
            self.root_choice = Some(cls.clone());
            self.all_choice = None;
            self.request_class(cls);
        } else if let Some(cls) = picked_any {
            self.all_choice = Some(cls.clone());
            self.root_choice = None;
            self.request_class(cls);
        }

        ui.horizontal(|ui| {
            if ui.button("Refresh").clicked() {
                self.load_lists();
            }
            if ui.button("Clear").clicked() {
                self.clear_selection();
            }
        });

        ui.add_space(10.0);
        ui.separator();
        self.render_layout_controls(ui);

        ui.add_space(10.0);
        ui.separator();
        ui.label("Display");
        let mut changed = false;
        changed |= ui.add(egui::Slider::new(&mut self.settings.node_size, 4.0..=40.0).text("Node size")).changed();
        changed |= ui.checkbox(&mut self.settings.show_labels, "Show labels").changed();
        changed |= ui.checkbox(&mut self.settings.show_arrows, "Show arrows").changed();
        if changed {
            self.mark_settings_dirty();
        }
    }

    fn render_layout_controls(&mut self, ui: &mut egui::Ui) {
        ui.label("Layout");

        let opts = &mut self.settings.layout;
        let mut changed = false;

        changed |= ui.add(egui::Slider::new(&mut opts.iterations, 0..=500).text("Iterations")).changed();
        changed |= ui
            .add(egui::Slider::new(&mut opts.k, 0.01..=10.0).logarithmic(true).text("Spring constant"))
            .changed();

        egui::ComboBox::from_label("Update mode")
            .selected_text(opts.mode.label())
            .show_ui(ui, |ui| {
                for mode in [UpdateMode::Sequential, UpdateMode::Batched] {
                    changed |= ui.selectable_value(&mut opts.mode, mode, mode.label()).changed();
                }
            });

        changed |= optional_value(ui, &mut opts.max_displacement, "Cap each move", 0.5, 0.01..=10.0);
        changed |= optional_value(ui, &mut opts.tolerance, "Stop when settled", 0.001, 0.0001..=1.0);

        ui.horizontal(|ui| {
            let mut pinned = opts.seed.is_some();
            if ui.checkbox(&mut pinned, "Pin seed").changed() {
                opts.seed = if pinned { Some(0) } else { None };
                changed = true;
            }
            if let Some(seed) = &mut opts.seed {
                changed |= ui.add(egui::DragValue::new(seed)).changed();
            }
        });

        let rerun = ui.button("Re-run layout").clicked();

        if changed {
            self.mark_settings_dirty();
        }
        if changed || rerun {
            self.relayout();
        }

        if let Some(selection) = &self.selection {
            match &selection.layout {
                Ok(layout) => {
                    let report = &layout.report;
                    let mut line = format!("{} iterations", report.iterations_run);
                    if report.converged {
                        line.push_str(", settled");
                    }
                    if let Some(seed) = report.seed {
                        line.push_str(&format!(", seed {}", seed));
                    }
                    ui.label(RichText::new(line).small().color(theme::text::MUTED));
                    if !report.is_finite {
                        ui.colored_label(
                            theme::state::WARNING,
                            "Layout diverged; enable \"Cap each move\" to keep it on screen.",
                        );
                    }
                }
                Err(e) => {
                    ui.colored_label(theme::state::ERROR, e.to_string());
                }
            }
        }
    }

    fn render_details(&mut self, ui: &mut egui::Ui) {
        let class_loading = self.class_loading;
        let Some(selection) = &mut self.selection else {
            if class_loading {
                theme::skeleton_lines(ui, 6, 220.0);
            } else {
                ui.label("Select a class to view its details.");
            }
            return;
        };

        let info = &selection.info;
        let details = &info.details;

        ui.heading(format!("Class: {}", info.name));
        ui.add_space(8.0);

        egui::Grid::new("class_details").num_columns(2).striped(true).show(ui, |ui| {
            ui.strong("Unit of measure");
            ui.label(format_units(details.unit_measure.as_deref()));
            ui.end_row();
            ui.strong("Minimum");
            ui.label(format_value(details.min));
            ui.end_row();
            ui.strong("Maximum");
            ui.label(format_value(details.max));
            ui.end_row();
            ui.strong("Mean");
            ui.label(format_value(details.mean));
            ui.end_row();
        });

        ui.add_space(8.0);
        class_list(ui, "Superclasses", &info.superclasses, "No superclasses", NodeRole::Superclass);
        ui.add_space(8.0);
        class_list(ui, "Subclasses", &info.subclasses, "No subclasses", NodeRole::Subclass);

        ui.add_space(12.0);
        ui.separator();
        ui.strong("Sample reading");
        ui.horizontal(|ui| {
            let can_sample = details.min.is_some() && details.max.is_some();
            if ui.add_enabled(can_sample, egui::Button::new("Draw")).clicked() {
                selection.sample = details.sample_value(&mut rand::thread_rng());
            }
            match selection.sample {
                Some(v) => ui.label(format_reading(v, details.unit_measure.as_deref())),
                None if can_sample => ui.label(RichText::new("-").color(theme::text::MUTED)),
                None => ui.label(RichText::new("Needs min and max").color(theme::text::MUTED)),
            };
        });

        ui.add_space(8.0);
        ui.strong("Compatible sensor types");
        for sensor in info.compatible_sensors() {
            ui.label(format!("• {}", sensor));
        }
        ui.horizontal(|ui| {
            ui.add(egui::TextEdit::singleline(&mut selection.sensor_query).hint_text("Sensor type").desired_width(160.0));
            let query = selection.sensor_query.trim();
            if !query.is_empty() {
                if info.accepts_sensor(query) {
                    ui.colored_label(theme::state::SUCCESS, "compatible");
                } else {
                    ui.colored_label(theme::state::ERROR, "not compatible");
                }
            }
        });
    }

    fn render_graph(&self, ui: &mut egui::Ui) {
        let Some(selection) = &self.selection else {
            Plot::new("ontology_graph_empty")
                .show_axes(false)
                .show_grid(false)
                .show(ui, |_| {});
            return;
        };

        ui.horizontal(|ui| {
            ui.heading(format!("Relationships for {}", selection.info.name));
            ui.add_space(12.0);
            for role in [NodeRole::Focal, NodeRole::Superclass, NodeRole::Subclass] {
                ui.colored_label(role.color(), format!("● {}", role.label()));
            }
        });

        let scene = &selection.scene;
        let node_radius = self.settings.node_size / 2.0;
        let show_labels = self.settings.show_labels;
        let show_arrows = self.settings.show_arrows;

        Plot::new("ontology_graph")
            .show_axes(false)
            .show_grid(false)
            .show_x(false)
            .show_y(false)
            .data_aspect(1.0)
            .show_background(true)
            .show(ui, |plot_ui| {
                for seg in &scene.segments {
                    plot_ui.line(
                        Line::new(PlotPoints::from(vec![[seg.from.x, seg.from.y], [seg.to.x, seg.to.y]]))
                            .color(theme::edge::LINE)
                            .width(1.0),
                    );
                }

                if show_arrows {
                    for head in &scene.arrowheads {
                        let points: Vec<[f64; 2]> = head.points.iter().map(|p| [p.x, p.y]).collect();
                        plot_ui.polygon(
                            Polygon::new(PlotPoints::from(points))
                                .fill_color(theme::edge::LINE)
                                .stroke(Stroke::new(1.0, theme::edge::LINE)),
                        );
                    }
                }

                for marker in scene.markers.iter().filter(|m| m.position.is_finite()) {
                    let [x, y] = [marker.position.x, marker.position.y];
                    plot_ui.points(
                        Points::new(vec![[x, y]])
                            .radius(node_radius)
                            .filled(true)
                            .color(marker.role.color())
                            .name(&marker.label),
                    );
                    if show_labels {
                        plot_ui.text(
                            Text::new(PlotPoint::new(x, y), RichText::new(&marker.label).color(theme::text::PRIMARY))
                                .anchor(Align2::CENTER_BOTTOM),
                        );
                    }
                }
            });
    }
}

/// Checkbox plus slider for an optional numeric setting
fn optional_value(
    ui: &mut egui::Ui,
    value: &mut Option<f64>,
    label: &str,
    initial: f64,
    range: std::ops::RangeInclusive<f64>,
) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        let mut enabled = value.is_some();
        if ui.checkbox(&mut enabled, label).changed() {
            *value = if enabled { Some(initial) } else { None };
            changed = true;
        }
        if let Some(v) = value {
            changed |= ui.add(egui::Slider::new(v, range).logarithmic(true)).changed();
        }
    });
    changed
}

fn class_list(ui: &mut egui::Ui, title: &str, classes: &[String], empty: &str, role: NodeRole) {
    ui.strong(title);
    if classes.is_empty() {
        ui.label(RichText::new(empty).color(theme::text::MUTED));
        return;
    }
    for cls in classes {
        ui.colored_label(role.color(), format!("• {}", cls));
    }
}

/// Units joined with ", ", or N/A
pub(crate) fn format_units(units: Option<&[String]>) -> String {
    match units {
        Some(units) => units.join(", "),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// A sample value with the first unit, if any
pub(crate) fn format_reading(value: f64, units: Option<&[String]>) -> String {
    match units.and_then(|u| u.first()) {
        Some(unit) => format!("{} {}", value, unit),
        None => value.to_string(),
    }
}

pub(crate) fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string())
}

impl eframe::App for OntologyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_responses();

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(280.0)
            .frame(egui::Frame::side_top_panel(&ctx.style()).fill(theme::bg::PANEL))
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.render_sidebar(ui);
                });
            });

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(300.0)
            .frame(egui::Frame::side_top_panel(&ctx.style()).fill(theme::bg::SURFACE))
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.render_details(ui);
                });
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::central_panel(&ctx.style()).fill(theme::bg::GRAPH))
            .show(ctx, |ui| {
                self.render_graph(ui);
            });

        if self.lists_receiver.is_some() || self.class_loading {
            ctx.request_repaint_after(std::time::Duration::from_millis(50));
        }

        self.maybe_save_settings();
    }

    fn save(&mut self, _storage: &mut dyn eframe::Storage) {
        if self.settings_dirty {
            self.settings.save();
            self.settings_dirty = false;
        }
    }

    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        theme::bg::GRAPH.to_normalized_gamma_f32()
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
