use super::*;
use crate::ontology::{ClassDetails, OntologyError};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;

fn info(name: &str, supers: &[&str], subs: &[&str]) -> ClassInfo {
    ClassInfo {
        name: name.into(),
        details: ClassDetails::default(),
        superclasses: supers.iter().map(|s| s.to_string()).collect(),
        subclasses: subs.iter().map(|s| s.to_string()).collect(),
    }
}

fn capped(seed: u64) -> LayoutOptions {
    LayoutOptions {
        max_displacement: Some(0.5),
        seed: Some(seed),
        ..LayoutOptions::default()
    }
}

#[test]
fn units_are_joined_or_not_available() {
    let units = vec!["Celsius".to_string(), "Kelvin".to_string()];
    assert_eq!(format_units(Some(units.as_slice())), "Celsius, Kelvin");
    assert_eq!(format_units(None), "N/A");
}

#[test]
fn values_fall_back_to_not_available() {
    assert_eq!(format_value(Some(-40.0)), "-40");
    assert_eq!(format_value(Some(12.5)), "12.5");
    assert_eq!(format_value(None), "N/A");
}

#[test]
fn readings_use_the_first_unit() {
    let units = vec!["Celsius".to_string(), "Kelvin".to_string()];
    assert_eq!(format_reading(21.5, Some(units.as_slice())), "21.5 Celsius");
    assert_eq!(format_reading(3.0, Some(&[][..])), "3");
    assert_eq!(format_reading(3.0, None), "3");
}

#[test]
fn only_latest_request_is_current() {
    let mut tracker = RequestTracker::default();
    let first = tracker.begin();
    let second = tracker.begin();
    assert!(!tracker.is_current(first));
    assert!(tracker.is_current(second));

    // Clearing the selection starts a new generation without a request.
    tracker.begin();
    assert!(!tracker.is_current(second));
}

#[test]
fn selection_builds_graph_and_scene() {
    let selection = Selection::new(info("Temp", &["Env", "Sensor"], &["Indoor"]), &capped(3));

    assert_eq!(selection.model.nodes.len(), 4);
    assert_eq!(selection.model.edges.len(), 3);

    let layout = selection.layout.as_ref().unwrap();
    assert!(layout.report.is_finite);
    assert_eq!(selection.scene.markers.len(), 4);
    assert_eq!(selection.scene.segments.len(), 3);
}

#[test]
fn relayout_with_same_seed_is_stable() {
    let mut selection = Selection::new(info("A", &["B"], &["C", "D"]), &capped(99));
    let before = selection.layout.as_ref().unwrap().positions.clone();

    selection.relayout(&capped(99));
    assert_eq!(selection.layout.as_ref().unwrap().positions, before);
}

#[test]
fn invalid_options_leave_an_empty_scene() {
    let opts = LayoutOptions {
        k: 0.0,
        ..capped(1)
    };
    let selection = Selection::new(info("A", &["B"], &[]), &opts);
    assert!(matches!(selection.layout, Err(LayoutError::InvalidOptions(_))));
    assert!(selection.scene.markers.is_empty());
}

#[test]
fn open_source_prefers_local_hierarchy() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(br#"{"Sensor": {}, "Thermometer": {"superclass": ["Sensor"]}}"#)
        .unwrap();

    let settings = Settings {
        hierarchy_path: Some(file.path().to_path_buf()),
        ..Settings::default()
    };
    let source = open_source(&settings).unwrap();
    assert_eq!(source.root_classes().unwrap(), vec!["Sensor"]);
    assert_eq!(source.class_info("Thermometer").unwrap().superclasses, vec!["Sensor"]);
}

#[test]
fn open_source_reports_missing_hierarchy() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        hierarchy_path: Some(dir.path().join("missing.json")),
        ..Settings::default()
    };
    assert!(matches!(
        open_source(&settings),
        Err(SourceError::Ontology(OntologyError::Io(_)))
    ));
}

#[test]
fn open_source_defaults_to_api() {
    let source = open_source(&Settings::default()).unwrap();
    assert!(source.describe().starts_with("API "));
}

/// Serve the ontology list routes only; every other path gets a 404
fn serve_ontology_lists() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
            }

            let path = request_line.split_whitespace().nth(1).unwrap_or_default();
            let (status, body) = match path {
                "/api/v1/digital-twins/ontology/root-classes" => ("200 OK", r#"["Sensor"]"#),
                "/api/v1/digital-twins/ontology/classes" => ("200 OK", r#"["Thermometer","Sensor"]"#),
                _ => ("404 Not Found", r#"{"detail":"Not Found"}"#),
            };
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    format!("http://{}/api/v1", addr)
}

#[test]
fn api_serving_only_ontology_routes_counts_as_connected() {
    let client = ApiClient::new(serve_ontology_lists(), None);
    let lists = ListsResponse::fetch(&client);

    assert!(lists.is_connected());
    assert_eq!(lists.roots.unwrap(), vec!["Sensor"]);
    assert_eq!(lists.all.unwrap(), vec!["Sensor", "Thermometer"]);
}

#[test]
fn failed_list_query_counts_as_disconnected() {
    // Nothing listens on a port whose listener was just dropped.
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let client = ApiClient::new(format!("http://{}/api/v1", addr), None);
    let lists = ListsResponse::fetch(&client);
    assert!(!lists.is_connected());
}
