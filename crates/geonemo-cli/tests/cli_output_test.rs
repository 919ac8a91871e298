//! Integration tests for the geonemo binary
//!
//! Each test writes a small catalog to a temporary directory and runs the
//! binary against it, parsing the JSON printed on stdout.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const SQUARE: &str = r#"{"type": "FeatureCollection", "features": [
    {"type": "Feature", "properties": {"nombre": "Cuadrado", "superficie": 40},
     "geometry": {"type": "Polygon",
        "coordinates": [[[-10, -10], [10, -10], [10, 10], [-10, 10], [-10, -10]]]}}
]}"#;

const CATALOG: &str = r#"{"groups": [
    {"id": "cuadrado", "label": "Cuadrado", "files": ["square.geojson"]},
    {"id": "vacio", "files": []},
    {"id": "apagado", "enabled": false, "files": ["square.geojson"]}
]}"#;

fn workspace(catalog: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("square.geojson"), SQUARE).unwrap();
    fs::write(dir.path().join("grupos.json"), catalog).unwrap();
    dir
}

fn geonemo(dir: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_geonemo"));
    for key in [
        "GEONEMO_GROUPS",
        "GEONEMO_BASE_URL",
        "GEONEMO_METRIC",
        "GEONEMO_DRAW_THRESHOLD_M",
        "GEONEMO_COMPUTE_AREA",
        "GEONEMO_HEAVY_VERTICES",
        "GEONEMO_FETCH_TIMEOUT_S",
    ] {
        command.env_remove(key);
    }
    command
        .current_dir(dir)
        .args(args)
        .output()
        .expect("Failed to execute geonemo")
}

fn json_stdout(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("Output should be valid JSON")
}

#[test]
fn test_resolve_inside_as_json() {
    let dir = workspace(CATALOG);
    let output = geonemo(
        dir.path(),
        &["resolve", "--json", "--groups", "grupos.json", "--metric", "planar", "--lon", "1", "--lat", "2"],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let parsed = json_stdout(&output);
    assert_eq!(parsed["status"], "success");

    let data = &parsed["data"];
    assert_eq!(data["summary"]["status"], "inside");
    assert_eq!(data["summary"]["dominant_group"], "Cuadrado");
    assert_eq!(data["click"]["lat"], 2.0);
    assert_eq!(data["click"]["lng"], 1.0);

    let groups = data["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 2, "disabled groups are not resolved");
    assert_eq!(groups[0]["group_id"], "cuadrado");
    assert_eq!(groups[0]["border_distance"], 8.0);
    assert_eq!(groups[0]["distance"], 0.0);
    assert_eq!(groups[1]["status"], "none");
    assert_eq!(data["near"], serde_json::json!(["cuadrado"]));
    assert_eq!(data["unmatched"], serde_json::json!(["vacio"]));
}

#[test]
fn test_resolve_writes_payload() {
    let dir = workspace(CATALOG);
    let output = geonemo(
        dir.path(),
        &[
            "resolve", "--groups", "grupos.json", "--metric", "planar", "--threshold", "1",
            "--lon", "15", "--lat", "0", "--out", "out/resultado.json",
        ],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let written = fs::read_to_string(dir.path().join("out/resultado.json")).unwrap();
    let payload: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(payload["summary"]["status"], "nearest_perimeter");
    assert_eq!(payload["summary"]["min_distance"], 5.0);
    assert_eq!(payload["draw_threshold"], 1.0);
    assert_eq!(payload["far"], serde_json::json!(["cuadrado"]));
}

#[test]
fn test_planar_distances_print_without_units() {
    let dir = workspace(CATALOG);
    let output = geonemo(
        dir.path(),
        &["resolve", "--groups", "grupos.json", "--metric", "planar", "--lon", "15", "--lat", "0"],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("5.0000"), "stdout: {}", stdout);
    assert!(!stdout.contains(" km"), "stdout: {}", stdout);
    assert!(!stdout.contains("5 m"), "stdout: {}", stdout);
    assert!(stdout.contains("270°"), "stdout: {}", stdout);
}

#[test]
fn test_resolve_missing_catalog_fails() {
    let dir = TempDir::new().unwrap();
    let output = geonemo(dir.path(), &["resolve", "--groups", "nada.json", "--lon", "0", "--lat", "0"]);

    assert!(!output.status.success());
}

#[test]
fn test_inspect_passes_on_a_good_catalog() {
    let dir = workspace(CATALOG);
    let output = geonemo(dir.path(), &["inspect", "--json", "--groups", "grupos.json"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let data = &json_stdout(&output)["data"];
    assert_eq!(data["totals"]["files"], 1);
    assert_eq!(data["totals"]["ok"], 1);
    assert_eq!(data["groups"][0]["files"][0]["indexable"], 1);
    assert_eq!(data["heaviest"][0]["vertices"], 5);
}

#[test]
fn test_inspect_fails_on_missing_file() {
    let dir = workspace(
        r#"[{"id": "roto", "files": ["square.geojson", "falta.geojson"]}]"#,
    );
    let output = geonemo(dir.path(), &["inspect", "--json", "--groups", "grupos.json"]);

    assert!(!output.status.success());
    let data = &json_stdout(&output)["data"];
    assert_eq!(data["totals"]["missing"], 1);
    assert_eq!(data["groups"][0]["files"][1]["status"], "missing");
}

#[test]
fn test_config_reports_sources() {
    let dir = workspace(CATALOG);
    fs::write(dir.path().join("geonemo.toml"), "metric = \"planar\"\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_geonemo"))
        .current_dir(dir.path())
        .env("GEONEMO_DRAW_THRESHOLD_M", "1000")
        .env_remove("GEONEMO_METRIC")
        .env_remove("GEONEMO_FETCH_TIMEOUT_S")
        .args(["config", "--json", "--groups", "grupos.json", "--timeout", "7"])
        .output()
        .expect("Failed to execute geonemo");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let values = &json_stdout(&output)["data"]["values"];
    assert_eq!(values["metric"]["value"], "planar");
    assert_eq!(values["metric"]["source"], "File");
    assert_eq!(values["draw_threshold_m"]["source"], "Environment");
    assert_eq!(values["groups_file"]["source"], "Cli");
    assert_eq!(values["compute_area"]["source"], "Default");
    assert_eq!(values["fetch_timeout_s"]["value"], "7");
    assert_eq!(values["fetch_timeout_s"]["source"], "Cli");
}

#[test]
fn test_zero_timeout_is_rejected() {
    let dir = workspace(CATALOG);
    let output = geonemo(dir.path(), &["config", "--timeout", "0"]);
    assert!(!output.status.success());
}
