//! Inspect command implementation
//!
//! Walks the catalog group by group and checks every referenced file the way
//! the resolver will read it. Files shared between groups are read once.

use crate::cli::InspectArgs;
use crate::output::OutputWriter;
use crate::output_types::{
    FileReport, FileStatus, GroupReport, HeavyFeature, InspectOutput, InspectTotals,
};
use anyhow::{bail, Context, Result};
use geojson::GeoJson;
use geonemo_core::config::LayeredConfig;
use geonemo_core::error::GeonemoError;
use geonemo_core::models::GroupCatalog;
use geonemo_core::ports::FeatureSource;
use geonemo_geo::convert::{geometry_type_name, into_feature_collection, position_count};
use geonemo_geo::{build_index, IndexOptions};
use geonemo_resolve::CatalogSource;
use std::collections::{BTreeMap, HashMap};
use tabled::Tabled;

pub async fn execute(args: InspectArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let groups_file = &config.groups_file.value;
    let source = CatalogSource::for_catalog(
        groups_file,
        config.base_url.value.as_deref(),
        config.fetch_timeout(),
    )?;
    let catalog = source
        .load_catalog(groups_file)
        .await
        .with_context(|| format!("Failed to load group catalog {}", groups_file.display()))?;

    let options = IndexOptions { metric: config.metric.value, compute_area: false };
    let heavy_threshold = config.heavy_vertex_threshold.value;

    let mut report = inspect_catalog(&source, &catalog, options).await;
    report.catalog = source.catalog_location(groups_file);
    report.heavy_vertex_threshold = heavy_threshold;
    report.heavy_alerts = report.heaviest.iter().filter(|h| h.vertices > heavy_threshold).count();
    report.heaviest.truncate(args.top);

    if output.is_json() {
        output.result(&report)?;
    } else {
        print_report(&report, output);
    }

    if !report.totals.passed() {
        bail!(
            "Catalog check failed: {} ok, {} missing, {} invalid",
            report.totals.ok,
            report.totals.missing,
            report.totals.invalid
        );
    }

    Ok(())
}

/// Inspect every group of the catalog, enabled or not
///
/// `heaviest` comes back sorted by vertex count over the whole catalog,
/// untruncated.
async fn inspect_catalog<S: FeatureSource>(
    source: &S,
    catalog: &GroupCatalog,
    options: IndexOptions,
) -> InspectOutput {
    let mut seen: HashMap<String, FileReport> = HashMap::new();
    let mut heaviest = Vec::new();
    let mut totals = InspectTotals::default();
    let mut groups = Vec::with_capacity(catalog.len());

    for group in &catalog.groups {
        let mut files = Vec::new();
        for reference in group.files.iter().filter(|f| !f.trim().is_empty()) {
            if let Some(known) = seen.get(reference) {
                files.push(known.clone());
                continue;
            }

            let (file, heavy) = inspect_file(source, reference, options).await;
            totals.count(file.status);
            heaviest.extend(heavy);
            seen.insert(reference.clone(), file.clone());
            files.push(file);
        }

        groups.push(GroupReport {
            id: group.id.clone(),
            label: group.display_name().to_string(),
            enabled: group.enabled,
            problem: group.validate().err().map(|e| e.to_string()),
            files,
        });
    }

    // Stable: equal counts keep catalog order
    heaviest.sort_by(|a: &HeavyFeature, b: &HeavyFeature| b.vertices.cmp(&a.vertices));

    InspectOutput {
        catalog: String::new(),
        groups,
        heaviest,
        heavy_vertex_threshold: 0,
        heavy_alerts: 0,
        totals,
    }
}

async fn inspect_file<S: FeatureSource>(
    source: &S,
    reference: &str,
    options: IndexOptions,
) -> (FileReport, Vec<HeavyFeature>) {
    let location = source.locate(reference);

    match source.load(reference).await {
        Ok(geojson) => inspect_document(reference, location, geojson, options),
        Err(e) => {
            let status = match e {
                GeonemoError::GeoJson { .. } => FileStatus::Invalid,
                _ => FileStatus::Missing,
            };
            tracing::debug!("{} is {}: {}", reference, status.as_str(), e);
            (FileReport::failed(reference, location, status, e.to_string()), Vec::new())
        }
    }
}

/// Check one parsed document
fn inspect_document(
    reference: &str,
    location: String,
    geojson: GeoJson,
    options: IndexOptions,
) -> (FileReport, Vec<HeavyFeature>) {
    let shape = match &geojson {
        GeoJson::FeatureCollection(_) => "FeatureCollection",
        GeoJson::Feature(_) => "Feature",
        GeoJson::Geometry(_) => "Geometry",
    };

    let collection = into_feature_collection(geojson);
    let mut geometry_types = BTreeMap::new();
    let mut vertices = 0;
    for feature in &collection.features {
        let name = match &feature.geometry {
            Some(geometry) => {
                vertices += position_count(&geometry.value);
                geometry_type_name(&geometry.value)
            }
            None => "null",
        };
        *geometry_types.entry(name.to_string()).or_insert(0) += 1;
    }

    let index = build_index(reference, GeoJson::FeatureCollection(collection), options);
    let stats = index.stats();
    let bbox = index.bbox();

    let heavy = index
        .entries()
        .iter()
        .map(|entry| HeavyFeature {
            reference: reference.to_string(),
            position: entry.position,
            name: entry.to_match(reference).name().map(str::to_string),
            vertices: position_count(&entry.raw_geometry.value),
        })
        .collect();

    let report = FileReport {
        reference: reference.to_string(),
        location,
        status: if stats.features == 0 { FileStatus::Empty } else { FileStatus::Ok },
        shape: Some(shape.to_string()),
        features: stats.features,
        geometry_types,
        vertices,
        indexable: stats.indexed,
        dropped: stats.dropped,
        bbox,
        span_km: bbox.map(|b| {
            let (width, height) = b.span_km();
            [width, height]
        }),
        error: None,
    };

    (report, heavy)
}

fn print_report(report: &InspectOutput, output: &OutputWriter) {
    output.section("Catalog");
    output.kv("Location", &report.catalog);
    output.kv("Groups", report.groups.len());

    #[derive(Tabled)]
    struct FileRow {
        #[tabled(rename = "File")]
        reference: String,
        #[tabled(rename = "Status")]
        status: String,
        #[tabled(rename = "Features")]
        features: usize,
        #[tabled(rename = "Polygons")]
        indexable: String,
        #[tabled(rename = "Types")]
        types: String,
        #[tabled(rename = "Vertices")]
        vertices: usize,
        #[tabled(rename = "Span (km)")]
        span: String,
    }

    for group in &report.groups {
        let state = if group.enabled { "" } else { " (disabled)" };
        output.section(format!("{} [{}]{}", group.label, group.id, state));

        if let Some(problem) = &group.problem {
            output.warning(problem);
        }

        let rows: Vec<FileRow> = group
            .files
            .iter()
            .map(|file| FileRow {
                reference: file.reference.clone(),
                status: file.status.as_str().to_string(),
                features: file.features,
                indexable: if file.dropped > 0 {
                    format!("{} ({} dropped)", file.indexable, file.dropped)
                } else {
                    file.indexable.to_string()
                },
                types: file
                    .geometry_types
                    .iter()
                    .map(|(name, count)| format!("{}:{}", name, count))
                    .collect::<Vec<_>>()
                    .join(" "),
                vertices: file.vertices,
                span: file
                    .span_km
                    .map(|[w, h]| format!("{:.1} x {:.1}", w, h))
                    .unwrap_or_default(),
            })
            .collect();

        output.table(rows);

        for file in &group.files {
            if let Some(error) = &file.error {
                output.error(format!("{}: {}", file.location, error));
            } else if file.shape.as_deref() != Some("FeatureCollection") {
                output.info(format!(
                    "{} is a bare {}, read as a one-feature collection",
                    file.reference,
                    file.shape.as_deref().unwrap_or("document")
                ));
            }
        }
    }

    if !report.heaviest.is_empty() {
        output.section("Heaviest features");

        #[derive(Tabled)]
        struct HeavyRow {
            #[tabled(rename = "File")]
            reference: String,
            #[tabled(rename = "#")]
            position: usize,
            #[tabled(rename = "Name")]
            name: String,
            #[tabled(rename = "Vertices")]
            vertices: usize,
        }

        output.table(
            report
                .heaviest
                .iter()
                .map(|h| HeavyRow {
                    reference: h.reference.clone(),
                    position: h.position,
                    name: h.name.clone().unwrap_or_default(),
                    vertices: h.vertices,
                })
                .collect(),
        );
    }

    if report.heavy_alerts > 0 {
        output.warning(format!(
            "{} feature(s) above {} vertices; expect slow clicks on those layers",
            report.heavy_alerts, report.heavy_vertex_threshold
        ));
    }

    let totals = &report.totals;
    output.section("Totals");
    output.kv("Files", totals.files);
    output.kv("Ok", totals.ok);
    output.kv("Empty", totals.empty);
    output.kv("Missing/unreachable", totals.missing);
    output.kv("Invalid", totals.invalid);

    if totals.passed() {
        output.success("Catalog is usable");
    }
}
