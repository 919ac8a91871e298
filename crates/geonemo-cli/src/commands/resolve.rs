//! Resolve command implementation

use crate::cli::ResolveArgs;
use crate::output::OutputWriter;
use anyhow::{Context, Result};
use geonemo_core::config::LayeredConfig;
use geonemo_core::models::{DistanceMetric, GroupOutcome, Membership, Point};
use geonemo_geo::IndexOptions;
use geonemo_resolve::{CatalogSource, GroupResolver, ResultPayload};
use tabled::Tabled;

pub async fn execute(args: ResolveArgs, config: &LayeredConfig, output: &OutputWriter) -> Result<()> {
    let point = Point::new(args.lon, args.lat)?;
    let groups_file = &config.groups_file.value;
    let metric = config.metric.value;

    let source = CatalogSource::for_catalog(
        groups_file,
        config.base_url.value.as_deref(),
        config.fetch_timeout(),
    )?;
    let catalog = source
        .load_catalog(groups_file)
        .await
        .with_context(|| format!("Failed to load group catalog {}", groups_file.display()))?;

    tracing::info!(
        "Resolving ({}) against {} enabled group(s) of {}",
        point,
        catalog.enabled().count(),
        groups_file.display()
    );

    let options = IndexOptions { metric, compute_area: config.compute_area.value };
    let resolver = GroupResolver::new(source, options);
    let outcomes = resolver.resolve_all_groups(&catalog, &point).await;

    let payload = ResultPayload::build(&point, metric, outcomes, config.draw_threshold_m.value);

    if let Some(path) = &args.out {
        payload
            .write_to(path)
            .with_context(|| format!("Failed to write result to {}", path.display()))?;
    }

    if output.is_json() {
        output.result(&payload)?;
    } else {
        print_payload(&payload, output);
        if let Some(path) = &args.out {
            output.success(format!("Result written to {}", path.display()));
        }
    }

    Ok(())
}

fn print_payload(payload: &ResultPayload, output: &OutputWriter) {
    output.section("Click");
    output.kv("Point", format!("{:.6}, {:.6}", payload.click.lat, payload.click.lng));
    output.kv("Metric", payload.metric);

    output.section("Summary");
    output.kv("Status", payload.summary.status);
    output.kv("Dominant group", payload.summary.dominant_group.as_deref().unwrap_or("-"));
    output.kv(
        "Distance",
        payload
            .summary
            .min_distance
            .map(|d| format_distance(d, payload.metric))
            .unwrap_or_else(|| "-".to_string()),
    );

    output.section("Groups");

    #[derive(Tabled)]
    struct OutcomeRow {
        #[tabled(rename = "Group")]
        group: String,
        #[tabled(rename = "Status")]
        status: String,
        #[tabled(rename = "Feature")]
        feature: String,
        #[tabled(rename = "Distance")]
        distance: String,
        #[tabled(rename = "Bearing")]
        bearing: String,
        #[tabled(rename = "Surface (ha)")]
        surface: String,
        #[tabled(rename = "Drawn")]
        drawn: String,
    }

    let rows: Vec<OutcomeRow> = payload
        .groups
        .iter()
        .map(|outcome| OutcomeRow {
            group: outcome.group_name.clone(),
            status: outcome.status().to_string(),
            feature: feature_label(outcome),
            distance: outcome
                .distance()
                .map(|d| format_distance(d, payload.metric))
                .unwrap_or_default(),
            bearing: match &outcome.membership {
                Membership::NearestPerimeter { bearing, .. } => format!("{:.0}°", bearing),
                _ => String::new(),
            },
            surface: outcome
                .feature()
                .and_then(|f| f.area.as_ref())
                .map(|area| format!("{:.1}", area.hectares()))
                .unwrap_or_default(),
            drawn: if payload.near.contains(&outcome.group_id) { "✓" } else { "" }.to_string(),
        })
        .collect();

    output.table(rows);

    for outcome in &payload.groups {
        for failure in &outcome.load_failures {
            output.warning(format!(
                "{}: could not load {} ({})",
                outcome.group_name, failure.reference, failure.reason
            ));
        }
        if let Membership::Error { message } = &outcome.membership {
            output.error(format!("{}: {}", outcome.group_name, message));
        }
    }
}

fn feature_label(outcome: &GroupOutcome) -> String {
    match outcome.feature() {
        Some(feature) => feature
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} #{}", feature.source, feature.position)),
        None => String::new(),
    }
}

/// Planar distances are in coordinate units, so they get no unit suffix
fn format_distance(distance: f64, metric: DistanceMetric) -> String {
    match metric {
        DistanceMetric::Planar => format!("{:.4}", distance),
        DistanceMetric::Geodesic if distance >= 1000.0 => format!("{:.2} km", distance / 1000.0),
        DistanceMetric::Geodesic => format!("{:.0} m", distance),
    }
}
