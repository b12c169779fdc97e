// src/main.rs
//
// Runner binary: load config.yaml, read a batch of candidate routes from
// a JSON file, run the safety pipeline, and print the recommendation with
// the full comparison table.

use anyhow::{Context, Result};
use saferoute::types::Route;
use saferoute::{AppConfig, SafetyPipeline};
use std::fs;
use tracing::{error, info};

fn load_routes(path: &str) -> Result<Vec<Route>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading routes file {}", path))?;
    let routes: Vec<Route> =
        serde_json::from_str(&contents).with_context(|| format!("parsing {}", path))?;
    Ok(routes)
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let routes_path = args.next().unwrap_or_else(|| "routes.json".to_string());
    let config_path = args.next().unwrap_or_else(|| "config.yaml".to_string());

    let config = AppConfig::load(&config_path)?;
    tracing_subscriber::fmt()
        .with_env_filter(config.logging.filter.clone())
        .init();
    info!("configuration loaded from {}", config_path);

    let routes = load_routes(&routes_path)?;
    info!("analyzing {} candidate route(s)", routes.len());

    let pipeline = SafetyPipeline::new(config.pipeline_config())?;
    let outcome = pipeline.analyze_batch(&routes).await?;

    for failure in &outcome.rejected {
        error!(
            "route '{}' could not be assessed: {}",
            failure.route_id, failure.error
        );
    }

    println!("\n  {:<14} {:>9} {:>9} {:>6}  {}", "route", "dist(km)", "time(min)", "score", "category");
    for row in &outcome.decision.comparison {
        println!(
            "  {:<14} {:>9.1} {:>9.1} {:>6}  {}",
            row.route_id,
            row.distance_m / 1000.0,
            row.duration_s / 60.0,
            row.score,
            row.category
        );
    }
    println!("\n{}\n", outcome.decision.justification);

    for analysis in &outcome.analyses {
        if analysis.route.id == outcome.decision.selected_route_id {
            for reason in &analysis.scoring.reasons {
                println!("  - {}", reason);
            }
        }
    }

    let summary = pipeline.metrics().summary();
    info!(
        routes = summary.routes_analyzed,
        fallbacks = summary.intelligence_fallbacks,
        batch_us = summary.last_batch_us,
        "done"
    );

    Ok(())
}
