use crate::infra::{command_config, FeedSource};
use chrono::Utc;
use clap::Args;
use quake_alert::error::AppError;
use quake_alert::workflows::alerts::notify::render_report;
use quake_alert::workflows::alerts::setup::{facility_registry, impact_evaluator, tier_table};
use quake_alert::workflows::alerts::{build_orchestrator, Coordinates, SeismicEvent, SetupError};
use serde::Serialize;
use std::io::Write;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct PollArgs {
    /// GeoJSON feed file, `http(s)://` URL, or `-` for stdin; defaults to QUAKE_FEED_URL
    #[arg(long, value_parser = FeedSource::parse)]
    pub(crate) feed: Option<FeedSource>,
}

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Epicenter latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub(crate) lat: f64,
    /// Epicenter longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub(crate) lon: f64,
    /// Event magnitude; omit to see the no-alert case
    #[arg(long)]
    pub(crate) magnitude: Option<f64>,
    /// Label used as the event identifier in the output
    #[arg(long, default_value = "manual")]
    pub(crate) id: String,
    /// Print the impact report as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_poll(args: PollArgs) -> Result<(), AppError> {
    let config = command_config()?;
    let orchestrator = build_orchestrator(&config.alerts)?;

    let source = args
        .feed
        .unwrap_or_else(|| FeedSource::Url(config.feed.url.clone()));
    let snapshot = source.load(config.feed.timeout).await?;
    info!(
        source = ?source,
        events = snapshot.events.len(),
        ignored = snapshot.ignored,
        "feed snapshot loaded"
    );

    let summary = orchestrator.process_batch(&snapshot.events);
    print_json(&summary)
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let config = command_config()?;
    let evaluator = impact_evaluator(&config.alerts)?;

    let event = SeismicEvent {
        resource_ref: args.id,
        agency: "manual".to_string(),
        origin_time: Utc::now(),
        epicenter: Some(Coordinates::new(args.lat, args.lon)),
        depth_km: None,
        magnitude: args.magnitude,
        place: None,
    };
    let report = evaluator.evaluate(&event)?;

    if args.json {
        return print_json(&report);
    }

    match report.radius_km {
        Some(radius) => println!("Alert radius: {radius:.0} km"),
        None => println!("Alert radius: none (magnitude below the lowest tier)"),
    }
    if report.has_impacts() {
        let alert = render_report(&report, &config.alerts.notify.subject);
        println!("{}", alert.subject);
        print!("{}", alert.text);
    } else {
        println!("No facilities inside the alert radius.");
    }
    Ok(())
}

pub(crate) fn run_facilities() -> Result<(), AppError> {
    let config = command_config()?;
    let registry = facility_registry(&config.alerts).map_err(SetupError::from)?;
    let tiers = tier_table(&config.alerts).map_err(SetupError::from)?;

    println!("Facilities ({})", registry.len());
    for facility in registry.all() {
        println!("- {}: {}", facility.name, facility.location);
    }

    println!("\nRadius tiers");
    for tier in tiers.tiers() {
        let upper = tier
            .max_magnitude
            .map(|max| format!("< M{max:.2}"))
            .unwrap_or_else(|| "and above".to_string());
        println!(
            "- M{:.2} {upper}: {:.0} km",
            tier.min_magnitude,
            tier.radius.as_km()
        );
    }

    println!("\nAllowed networks: {}", config.alerts.agencies.join(", "));
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).map_err(std::io::Error::from)?;
    writeln!(stdout)?;
    Ok(())
}
