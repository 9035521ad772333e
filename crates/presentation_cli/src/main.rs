//! Map Kit CLI
//!
//! Command-line front end for route planning and polyline conversion.

#![allow(clippy::print_stdout)]

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use integration_mapkit::{
    Avoid, CancellationToken, Coordinate, DirectionsApi, DirectionsRequest, MapKitClient,
    MapKitConfig, Route, RouteService, TrafficMode, decode_polyline, encode_polyline,
    parse_coordinate,
};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Map Kit CLI
#[derive(Parser)]
#[command(name = "mapkit-cli")]
#[command(author, version, about = "Map Kit directions client", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Optional TOML configuration file (MAPKIT_* environment variables and
    /// command-line flags win)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan routes between two points
    ///
    /// Example: mapkit-cli directions --origin 50.4501,30.5234 --destination 49.8397,24.0297
    Directions(DirectionsArgs),

    /// Encode `lat,lng` points, `|` separated, into a polyline
    EncodePolyline {
        /// Points, e.g. "38.5,-120.2|40.7,-120.95"
        points: String,
    },

    /// Decode a polyline into `lat,lng` points
    DecodePolyline {
        /// Encoded polyline
        polyline: String,
    },
}

#[derive(Args)]
struct DirectionsArgs {
    /// API key for the Map Kit service
    #[arg(long, env = "MAPKIT_API_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Start point as `lat,lng`
    #[arg(long)]
    origin: String,

    /// End point as `lat,lng`
    #[arg(long)]
    destination: String,

    /// Waypoints as `lat,lng`, `|` separated
    #[arg(long)]
    waypoints: Option<String>,

    /// Ask for alternative routes
    #[arg(long)]
    alternatives: bool,

    /// Traffic model: best_guess, optimistic or pessimistic
    #[arg(long)]
    traffic_model: Option<TrafficMode>,

    /// Features to avoid (tolls, highways), `|` separated
    #[arg(long)]
    avoid: Option<String>,

    /// Language of the returned texts (zh_CN or en)
    #[arg(long)]
    language: Option<String>,

    /// Travel mode: driving, walking or bicycling
    #[arg(long, default_value = "driving")]
    route_service: RouteService,

    /// Requests per second, 0 disables rate limiting [default: 2 unless
    /// set in the config file or MAPKIT_REQUESTS_PER_SECOND]
    #[arg(long)]
    rate_limit: Option<u32>,

    /// Override the service host
    #[arg(long)]
    base_url: Option<String>,
}

/// Request ceiling used when no flag, file or environment variable sets one
const DEFAULT_RATE_LIMIT: u32 = 2;

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Parse `|` separated `lat,lng` points
fn parse_points(text: &str) -> anyhow::Result<Vec<Coordinate>> {
    text.split('|')
        .map(|point| {
            parse_coordinate(point).with_context(|| format!("invalid coordinate '{point}'"))
        })
        .collect()
}

/// Build the directions request from command-line arguments
///
/// Unparsable origin or destination text is left empty so the client
/// reports it as missing.
fn build_request(args: &DirectionsArgs) -> anyhow::Result<DirectionsRequest> {
    let mut request = DirectionsRequest {
        origin: parse_coordinate(&args.origin),
        destination: parse_coordinate(&args.destination),
        alternatives: args.alternatives,
        traffic_mode: args.traffic_model.unwrap_or_default(),
        language: args.language.clone().filter(|l| !l.is_empty()),
        route_service: Some(args.route_service),
        ..Default::default()
    };

    if let Some(waypoints) = args.waypoints.as_deref().filter(|w| !w.is_empty()) {
        request.waypoints = parse_points(waypoints)?;
    }

    if let Some(avoid) = args.avoid.as_deref().filter(|a| !a.is_empty()) {
        for feature in avoid.split('|') {
            let feature: Avoid = feature
                .parse()
                .with_context(|| format!("Unknown avoid restriction {feature}"))?;
            request.avoid.insert(feature);
        }
    }

    Ok(request)
}

/// Merge file/environment configuration with command-line overrides
fn client_config(config_file: Option<&Path>, args: &DirectionsArgs) -> anyhow::Result<MapKitConfig> {
    let mut config = MapKitConfig::load_with_requests_per_second(config_file, DEFAULT_RATE_LIMIT)
        .context("failed to load configuration")?;

    if let Some(key) = args.key.as_deref().filter(|k| !k.is_empty()) {
        config.api_key = Some(key.to_string().into());
    }
    if config.api_key.is_none() {
        bail!("Please specify an API Key (--key or MAPKIT_API_KEY).");
    }
    if let Some(base_url) = &args.base_url {
        config.base_url = Some(base_url.clone());
    }
    if let Some(rate_limit) = args.rate_limit {
        config.requests_per_second = rate_limit;
    }

    Ok(config)
}

fn print_routes(routes: &[Route]) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(routes)?);

    for (route_index, route) in routes.iter().enumerate() {
        for (path_index, path) in route.paths.iter().enumerate() {
            println!(
                "route {route_index} path {path_index}: {} / {} overview: {}",
                path.distance_text,
                path.duration_text,
                path.overview_polyline()
            );
        }
    }

    Ok(())
}

async fn run_directions(config_file: Option<&Path>, args: &DirectionsArgs) -> anyhow::Result<()> {
    let request = build_request(args)?;
    let config = client_config(config_file, args)?;
    debug!(?config, "Resolved configuration");

    let client = MapKitClient::new(config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    info!(route_service = %args.route_service, "Requesting directions");
    let routes = client
        .directions_with_cancellation(&request, &cancel)
        .await?;

    if routes.is_empty() {
        println!("No routes found");
        return Ok(());
    }
    print_routes(&routes)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = log_filter_from_verbosity(cli.verbose);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Directions(args) => run_directions(cli.config.as_deref(), &args).await?,

        Commands::EncodePolyline { points } => {
            println!("{}", encode_polyline(&parse_points(&points)?));
        },

        Commands::DecodePolyline { polyline } => {
            for point in decode_polyline(&polyline)? {
                println!("{point}");
            }
        },
    }

    Ok(())
}
