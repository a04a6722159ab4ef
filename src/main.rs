use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use geotrail::config::{AppConfig, ServiceConfig};
use geotrail::location::{
    FixedSource, GeoPoint, GeocodingService, IpApiSource, LocationSource, NominatimGeocoder, Position,
    PositionProvider,
};
use geotrail::path::{PathFilter, SphericalDistance};
use serde::Serialize;
use std::error::Error;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// geotrail: detect your position and trim a route to what is still ahead.
///
/// Examples:
///   geotrail locate --address
///   geotrail locate --lat 60.34 --lon 18.23 --address
///   geotrail filter route.json --distance 2500
///   geotrail filter route.json --speed 50 --arrival 2026-10-19T18:30:00Z
///   cat route.json | geotrail filter - --distance 800
#[derive(Parser)]
#[command(name = "geotrail", version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML). Defaults to ./geotrail.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Offline mode: never query the IP geolocation or geocoding services.
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect the current position, optionally with its address.
    Locate {
        /// Latitude (-90 to 90). Skips IP geolocation when given with --lon.
        #[arg(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,

        /// Longitude (-180 to 180).
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,

        /// Reverse geocode the detected position.
        #[arg(long, short = 'a')]
        address: bool,
    },
    /// Keep the trailing part of a route that fits a distance or time budget.
    Filter {
        /// JSON array of {"lat": .., "lon": ..} points, or "-" for stdin.
        path: PathBuf,

        /// Distance budget in meters.
        #[arg(long, conflicts_with_all = ["speed", "arrival"], required_unless_present = "speed")]
        distance: Option<f64>,

        /// Travel speed in km/h.
        #[arg(long, requires = "arrival")]
        speed: Option<f64>,

        /// Desired arrival time (RFC 3339, e.g. 2026-10-19T18:30:00Z).
        #[arg(long, requires = "speed")]
        arrival: Option<DateTime<Utc>>,
    },
}

#[derive(Serialize)]
struct LocateOutput {
    position: Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    debug!(?config, "Loaded configuration");

    match cli.command {
        Command::Locate { lat, lon, address } => {
            let geocoder = build_geocoder(config.geocoder(), cli.offline);

            let output = match (lat, lon) {
                (Some(lat), Some(lon)) => {
                    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                        return Err("Invalid coordinates. Lat: -90..90, Lon: -180..180".into());
                    }
                    locate(FixedSource::new(GeoPoint::new(lat, lon)), geocoder, address).await?
                }
                _ => {
                    let mut source = IpApiSource::new(config.locator().clone());
                    source.set_offline(cli.offline);
                    locate(source, geocoder, address).await?
                }
            };

            eprintln!("  \u{1F4CD} {}", output.position.coords);
            if let Some(ref addr) = output.address {
                eprintln!("  \u{1F3E0} {}", addr);
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Filter {
            path,
            distance,
            speed,
            arrival,
        } => {
            let points = read_points(&path)?;
            let filter = PathFilter::new(SphericalDistance::new(config.distance().earth_radius_m()));

            let filtered = match (distance, speed, arrival) {
                (Some(budget), _, _) => filter.filter_by_distance(&points, budget)?,
                (None, Some(speed), Some(arrival)) => filter.filter_by_arrival_time(&points, speed, arrival)?,
                _ => return Err("Either --distance or --speed with --arrival is required".into()),
            };

            info!(kept = filtered.len(), total = points.len(), "✅ Path filtered");
            println!("{}", serde_json::to_string_pretty(&filtered)?);
        }
    }

    Ok(())
}

fn build_geocoder(config: &ServiceConfig, offline: bool) -> NominatimGeocoder {
    let mut geocoder = NominatimGeocoder::new(config.clone());
    geocoder.set_offline(offline);
    geocoder
}

async fn locate<S, G>(source: S, geocoder: G, with_address: bool) -> Result<LocateOutput, Box<dyn Error>>
where
    S: LocationSource,
    G: GeocodingService,
{
    let provider = PositionProvider::new(source, geocoder);
    let position = provider.detect().await?;
    let address = if with_address {
        Some(provider.detect_address().await?)
    } else {
        None
    };
    Ok(LocateOutput { position, address })
}

fn read_points(path: &Path) -> Result<Vec<GeoPoint>, Box<dyn Error>> {
    let data = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("Cannot read '{}': {}", path.display(), e))?
    };
    Ok(serde_json::from_str(&data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotrail::location::{DetectionError, SourceError};
    use mockito::Matcher;
    use test_log::test;

    #[test(tokio::test)]
    async fn offline_locate_with_address_stays_off_the_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/reverse")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let source = FixedSource::new(GeoPoint::new(59.85, 17.63));
        let err = locate(source, build_geocoder(&ServiceConfig::new(server.url()), true), true)
            .await
            .err()
            .and_then(|e| e.downcast::<DetectionError>().ok())
            .map(|e| *e);

        assert_eq!(err, Some(DetectionError::GeocodingFailed(SourceError::Offline)));
        mock.assert_async().await;
    }

    #[test(tokio::test)]
    async fn offline_locate_without_address_reports_position() {
        let source = FixedSource::new(GeoPoint::new(59.85, 17.63));
        let output = locate(source, build_geocoder(&ServiceConfig::new("http://127.0.0.1:9"), true), false)
            .await
            .unwrap();

        assert_eq!(output.position.coords, GeoPoint::new(59.85, 17.63));
        assert!(output.address.is_none());
    }

    #[test(tokio::test)]
    async fn online_locate_queries_the_geocoder() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/reverse")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"display_name":"Uppsala, Sweden","address":{"city":"Uppsala","country":"Sweden"}}"#)
            .create_async()
            .await;

        let source = FixedSource::new(GeoPoint::new(59.85, 17.63));
        let output = locate(source, build_geocoder(&ServiceConfig::new(server.url()), false), true)
            .await
            .unwrap();

        assert_eq!(output.address.as_deref(), Some("Sweden"));
        mock.assert_async().await;
    }
}
