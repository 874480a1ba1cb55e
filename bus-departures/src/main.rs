use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bus_departures::cache::CachedProvider;
use bus_departures::config::AppConfig;
use bus_departures::coordinator::TimetableQueryCoordinator;
use bus_departures::domain::{Direction, Gazetteer};
use bus_departures::preferences::{JsonFilePreferenceStore, UserId};
use bus_departures::resolver::ResolutionResult;
use bus_departures::service::{BusService, Request};
use bus_departures::timetable::HttpTimetableProvider;

/// User id for lookups made from the command line.
const CLI_USER: UserId = UserId(0);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(text), direction) = (args.next(), args.next()) else {
        eprintln!("usage: bus-departures <stop> [zwolle|apeldoorn]");
        std::process::exit(2);
    };

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let provider = match HttpTimetableProvider::new(config.provider.clone()) {
        Ok(provider) => CachedProvider::new(provider, &config.cache),
        Err(e) => {
            error!(error = %e, "failed to create timetable client");
            std::process::exit(1);
        }
    };
    let coordinator = TimetableQueryCoordinator::spawn(provider, config.queue.clone());
    let preferences = JsonFilePreferenceStore::new(&config.preferences_path);
    let service = BusService::new(Gazetteer::line(), coordinator, preferences, config.timezone);

    if let Some(direction) = direction {
        let direction: Direction = match direction.parse() {
            Ok(direction) => direction,
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(2);
            }
        };
        if let Err(e) = service.handle(CLI_USER, Request::SelectDirection(direction)).await {
            error!(error = %e, "failed to store direction");
            std::process::exit(1);
        }
    }

    let resolution = service.resolve(&text);
    print_json(&resolution);

    // A suggestion would need confirmation in a chat; here only exact names
    // go on to a timetable lookup.
    let ResolutionResult::Exact(stop) = resolution else {
        return;
    };

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default();
    info!(stop = %stop, "looking up departures");

    match service.handle(CLI_USER, Request::Departures { stop, at: now }).await {
        Ok(response) => print_json(&response),
        Err(e) => {
            error!(error = %e, "departure lookup failed");
            std::process::exit(1);
        }
    }
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => error!(error = %e, "failed to encode reply"),
    }
}
