use std::sync::Arc;

use anyhow::{Context, Result};
use farmie_auth::{SecureStorage, StaticToken, StoredToken};
use farmie_core::{Config, FarmieError};
use farmie_services::{FarmieClient, ImageRef};
use farmie_weather::{Coordinate, WeatherAggregator, WeatherSource};
use farmie_workflow::{Farm, FarmOverview, LoadState, RecommendationWorkflow, Submission};

const USAGE: &str = "\
Usage:
  farmie weather <latitude> <longitude>
  farmie identify <image> [farm_id]
  farmie farms
  farmie farm <farm_id>
  farmie login <user_name> <password>
  farmie logout";

#[tokio::main]
async fn main() -> Result<()> {
    farmie_core::init()?;

    let (config, _) = Config::load_validated()?;
    tracing::debug!("Using API at {}", config.services.api_base_url);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        ["weather", latitude, longitude] => weather(&config, latitude, longitude).await,
        ["identify", image] => identify(&config, image, None).await,
        ["identify", image, farm_id] => identify(&config, image, Some(*farm_id)).await,
        ["farms"] => farms(&config).await,
        ["farm", farm_id] => farm(&config, farm_id).await,
        ["login", user_name, password] => login(&config, user_name, password).await,
        ["logout"] => {
            SecureStorage::default_location()?.delete_token(&config.auth.token_service)?;
            println!("Signed out.");
            Ok(())
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

fn client(config: &Config) -> Result<FarmieClient> {
    let storage = SecureStorage::default_location()?;
    let tokens = Arc::new(StoredToken::new(storage, &config.auth.token_service));
    FarmieClient::from_config(&config.services, tokens).context("Failed to create API client")
}

/// Print the failure the way a screen would show it, keeping the raw error in the log.
fn report(stage: &str, err: &FarmieError) {
    tracing::debug!("{} failed: {:?}", stage, err);
    eprintln!("{}: {}", stage, err.user_message());
    if err.should_reauthenticate() {
        eprintln!("Run `farmie login <user_name> <password>` to sign in again.");
    } else if err.is_retryable() {
        eprintln!("You can try again.");
    }
}

async fn login(config: &Config, user_name: &str, password: &str) -> Result<()> {
    let client = FarmieClient::from_config(&config.services, Arc::new(StaticToken::missing()))
        .context("Failed to create API client")?;

    match client.login(user_name, password).await {
        Ok(tokens) => {
            SecureStorage::default_location()?.store_token(&config.auth.token_service, &tokens)?;
            println!("Signed in as {}.", user_name.trim());
        }
        Err(FarmieError::Unauthenticated) => eprintln!("Invalid user name or password."),
        Err(e) => report("Login", &e),
    }
    Ok(())
}

async fn weather(config: &Config, latitude: &str, longitude: &str) -> Result<()> {
    let coordinate = Coordinate::new(
        latitude.parse().context("latitude must be a number")?,
        longitude.parse().context("longitude must be a number")?,
    );
    let aggregator =
        WeatherAggregator::from_config(&config.weather, config.services.request_timeout())?;

    match aggregator.fetch_yearly_stats(coordinate).await {
        Ok(stats) => {
            println!("Average temperature: {:.2} °C", stats.avg_temperature);
            println!("Average humidity:    {:.2} %", stats.avg_humidity);
            println!("Total rainfall:      {:.2} mm", stats.total_rainfall);
        }
        Err(e) => {
            tracing::debug!("Weather failed: {:?}", e.reason());
            eprintln!("{}", e.user_message());
        }
    }
    Ok(())
}

async fn identify(config: &Config, image: &str, farm_id: Option<&str>) -> Result<()> {
    let workflow = RecommendationWorkflow::new(Arc::new(client(config)?));
    workflow.capture_image(ImageRef::jpeg(image));

    match workflow.classify().await {
        Ok(Submission::Done(prediction)) => {
            println!(
                "Species:    {} ({:.0}% confidence)",
                prediction.species,
                prediction.confidence * 100.0
            );
            println!(
                "Family:     {}",
                prediction.family.as_deref().unwrap_or("unavailable")
            );
        }
        Ok(_) => return Ok(()),
        Err(e) => {
            if let Some(partial) = workflow.prediction() {
                println!("Species:    {} (family unavailable)", partial.species);
            }
            report("Classification", &e);
            return Ok(());
        }
    }

    let Some(farm_id) = farm_id else {
        return Ok(());
    };

    match workflow.request_recommendations(Some(farm_id)).await {
        Ok(Submission::Done(recommendations)) if recommendations.is_empty() => {
            println!("No companion crops recommended for farm {}.", farm_id);
        }
        Ok(Submission::Done(recommendations)) => {
            println!("Recommended companions for farm {}:", farm_id);
            for (rank, crop) in recommendations.crops().iter().enumerate() {
                println!("  {}. {}", rank + 1, crop);
            }
        }
        Ok(_) => {}
        Err(e) => report("Recommendations", &e),
    }
    Ok(())
}

async fn farms(config: &Config) -> Result<()> {
    match client(config)?.list_farms().await {
        Ok(farms) if farms.is_empty() => println!("No farms yet."),
        Ok(farms) => {
            for farm in farms {
                match farm.coordinate() {
                    Some(c) => println!(
                        "{:>4}  {}  ({:.4}, {:.4})",
                        farm.id, farm.name, c.latitude, c.longitude
                    ),
                    None => println!("{:>4}  {}", farm.id, farm.name),
                }
            }
        }
        Err(e) => report("Farms", &e),
    }
    Ok(())
}

async fn farm(config: &Config, farm_id: &str) -> Result<()> {
    let client = Arc::new(client(config)?);
    let record = match client.list_farms().await {
        Ok(farms) => farms.into_iter().find(|f| f.id.to_string() == farm_id.trim()),
        Err(e) => {
            report("Farms", &e);
            return Ok(());
        }
    };
    let Some(record) = record else {
        eprintln!("No farm with id {}.", farm_id);
        return Ok(());
    };

    let weather =
        WeatherAggregator::from_config(&config.weather, config.services.request_timeout())?;
    let overview = FarmOverview::new(Arc::new(weather), client);
    overview.open(Farm::from(record));
    overview.reload().await?;

    if let Some(farm) = overview.farm() {
        println!("{} (farm {})", farm.name, farm.id);
    }

    match overview.weather() {
        LoadState::Loaded(stats) => {
            println!("Average temperature: {:.2} °C", stats.avg_temperature);
            println!("Average humidity:    {:.2} %", stats.avg_humidity);
            println!("Total rainfall:      {:.2} mm", stats.total_rainfall);
        }
        LoadState::Failed(e) => {
            tracing::debug!("Weather failed: {:?}", e.reason());
            eprintln!("{}", e.user_message());
        }
        LoadState::Idle | LoadState::Loading => println!("No location recorded for this farm."),
    }

    match overview.crops() {
        LoadState::Loaded(crops) if crops.is_empty() => println!("No crops planted yet."),
        LoadState::Loaded(crops) => {
            println!("Crops:");
            for crop in crops {
                println!(
                    "  {:<16} {:<16} {}",
                    crop.crop_name,
                    crop.family.as_deref().unwrap_or("-"),
                    crop.quantity
                );
            }
        }
        LoadState::Failed(e) => report("Crops", &e),
        LoadState::Idle | LoadState::Loading => {}
    }

    overview.close();
    Ok(())
}
