//! Position lookup with a pluggable provider.
//!
//! [`LocationService`] wraps a [`Geolocator`] with a timeout, reuses a recent
//! position for `maximum_age`, and falls back to the configured default city
//! when the provider refuses access.

use crate::api::WeatherApiClient;
use crate::config::{LocationConfig, LocationProvider};
use crate::models::{Coordinates, Position, PositionSource};
use crate::{ClimaError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Something that can tell where the user is
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn locate(&self) -> Result<Position>;

    /// Short provider name for logs
    fn name(&self) -> &'static str;
}

/// Always answers with the configured coordinates
pub struct FixedGeolocator {
    coordinates: Coordinates,
}

impl FixedGeolocator {
    #[must_use]
    pub fn new(coordinates: Coordinates) -> Self {
        Self { coordinates }
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn locate(&self) -> Result<Position> {
        Ok(Position::new(self.coordinates, PositionSource::Fixed))
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Location access switched off
pub struct DisabledGeolocator;

#[async_trait]
impl Geolocator for DisabledGeolocator {
    async fn locate(&self) -> Result<Position> {
        Err(ClimaError::permission_denied("location lookup is disabled"))
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    city: Option<String>,
    message: Option<String>,
}

/// Approximate position from the public IP address (ip-api.com format)
pub struct IpGeolocator {
    client: reqwest::Client,
    url: String,
}

impl IpGeolocator {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("clima/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Geolocator for IpGeolocator {
    async fn locate(&self) -> Result<Position> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ClimaError::position_unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClimaError::position_unavailable(format!(
                "IP lookup answered {}",
                response.status()
            )));
        }

        let body: IpLookupResponse = response
            .json()
            .await
            .map_err(|e| ClimaError::position_unavailable(e.to_string()))?;

        if body.status != "success" {
            return Err(ClimaError::position_unavailable(
                body.message.unwrap_or_else(|| "IP lookup failed".to_string()),
            ));
        }

        match (body.lat, body.lon) {
            (Some(lat), Some(lon)) => {
                debug!("IP lookup placed us in {:?}", body.city);
                // city level precision
                Ok(Position::new(Coordinates::new(lat, lon), PositionSource::Ip).with_accuracy(5_000.0))
            }
            _ => Err(ClimaError::position_unavailable(
                "IP lookup returned no coordinates",
            )),
        }
    }

    fn name(&self) -> &'static str {
        "ip"
    }
}

/// Build the provider selected in the configuration
pub fn provider_from_config(config: &LocationConfig) -> Result<Box<dyn Geolocator>> {
    let fixed = match (config.latitude, config.longitude) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
        _ => None,
    };
    let timeout = Duration::from_secs(config.timeout_seconds);

    match config.provider {
        LocationProvider::Auto => match fixed {
            Some(coordinates) => Ok(Box::new(FixedGeolocator::new(coordinates))),
            None => Ok(Box::new(IpGeolocator::new(&config.ip_lookup_url, timeout)?)),
        },
        LocationProvider::Fixed => fixed
            .map(|coordinates| Box::new(FixedGeolocator::new(coordinates)) as Box<dyn Geolocator>)
            .ok_or_else(|| {
                ClimaError::config("location.provider = fixed needs latitude and longitude")
            }),
        LocationProvider::Ip => Ok(Box::new(IpGeolocator::new(&config.ip_lookup_url, timeout)?)),
        LocationProvider::None => Ok(Box::new(DisabledGeolocator)),
    }
}

/// Resolves the position used for the dashboard
pub struct LocationService {
    provider: Box<dyn Geolocator>,
    api: Arc<WeatherApiClient>,
    default_city: String,
    timeout: Duration,
    maximum_age: Duration,
    last: Mutex<Option<(Position, Instant)>>,
}

impl LocationService {
    pub fn new(provider: Box<dyn Geolocator>, api: Arc<WeatherApiClient>, config: &LocationConfig) -> Self {
        Self {
            provider,
            api,
            default_city: config.default_city.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
            maximum_age: Duration::from_secs(config.maximum_age_seconds),
            last: Mutex::new(None),
        }
    }

    /// Current position, falling back to the default city on permission errors.
    pub async fn current_position(&self) -> Result<Position> {
        {
            let last = self.last.lock().await;
            if let Some((position, at)) = last.as_ref() {
                if at.elapsed() < self.maximum_age {
                    debug!("Reusing position from {:.0}s ago", at.elapsed().as_secs_f64());
                    return Ok(position.clone());
                }
            }
        }

        info!("Detecting your location via {} provider", self.provider.name());

        let located = match tokio::time::timeout(self.timeout, self.provider.locate()).await {
            Ok(result) => result,
            Err(_) => Err(ClimaError::GeolocationTimeout {
                seconds: self.timeout.as_secs(),
            }),
        };

        match located {
            Ok(position) => {
                info!("Location obtained: {}", position.coordinates);
                *self.last.lock().await = Some((position.clone(), Instant::now()));
                Ok(position)
            }
            Err(ClimaError::PermissionDenied { message }) => {
                warn!(
                    "Location permission denied ({}), showing weather for {}",
                    message, self.default_city
                );
                self.api
                    .city_coordinates(&self.default_city)
                    .await
                    .map_err(|err| {
                        ClimaError::permission_denied(format!(
                            "{message}; could not load {} either: {err}",
                            self.default_city
                        ))
                    })
            }
            Err(err) => Err(err),
        }
    }

    /// Turn user input into a position
    pub async fn resolve(&self, input: &LocationInput) -> Result<Position> {
        match input {
            LocationInput::Coordinates(coordinates) => {
                Ok(Position::new(*coordinates, PositionSource::Fixed))
            }
            LocationInput::Name(name) => self.api.city_coordinates(name).await,
        }
    }
}

/// Types of location input
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    Coordinates(Coordinates),
    /// City name, optionally with country ("Paris,FR")
    Name(String),
}

impl LocationInput {
    /// Parse "lat,lon" / "lat lon", anything else is a place name
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ClimaError::validation("location must not be empty"));
        }

        match Self::parse_coordinates(input) {
            Some(coordinates) => Ok(LocationInput::Coordinates(coordinates)),
            None => Ok(LocationInput::Name(input.to_string())),
        }
    }

    fn parse_coordinates(input: &str) -> Option<Coordinates> {
        let parts: Vec<&str> = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();

        if parts.len() != 2 {
            return None;
        }

        let lat = parts[0].parse::<f64>().ok()?;
        let lon = parts[1].parse::<f64>().ok()?;
        let coordinates = Coordinates::new(lat, lon);
        coordinates.is_valid().then_some(coordinates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClimaConfig;

    struct SlowGeolocator;

    #[async_trait]
    impl Geolocator for SlowGeolocator {
        async fn locate(&self) -> Result<Position> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Position::new(Coordinates::new(0.0, 0.0), PositionSource::Fixed))
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    struct FailingGeolocator;

    #[async_trait]
    impl Geolocator for FailingGeolocator {
        async fn locate(&self) -> Result<Position> {
            Err(ClimaError::position_unavailable("no fix"))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn service(provider: Box<dyn Geolocator>) -> LocationService {
        let config = ClimaConfig::default();
        let api = Arc::new(WeatherApiClient::new(&config).unwrap());
        LocationService::new(provider, api, &config.location)
    }

    #[test]
    fn test_parse_coordinates() {
        assert_eq!(
            LocationInput::parse("46.8182,8.2275").unwrap(),
            LocationInput::Coordinates(Coordinates::new(46.8182, 8.2275))
        );
        assert_eq!(
            LocationInput::parse(" -46.8182 -8.2275 ").unwrap(),
            LocationInput::Coordinates(Coordinates::new(-46.8182, -8.2275))
        );
    }

    #[test]
    fn test_out_of_range_coordinates_are_names() {
        assert!(matches!(
            LocationInput::parse("91.0,8.0").unwrap(),
            LocationInput::Name(_)
        ));
        assert!(matches!(
            LocationInput::parse("46.0,181.0").unwrap(),
            LocationInput::Name(_)
        ));
        assert!(matches!(
            LocationInput::parse("46.0,8.0,0.0").unwrap(),
            LocationInput::Name(_)
        ));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(
            LocationInput::parse("Buenos Aires").unwrap(),
            LocationInput::Name("Buenos Aires".to_string())
        );
        assert_eq!(
            LocationInput::parse("Paris,FR").unwrap(),
            LocationInput::Name("Paris,FR".to_string())
        );
    }

    #[test]
    fn test_parse_empty_is_rejected() {
        assert!(matches!(
            LocationInput::parse("   "),
            Err(ClimaError::Validation { .. })
        ));
    }

    #[test]
    fn test_provider_from_config() {
        let mut config = ClimaConfig::default().location;
        assert_eq!(provider_from_config(&config).unwrap().name(), "ip");

        config.latitude = Some(40.4);
        config.longitude = Some(-3.7);
        assert_eq!(provider_from_config(&config).unwrap().name(), "fixed");

        config.provider = LocationProvider::None;
        assert_eq!(provider_from_config(&config).unwrap().name(), "disabled");

        config.provider = LocationProvider::Fixed;
        config.latitude = None;
        assert!(provider_from_config(&config).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let service = service(Box::new(SlowGeolocator));
        let err = service.current_position().await.unwrap_err();
        assert!(matches!(err, ClimaError::GeolocationTimeout { seconds: 15 }));
    }

    #[tokio::test]
    async fn test_other_errors_propagate() {
        let service = service(Box::new(FailingGeolocator));
        let err = service.current_position().await.unwrap_err();
        assert!(matches!(err, ClimaError::PositionUnavailable { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recent_position_is_reused() {
        let service = service(Box::new(FixedGeolocator::new(Coordinates::new(1.0, 2.0))));
        let first = service.current_position().await.unwrap();
        tokio::time::advance(Duration::from_secs(100)).await;
        let second = service.current_position().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_denied_without_key_reports_both_failures() {
        // Default config has no API key, so the city fallback fails too
        let service = service(Box::new(DisabledGeolocator));
        let err = service.current_position().await.unwrap_err();
        match err {
            ClimaError::PermissionDenied { message } => assert!(message.contains("Madrid")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
