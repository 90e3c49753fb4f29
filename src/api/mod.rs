//! Weather API client for OpenWeatherMap
//!
//! Every call goes through [`WeatherApiClient::api_call`], which adds the
//! key, units and language to the query, serves fresh payloads from an
//! in-memory cache, spaces requests with a rate limiter and retries failed
//! requests with exponential backoff.

pub mod openweather;
pub mod rate_limit;

use crate::cache::ResponseCache;
use crate::config::{ClimaConfig, Units};
use crate::models::{Coordinates, CurrentWeather, Forecast, Position, PositionSource};
use crate::{ClimaError, Result};
use openweather::{CurrentResponse, ErrorBody, ForecastResponse, UvResponse};
use rate_limit::RateLimiter;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

/// Weather API client for OpenWeatherMap
pub struct WeatherApiClient {
    /// HTTP client
    client: Client,
    base_url: String,
    api_key: Option<String>,
    units: Units,
    lang: String,
    max_retries: u32,
    retry_delay: Duration,
    cache: ResponseCache,
    rate_limiter: Mutex<RateLimiter>,
}

impl WeatherApiClient {
    /// Create a new weather API client
    pub fn new(config: &ClimaConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.api.timeout_seconds.into());

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("clima/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key().map(str::to_string),
            units: config.api.units,
            lang: config.api.lang.clone(),
            max_retries: config.api.max_retries,
            retry_delay: Duration::from_millis(config.api.retry_delay_ms),
            cache: ResponseCache::new(config.cache_duration()),
            rate_limiter: Mutex::new(RateLimiter::new(Duration::from_millis(
                config.api.min_request_interval_ms,
            ))),
        })
    }

    /// Point the client at another server (mock servers, proxies)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn units(&self) -> Units {
        self.units
    }

    /// Perform a GET against `endpoint` with caching, rate limiting and retries.
    pub async fn api_call(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        use_cache: bool,
    ) -> Result<Value> {
        self.request(endpoint, params, use_cache, self.max_retries).await
    }

    #[instrument(skip(self, params), fields(endpoint = endpoint))]
    async fn request(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        use_cache: bool,
        max_retries: u32,
    ) -> Result<Value> {
        let api_key = self.api_key.as_deref().ok_or(ClimaError::MissingApiKey)?;

        let cache_key = ResponseCache::key(endpoint, params);
        if use_cache {
            if let Some(data) = self.cache.get(&cache_key) {
                debug!("Using cached data for {}", cache_key);
                return Ok(data);
            }
        }

        self.rate_limiter.lock().await.acquire().await;

        let mut url = format!(
            "{}/{}?appid={}&units={}&lang={}",
            self.base_url,
            endpoint,
            urlencoding::encode(api_key),
            self.units.as_str(),
            urlencoding::encode(&self.lang)
        );
        for (name, value) in params {
            url.push('&');
            url.push_str(name);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }

        let max_attempts = max_retries + 1;
        let request_start = Instant::now();
        let mut last_error = None;

        for attempt in 0..max_attempts {
            debug!("API request {} (attempt {}/{})", cache_key, attempt + 1, max_attempts);

            match self.send(&url).await {
                Ok(data) => {
                    info!(
                        "Successful API request to {} in {:.3}s (attempt {})",
                        endpoint,
                        request_start.elapsed().as_secs_f64(),
                        attempt + 1
                    );
                    self.cache.insert(cache_key, data.clone());
                    return Ok(data);
                }
                Err(err) => {
                    warn!("Attempt {} failed: {}", attempt + 1, err);

                    if matches!(err, ClimaError::InvalidApiKey | ClimaError::NotFound) {
                        return Err(err);
                    }

                    if attempt + 1 < max_attempts {
                        let backoff = backoff_delay(self.retry_delay, attempt);
                        debug!("Exponential backoff: waiting {:.1}s", backoff.as_secs_f64());
                        tokio::time::sleep(backoff).await;
                    }
                    last_error = Some(err);
                }
            }
        }

        error!("API request to {} failed after {} attempts", endpoint, max_attempts);
        Err(last_error.unwrap_or_else(|| ClimaError::network("no request attempted")))
    }

    async fn send(&self, url: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message);
            return Err(ClimaError::from_status(status.as_u16(), message));
        }

        Ok(response.json::<Value>().await?)
    }

    /// Current conditions at `coords`
    pub async fn current_weather(&self, coords: Coordinates) -> Result<CurrentWeather> {
        info!("Getting current weather for coordinates: {}", coords);
        let (lat, lon) = coords.query_values();
        let data = self
            .api_call("weather", &[("lat", lat), ("lon", lon)], true)
            .await?;

        let response: CurrentResponse = serde_json::from_value(data)?;
        response.into_model(coords)
    }

    /// UV index at `coords`; `None` when the service can't provide one
    pub async fn uv_index(&self, coords: Coordinates) -> Option<f64> {
        let (lat, lon) = coords.query_values();
        // single attempt
        let data = match self.request("uvi", &[("lat", lat), ("lon", lon)], true, 0).await {
            Ok(data) => data,
            Err(err) => {
                warn!("UV index not available: {}", err);
                return None;
            }
        };

        match serde_json::from_value::<UvResponse>(data) {
            Ok(uv) => uv.value,
            Err(err) => {
                warn!("Unexpected UV index payload: {}", err);
                None
            }
        }
    }

    /// Current conditions plus the UV index when available
    pub async fn current_weather_extended(&self, coords: Coordinates) -> Result<CurrentWeather> {
        let mut weather = self.current_weather(coords).await?;
        weather.uv_index = self.uv_index(coords).await;
        Ok(weather)
    }

    /// Multi-day forecast at `coords`
    pub async fn forecast(&self, coords: Coordinates) -> Result<Forecast> {
        info!("Getting forecast for coordinates: {}", coords);
        let (lat, lon) = coords.query_values();
        let data = self
            .api_call("forecast", &[("lat", lat), ("lon", lon)], true)
            .await?;

        let response: ForecastResponse = serde_json::from_value(data)?;
        let forecast = response.into_model()?;
        info!(
            "Retrieved forecast with {} samples for {}",
            forecast.samples.len(),
            forecast.city
        );
        Ok(forecast)
    }

    /// Resolve a city name to a position through the weather endpoint
    pub async fn city_coordinates(&self, name: &str) -> Result<Position> {
        info!("Resolving coordinates of '{}'", name);
        let data = self
            .api_call("weather", &[("q", name.to_string())], true)
            .await?;

        let response: CurrentResponse = serde_json::from_value(data)?;
        let coord = response
            .coord
            .ok_or_else(|| ClimaError::incomplete(format!("no coordinates for {name}")))?;

        Ok(Position::new(
            Coordinates::new(coord.lat, coord.lon),
            PositionSource::City(name.to_string()),
        ))
    }

    /// Drop expired cached responses
    pub fn cleanup_cache(&self) -> usize {
        self.cache.cleanup()
    }

    #[must_use]
    pub fn cached_responses(&self) -> usize {
        self.cache.len()
    }
}

/// Wait before retry number `attempt + 1`: the base delay doubled per attempt
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(attempt))
}
