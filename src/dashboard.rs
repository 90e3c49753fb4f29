//! Application state and the load/refresh cycle of the dashboard

use crate::api::WeatherApiClient;
use crate::config::ClimaConfig;
use crate::effects::{BackdropClass, EffectKind, Frame, ParticleSystem, select_effect};
use crate::geolocation::{LocationInput, LocationService};
use crate::models::{CurrentWeather, DailyAggregate, Forecast, Position};
use crate::storage::{CHART_DATA_KEY, FORECAST_DATA_KEY, Stamped, Storage, WEATHER_DATA_KEY};
use crate::theme::{Theme, ThemeController, sun_times_for};
use crate::{ClimaError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Everything the dashboard currently shows
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppState {
    pub position: Option<Position>,
    pub weather: Option<CurrentWeather>,
    pub forecast: Option<Forecast>,
    pub daily: Vec<DailyAggregate>,
    pub last_update: Option<DateTime<Utc>>,
    pub has_error: bool,
    pub last_error: Option<String>,
    pub retry_count: u32,
    /// Progress or outcome line shown while loading
    pub status: String,
    pub theme: Theme,
    pub effect: EffectKind,
    pub backdrop: Option<BackdropClass>,
    #[serde(skip)]
    updated_at: Option<Instant>,
}

impl AppState {
    /// Age of the displayed data, `None` before the first successful load
    #[must_use]
    pub fn age(&self) -> Option<Duration> {
        self.updated_at.map(|at| at.elapsed())
    }
}

/// Result of one [`Dashboard::load`] call
#[derive(Debug)]
pub enum LoadOutcome {
    /// Another load was in progress
    Skipped,
    /// Position and data still current; nothing fetched
    Unchanged,
    Updated,
    Failed {
        error: ClimaError,
        retry_offered: bool,
    },
}

/// What happened during [`Dashboard::run_watch`]
#[derive(Debug)]
pub enum WatchEvent {
    /// A load finished; `state` is the dashboard right after it
    Loaded {
        outcome: LoadOutcome,
        state: Box<AppState>,
    },
    ThemeChanged(Theme),
    Frame {
        frame: Frame,
        effect: EffectKind,
    },
}

struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Daily aggregates saved by an earlier load, if still fresh.
///
/// Prefers the stored chart data and falls back to re-aggregating the
/// stored forecast.
pub async fn stored_daily(storage: &Storage, config: &ClimaConfig) -> Option<Vec<DailyAggregate>> {
    let max_age = config.cache_duration();
    let max_days = config.dashboard.forecast_days;

    let chart = storage
        .get_json::<Stamped<Vec<DailyAggregate>>>(CHART_DATA_KEY)
        .await
        .unwrap_or_else(|err| {
            warn!("Ignoring stored chart data: {:#}", err);
            None
        });
    if let Some(stored) = chart.filter(|stored| stored.is_fresh(max_age)) {
        let mut days = stored.data;
        days.truncate(max_days);
        return Some(days);
    }

    let forecast = storage
        .get_json::<Stamped<Forecast>>(FORECAST_DATA_KEY)
        .await
        .unwrap_or_else(|err| {
            warn!("Ignoring stored forecast data: {:#}", err);
            None
        })
        .filter(|stored| stored.is_fresh(max_age))?;
    debug!("Rebuilding chart data from the stored forecast");
    Some(forecast.data.daily(config.api.units.wind_to_kmh(), max_days))
}

pub struct Dashboard {
    api: Arc<WeatherApiClient>,
    locator: LocationService,
    storage: Option<Storage>,
    location_override: Option<LocationInput>,
    theme: Mutex<ThemeController>,
    state: Mutex<AppState>,
    loading: AtomicBool,
    cache_duration: Duration,
    update_interval: Duration,
    theme_check: Duration,
    frame_interval: Duration,
    change_threshold: f64,
    max_retries: u32,
    forecast_days: usize,
    effects_enabled: bool,
}

impl Dashboard {
    pub fn new(
        config: &ClimaConfig,
        api: Arc<WeatherApiClient>,
        locator: LocationService,
        storage: Option<Storage>,
    ) -> Self {
        Self {
            api,
            locator,
            storage,
            location_override: None,
            theme: Mutex::new(ThemeController::default()),
            state: Mutex::new(AppState::default()),
            loading: AtomicBool::new(false),
            cache_duration: config.cache_duration(),
            update_interval: config.update_interval(),
            theme_check: Duration::from_secs(config.dashboard.theme_check_seconds),
            frame_interval: Duration::from_millis(config.dashboard.frame_millis),
            change_threshold: config.location.change_threshold_degrees,
            max_retries: config.api.max_retries,
            forecast_days: config.dashboard.forecast_days,
            effects_enabled: config.dashboard.effects,
        }
    }

    /// Show this place instead of the located position
    #[must_use]
    pub fn with_location(mut self, input: LocationInput) -> Self {
        self.location_override = Some(input);
        self
    }

    #[must_use]
    pub fn with_theme_controller(mut self, controller: ThemeController) -> Self {
        self.theme = Mutex::new(controller);
        self
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> AppState {
        self.state.lock().await.clone()
    }

    /// Pick the starting theme from storage, or from the clock without one.
    pub async fn initialize_theme(&self) -> Theme {
        let mut controller = self.theme.lock().await;
        let theme = match &self.storage {
            Some(storage) => controller.initialize(storage, Utc::now()).await,
            None => {
                controller.update(Utc::now());
                controller.theme()
            }
        };
        self.state.lock().await.theme = theme;
        theme
    }

    async fn set_status(&self, status: &str) {
        info!("{}", status);
        self.state.lock().await.status = status.to_string();
    }

    /// Locate, fetch and aggregate, unless the shown data is still current.
    ///
    /// Concurrent calls are skipped unless `force_refresh` is set.
    pub async fn load(&self, force_refresh: bool) -> LoadOutcome {
        if self.loading.swap(true, Ordering::SeqCst) && !force_refresh {
            warn!("A load is already in progress");
            return LoadOutcome::Skipped;
        }
        let _guard = LoadingGuard(&self.loading);

        self.state.lock().await.has_error = false;

        match self.fetch(force_refresh).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("Error loading weather data: {}", err);
                let mut state = self.state.lock().await;
                state.retry_count += 1;
                state.has_error = true;
                state.last_error = Some(err.user_message());
                state.status = "Could not load weather data".to_string();
                let retry_offered = err.is_retryable() && state.retry_count < self.max_retries;
                LoadOutcome::Failed {
                    error: err,
                    retry_offered,
                }
            }
        }
    }

    async fn fetch(&self, force_refresh: bool) -> Result<LoadOutcome> {
        let removed = self.api.cleanup_cache();
        if removed > 0 {
            debug!("Removed {} expired responses", removed);
        }

        self.set_status("Detecting your location...").await;
        let position = match &self.location_override {
            Some(input) => self.locator.resolve(input).await?,
            None => self.locator.current_position().await?,
        };

        let needs_update = {
            let state = self.state.lock().await;
            let previous = state.position.as_ref().map(|p| &p.coordinates);
            force_refresh
                || position.coordinates.has_changed(previous, self.change_threshold)
                || state.weather.is_none()
                || state.forecast.is_none()
                || state.age().is_none_or(|age| age > self.cache_duration)
        };

        if !needs_update {
            info!("Using existing data (no significant changes)");
            let mut state = self.state.lock().await;
            state.retry_count = 0;
            state.last_error = None;
            state.status = "Up to date".to_string();
            return Ok(LoadOutcome::Unchanged);
        }

        self.set_status("Loading weather data...").await;
        let coordinates = position.coordinates;
        let (weather, forecast) = futures::future::try_join(
            self.api.current_weather_extended(coordinates),
            self.api.forecast(coordinates),
        )
        .await?;

        let wind_factor = self.api.units().wind_to_kmh();
        let daily = forecast.daily(wind_factor, self.forecast_days);

        self.persist(&weather, &forecast, &daily).await;

        let now = Utc::now();
        let sun = weather
            .sun
            .or_else(|| sun_times_for(coordinates, now.date_naive()));
        let theme = {
            let mut controller = self.theme.lock().await;
            controller.set_sun_times(sun);
            controller.update(now);
            controller.theme()
        };

        let wind_kmh = weather.wind_speed_kmh(wind_factor);
        let effect = if self.effects_enabled {
            select_effect(weather.condition.group(), wind_kmh)
        } else {
            EffectKind::Clear
        };
        let backdrop = BackdropClass::for_weather(&weather, wind_kmh);

        let mut state = self.state.lock().await;
        state.position = Some(position);
        state.weather = Some(weather);
        state.forecast = Some(forecast);
        state.daily = daily;
        state.last_update = Some(now);
        state.updated_at = Some(Instant::now());
        state.retry_count = 0;
        state.last_error = None;
        state.status = "Weather data loaded".to_string();
        state.theme = theme;
        state.effect = effect;
        state.backdrop = Some(backdrop);
        info!("All data loaded, effect {}", effect);

        Ok(LoadOutcome::Updated)
    }

    async fn persist(&self, weather: &CurrentWeather, forecast: &Forecast, daily: &[DailyAggregate]) {
        let Some(storage) = &self.storage else {
            return;
        };

        if let Err(err) = storage
            .put_json(WEATHER_DATA_KEY, &Stamped::now(weather), None)
            .await
        {
            warn!("Could not store weather data: {:#}", err);
        }
        if let Err(err) = storage
            .put_json(FORECAST_DATA_KEY, &Stamped::now(forecast), None)
            .await
        {
            warn!("Could not store forecast data: {:#}", err);
        }
        if let Err(err) = storage
            .put_json(CHART_DATA_KEY, &Stamped::now(daily), None)
            .await
        {
            warn!("Could not store chart data: {:#}", err);
        }
    }

    /// Reload when the data is older than the cache duration.
    pub async fn refresh_if_needed(&self) -> Option<LoadOutcome> {
        let stale = self
            .state
            .lock()
            .await
            .age()
            .is_none_or(|age| age > self.cache_duration);

        if stale {
            info!("Refreshing data automatically");
            Some(self.load(true).await)
        } else {
            None
        }
    }

    /// Keep the dashboard current until `shutdown` completes.
    ///
    /// Refreshes every update interval, re-checks the theme every
    /// `theme_check_seconds` and, with effects on, emits animation frames of
    /// `width` x `height` cells.
    pub async fn run_watch<S, F>(&self, shutdown: S, width: u16, height: u16, mut on_event: F)
    where
        S: Future<Output = ()>,
        F: FnMut(WatchEvent),
    {
        tokio::pin!(shutdown);

        let outcome = self.load(false).await;
        on_event(WatchEvent::Loaded {
            outcome,
            state: Box::new(self.snapshot().await),
        });

        let mut refresh = tokio::time::interval_at(Instant::now() + self.update_interval, self.update_interval);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut theme_tick = tokio::time::interval_at(Instant::now() + self.theme_check, self.theme_check);
        theme_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut frame_tick = tokio::time::interval(self.frame_interval);
        frame_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut particles = ParticleSystem::new(self.state.lock().await.effect, f64::from(width), f64::from(height));

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Stopping watch");
                    break;
                }
                _ = refresh.tick() => {
                    if let Some(outcome) = self.refresh_if_needed().await {
                        let state = self.snapshot().await;
                        if state.effect != particles.kind() {
                            particles.change(state.effect);
                        }
                        on_event(WatchEvent::Loaded {
                            outcome,
                            state: Box::new(state),
                        });
                    }
                }
                _ = theme_tick.tick() => {
                    let changed = self.theme.lock().await.update(Utc::now());
                    if let Some(theme) = changed {
                        self.state.lock().await.theme = theme;
                        on_event(WatchEvent::ThemeChanged(theme));
                    }
                }
                _ = frame_tick.tick(), if self.effects_enabled && particles.kind() != EffectKind::Clear => {
                    particles.step();
                    on_event(WatchEvent::Frame {
                        frame: Frame::capture(&particles),
                        effect: particles.kind(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geolocation::FixedGeolocator;
    use crate::models::Coordinates;
    use chrono::FixedOffset;

    fn dashboard_without_key() -> Dashboard {
        let config = ClimaConfig::default();
        let api = Arc::new(WeatherApiClient::new(&config).unwrap());
        let locator = LocationService::new(
            Box::new(FixedGeolocator::new(Coordinates::new(40.4168, -3.7038))),
            Arc::clone(&api),
            &config.location,
        );
        Dashboard::new(&config, api, locator, None)
            .with_theme_controller(ThemeController::new(FixedOffset::east_opt(0).unwrap()))
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_retry() {
        let dashboard = dashboard_without_key();

        let outcome = dashboard.load(false).await;
        match outcome {
            LoadOutcome::Failed {
                error,
                retry_offered,
            } => {
                assert!(matches!(error, ClimaError::MissingApiKey));
                assert!(!retry_offered);
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        let state = dashboard.snapshot().await;
        assert!(state.has_error);
        assert_eq!(state.retry_count, 1);
        assert!(state.last_error.unwrap().contains("API key"));
        assert!(state.weather.is_none());
        assert!(!dashboard.is_loading());
    }

    #[tokio::test]
    async fn test_retry_count_accumulates() {
        let dashboard = dashboard_without_key();
        dashboard.load(false).await;
        dashboard.load(true).await;
        assert_eq!(dashboard.snapshot().await.retry_count, 2);
    }

    #[tokio::test]
    async fn test_concurrent_load_is_skipped() {
        let dashboard = dashboard_without_key();
        dashboard.loading.store(true, Ordering::SeqCst);

        assert!(matches!(dashboard.load(false).await, LoadOutcome::Skipped));
        // the flag belongs to the other load
        assert!(dashboard.is_loading());
    }

    #[tokio::test]
    async fn test_refresh_without_data_loads() {
        let dashboard = dashboard_without_key();
        let outcome = dashboard.refresh_if_needed().await;
        assert!(matches!(outcome, Some(LoadOutcome::Failed { .. })));
    }

    #[tokio::test]
    async fn test_snapshot_serializes() {
        let dashboard = dashboard_without_key();
        let json = serde_json::to_value(dashboard.snapshot().await).unwrap();
        assert_eq!(json["theme"], "light");
        assert_eq!(json["effect"], "clear");
        assert!(json.get("updated_at").is_none());
    }
}
