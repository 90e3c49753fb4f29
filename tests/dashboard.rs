//! Full load cycle against a mock OpenWeatherMap server

mod common;

use async_trait::async_trait;
use chrono::{FixedOffset, Timelike, Utc};
use clima::dashboard::{Dashboard, LoadOutcome, WatchEvent, stored_daily};
use clima::effects::{BackdropClass, EffectKind};
use clima::geolocation::{FixedGeolocator, Geolocator, LocationService};
use clima::models::{Coordinates, CurrentWeather, DailyAggregate, Position, PositionSource};
use clima::storage::{CHART_DATA_KEY, Stamped, Storage, WEATHER_DATA_KEY};
use clima::theme::{Theme, ThemeController};
use clima::{ClimaError, ClimaConfig, WeatherApiClient};
use common::{config_for, current_weather_body, forecast_body};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_weather(server: &MockServer) {
    Mock::given(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_weather_body()))
        .mount(server)
        .await;
    Mock::given(path("/uvi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "value": 5.0 })))
        .mount(server)
        .await;
    Mock::given(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .mount(server)
        .await;
}

fn dashboard(config: &ClimaConfig, coordinates: Coordinates, storage: Option<Storage>) -> Dashboard {
    let api = Arc::new(WeatherApiClient::new(config).unwrap());
    let locator = LocationService::new(
        Box::new(FixedGeolocator::new(coordinates)),
        Arc::clone(&api),
        &config.location,
    );
    Dashboard::new(config, api, locator, storage)
        .with_theme_controller(ThemeController::new(FixedOffset::east_opt(0).unwrap()))
}

/// Reports whatever position the test sets; `None` means no fix
#[derive(Clone)]
struct MovingGeolocator(Arc<Mutex<Option<Coordinates>>>);

impl MovingGeolocator {
    fn at(coordinates: Coordinates) -> Self {
        Self(Arc::new(Mutex::new(Some(coordinates))))
    }

    fn set(&self, coordinates: Option<Coordinates>) {
        *self.0.lock().unwrap() = coordinates;
    }
}

#[async_trait]
impl Geolocator for MovingGeolocator {
    async fn locate(&self) -> clima::Result<Position> {
        let current = *self.0.lock().unwrap();
        match current {
            Some(coordinates) => Ok(Position::new(coordinates, PositionSource::Fixed)),
            None => Err(ClimaError::PositionUnavailable {
                message: "no signal".to_string(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "moving"
    }
}

fn moving_dashboard(config: &ClimaConfig, geolocator: &MovingGeolocator) -> Dashboard {
    let mut config = config.clone();
    // ask the provider on every load
    config.location.maximum_age_seconds = 0;
    let api = Arc::new(WeatherApiClient::new(&config).unwrap());
    let locator = LocationService::new(Box::new(geolocator.clone()), Arc::clone(&api), &config.location);
    Dashboard::new(&config, api, locator, None)
        .with_theme_controller(ThemeController::new(FixedOffset::east_opt(0).unwrap()))
}

/// Offset that puts the local clock at 23:xx right now
fn late_evening_offset() -> FixedOffset {
    let hour = i32::try_from(Utc::now().hour()).unwrap();
    let mut shift = (23 - hour).rem_euclid(24);
    if shift > 12 {
        shift -= 24;
    }
    FixedOffset::east_opt(shift * 3600).unwrap()
}

#[tokio::test]
async fn test_load_fills_state_and_storage() {
    let server = MockServer::start().await;
    mount_weather(&server).await;
    let dir = TempDir::new().unwrap();
    let storage = Storage::open(dir.path()).unwrap();

    let config = config_for(&server.uri());
    let dashboard = dashboard(&config, Coordinates::new(40.4168, -3.7038), Some(storage.clone()));

    let outcome = dashboard.load(false).await;
    assert!(matches!(outcome, LoadOutcome::Updated), "{outcome:?}");

    let state = dashboard.snapshot().await;
    assert!(!state.has_error);
    assert_eq!(state.retry_count, 0);
    assert!(state.last_update.is_some());
    assert_eq!(state.daily.len(), 2);
    assert_eq!(state.weather.as_ref().unwrap().uv_index, Some(5.0));
    // rain wins over the 34 km/h wind
    assert_eq!(state.effect, EffectKind::Rain);
    assert_eq!(state.backdrop, Some(BackdropClass::Rainy));

    let stored: Stamped<CurrentWeather> = storage.get_json(WEATHER_DATA_KEY).await.unwrap().unwrap();
    assert_eq!(stored.data.location_name, "Madrid");
    let chart: Stamped<Vec<DailyAggregate>> = storage.get_json(CHART_DATA_KEY).await.unwrap().unwrap();
    assert_eq!(chart.data, state.daily);
    assert!(chart.is_fresh(Duration::from_secs(60)));
}

#[tokio::test]
async fn test_second_load_without_changes_is_unchanged() {
    let server = MockServer::start().await;
    mount_weather(&server).await;

    let config = config_for(&server.uri());
    let dashboard = dashboard(&config, Coordinates::new(40.4168, -3.7038), None);

    assert!(matches!(dashboard.load(false).await, LoadOutcome::Updated));
    assert!(matches!(dashboard.load(false).await, LoadOutcome::Unchanged));
    assert!(dashboard.refresh_if_needed().await.is_none());

    // forcing always refetches
    assert!(matches!(dashboard.load(true).await, LoadOutcome::Updated));
}

#[tokio::test]
async fn test_server_failure_offers_retry() {
    let server = MockServer::start().await;
    Mock::given(path("/weather"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(path("/forecast"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut config = config_for(&server.uri());
    config.api.max_retries = 2;
    let dashboard = dashboard(&config, Coordinates::new(40.4168, -3.7038), None);

    match dashboard.load(false).await {
        LoadOutcome::Failed {
            error,
            retry_offered,
        } => {
            assert!(matches!(error, ClimaError::Server { status: 500 }));
            assert!(retry_offered);
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    // second failure reaches max_retries
    match dashboard.load(false).await {
        LoadOutcome::Failed { retry_offered, .. } => assert!(!retry_offered),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(dashboard.snapshot().await.retry_count, 2);
}

#[tokio::test]
async fn test_forced_reload_reuses_fresh_responses() {
    let server = MockServer::start().await;
    mount_weather(&server).await;

    let config = config_for(&server.uri());
    let dashboard = dashboard(&config, Coordinates::new(40.4168, -3.7038), None);
    assert!(matches!(dashboard.load(false).await, LoadOutcome::Updated));

    server.reset().await;
    Mock::given(path("/weather"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(path("/forecast"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    // a forced reload still answers from the response cache within its TTL
    assert!(matches!(dashboard.load(true).await, LoadOutcome::Updated));
    assert!(dashboard.snapshot().await.weather.is_some());
}

#[tokio::test]
async fn test_watch_emits_initial_load_and_frames() {
    let server = MockServer::start().await;
    mount_weather(&server).await;

    let mut config = config_for(&server.uri());
    config.dashboard.frame_millis = 10;
    let dashboard = dashboard(&config, Coordinates::new(40.4168, -3.7038), None);

    let mut loads = 0;
    let mut frames = 0;
    let shutdown = tokio::time::sleep(Duration::from_millis(200));

    dashboard
        .run_watch(shutdown, 40, 10, |event| match event {
            WatchEvent::Loaded { outcome, state } => {
                assert!(matches!(outcome, LoadOutcome::Updated));
                assert_eq!(state.effect, EffectKind::Rain);
                loads += 1;
            }
            WatchEvent::Frame { frame, effect } => {
                assert_eq!(effect, EffectKind::Rain);
                assert_eq!(frame.width(), 40);
                frames += 1;
            }
            WatchEvent::ThemeChanged(_) => {}
        })
        .await;

    assert_eq!(loads, 1);
    assert!(frames > 0);
}

#[tokio::test]
async fn test_moving_beyond_threshold_refetches() {
    let server = MockServer::start().await;
    Mock::given(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_weather_body()))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(path("/uvi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "value": 5.0 })))
        .mount(&server)
        .await;
    Mock::given(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .expect(2)
        .mount(&server)
        .await;

    let geolocator = MovingGeolocator::at(Coordinates::new(40.4168, -3.7038));
    let dashboard = moving_dashboard(&config_for(&server.uri()), &geolocator);
    assert!(matches!(dashboard.load(false).await, LoadOutcome::Updated));

    // well under the threshold
    geolocator.set(Some(Coordinates::new(40.4169, -3.7038)));
    assert!(matches!(dashboard.load(false).await, LoadOutcome::Unchanged));

    geolocator.set(Some(Coordinates::new(41.4168, -3.7038)));
    let outcome = dashboard.load(false).await;
    assert!(matches!(outcome, LoadOutcome::Updated), "{outcome:?}");

    let state = dashboard.snapshot().await;
    assert_eq!(state.position.unwrap().coordinates, Coordinates::new(41.4168, -3.7038));
}

#[tokio::test]
async fn test_unchanged_load_clears_previous_error() {
    let server = MockServer::start().await;
    mount_weather(&server).await;

    let geolocator = MovingGeolocator::at(Coordinates::new(40.4168, -3.7038));
    let dashboard = moving_dashboard(&config_for(&server.uri()), &geolocator);
    assert!(matches!(dashboard.load(false).await, LoadOutcome::Updated));

    geolocator.set(None);
    assert!(matches!(dashboard.load(false).await, LoadOutcome::Failed { .. }));
    let state = dashboard.snapshot().await;
    assert!(state.has_error);
    assert!(state.last_error.is_some());
    assert_eq!(state.retry_count, 1);

    geolocator.set(Some(Coordinates::new(40.4168, -3.7038)));
    assert!(matches!(dashboard.load(false).await, LoadOutcome::Unchanged));
    let state = dashboard.snapshot().await;
    assert!(!state.has_error);
    assert_eq!(state.last_error, None);
    assert_eq!(state.retry_count, 0);
    assert_eq!(state.status, "Up to date");
}

#[tokio::test]
async fn test_watch_refreshes_stale_data_periodically() {
    let server = MockServer::start().await;
    mount_weather(&server).await;

    let mut config = config_for(&server.uri());
    config.dashboard.update_interval_seconds = 1;
    config.dashboard.theme_check_seconds = 3600;
    config.dashboard.effects = false;
    config.cache.duration_seconds = 0;
    let dashboard = dashboard(&config, Coordinates::new(40.4168, -3.7038), None);

    let mut loads = 0;
    let shutdown = tokio::time::sleep(Duration::from_millis(1600));

    dashboard
        .run_watch(shutdown, 40, 10, |event| match event {
            WatchEvent::Loaded { outcome, state } => {
                assert!(matches!(outcome, LoadOutcome::Updated), "{outcome:?}");
                assert!(state.weather.is_some());
                loads += 1;
            }
            WatchEvent::Frame { .. } => panic!("effects are disabled"),
            WatchEvent::ThemeChanged(_) => {}
        })
        .await;

    // the initial load plus the one after the first interval
    assert_eq!(loads, 2);
    assert!(server.received_requests().await.unwrap().len() >= 6);
}

#[tokio::test]
async fn test_watch_reports_theme_changes() {
    let server = MockServer::start().await;
    let mut config = config_for(&server.uri());
    // loads fail, so only the clock drives the theme
    config.api.api_key = None;
    config.dashboard.update_interval_seconds = 3600;
    config.dashboard.theme_check_seconds = 1;
    config.dashboard.effects = false;

    let api = Arc::new(WeatherApiClient::new(&config).unwrap());
    let locator = LocationService::new(
        Box::new(FixedGeolocator::new(Coordinates::new(40.4168, -3.7038))),
        Arc::clone(&api),
        &config.location,
    );
    let dashboard = Dashboard::new(&config, api, locator, None)
        .with_theme_controller(ThemeController::new(late_evening_offset()));

    let mut themes = Vec::new();
    let shutdown = tokio::time::sleep(Duration::from_millis(1500));

    dashboard
        .run_watch(shutdown, 40, 10, |event| match event {
            WatchEvent::Loaded { outcome, state } => {
                assert!(matches!(outcome, LoadOutcome::Failed { .. }), "{outcome:?}");
                assert_eq!(state.theme, Theme::Light);
            }
            WatchEvent::ThemeChanged(theme) => themes.push(theme),
            WatchEvent::Frame { .. } => panic!("effects are disabled"),
        })
        .await;

    assert_eq!(themes, vec![Theme::Dark]);
    assert_eq!(dashboard.snapshot().await.theme, Theme::Dark);
}

#[tokio::test]
async fn test_stored_daily_falls_back_to_forecast() {
    let server = MockServer::start().await;
    mount_weather(&server).await;
    let dir = TempDir::new().unwrap();
    let storage = Storage::open(dir.path()).unwrap();

    let config = config_for(&server.uri());
    assert_eq!(stored_daily(&storage, &config).await, None);

    let dashboard = dashboard(&config, Coordinates::new(40.4168, -3.7038), Some(storage.clone()));
    assert!(matches!(dashboard.load(false).await, LoadOutcome::Updated));
    let expected = dashboard.snapshot().await.daily;
    assert_eq!(stored_daily(&storage, &config).await.as_ref(), Some(&expected));

    let stale: Stamped<Vec<DailyAggregate>> = Stamped {
        data: Vec::new(),
        timestamp: Utc::now() - chrono::Duration::hours(2),
    };
    storage.put_json(CHART_DATA_KEY, &stale, None).await.unwrap();
    assert_eq!(stored_daily(&storage, &config).await, Some(expected));
}
