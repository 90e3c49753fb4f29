//! `clima` - terminal weather dashboard
//!
//! Locates the user, fetches current conditions and a multi-day forecast
//! from OpenWeatherMap, aggregates the forecast per day and renders it
//! with a day/night theme and optional particle effects.

pub mod api;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod effects;
pub mod error;
pub mod geolocation;
pub mod logging;
pub mod models;
pub mod render;
pub mod storage;
pub mod theme;

// Re-export core types for public API
pub use api::WeatherApiClient;
pub use cache::ResponseCache;
pub use config::{ClimaConfig, Units};
pub use dashboard::{AppState, Dashboard, LoadOutcome, WatchEvent};
pub use effects::{EffectKind, Frame, ParticleSystem};
pub use error::ClimaError;
pub use geolocation::{Geolocator, LocationInput, LocationService};
pub use models::{Coordinates, CurrentWeather, DailyAggregate, Forecast, Position};
pub use render::Renderer;
pub use storage::{Stamped, Storage};
pub use theme::{Theme, ThemeController};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, ClimaError>;
