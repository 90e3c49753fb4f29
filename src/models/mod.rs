//! Data models for the clima dashboard
//!
//! - Location: coordinates and where a position came from
//! - Weather: the current conditions snapshot
//! - Forecast: forecast samples and their daily aggregates

pub mod forecast;
pub mod location;
pub mod weather;

pub use forecast::{DailyAggregate, Forecast, ForecastSample, aggregate_daily, day_label};
pub use location::{Coordinates, Position, PositionSource};
pub use weather::{Condition, ConditionGroup, CurrentWeather, PrecipitationOutlook, SunTimes};
