//! OpenWeatherMap 2.5 response structures and conversion into the models

use crate::error::ClimaError;
use crate::models::{Condition, Coordinates, CurrentWeather, Forecast, ForecastSample, SunTimes};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct WeatherEntry {
    pub id: u16,
    pub main: String,
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

impl From<WeatherEntry> for Condition {
    fn from(entry: WeatherEntry) -> Self {
        Condition {
            id: entry.id,
            main: entry.main,
            description: entry.description,
            icon: entry.icon,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MainBlock {
    pub temp: f64,
    pub feels_like: f64,
    pub pressure: f64,
    pub humidity: u8,
}

#[derive(Debug, Default, Deserialize)]
pub struct Wind {
    #[serde(default)]
    pub speed: f64,
    pub deg: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Volume {
    #[serde(rename = "1h")]
    pub one_hour: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Sys {
    pub country: Option<String>,
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
}

/// Body of `GET /weather`
#[derive(Debug, Deserialize)]
pub struct CurrentResponse {
    pub coord: Option<Coord>,
    #[serde(default)]
    pub weather: Vec<WeatherEntry>,
    pub main: Option<MainBlock>,
    #[serde(default)]
    pub wind: Wind,
    pub rain: Option<Volume>,
    pub snow: Option<Volume>,
    pub dt: Option<i64>,
    #[serde(default)]
    pub sys: Sys,
    #[serde(default)]
    pub timezone: i32,
    #[serde(default)]
    pub name: String,
}

/// Body of `GET /uvi`
#[derive(Debug, Deserialize)]
pub struct UvResponse {
    pub value: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastItem {
    pub dt: i64,
    pub main: MainBlock,
    #[serde(default)]
    pub weather: Vec<WeatherEntry>,
    #[serde(default)]
    pub wind: Wind,
    #[serde(default)]
    pub pop: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct City {
    #[serde(default)]
    pub name: String,
    pub country: Option<String>,
    #[serde(default)]
    pub timezone: i32,
}

/// Body of `GET /forecast`
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub list: Vec<ForecastItem>,
    #[serde(default)]
    pub city: City,
}

/// Body of a non-success answer
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

impl CurrentResponse {
    /// Convert into a snapshot. `requested` is used when the body lacks `coord`.
    pub fn into_model(self, requested: Coordinates) -> Result<CurrentWeather, ClimaError> {
        let main = self
            .main
            .ok_or_else(|| ClimaError::incomplete("current weather without `main` block"))?;
        let condition: Condition = self
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| ClimaError::incomplete("current weather without conditions"))?
            .into();

        let sun = match (
            self.sys.sunrise.and_then(timestamp),
            self.sys.sunset.and_then(timestamp),
        ) {
            (Some(sunrise), Some(sunset)) => Some(SunTimes { sunrise, sunset }),
            _ => None,
        };

        Ok(CurrentWeather {
            location_name: self.name,
            country: self.sys.country,
            coordinates: self
                .coord
                .map_or(requested, |c| Coordinates::new(c.lat, c.lon)),
            observed_at: self.dt.and_then(timestamp).unwrap_or_else(Utc::now),
            temperature: main.temp,
            feels_like: main.feels_like,
            humidity: main.humidity,
            pressure: main.pressure,
            wind_speed: self.wind.speed,
            wind_direction: self.wind.deg,
            condition,
            rain_1h: self.rain.and_then(|r| r.one_hour),
            snow_1h: self.snow.and_then(|s| s.one_hour),
            sun,
            uv_index: None,
            timezone_offset: self.timezone,
        })
    }
}

impl ForecastResponse {
    pub fn into_model(self) -> Result<Forecast, ClimaError> {
        if self.list.is_empty() {
            return Err(ClimaError::incomplete("forecast without samples"));
        }

        let mut samples: Vec<ForecastSample> = self
            .list
            .into_iter()
            .filter_map(|item| {
                let condition = item.weather.into_iter().next()?.into();
                Some(ForecastSample {
                    timestamp: timestamp(item.dt)?,
                    temperature: item.main.temp,
                    feels_like: item.main.feels_like,
                    humidity: item.main.humidity,
                    pressure: item.main.pressure,
                    wind_speed: item.wind.speed,
                    precipitation_probability: item.pop.clamp(0.0, 1.0),
                    condition,
                })
            })
            .collect();

        if samples.is_empty() {
            return Err(ClimaError::incomplete("forecast samples without conditions"));
        }
        samples.sort_by_key(|s| s.timestamp);

        Ok(Forecast {
            city: self.city.name,
            country: self.city.country,
            timezone_offset: self.city.timezone,
            samples,
            retrieved_at: Utc::now(),
        })
    }
}
