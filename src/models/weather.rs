//! Current weather snapshot and derived display values

use super::Coordinates;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse condition family, as reported in the API `weather[0].main` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionGroup {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Thunderstorm,
    Snow,
    /// Mist, fog, haze, smoke, dust...
    Atmosphere,
    Other,
}

impl ConditionGroup {
    #[must_use]
    pub fn from_main(main: &str) -> Self {
        match main.to_lowercase().as_str() {
            "clear" => Self::Clear,
            "clouds" => Self::Clouds,
            "rain" => Self::Rain,
            "drizzle" => Self::Drizzle,
            "thunderstorm" => Self::Thunderstorm,
            "snow" => Self::Snow,
            "mist" | "fog" | "haze" | "smoke" | "dust" | "sand" | "ash" | "squall"
            | "tornado" => Self::Atmosphere,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub fn is_wet(&self) -> bool {
        matches!(self, Self::Rain | Self::Drizzle)
    }
}

/// A weather condition as reported by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Numeric condition id (2xx thunderstorm ... 80x clouds)
    pub id: u16,
    /// Condition family name, e.g. "Clouds"
    pub main: String,
    /// Localised description, e.g. "algo de nubes"
    pub description: String,
    /// Icon code, e.g. "03d"
    pub icon: String,
}

impl Condition {
    #[must_use]
    pub fn group(&self) -> ConditionGroup {
        ConditionGroup::from_main(&self.main)
    }
}

/// Sunrise and sunset of the observed day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SunTimes {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

impl SunTimes {
    #[must_use]
    pub fn is_night(&self, now: DateTime<Utc>) -> bool {
        now < self.sunrise || now > self.sunset
    }
}

/// Precipitation shown in the additional info panel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PrecipitationOutlook {
    /// It is raining or snowing right now, in mm/h
    Active(f64),
    /// Estimated chance in percent
    Chance(u8),
}

impl std::fmt::Display for PrecipitationOutlook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrecipitationOutlook::Active(mm) => write!(f, "{mm:.1} mm/h"),
            PrecipitationOutlook::Chance(pct) => write!(f, "{pct}%"),
        }
    }
}

/// Current conditions for one place
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CurrentWeather {
    /// Place name reported by the API
    pub location_name: String,
    /// Country code (ISO 3166-1 alpha-2)
    pub country: Option<String>,
    pub coordinates: Coordinates,
    /// Time of the observation
    pub observed_at: DateTime<Utc>,
    /// Temperature in the configured units
    pub temperature: f64,
    pub feels_like: f64,
    /// Relative humidity in percent
    pub humidity: u8,
    /// Pressure in hPa
    pub pressure: f64,
    /// Wind speed in API units (m/s for metric, mph for imperial)
    pub wind_speed: f64,
    /// Wind direction in degrees
    pub wind_direction: Option<u16>,
    pub condition: Condition,
    /// Rain volume of the last hour in mm
    pub rain_1h: Option<f64>,
    /// Snow volume of the last hour in mm
    pub snow_1h: Option<f64>,
    pub sun: Option<SunTimes>,
    /// UV index, fetched separately and optional
    pub uv_index: Option<f64>,
    /// Shift from UTC in seconds
    pub timezone_offset: i32,
}

impl CurrentWeather {
    /// Wind speed in km/h given the factor of the configured unit system
    #[must_use]
    pub fn wind_speed_kmh(&self, factor: f64) -> f64 {
        self.wind_speed * factor
    }

    /// "Madrid, ES" or just the name when the country is unknown
    #[must_use]
    pub fn location_label(&self) -> String {
        match &self.country {
            Some(country) if !country.is_empty() => format!("{}, {}", self.location_name, country),
            _ => self.location_name.clone(),
        }
    }

    /// Active precipitation, or a chance estimated from humidity and condition.
    #[must_use]
    pub fn precipitation_outlook(&self) -> PrecipitationOutlook {
        let active = self.rain_1h.unwrap_or(0.0) + self.snow_1h.unwrap_or(0.0);
        if active > 0.0 {
            return PrecipitationOutlook::Active(active);
        }

        let humidity = f64::from(self.humidity);
        let chance = match self.condition.group() {
            ConditionGroup::Rain | ConditionGroup::Drizzle => (90.0 + (humidity - 70.0)).min(95.0),
            ConditionGroup::Snow => (85.0 + (humidity - 65.0)).min(95.0),
            ConditionGroup::Thunderstorm => (95.0 + (humidity - 75.0)).min(98.0),
            ConditionGroup::Clouds => {
                if humidity > 80.0 {
                    (30.0 + (humidity - 80.0) * 2.0).min(70.0)
                } else if humidity > 60.0 {
                    (10.0 + (humidity - 60.0)).min(30.0)
                } else {
                    0.0
                }
            }
            ConditionGroup::Clear => {
                if humidity > 90.0 {
                    15.0
                } else if humidity > 80.0 {
                    5.0
                } else {
                    0.0
                }
            }
            ConditionGroup::Atmosphere | ConditionGroup::Other => {
                ((humidity - 70.0) / 2.0).max(0.0)
            }
        };

        // bounded to 0..=98 by the arms above
        PrecipitationOutlook::Chance(chance.max(0.0).round() as u8)
    }

    /// Convert wind direction from degrees to cardinal direction
    #[must_use]
    pub fn wind_direction_to_cardinal(degrees: u16) -> &'static str {
        match degrees {
            0..=11 | 349..=360 => "N",
            12..=33 => "NNE",
            34..=56 => "NE",
            57..=78 => "ENE",
            79..=101 => "E",
            102..=123 => "ESE",
            124..=146 => "SE",
            147..=168 => "SSE",
            169..=191 => "S",
            192..=213 => "SSW",
            214..=236 => "SW",
            237..=258 => "WSW",
            259..=281 => "W",
            282..=303 => "WNW",
            304..=326 => "NW",
            327..=348 => "NNW",
            _ => "Unknown",
        }
    }
}
