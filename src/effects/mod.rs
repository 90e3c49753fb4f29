//! Weather effects: which animation to play and how it looks

pub mod frame;
pub mod particles;

use crate::models::{ConditionGroup, CurrentWeather};
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use frame::Frame;
pub use particles::{Particle, ParticleSystem};

/// Wind above this speed (km/h) gets its own effect
pub const STRONG_WIND_KMH: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    #[default]
    Clear,
    Rain,
    Thunder,
    Snow,
    Wind,
}

impl EffectKind {
    /// Map a free-form condition text (English or Spanish) to an effect.
    #[must_use]
    pub fn from_description(text: &str) -> Self {
        let text = text.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| text.contains(w));

        if has(&["rain", "lluvia", "drizzle", "llovizna"]) {
            EffectKind::Rain
        } else if has(&["thunder", "storm", "tormenta"]) {
            EffectKind::Thunder
        } else if has(&["snow", "nieve"]) {
            EffectKind::Snow
        } else if has(&["wind", "viento"]) {
            EffectKind::Wind
        } else {
            EffectKind::Clear
        }
    }

    #[must_use]
    pub fn style(self) -> EffectStyle {
        match self {
            EffectKind::Rain => EffectStyle {
                name: "Rain",
                particle_count: 50,
                colour: "#1565C0",
                dark_colour: "#42A5F5",
                light_background: Some(("#E3F2FD", "#BBDEFB")),
                dark_background: Some(("#1e293b", "#334155")),
            },
            EffectKind::Thunder => EffectStyle {
                name: "Thunderstorm",
                particle_count: 80,
                colour: "#424242",
                dark_colour: "#E0E0E0",
                light_background: Some(("#F5F5F5", "#E0E0E0")),
                dark_background: Some(("#0f172a", "#1e293b")),
            },
            EffectKind::Snow => EffectStyle {
                name: "Snow",
                particle_count: 30,
                colour: "#FFFFFF",
                dark_colour: "#FFFFFF",
                light_background: Some(("#F3E5F5", "#E8EAF6")),
                dark_background: Some(("#312e81", "#3730a3")),
            },
            EffectKind::Wind => EffectStyle {
                name: "Wind",
                particle_count: 15,
                colour: "#2E7D32",
                dark_colour: "#66BB6A",
                light_background: Some(("#F1F8E9", "#E8F5E8")),
                dark_background: Some(("#064e3b", "#065f46")),
            },
            EffectKind::Clear => EffectStyle {
                name: "Clear",
                particle_count: 0,
                colour: "#FFD700",
                dark_colour: "#FFD700",
                light_background: None,
                dark_background: None,
            },
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EffectKind::Clear => "clear",
            EffectKind::Rain => "rain",
            EffectKind::Thunder => "thunder",
            EffectKind::Snow => "snow",
            EffectKind::Wind => "wind",
        };
        f.write_str(name)
    }
}

impl FromStr for EffectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clear" | "none" => Ok(EffectKind::Clear),
            "rain" => Ok(EffectKind::Rain),
            "thunder" | "thunderstorm" | "storm" => Ok(EffectKind::Thunder),
            "snow" => Ok(EffectKind::Snow),
            "wind" => Ok(EffectKind::Wind),
            other => Err(format!(
                "unknown effect '{other}' (expected clear, rain, thunder, snow or wind)"
            )),
        }
    }
}

/// Look of one effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectStyle {
    pub name: &'static str,
    pub particle_count: usize,
    /// Particle colour in light mode, hex
    pub colour: &'static str,
    pub dark_colour: &'static str,
    /// Gradient stops behind the current card; `None` keeps the plain card
    pub light_background: Option<(&'static str, &'static str)>,
    pub dark_background: Option<(&'static str, &'static str)>,
}

impl EffectStyle {
    #[must_use]
    pub fn colour_for(&self, theme: Theme) -> &'static str {
        if theme.is_dark() { self.dark_colour } else { self.colour }
    }

    #[must_use]
    pub fn background_for(&self, theme: Theme) -> Option<(&'static str, &'static str)> {
        if theme.is_dark() {
            self.dark_background
        } else {
            self.light_background
        }
    }
}

/// Pick the effect for the current conditions.
///
/// Snow wins over thunderstorms, which win over rain; strong wind only
/// shows when nothing is falling.
#[must_use]
pub fn select_effect(group: ConditionGroup, wind_kmh: f64) -> EffectKind {
    match group {
        ConditionGroup::Snow => EffectKind::Snow,
        ConditionGroup::Thunderstorm => EffectKind::Thunder,
        ConditionGroup::Rain | ConditionGroup::Drizzle => EffectKind::Rain,
        _ if wind_kmh > STRONG_WIND_KMH => EffectKind::Wind,
        _ => EffectKind::Clear,
    }
}

/// Overall mood of the dashboard background
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackdropClass {
    Sunny,
    PartlyCloudy,
    Cloudy,
    Rainy,
    Stormy,
    Snowy,
    Foggy,
}

impl BackdropClass {
    #[must_use]
    pub fn for_weather(weather: &CurrentWeather, wind_kmh: f64) -> Self {
        match weather.condition.group() {
            ConditionGroup::Snow => BackdropClass::Snowy,
            ConditionGroup::Thunderstorm => BackdropClass::Stormy,
            ConditionGroup::Rain | ConditionGroup::Drizzle => BackdropClass::Rainy,
            _ if wind_kmh > STRONG_WIND_KMH => BackdropClass::Cloudy,
            ConditionGroup::Clouds if weather.condition.id >= 803 => BackdropClass::Cloudy,
            ConditionGroup::Clouds => BackdropClass::PartlyCloudy,
            _ => match weather.condition.main.to_lowercase().as_str() {
                "mist" | "fog" | "haze" => BackdropClass::Foggy,
                _ => BackdropClass::Sunny,
            },
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BackdropClass::Sunny => "sunny",
            BackdropClass::PartlyCloudy => "partly-cloudy",
            BackdropClass::Cloudy => "cloudy",
            BackdropClass::Rainy => "rainy",
            BackdropClass::Stormy => "stormy",
            BackdropClass::Snowy => "snowy",
            BackdropClass::Foggy => "foggy",
        }
    }
}
