//! Plain-text rendering of the dashboard sections

use crate::ClimaError;
use crate::config::Units;
use crate::models::forecast::round_half_up;
use crate::models::{CurrentWeather, DailyAggregate, day_label};
use crate::theme::Palette;
use chrono::NaiveDate;
use std::fmt::Write;

const BAR_WIDTH: usize = 24;

/// Lower-case everything, then upper-case the first letter
#[must_use]
pub fn capitalize(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Emoji for a condition description, English or Spanish
#[must_use]
pub fn icon_for_description(description: &str) -> &'static str {
    match description.to_lowercase().as_str() {
        "clear sky" | "cielo claro" => "☀️",
        "few clouds" => "🌤️",
        "scattered clouds" | "algo nuboso" => "⛅",
        "broken clouds" | "nubes dispersas" | "nubes" | "muy nuboso" => "☁️",
        "shower rain" | "lluvia ligera" => "🌦️",
        "rain" | "lluvia" | "lluvia intensa" => "🌧️",
        "thunderstorm" | "tormenta" => "⛈️",
        "snow" | "nieve" => "🌨️",
        "mist" | "niebla" => "🌫️",
        _ => "🌤️",
    }
}

/// Extremes over all forecast days, shown above the chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickStats {
    pub temp_max: i32,
    pub temp_min: i32,
    pub precipitation_max: i32,
    pub wind_max: i32,
}

impl QuickStats {
    #[must_use]
    pub fn from_days(days: &[DailyAggregate]) -> Option<Self> {
        Some(Self {
            temp_max: days.iter().map(|d| d.temp_max).max()?,
            temp_min: days.iter().map(|d| d.temp_min).min()?,
            precipitation_max: days.iter().map(|d| d.precipitation_avg).max()?,
            wind_max: days.iter().map(|d| d.wind_avg).max()?,
        })
    }
}

fn bar(value: f64, scale: f64) -> String {
    if scale <= 0.0 {
        return String::new();
    }
    let filled = ((value / scale) * BAR_WIDTH as f64).round().clamp(0.0, BAR_WIDTH as f64);
    "█".repeat(filled as usize)
}

/// Renders sections with or without ANSI colours
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    units: Units,
    palette: Option<Palette>,
}

impl Renderer {
    #[must_use]
    pub fn new(units: Units) -> Self {
        Self {
            units,
            palette: None,
        }
    }

    #[must_use]
    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = Some(palette);
        self
    }

    fn text(&self, text: &str) -> String {
        match &self.palette {
            Some(p) => p.paint(p.text, text),
            None => text.to_string(),
        }
    }

    fn accent(&self, text: &str) -> String {
        match &self.palette {
            Some(p) => p.paint(p.accent, text),
            None => text.to_string(),
        }
    }

    fn muted(&self, text: &str) -> String {
        match &self.palette {
            Some(p) => p.paint(p.muted, text),
            None => text.to_string(),
        }
    }

    fn warning(&self, text: &str) -> String {
        match &self.palette {
            Some(p) => p.paint(p.warning, text),
            None => text.to_string(),
        }
    }

    #[must_use]
    pub fn location(&self, weather: &CurrentWeather) -> String {
        format!("📍 {}", self.accent(&weather.location_label()))
    }

    #[must_use]
    pub fn current_card(&self, weather: &CurrentWeather) -> String {
        let description = &weather.condition.description;
        format!(
            "{}  {}  {}\n   Feels like {}°",
            icon_for_description(description),
            self.text(&format!("{}°", round_half_up(weather.temperature))),
            capitalize(description),
            round_half_up(weather.feels_like),
        )
    }

    #[must_use]
    pub fn additional_info(&self, weather: &CurrentWeather) -> String {
        let wind = round_half_up(weather.wind_speed_kmh(self.units.wind_to_kmh()));
        let uv = weather
            .uv_index
            .map_or_else(|| "N/A".to_string(), |uv| round_half_up(uv).to_string());

        let mut out = String::new();
        let _ = writeln!(out, "💧 {} {}%", self.muted("Humidity"), weather.humidity);
        let _ = write!(out, "💨 {} {} km/h", self.muted("Wind"), wind);
        if let Some(deg) = weather.wind_direction {
            let _ = write!(out, " {}", CurrentWeather::wind_direction_to_cardinal(deg));
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "☀️ {} {}", self.muted("UV index"), uv);
        let _ = write!(
            out,
            "🌧️ {} {}",
            self.muted("Precipitation"),
            weather.precipitation_outlook()
        );
        out
    }

    /// One compact column per day
    #[must_use]
    pub fn forecast_strip(&self, days: &[DailyAggregate], today: NaiveDate) -> String {
        if days.is_empty() {
            return "📅 No forecast data available".to_string();
        }

        days.iter()
            .map(|day| {
                format!(
                    "{:<9} {}  {:>3}° {:>3}°  💧{:>3}%",
                    day_label(day.date, today).to_uppercase(),
                    icon_for_description(&day.condition.description),
                    day.temp_max,
                    day.temp_min,
                    day.precipitation_avg,
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Full statistics for every day
    #[must_use]
    pub fn detailed_days(&self, days: &[DailyAggregate], today: NaiveDate) -> String {
        let symbol = self.units.temperature_symbol();
        days.iter()
            .map(|day| {
                format!(
                    "{} {} ({})\n  Max {}{symbol}  Min {}{symbol}  Rain {}%  Wind {} km/h  Humidity {}%  Pressure {} hPa",
                    icon_for_description(&day.condition.description),
                    self.accent(&day_label(day.date, today)),
                    day.date.format("%-d %B"),
                    day.temp_max,
                    day.temp_min,
                    day.precipitation_avg,
                    day.wind_avg,
                    day.humidity_avg,
                    day.pressure_avg,
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Quick stats followed by per-day bars
    #[must_use]
    pub fn chart(&self, days: &[DailyAggregate], today: NaiveDate) -> String {
        let Some(stats) = QuickStats::from_days(days) else {
            return "📊 No forecast data available".to_string();
        };
        let symbol = self.units.temperature_symbol();

        let mut out = String::new();
        let _ = writeln!(
            out,
            "🔥 Highest {}{symbol}   ❄️ Lowest {}{symbol}   🌧️ Max rain {}%   💨 Strongest wind {} km/h",
            stats.temp_max, stats.temp_min, stats.precipitation_max, stats.wind_max
        );

        // temperatures can be negative, so bars start at the lowest minimum
        let temp_span = f64::from(stats.temp_max - stats.temp_min);
        let wind_scale = f64::from(stats.wind_max);

        for day in days {
            let _ = writeln!(out, "\n{}", self.accent(&day_label(day.date, today)));
            let _ = writeln!(
                out,
                "  max  {:>4}{symbol} {}",
                day.temp_max,
                bar(f64::from(day.temp_max - stats.temp_min), temp_span)
            );
            let _ = writeln!(
                out,
                "  min  {:>4}{symbol} {}",
                day.temp_min,
                bar(f64::from(day.temp_min - stats.temp_min), temp_span)
            );
            let _ = writeln!(
                out,
                "  rain {:>4}%  {}",
                day.precipitation_avg,
                bar(f64::from(day.precipitation_avg), 100.0)
            );
            let _ = write!(
                out,
                "  wind {:>4}km/h {}",
                day.wind_avg,
                bar(f64::from(day.wind_avg), wind_scale)
            );
        }
        out
    }

    #[must_use]
    pub fn error_panel(&self, error: &ClimaError, retry_offered: bool) -> String {
        let mut out = format!("⚠️  {}", self.warning(&error.user_message()));
        if retry_offered {
            out.push_str("\n   Run the command again to retry.");
        }
        out
    }

    #[must_use]
    pub fn loading(&self, status: &str) -> String {
        format!("⏳ {}", self.muted(status))
    }
}
