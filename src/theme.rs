//! Day/night theme selection

use crate::models::{Coordinates, CurrentWeather, SunTimes};
use crate::storage::{DARK_MODE_KEY, Stamped, Storage, WEATHER_DATA_KEY};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub fn from_dark(dark: bool) -> Self {
        if dark { Theme::Dark } else { Theme::Light }
    }

    #[must_use]
    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        Self::from_dark(!self.is_dark())
    }

    #[must_use]
    pub fn palette(self) -> Palette {
        match self {
            Theme::Light => Palette {
                text: "\x1b[30m",
                accent: "\x1b[34m",
                muted: "\x1b[90m",
                warning: "\x1b[31m",
            },
            Theme::Dark => Palette {
                text: "\x1b[97m",
                accent: "\x1b[96m",
                muted: "\x1b[37m",
                warning: "\x1b[91m",
            },
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

/// ANSI colours used by the text renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub text: &'static str,
    pub accent: &'static str,
    pub muted: &'static str,
    pub warning: &'static str,
}

impl Palette {
    pub const RESET: &'static str = "\x1b[0m";

    #[must_use]
    pub fn paint(&self, colour: &str, text: &str) -> String {
        format!("{colour}{text}{}", Self::RESET)
    }
}

/// Dark between sunset and sunrise; from 19:00 to 06:00 local time when the
/// sun times are unknown.
#[must_use]
pub fn should_use_dark(now: DateTime<Utc>, sun: Option<&SunTimes>, local_offset: FixedOffset) -> bool {
    match sun {
        Some(sun) => sun.is_night(now),
        None => {
            let hour = now.with_timezone(&local_offset).hour();
            hour < 6 || hour >= 19
        }
    }
}

/// Computed sunrise and sunset for places where the API gave none
#[must_use]
pub fn sun_times_for(coordinates: Coordinates, date: NaiveDate) -> Option<SunTimes> {
    let coordinates = sunrise::Coordinates::new(coordinates.latitude, coordinates.longitude)?;
    let solar_day = sunrise::SolarDay::new(coordinates, date);
    // polar day or night has no events
    Some(SunTimes {
        sunrise: solar_day.event_time(sunrise::SolarEvent::Sunrise)?,
        sunset: solar_day.event_time(sunrise::SolarEvent::Sunset)?,
    })
}

/// Tracks the active theme and switches it with the sun
#[derive(Debug, Clone)]
pub struct ThemeController {
    theme: Theme,
    sun: Option<SunTimes>,
    local_offset: FixedOffset,
}

impl Default for ThemeController {
    fn default() -> Self {
        Self::new(Local::now().offset().fix())
    }
}

impl ThemeController {
    #[must_use]
    pub fn new(local_offset: FixedOffset) -> Self {
        Self {
            theme: Theme::Light,
            sun: None,
            local_offset,
        }
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }

    #[must_use]
    pub fn sun_times(&self) -> Option<&SunTimes> {
        self.sun.as_ref()
    }

    pub fn set_sun_times(&mut self, sun: Option<SunTimes>) {
        if let Some(sun) = &sun {
            debug!("Sunrise {} / sunset {}", sun.sunrise, sun.sunset);
        }
        self.sun = sun;
    }

    /// Re-evaluate the theme. Returns the new theme when it changed.
    pub fn update(&mut self, now: DateTime<Utc>) -> Option<Theme> {
        let wanted = Theme::from_dark(should_use_dark(now, self.sun.as_ref(), self.local_offset));
        if wanted == self.theme {
            return None;
        }
        info!("Automatic theme change: {} -> {}", self.theme, wanted);
        self.theme = wanted;
        Some(wanted)
    }

    /// Flip the theme by hand and remember the choice
    pub async fn toggle(&mut self, storage: Option<&Storage>) -> Theme {
        self.theme = self.theme.toggled();
        if let Some(storage) = storage {
            if let Err(err) = storage.put(DARK_MODE_KEY, self.theme.is_dark(), None).await {
                warn!("Could not save dark mode preference: {:#}", err);
            }
        }
        self.theme
    }

    /// Pick the starting theme from the last stored weather, else the saved
    /// preference, else the clock.
    pub async fn initialize(&mut self, storage: &Storage, now: DateTime<Utc>) -> Theme {
        let stored = storage
            .get_json::<Stamped<CurrentWeather>>(WEATHER_DATA_KEY)
            .await
            .unwrap_or_else(|err| {
                warn!("Ignoring stored weather: {:#}", err);
                None
            });

        if let Some(sun) = stored.and_then(|s| s.data.sun) {
            self.sun = Some(sun);
            self.theme = Theme::from_dark(sun.is_night(now));
            return self.theme;
        }

        match storage.get::<bool>(DARK_MODE_KEY).await {
            Ok(Some(dark)) => self.theme = Theme::from_dark(dark),
            Ok(None) => {
                self.update(now);
            }
            Err(err) => {
                warn!("Could not read dark mode preference: {:#}", err);
                self.update(now);
            }
        }
        self.theme
    }
}
