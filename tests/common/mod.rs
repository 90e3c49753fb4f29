//! Fixtures shared by the integration tests

#![allow(dead_code)]

use clima::config::ClimaConfig;
use serde_json::{Value, json};

pub const API_KEY: &str = "0123456789abcdef0123456789abcdef";

/// 2024-05-01 00:00:00 UTC
pub const MAY_FIRST: i64 = 1_714_521_600;

/// Configuration pointing at a mock server, with fast retries and no spacing
pub fn config_for(base_url: &str) -> ClimaConfig {
    let mut config = ClimaConfig::default();
    config.api.api_key = Some(API_KEY.to_string());
    config.api.base_url = base_url.to_string();
    config.api.retry_delay_ms = 5;
    config.api.min_request_interval_ms = 0;
    config.api.max_retries = 2;
    config
}

pub fn current_weather_body() -> Value {
    json!({
        "coord": { "lon": -3.7038, "lat": 40.4168 },
        "weather": [
            { "id": 500, "main": "Rain", "description": "lluvia ligera", "icon": "10d" }
        ],
        "main": { "temp": 18.3, "feels_like": 17.9, "pressure": 1012, "humidity": 82 },
        "wind": { "speed": 9.5, "deg": 250 },
        "rain": { "1h": 0.6 },
        "dt": MAY_FIRST + 12 * 3600,
        "sys": {
            "country": "ES",
            "sunrise": MAY_FIRST + 5 * 3600,
            "sunset": MAY_FIRST + 19 * 3600
        },
        "timezone": 7200,
        "name": "Madrid"
    })
}

fn forecast_item(dt: i64, temp: f64, pop: f64, main: &str, description: &str) -> Value {
    json!({
        "dt": dt,
        "main": { "temp": temp, "feels_like": temp, "pressure": 1010, "humidity": 70 },
        "weather": [ { "id": 800, "main": main, "description": description, "icon": "01d" } ],
        "wind": { "speed": 5.0, "deg": 180 },
        "pop": pop
    })
}

/// Three samples on May 1st and one on May 2nd (UTC)
pub fn forecast_body() -> Value {
    json!({
        "cod": "200",
        "list": [
            forecast_item(MAY_FIRST + 9 * 3600, 15.0, 0.1, "Clouds", "nubes"),
            forecast_item(MAY_FIRST + 12 * 3600, 21.0, 0.3, "Clear", "cielo claro"),
            forecast_item(MAY_FIRST + 15 * 3600, 24.0, 0.5, "Clouds", "nubes"),
            forecast_item(MAY_FIRST + 33 * 3600, 19.0, 0.8, "Rain", "lluvia ligera"),
        ],
        "city": { "name": "Madrid", "country": "ES", "timezone": 0 }
    })
}
