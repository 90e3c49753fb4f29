//! Forecast samples and their grouping into daily aggregates

use super::weather::Condition;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped reading from the multi-day forecast list
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ForecastSample {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    /// Pressure in hPa
    pub pressure: f64,
    /// Wind speed in API units
    pub wind_speed: f64,
    /// Probability of precipitation, 0.0 - 1.0
    pub precipitation_probability: f64,
    pub condition: Condition,
}

/// Multi-day forecast for one city
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Forecast {
    pub city: String,
    pub country: Option<String>,
    /// Shift from UTC in seconds
    pub timezone_offset: i32,
    /// Samples sorted by timestamp
    pub samples: Vec<ForecastSample>,
    /// When this forecast was retrieved
    pub retrieved_at: DateTime<Utc>,
}

impl Forecast {
    /// Group the samples into at most `max_days` daily aggregates
    #[must_use]
    pub fn daily(&self, wind_to_kmh: f64, max_days: usize) -> Vec<DailyAggregate> {
        aggregate_daily(&self.samples, self.timezone_offset, wind_to_kmh, max_days)
    }
}

/// Statistics over all samples sharing a local calendar date
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub temp_max: i32,
    pub temp_min: i32,
    pub temp_avg: i32,
    /// Mean probability of precipitation in percent
    pub precipitation_avg: i32,
    pub precipitation_max: i32,
    /// Wind in km/h
    pub wind_avg: i32,
    pub wind_max: i32,
    pub humidity_avg: i32,
    pub pressure_avg: i32,
    /// Midday condition when available, otherwise the first of the day
    pub condition: Condition,
    pub samples: usize,
}

/// Rounds halves towards positive infinity so -2.5 becomes -2.
pub(crate) fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

#[derive(Default)]
struct DayBucket {
    temps: Vec<f64>,
    precipitation: Vec<f64>,
    wind: Vec<f64>,
    humidity: Vec<f64>,
    pressure: Vec<f64>,
    condition: Option<Condition>,
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

/// Group forecast samples by local calendar date.
///
/// Days keep the order in which they first appear. Only the first
/// `max_days` groups are returned.
#[must_use]
pub fn aggregate_daily(
    samples: &[ForecastSample],
    timezone_offset: i32,
    wind_to_kmh: f64,
    max_days: usize,
) -> Vec<DailyAggregate> {
    let tz = FixedOffset::east_opt(timezone_offset).unwrap_or_else(|| Utc.fix());

    let mut days: Vec<(NaiveDate, DayBucket)> = Vec::new();

    for sample in samples {
        let local = sample.timestamp.with_timezone(&tz);
        let date = local.date_naive();

        let index = match days.iter().position(|(day, _)| *day == date) {
            Some(index) => index,
            None => {
                days.push((date, DayBucket::default()));
                days.len() - 1
            }
        };
        let bucket = &mut days[index].1;

        bucket.temps.push(sample.temperature);
        bucket.precipitation.push(sample.precipitation_probability * 100.0);
        bucket.wind.push(sample.wind_speed * wind_to_kmh);
        bucket.humidity.push(f64::from(sample.humidity));
        bucket.pressure.push(sample.pressure);

        if bucket.condition.is_none() || (11..=13).contains(&local.hour()) {
            bucket.condition = Some(sample.condition.clone());
        }
    }

    days.into_iter()
        .take(max_days)
        .filter_map(|(date, bucket)| {
            let condition = bucket.condition?;
            Some(DailyAggregate {
                date,
                temp_max: round_half_up(max(&bucket.temps)),
                temp_min: round_half_up(min(&bucket.temps)),
                temp_avg: round_half_up(mean(&bucket.temps)),
                precipitation_avg: round_half_up(mean(&bucket.precipitation)),
                precipitation_max: round_half_up(max(&bucket.precipitation)),
                wind_avg: round_half_up(mean(&bucket.wind)),
                wind_max: round_half_up(max(&bucket.wind)),
                humidity_avg: round_half_up(mean(&bucket.humidity)),
                pressure_avg: round_half_up(mean(&bucket.pressure)),
                condition,
                samples: bucket.temps.len(),
            })
        })
        .collect()
}

/// "Today", "Tomorrow" or the short weekday name
#[must_use]
pub fn day_label(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if Some(date) == today.checked_add_signed(Duration::days(1)) {
        "Tomorrow".to_string()
    } else {
        date.weekday().to_string()
    }
}
