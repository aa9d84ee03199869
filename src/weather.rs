//! The weather-forecast endpoint.
//!
//! Deliberately trivial: five synthetic records from a random source, no
//! I/O, no failure modes. What matters is the observability pattern it
//! establishes — one facade record per severity, in order, before the
//! result is produced.

use chrono::{Duration, NaiveDate, Utc};
use http::StatusCode;
use rand::Rng;
use serde::Serialize;

use crate::request::Request;
use crate::response::Response;

/// The closed set of forecast labels.
pub const SUMMARIES: [&str; 10] = [
    "Freezing", "Bracing", "Chilly", "Cool", "Mild", "Warm", "Balmy", "Hot",
    "Sweltering", "Scorching",
];

/// One synthetic forecast entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherForecast {
    pub date: NaiveDate,
    pub temperature_c: i32,
    pub summary: &'static str,
}

fn build_forecast(rng: &mut impl Rng, today: NaiveDate) -> Vec<WeatherForecast> {
    (1..=5)
        .map(|offset| WeatherForecast {
            date: today + Duration::days(offset),
            temperature_c: rng.gen_range(-20..=54),
            summary: SUMMARIES[rng.gen_range(0..SUMMARIES.len())],
        })
        .collect()
}

/// `GET /weatherforecast` — five synthetic records, dated tomorrow onward.
pub async fn forecast(req: Request) -> Response {
    let logger = req.logger();
    logger.debug("this is a debug message");
    logger.information("this is an information message");
    logger.warning("this is a warning message");
    logger.error("this is an error message");

    let entries = build_forecast(&mut rand::thread_rng(), Utc::now().date_naive());
    match serde_json::to_vec(&entries) {
        Ok(body) => Response::json(body),
        Err(_) => Response::status(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn five_entries_within_bounds() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 27).unwrap();
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let entries = build_forecast(&mut rng, today);
            assert_eq!(entries.len(), 5);
            for (i, entry) in entries.iter().enumerate() {
                assert_eq!(entry.date, today + Duration::days(i as i64 + 1));
                assert!((-20..=54).contains(&entry.temperature_c));
                assert!(SUMMARIES.contains(&entry.summary));
            }
        }
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let entry = WeatherForecast {
            date: NaiveDate::from_ymd_opt(2026, 8, 28).unwrap(),
            temperature_c: -3,
            summary: "Chilly",
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["date"], "2026-08-28");
        assert_eq!(json["temperatureC"], -3);
        assert_eq!(json["summary"], "Chilly");
    }
}
