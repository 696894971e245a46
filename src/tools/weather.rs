//! getWeather: Nominatim geocoding followed by OpenWeather current conditions

use super::{param_or, Tool, ToolContext};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

#[derive(Debug, Deserialize)]
struct Conditions {
    weather: Vec<Description>,
    main: Readings,
}

#[derive(Debug, Deserialize)]
struct Description {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Readings {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

pub struct GetWeather;

#[async_trait]
impl Tool for GetWeather {
    fn name(&self) -> &'static str {
        "getWeather"
    }

    fn description(&self) -> &'static str {
        "Current weather for a place (location)"
    }

    fn error_label(&self) -> &'static str {
        "Weather API error"
    }

    async fn call(&self, params: &Value, ctx: &ToolContext) -> Result<String> {
        let location = param_or(params, "location", "Jakarta");

        let Some(api_key) = ctx.openweather_api_key.as_deref() else {
            return Ok("Weather API key not configured".to_string());
        };

        let places: Vec<Place> = ctx
            .http
            .get(format!("{}/search", ctx.endpoints.nominatim))
            .query(&[("q", location.as_str()), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(place) = places.into_iter().next() else {
            return Ok(format!("Location {} not found", location));
        };

        let conditions: Conditions = ctx
            .http
            .get(format!("{}/data/2.5/weather", ctx.endpoints.openweather))
            .query(&[
                ("lat", place.lat.as_str()),
                ("lon", place.lon.as_str()),
                ("appid", api_key),
                ("units", "metric"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let summary = conditions
            .weather
            .first()
            .map(|d| d.description.as_str())
            .context("response has no weather description")?;

        Ok(format!(
            "Weather in {}: {}, Temperature: {}°C (feels like {}°C), Humidity: {}%",
            location,
            summary,
            conditions.main.temp,
            conditions.main.feels_like,
            conditions.main.humidity
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_key_is_reported_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::for_workspace(dir.path());
        let out = GetWeather
            .call(&json!({"location": "Oslo"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out, "Weather API key not configured");
    }
}
