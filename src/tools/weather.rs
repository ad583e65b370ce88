//! 天气工具
//!
//! 先用 Open-Meteo 地理编码查城市坐标，再查当前天气与三日预报；任一步失败则降级到内置城市数据。

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::tools::{Tool, ToolOutcome};

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    results: Option<Vec<Location>>,
}

#[derive(Debug, Deserialize)]
struct Location {
    name: String,
    #[serde(default)]
    country: Option<String>,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct Forecast {
    current: Current,
    current_units: CurrentUnits,
    daily: Daily,
}

#[derive(Debug, Deserialize)]
struct Current {
    temperature_2m: f64,
    weather_code: u32,
    wind_speed_10m: f64,
}

#[derive(Debug, Deserialize)]
struct CurrentUnits {
    temperature_2m: String,
}

#[derive(Debug, Deserialize)]
struct Daily {
    time: Vec<String>,
    weather_code: Vec<u32>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
}

/// WMO 天气代码转描述
fn condition(code: u32) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        61 => "Light rain",
        80 => "Light rain showers",
        95 => "Thunderstorm",
        _ => "Unknown",
    }
}

/// 天气工具
pub struct WeatherTool {
    client: Client,
    geocoding_url: String,
    forecast_url: String,
}

impl WeatherTool {
    pub fn new(geocoding_url: impl Into<String>, forecast_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            geocoding_url: geocoding_url.into(),
            forecast_url: forecast_url.into(),
        }
    }

    async fn fetch(&self, city: &str) -> Result<Value, String> {
        let geo: GeoResponse = self
            .client
            .get(&self.geocoding_url)
            .query(&[("name", city), ("count", "1")])
            .send()
            .await
            .map_err(|e| format!("Geocoding request failed: {}", e))?
            .json()
            .await
            .map_err(|e| format!("Invalid geocoding response: {}", e))?;

        let location = geo
            .results
            .and_then(|r| r.into_iter().next())
            .ok_or("City not found")?;

        let forecast: Forecast = self
            .client
            .get(&self.forecast_url)
            .query(&[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("current", "temperature_2m,weather_code,wind_speed_10m".to_string()),
                (
                    "daily",
                    "weather_code,temperature_2m_max,temperature_2m_min".to_string(),
                ),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await
            .map_err(|e| format!("Forecast request failed: {}", e))?
            .json()
            .await
            .map_err(|e| format!("Invalid forecast response: {}", e))?;

        let daily = &forecast.daily;
        let days: Vec<Value> = daily
            .time
            .iter()
            .take(3)
            .enumerate()
            .map(|(i, date)| {
                json!({
                    "date": date,
                    "maxTemp": daily.temperature_2m_max.get(i),
                    "minTemp": daily.temperature_2m_min.get(i),
                    "condition": daily.weather_code.get(i).map(|c| condition(*c)).unwrap_or("Unknown"),
                })
            })
            .collect();

        Ok(json!({
            "location": {
                "city": location.name,
                "country": location.country,
                "latitude": location.latitude,
                "longitude": location.longitude,
            },
            "current": {
                "temperature": forecast.current.temperature_2m,
                "condition": condition(forecast.current.weather_code),
                "windSpeed": forecast.current.wind_speed_10m,
                "unit": forecast.current_units.temperature_2m,
            },
            "forecast": days,
            "type": "weather",
        }))
    }
}

/// 内置城市数据（外部服务不可用时使用）
fn mock_weather(city: &str) -> ToolOutcome {
    let (temp, condition, humidity) = match city.to_lowercase().as_str() {
        "delhi" => (32, "Sunny", "45%"),
        "mumbai" => (28, "Cloudy", "75%"),
        "london" => (15, "Rainy", "80%"),
        "new york" => (22, "Partly cloudy", "65%"),
        _ => return ToolOutcome::failure("Weather data not available for this location"),
    };

    ToolOutcome::Success(json!({
        "location": { "city": city },
        "current": { "temp": temp, "condition": condition, "humidity": humidity },
        "type": "weather",
    }))
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "weather"
    }

    fn description(&self) -> &str {
        "Real-time weather information and forecasts"
    }

    fn validate_input(&self, input: &str) -> bool {
        input.trim().chars().count() > 1
    }

    async fn execute(&self, input: &str, _session_id: &str) -> Result<ToolOutcome, String> {
        let city = input.trim();
        match self.fetch(city).await {
            Ok(payload) => Ok(ToolOutcome::Success(payload)),
            Err(e) => {
                tracing::warn!("Weather API error, using fallback: {}", e);
                Ok(mock_weather(city))
            }
        }
    }
}
