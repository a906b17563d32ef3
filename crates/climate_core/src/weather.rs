use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discrete "emotional weather" shown on the campus map widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    Sunny,
    PartlyCloudy,
    #[default]
    Cloudy,
    MostlyCloudy,
    Rainy,
}

impl Weather {
    pub fn as_str(&self) -> &'static str {
        match self {
            Weather::Sunny => "sunny",
            Weather::PartlyCloudy => "partly_cloudy",
            Weather::Cloudy => "cloudy",
            Weather::MostlyCloudy => "mostly_cloudy",
            Weather::Rainy => "rainy",
        }
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown weather label: {0}")]
pub struct ParseWeatherError(pub String);

impl FromStr for Weather {
    type Err = ParseWeatherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sunny" => Ok(Weather::Sunny),
            "partly_cloudy" => Ok(Weather::PartlyCloudy),
            "cloudy" => Ok(Weather::Cloudy),
            "mostly_cloudy" => Ok(Weather::MostlyCloudy),
            "rainy" => Ok(Weather::Rainy),
            _ => Err(ParseWeatherError(s.to_string())),
        }
    }
}
