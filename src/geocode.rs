use anyhow::Result;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// Sentinel returned whenever a reverse lookup fails or yields nothing usable.
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    address: Option<Address>,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    neighbourhood: Option<String>,
    suburb: Option<String>,
    city_district: Option<String>,
    town: Option<String>,
    city: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    county: Option<String>,
}

impl Address {
    /// Most specific available name, from neighbourhood down to county.
    fn most_specific(&self) -> Option<&str> {
        self.neighbourhood
            .as_deref()
            .or(self.suburb.as_deref())
            .or(self.city_district.as_deref())
            .or(self.town.as_deref())
            .or(self.city.as_deref())
            .or(self.village.as_deref())
            .or(self.municipality.as_deref())
            .or(self.county.as_deref())
    }
}

/// Nominatim-style reverse geocoder.
#[derive(Clone)]
pub struct GeocodeClient {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl GeocodeClient {
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            user_agent: user_agent.to_string(),
        })
    }

    /// Best-effort place name for a coordinate. Never fails: any error
    /// falls back to [`UNKNOWN_LOCATION`].
    pub async fn location_name(&self, lat: f64, lng: f64) -> String {
        match self.lookup(lat, lng).await {
            Ok(Some(name)) => name,
            Ok(None) => UNKNOWN_LOCATION.to_string(),
            Err(e) => {
                warn!("Error getting location for ({}, {}): {}", lat, lng, e);
                UNKNOWN_LOCATION.to_string()
            }
        }
    }

    async fn lookup(&self, lat: f64, lng: f64) -> Result<Option<String>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("format", "json"),
                ("lat", &lat.to_string()),
                ("lon", &lng.to_string()),
                ("zoom", "16"),
                ("addressdetails", "1"),
            ])
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?
            .error_for_status()?;

        let body: ReverseResponse = response.json().await?;
        Ok(body
            .address
            .and_then(|a| a.most_specific().map(str::to_string)))
    }
}
