use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use super::sighting::NewSighting;

// The wall's custom properties are keyed by opaque hash ids, not names.
const PROP_SIZE: &str = "Fvkpy4pI";
const PROP_ACTIVITY: &str = "4LxsfXZo";
const PROP_UNIFORM: &str = "h36hJnEo";
const PROP_EQUIPMENT: &str = "nnVFYm1Q";

/// One page of the wall feed.
#[derive(Debug, Deserialize)]
pub struct FeedPage {
    #[serde(default)]
    pub data: Vec<FeedPost>,
    pub meta: Option<FeedMeta>,
}

impl FeedPage {
    pub fn next_page(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|m| m.next.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub struct FeedMeta {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedPost {
    #[serde(default)]
    pub id: String,
    pub attributes: FeedAttributes,
}

#[derive(Debug, Deserialize)]
pub struct FeedAttributes {
    pub body: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub attachment: Option<String>,
    pub location_name: Option<String>,
    pub location_point: Option<LocationPoint>,
    #[serde(default)]
    pub custom_properties: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LocationPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A post that cannot be mapped into a sighting. Carries the post id so the
/// offending record can be found on the wall.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("feed post {0} has no location point")]
    MissingLocation(String),
    #[error("feed post {0} has no creation timestamp")]
    MissingTimestamp(String),
}

impl FeedPost {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.attributes.created_at
    }

    fn custom_property(&self, key: &str) -> String {
        self.attributes
            .custom_properties
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Map the upstream shape into the internal one. Absent optional fields
    /// default to empty strings; a missing location or timestamp is an error.
    pub fn into_sighting(self) -> Result<NewSighting, TransformError> {
        let point = self
            .attributes
            .location_point
            .as_ref()
            .ok_or_else(|| TransformError::MissingLocation(self.id.clone()))?;
        let time_date = self
            .attributes
            .created_at
            .ok_or_else(|| TransformError::MissingTimestamp(self.id.clone()))?;

        let image_url = self
            .attributes
            .attachment
            .as_deref()
            .filter(|a| !a.is_empty())
            .map(str::to_string);

        Ok(NewSighting {
            lat: point.latitude,
            lng: point.longitude,
            description: self.attributes.body.clone().unwrap_or_default(),
            size: self.custom_property(PROP_SIZE),
            activity: self.custom_property(PROP_ACTIVITY),
            uniform: self.custom_property(PROP_UNIFORM),
            equipment: self.custom_property(PROP_EQUIPMENT),
            location: self.attributes.location_name.clone().unwrap_or_default(),
            time_date,
            image_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_feed_page_and_maps_custom_properties() {
        let payload = r#"
        {
            "data": [
                {
                    "id": "wish_901",
                    "attributes": {
                        "body": "Two vans parked on the corner",
                        "created_at": "2025-06-01T12:00:00Z",
                        "attachment": "https://img.example.com/a.jpg",
                        "location_name": "Pico-Union",
                        "location_point": {
                            "latitude": 34.047,
                            "longitude": -118.283
                        },
                        "custom_properties": {
                            "Fvkpy4pI": "4-6 agents",
                            "4LxsfXZo": "checkpoint",
                            "h36hJnEo": "plainclothes",
                            "nnVFYm1Q": "unmarked vehicles"
                        }
                    }
                }
            ],
            "meta": { "next": "cursor_abc" }
        }
        "#;

        let page: FeedPage = serde_json::from_str(payload).unwrap();
        assert_eq!(page.next_page(), Some("cursor_abc"));
        assert_eq!(page.data.len(), 1);

        let sighting = page.data.into_iter().next().unwrap().into_sighting().unwrap();
        assert_eq!(sighting.lat, 34.047);
        assert_eq!(sighting.lng, -118.283);
        assert_eq!(sighting.description, "Two vans parked on the corner");
        assert_eq!(sighting.size, "4-6 agents");
        assert_eq!(sighting.activity, "checkpoint");
        assert_eq!(sighting.uniform, "plainclothes");
        assert_eq!(sighting.equipment, "unmarked vehicles");
        assert_eq!(sighting.location, "Pico-Union");
        assert_eq!(
            sighting.image_url.as_deref(),
            Some("https://img.example.com/a.jpg")
        );
    }

    #[test]
    fn absent_optionals_default_to_empty() {
        let payload = r#"
        {
            "data": [
                {
                    "id": "wish_902",
                    "attributes": {
                        "created_at": "2025-06-01T12:00:00Z",
                        "attachment": "",
                        "location_point": { "latitude": 1.0, "longitude": 2.0 }
                    }
                }
            ]
        }
        "#;

        let page: FeedPage = serde_json::from_str(payload).unwrap();
        assert_eq!(page.next_page(), None);

        let sighting = page.data.into_iter().next().unwrap().into_sighting().unwrap();
        assert_eq!(sighting.description, "");
        assert_eq!(sighting.size, "");
        assert_eq!(sighting.location, "");
        assert_eq!(sighting.image_url, None);
    }

    #[test]
    fn missing_location_point_is_an_error() {
        let payload = r#"
        {
            "id": "wish_903",
            "attributes": { "created_at": "2025-06-01T12:00:00Z" }
        }
        "#;

        let post: FeedPost = serde_json::from_str(payload).unwrap();
        let err = post.into_sighting().unwrap_err();
        assert!(matches!(err, TransformError::MissingLocation(id) if id == "wish_903"));
    }
}
