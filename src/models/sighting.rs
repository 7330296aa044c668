use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Two reports at the same coordinates whose timestamps fall within this many
/// seconds of each other describe the same event.
pub const DEDUP_WINDOW_SECS: i64 = 60;

/// A reported observation, as stored in the `sightings` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Sighting {
    pub id: Uuid,
    pub lat: f64,
    pub lng: f64,
    pub description: String,
    pub size: String,
    pub activity: String,
    pub uniform: String,
    pub equipment: String,
    pub location: String,
    pub time_date: DateTime<Utc>,
    pub image_url: Option<String>,
}

/// A sighting that has not been written to the store yet. The id is assigned
/// on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSighting {
    pub lat: f64,
    pub lng: f64,
    pub description: String,
    pub size: String,
    pub activity: String,
    pub uniform: String,
    pub equipment: String,
    pub location: String,
    pub time_date: DateTime<Utc>,
    pub image_url: Option<String>,
}

impl NewSighting {
    /// Whether `other` reports the same event: exact coordinate match and
    /// timestamps within the dedup window.
    pub fn duplicates(&self, other: &NewSighting) -> bool {
        self.lat == other.lat
            && self.lng == other.lng
            && (self.time_date - other.time_date)
                .num_seconds()
                .abs()
                <= DEDUP_WINDOW_SECS
    }
}

/// Submission-time backdating offsets. Reporters who are not filing live pick
/// a coarse bucket instead of an exact timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ReportedTime {
    #[serde(rename = "now")]
    Now,
    #[serde(rename = "1-8")]
    OneToEightHoursAgo,
    #[serde(rename = "8+")]
    OverEightHoursAgo,
}

impl Default for ReportedTime {
    fn default() -> Self {
        Self::Now
    }
}

impl ReportedTime {
    pub fn resolve(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Now => now,
            Self::OneToEightHoursAgo => now - Duration::hours(4),
            Self::OverEightHoursAgo => now - Duration::hours(9),
        }
    }
}

/// Age classification used by map clients to pick a marker icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBucket {
    /// Less than 4 hours old.
    Recent,
    /// Between 4 and 8 hours old.
    Today,
    /// More than 8 hours old.
    Older,
}

impl AgeBucket {
    pub fn for_age(time_date: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let age = now - time_date;
        if age < Duration::hours(4) {
            Self::Recent
        } else if age < Duration::hours(8) {
            Self::Today
        } else {
            Self::Older
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sighting_at(lat: f64, lng: f64, time_date: DateTime<Utc>) -> NewSighting {
        NewSighting {
            lat,
            lng,
            description: String::new(),
            size: String::new(),
            activity: String::new(),
            uniform: String::new(),
            equipment: String::new(),
            location: String::new(),
            time_date,
            image_url: None,
        }
    }

    #[test]
    fn duplicates_within_window_at_same_coordinates() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let a = sighting_at(34.05, -118.24, t0);
        let b = sighting_at(34.05, -118.24, t0 + Duration::seconds(30));
        assert!(a.duplicates(&b));
        assert!(b.duplicates(&a));
    }

    #[test]
    fn not_duplicates_outside_window() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let a = sighting_at(34.05, -118.24, t0);
        let b = sighting_at(34.05, -118.24, t0 + Duration::seconds(90));
        assert!(!a.duplicates(&b));
    }

    #[test]
    fn not_duplicates_at_different_coordinates() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let a = sighting_at(34.05, -118.24, t0);
        let b = sighting_at(34.06, -118.24, t0);
        assert!(!a.duplicates(&b));
    }

    #[test]
    fn reported_time_offsets() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(ReportedTime::Now.resolve(now), now);
        assert_eq!(
            ReportedTime::OneToEightHoursAgo.resolve(now),
            now - Duration::hours(4)
        );
        assert_eq!(
            ReportedTime::OverEightHoursAgo.resolve(now),
            now - Duration::hours(9)
        );
    }

    #[test]
    fn reported_time_deserializes_from_form_values() {
        assert_eq!(
            serde_json::from_str::<ReportedTime>("\"now\"").unwrap(),
            ReportedTime::Now
        );
        assert_eq!(
            serde_json::from_str::<ReportedTime>("\"1-8\"").unwrap(),
            ReportedTime::OneToEightHoursAgo
        );
        assert_eq!(
            serde_json::from_str::<ReportedTime>("\"8+\"").unwrap(),
            ReportedTime::OverEightHoursAgo
        );
    }

    #[test]
    fn age_buckets_split_at_four_and_eight_hours() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(
            AgeBucket::for_age(now - Duration::minutes(30), now),
            AgeBucket::Recent
        );
        assert_eq!(
            AgeBucket::for_age(now - Duration::hours(5), now),
            AgeBucket::Today
        );
        assert_eq!(
            AgeBucket::for_age(now - Duration::hours(12), now),
            AgeBucket::Older
        );
    }
}
