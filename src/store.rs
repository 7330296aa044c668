use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::db::{queries, DbPool};
use crate::models::sighting::{NewSighting, Sighting, DEDUP_WINDOW_SECS};

/// Storage operations the sync job and the API need. Kept behind a trait so
/// the job can be driven against an in-memory store in tests.
#[async_trait]
pub trait SightingStore: Send + Sync {
    async fn insert(&self, sighting: NewSighting) -> Result<Sighting>;

    /// Bulk insert. Returns the number of rows written.
    async fn insert_many(&self, sightings: &[NewSighting]) -> Result<u64>;

    /// Point lookup for an existing row at the same coordinates with a
    /// timestamp inside the dedup window around `time_date`.
    async fn has_duplicate(&self, lat: f64, lng: f64, time_date: DateTime<Utc>) -> Result<bool>;

    /// Copy rows older than `cutoff` into the archive table.
    async fn archive_expired(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Delete rows older than `cutoff` from the live table.
    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Rows at or after `cutoff`, newest first.
    async fn list_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Sighting>>;

    async fn get(&self, id: Uuid) -> Result<Option<Sighting>>;
}

#[async_trait]
impl<T: SightingStore + ?Sized> SightingStore for std::sync::Arc<T> {
    async fn insert(&self, sighting: NewSighting) -> Result<Sighting> {
        (**self).insert(sighting).await
    }

    async fn insert_many(&self, sightings: &[NewSighting]) -> Result<u64> {
        (**self).insert_many(sightings).await
    }

    async fn has_duplicate(&self, lat: f64, lng: f64, time_date: DateTime<Utc>) -> Result<bool> {
        (**self).has_duplicate(lat, lng, time_date).await
    }

    async fn archive_expired(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        (**self).archive_expired(cutoff).await
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        (**self).delete_expired(cutoff).await
    }

    async fn list_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Sighting>> {
        (**self).list_since(cutoff).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Sighting>> {
        (**self).get(id).await
    }
}

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgSightingStore {
    pool: DbPool,
}

impl PgSightingStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SightingStore for PgSightingStore {
    async fn insert(&self, sighting: NewSighting) -> Result<Sighting> {
        let id = Uuid::new_v4();
        sqlx::query(queries::INSERT_SIGHTING)
            .bind(id)
            .bind(sighting.lat)
            .bind(sighting.lng)
            .bind(&sighting.description)
            .bind(&sighting.size)
            .bind(&sighting.activity)
            .bind(&sighting.uniform)
            .bind(&sighting.equipment)
            .bind(&sighting.location)
            .bind(sighting.time_date)
            .bind(&sighting.image_url)
            .execute(&self.pool)
            .await?;

        Ok(Sighting {
            id,
            lat: sighting.lat,
            lng: sighting.lng,
            description: sighting.description,
            size: sighting.size,
            activity: sighting.activity,
            uniform: sighting.uniform,
            equipment: sighting.equipment,
            location: sighting.location,
            time_date: sighting.time_date,
            image_url: sighting.image_url,
        })
    }

    async fn insert_many(&self, sightings: &[NewSighting]) -> Result<u64> {
        if sightings.is_empty() {
            return Ok(0);
        }

        let mut builder = sqlx::QueryBuilder::new(
            "INSERT INTO sightings (id, lat, lng, description, size, activity, uniform, equipment, location, time_date, image_url) ",
        );
        builder.push_values(sightings, |mut row, s| {
            row.push_bind(Uuid::new_v4())
                .push_bind(s.lat)
                .push_bind(s.lng)
                .push_bind(&s.description)
                .push_bind(&s.size)
                .push_bind(&s.activity)
                .push_bind(&s.uniform)
                .push_bind(&s.equipment)
                .push_bind(&s.location)
                .push_bind(s.time_date)
                .push_bind(&s.image_url);
        });

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn has_duplicate(&self, lat: f64, lng: f64, time_date: DateTime<Utc>) -> Result<bool> {
        let window = Duration::seconds(DEDUP_WINDOW_SECS);
        let row: Option<(Uuid,)> = sqlx::query_as(queries::SELECT_DUPLICATE_ID)
            .bind(lat)
            .bind(lng)
            .bind(time_date - window)
            .bind(time_date + window)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn archive_expired(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(queries::ARCHIVE_EXPIRED)
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(queries::DELETE_EXPIRED)
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Sighting>> {
        let rows = sqlx::query_as::<_, Sighting>(queries::SELECT_SIGHTINGS_SINCE)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Sighting>> {
        let row = sqlx::query_as::<_, Sighting>(queries::SELECT_SIGHTING_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}
