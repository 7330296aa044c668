pub const INSERT_SIGHTING: &str = r#"
INSERT INTO sightings (id, lat, lng, description, size, activity, uniform, equipment, location, time_date, image_url)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11);
"#;

pub const SELECT_DUPLICATE_ID: &str = r#"
SELECT id FROM sightings
WHERE lat = $1 AND lng = $2 AND time_date >= $3 AND time_date <= $4
LIMIT 1;
"#;

pub const SELECT_SIGHTING_BY_ID: &str = r#"
SELECT id, lat, lng, description, size, activity, uniform, equipment, location, time_date, image_url
FROM sightings
WHERE id = $1;
"#;

pub const SELECT_SIGHTINGS_SINCE: &str = r#"
SELECT id, lat, lng, description, size, activity, uniform, equipment, location, time_date, image_url
FROM sightings
WHERE time_date >= $1
ORDER BY time_date DESC;
"#;

pub const ARCHIVE_EXPIRED: &str = r#"
INSERT INTO sightings_archive (id, lat, lng, description, size, activity, uniform, equipment, location, time_date, image_url)
SELECT id, lat, lng, description, size, activity, uniform, equipment, location, time_date, image_url
FROM sightings
WHERE time_date < $1
ON CONFLICT (id) DO NOTHING;
"#;

pub const DELETE_EXPIRED: &str = r#"
DELETE FROM sightings WHERE time_date < $1;
"#;
