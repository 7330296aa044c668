pub mod feed;
pub mod sighting;
