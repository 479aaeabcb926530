pub mod coercion;
pub mod destination;
pub mod metadata;
pub mod params;
