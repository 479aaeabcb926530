pub mod destination;
pub mod dialect;
pub mod error;
pub mod source;
