pub mod error;
pub mod transfer;
