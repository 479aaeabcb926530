pub mod clock;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod transform;
