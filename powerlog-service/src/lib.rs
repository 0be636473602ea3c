pub mod config;
pub mod device;
pub mod jobs;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod rollup;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use pipeline::{Envelope, Pipeline};
pub use rollup::QueryService;
