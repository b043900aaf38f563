pub mod config;
pub mod error;
pub mod instrument;
pub mod mapper;
pub mod model;
pub mod stream;
pub mod telemetry;
