// Adapters layer: concrete implementations of the domain ports (rate engine, PPM store).

pub mod http;
pub mod storage;

pub use http::{HttpEstimateClient, HttpPpmStore};
pub use storage::FilePpmStore;
