//! File interfaces: adjacency-list ingest and the serialized model
//! container.

pub mod adjacency;
pub mod model_file;
