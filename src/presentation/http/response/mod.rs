//! Response shaping: JSON serialization, negotiated compression, cache
//! headers and pagination envelopes.

pub mod compression;
pub mod optimizer;

pub use compression::{ContentEncoding, accepted_encodings};
pub use optimizer::{
    OptimizedResponse, OptimizerConfig, ResponseOptimizer, ResponseOptions, generate_etag,
    supports_compression,
};
