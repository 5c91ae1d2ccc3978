pub mod normalizer;

pub use normalizer::{normalize, normalize_with_limit, MAX_CANDIDATES};
