//! nearshot: nearest-neighbor search over projected image embeddings.
//!
//! A host feeds raw embeddings from its feature extractor; the index reduces
//! them with a learned linear projection, keeps them in an append-only store
//! that persists to one binary file, and answers k-nearest-neighbor queries.

pub mod config;
pub mod display;
pub mod error;
pub mod io;
pub mod vector;

// Explicit exports for better API clarity
pub use config::Settings;
pub use error::{ErrorKind, IndexError, IndexResult};
pub use vector::{
    IndexEntry, IndexOptions, Projector, SearchHit, SearcherConfig, SearcherKind,
    SharedVectorIndex, VectorDimension, VectorIndex,
};
