//! Embedding similarity search.
//!
//! Raw embeddings are reduced by an optional linear [`Projector`] before they
//! are stored, and queries go through the same projection. Entries live in an
//! append-only [`VectorStore`] that persists to a single binary file.
//!
//! # Architecture
//! Ranking sits behind the [`Searcher`] trait. [`ExactSearcher`] scans every
//! entry; [`IvfSearcher`] partitions entries with K-means clustering and only
//! scans the lists nearest the query once enough vectors exist to train.
//! Both rank by squared Euclidean distance with ties in insertion order.

mod clustering;
mod distance;
mod index;
mod projector;
mod search;
mod shared;
mod storage;
mod store;
mod types;

// Re-export core types for public API
pub use clustering::{ClusteringError, KMeansResult, assign_to_nearest_centroid, kmeans_clustering};
pub use distance::squared_euclidean;
pub use index::{IndexOptions, VectorIndex};
pub use projector::Projector;
pub use search::{
    ExactSearcher, IVF_TRAINING_SEED, IvfSearcher, MIN_POINTS_PER_LIST, Searcher, SearcherConfig,
    SearcherKind,
};
pub use shared::SharedVectorIndex;
pub use storage::{decode_store, encode_store, read_store, write_store};
pub use store::VectorStore;
pub use types::{
    Candidate, ClusterId, DEFAULT_INPUT_DIMENSION, DEFAULT_WORKING_DIMENSION, IndexEntry,
    SearchHit, VectorDimension,
};
