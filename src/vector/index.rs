//! The vector index: projection, storage and search behind one API.
//!
//! # Concurrency
//!
//! A `VectorIndex` is not meant for concurrent use. Mutating operations take
//! `&mut self`; hosts that share an index between threads must serialize
//! access themselves, for example through [`SharedVectorIndex`] or a single
//! dedicated worker that owns the index.
//!
//! [`SharedVectorIndex`]: crate::vector::SharedVectorIndex

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::error::{IndexError, IndexResult};
use crate::vector::projector::Projector;
use crate::vector::search::{Searcher, SearcherConfig};
use crate::vector::storage::{read_store, write_store};
use crate::vector::store::VectorStore;
use crate::vector::types::{IndexEntry, SearchHit, VectorDimension};

/// Construction options for a [`VectorIndex`].
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Projector artifact to load; `None` stores embeddings unchanged.
    pub projector_path: Option<PathBuf>,

    /// Expected embedding length. With a projector it must equal the
    /// projector's input dimension; without one it fixes the working
    /// dimension up front.
    pub dimension: Option<usize>,

    pub searcher: SearcherConfig,
}

/// Nearest-neighbor index over projected embeddings.
///
/// Distances are squared Euclidean (L2²) between projected vectors, both
/// when comparing stored entries and queries; persisted files hold projected
/// vectors, so they are only meaningful with the same projector.
#[derive(Debug)]
pub struct VectorIndex {
    store: VectorStore,
    projector: Option<Projector>,
    /// Working dimension fixed at construction, if any.
    pinned: Option<VectorDimension>,
    searcher: Box<dyn Searcher>,
}

impl VectorIndex {
    /// Creates an empty index, loading the projector artifact if given.
    ///
    /// Artifact problems are returned as [`IndexError::Artifact`]; hosts
    /// should treat them as fatal since the artifact ships with the app.
    pub fn new(projector_path: Option<&Path>) -> IndexResult<Self> {
        Self::with_options(IndexOptions {
            projector_path: projector_path.map(Path::to_path_buf),
            ..IndexOptions::default()
        })
    }

    /// Creates an empty index from explicit options.
    pub fn with_options(options: IndexOptions) -> IndexResult<Self> {
        let projector = options
            .projector_path
            .as_deref()
            .map(Projector::load)
            .transpose()?;

        let pinned = match (&projector, options.dimension) {
            (Some(projector), Some(dimension)) if dimension != projector.input_dim().get() => {
                return Err(IndexError::Config {
                    reason: format!(
                        "configured dimension {dimension} does not match projector input {}",
                        projector.input_dim()
                    ),
                });
            }
            (Some(projector), _) => Some(projector.output_dim()),
            (None, Some(dimension)) => {
                Some(VectorDimension::new(dimension).map_err(|_| IndexError::Config {
                    reason: "dimension must be greater than zero".to_string(),
                })?)
            }
            (None, None) => None,
        };

        Ok(Self::assemble(projector, pinned, &options.searcher))
    }

    /// Creates an empty index around an in-memory projector.
    #[must_use]
    pub fn from_projector(projector: Option<Projector>, searcher: &SearcherConfig) -> Self {
        let pinned = projector.as_ref().map(Projector::output_dim);
        Self::assemble(projector, pinned, searcher)
    }

    fn assemble(
        projector: Option<Projector>,
        pinned: Option<VectorDimension>,
        searcher: &SearcherConfig,
    ) -> Self {
        let store = VectorStore::new(pinned);
        let mut searcher = searcher.build();
        searcher.rebuild(&store);

        Self {
            store,
            projector,
            pinned,
            searcher,
        }
    }

    /// Applies the projector, or checks the pinned dimension without one.
    fn project(&self, embedding: &[f32]) -> IndexResult<Vec<f32>> {
        match &self.projector {
            Some(projector) => projector.apply(embedding),
            None => {
                if let Some(dimension) = self.pinned {
                    dimension.validate_vector(embedding)?;
                }
                Ok(embedding.to_vec())
            }
        }
    }

    /// Projects `embedding` and appends it under `id`.
    ///
    /// On error nothing is stored.
    pub fn add(&mut self, embedding: &[f32], id: impl Into<String>) -> IndexResult<()> {
        let vector = self.project(embedding)?;
        let position = self.store.push(IndexEntry::new(id, vector))?;
        self.searcher.observe(&self.store, position);

        trace!("Added entry {position}");
        Ok(())
    }

    /// Adds many embeddings, all or nothing.
    ///
    /// Every embedding is projected and validated before the first one is
    /// stored. Returns the number of entries added.
    pub fn add_batch<'a, S>(
        &mut self,
        items: impl IntoIterator<Item = (&'a [f32], S)>,
    ) -> IndexResult<usize>
    where
        S: Into<String>,
    {
        let mut dimension = self.store.dimension();
        let mut staged = Vec::new();

        for (embedding, id) in items {
            let vector = self.project(embedding)?;
            match dimension {
                Some(dimension) => dimension.validate_vector(&vector)?,
                None => dimension = Some(VectorDimension::new(vector.len())?),
            }
            staged.push(IndexEntry::new(id, vector));
        }

        let added = staged.len();
        for entry in staged {
            let position = self.store.push(entry)?;
            self.searcher.observe(&self.store, position);
        }

        debug!("Added batch of {added} entries, {} total", self.store.len());
        Ok(added)
    }

    /// Number of stored entries.
    #[must_use]
    pub fn count(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Removes every entry. The projector is kept.
    pub fn clear(&mut self) {
        self.store.reset(self.pinned);
        self.searcher.rebuild(&self.store);
        debug!("Cleared index");
    }

    /// Returns up to `k` nearest entries to `query`, closest first.
    ///
    /// Ties are broken by insertion order. An empty index yields an empty
    /// result; `k == 0` or a wrong-length query is an
    /// [`IndexError::InvalidArgument`]-kind error.
    pub fn search(&self, query: &[f32], k: usize) -> IndexResult<Vec<SearchHit>> {
        let k = NonZeroUsize::new(k)
            .ok_or_else(|| IndexError::invalid_argument("k must be at least 1"))?;
        let query = self.project(query)?;

        if let Some(dimension) = self.store.dimension() {
            dimension.validate_vector(&query)?;
        }
        if self.store.is_empty() {
            return Ok(Vec::new());
        }

        let hits = self
            .searcher
            .search(&self.store, &query, k)
            .into_iter()
            .filter_map(|candidate| {
                self.store.get(candidate.position).map(|entry| SearchHit {
                    id: entry.id.clone(),
                    distance: candidate.distance,
                })
            })
            .collect();

        Ok(hits)
    }

    /// Like [`search`](Self::search), dropping hits farther than `max_distance`.
    pub fn search_within(
        &self,
        query: &[f32],
        k: usize,
        max_distance: f32,
    ) -> IndexResult<Vec<SearchHit>> {
        if max_distance.is_nan() || max_distance < 0.0 {
            return Err(IndexError::invalid_argument(format!(
                "max_distance must be a non-negative number, got {max_distance}"
            )));
        }

        let mut hits = self.search(query, k)?;
        hits.retain(|hit| hit.distance <= max_distance);
        Ok(hits)
    }

    /// Persists the store (not the projector) to `path` atomically.
    ///
    /// A failed save leaves both the in-memory store and any existing file
    /// untouched.
    pub fn save(&self, path: impl AsRef<Path>) -> IndexResult<()> {
        write_store(path.as_ref(), &self.store)
    }

    /// Replaces the in-memory store with the one saved at `path`.
    ///
    /// All or nothing: on any error the current entries are kept.
    pub fn load(&mut self, path: impl AsRef<Path>) -> IndexResult<()> {
        let path = path.as_ref();

        let store = read_store(path, self.pinned).inspect_err(|e| {
            warn!("Keeping current index, load from {} failed: {e}", path.display());
        })?;

        self.store = store;
        self.searcher.rebuild(&self.store);
        debug!(
            "Loaded {} entries from {} using {} search",
            self.store.len(),
            path.display(),
            self.searcher.name()
        );
        Ok(())
    }

    /// Loads `path`, treating a missing file as an empty index.
    ///
    /// Returns `Ok(true)` if a file was loaded and `Ok(false)` on first run.
    pub fn load_or_empty(&mut self, path: impl AsRef<Path>) -> IndexResult<bool> {
        match self.load(path) {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => {
                self.clear();
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Stored entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        self.store.entries()
    }

    /// Working dimension of stored vectors, if known yet.
    #[must_use]
    pub fn dimension(&self) -> Option<VectorDimension> {
        self.store.dimension().or(self.pinned)
    }

    /// Embedding length callers must supply, if known yet.
    #[must_use]
    pub fn input_dimension(&self) -> Option<VectorDimension> {
        match &self.projector {
            Some(projector) => Some(projector.input_dim()),
            None => self.dimension(),
        }
    }

    #[must_use]
    pub fn projector(&self) -> Option<&Projector> {
        self.projector.as_ref()
    }

    #[must_use]
    pub fn searcher_name(&self) -> &'static str {
        self.searcher.name()
    }
}
