//! Nearest-neighbor search strategies over a [`VectorStore`].
//!
//! A [`Searcher`] ranks stored vectors against an already-projected query.
//! It never touches persistence: the index tells it when the store was
//! rebuilt (load, clear) or appended to, and it keeps whatever acceleration
//! structure it needs in sync.
//!
//! Every searcher ranks with squared Euclidean distance and the same
//! ordering: ascending distance, ties broken by insertion position.

use std::collections::BinaryHeap;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::vector::clustering::{assign_to_nearest_centroid, kmeans_clustering};
use crate::vector::distance::squared_euclidean;
use crate::vector::store::VectorStore;
use crate::vector::types::Candidate;

/// Minimum vectors per inverted list before an IVF searcher trains.
pub const MIN_POINTS_PER_LIST: usize = 8;

/// Seed for IVF training, fixed so a given store always trains the same way.
pub const IVF_TRAINING_SEED: u64 = 0x6e65_6172_7368_6f74;

/// Ranks stored vectors against a projected query.
///
/// Implementations must return exactly `min(k, store.len())` candidates
/// ordered by [`Candidate`]'s ordering. Approximate implementations may miss
/// true neighbors but must never reorder the ones they return.
pub trait Searcher: std::fmt::Debug + Send {
    /// Short name used in logs and `info` output.
    fn name(&self) -> &'static str;

    /// Discards internal state and rebuilds it from `store`.
    fn rebuild(&mut self, store: &VectorStore);

    /// Called after the entry at `position` was appended to `store`.
    fn observe(&mut self, store: &VectorStore, position: usize);

    /// Returns the `k` best candidates for `query`.
    fn search(&self, store: &VectorStore, query: &[f32], k: NonZeroUsize) -> Vec<Candidate>;
}

/// Keeps the `k` smallest candidates seen, then returns them sorted.
fn top_k(candidates: impl Iterator<Item = Candidate>, k: NonZeroUsize) -> Vec<Candidate> {
    let k = k.get();
    let mut heap = BinaryHeap::with_capacity(k + 1);

    for candidate in candidates {
        if heap.len() < k {
            heap.push(candidate);
        } else if let Some(worst) = heap.peek() {
            if candidate < *worst {
                heap.pop();
                heap.push(candidate);
            }
        }
    }

    heap.into_sorted_vec()
}

fn scan_all(store: &VectorStore, query: &[f32], k: NonZeroUsize) -> Vec<Candidate> {
    let candidates = store
        .vectors()
        .enumerate()
        .map(|(position, vector)| Candidate::new(position, squared_euclidean(query, vector)));
    top_k(candidates, k)
}

/// Brute-force search over every stored vector.
#[derive(Debug, Default, Clone)]
pub struct ExactSearcher;

impl Searcher for ExactSearcher {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn rebuild(&mut self, _store: &VectorStore) {}

    fn observe(&mut self, _store: &VectorStore, _position: usize) {}

    fn search(&self, store: &VectorStore, query: &[f32], k: NonZeroUsize) -> Vec<Candidate> {
        scan_all(store, query, k)
    }
}

/// Inverted-file search over K-means centroids.
///
/// Until the store holds `nlist * MIN_POINTS_PER_LIST` vectors the searcher
/// is untrained and scans everything. Once trained, appends are routed to
/// their nearest centroid's list and queries scan the `nprobe` lists whose
/// centroids are closest to the query, probing further lists when those
/// hold fewer than `k` entries.
///
/// Training runs again whenever the store has doubled since the last
/// attempt, successful or not.
#[derive(Debug, Clone)]
pub struct IvfSearcher {
    nlist: usize,
    nprobe: usize,
    centroids: Vec<Vec<f32>>,
    lists: Vec<Vec<usize>>,
    /// Store length at the last training attempt
    trained_len: Option<usize>,
    training_runs: usize,
}

impl IvfSearcher {
    /// Creates an untrained searcher. Both parameters are clamped to at least 1.
    #[must_use]
    pub fn new(nlist: usize, nprobe: usize) -> Self {
        Self {
            nlist: nlist.max(1),
            nprobe: nprobe.max(1),
            centroids: Vec::new(),
            lists: Vec::new(),
            trained_len: None,
            training_runs: 0,
        }
    }

    #[must_use]
    pub fn is_trained(&self) -> bool {
        !self.centroids.is_empty()
    }

    /// Number of times k-means has run since construction.
    #[must_use]
    pub fn training_runs(&self) -> usize {
        self.training_runs
    }

    fn training_threshold(&self) -> usize {
        self.nlist.saturating_mul(MIN_POINTS_PER_LIST)
    }

    fn needs_training(&self, len: usize) -> bool {
        len >= self.training_threshold()
            && self
                .trained_len
                .is_none_or(|last| len >= last.saturating_mul(2))
    }

    fn train(&mut self, store: &VectorStore) {
        let vectors: Vec<&[f32]> = store.vectors().collect();
        self.trained_len = Some(vectors.len());
        self.training_runs += 1;

        match kmeans_clustering(&vectors, self.nlist, IVF_TRAINING_SEED) {
            Ok(result) => {
                let mut lists = vec![Vec::new(); self.nlist];
                for (position, cluster) in result.assignments.iter().enumerate() {
                    lists[cluster.index()].push(position);
                }
                debug!(
                    "Trained IVF with {} lists over {} vectors in {} iterations",
                    self.nlist,
                    vectors.len(),
                    result.iterations
                );
                self.centroids = result.centroids;
                self.lists = lists;
            }
            Err(e) => {
                warn!(
                    "IVF training failed over {} vectors, scanning exhaustively until the store doubles: {e}",
                    vectors.len()
                );
                self.centroids.clear();
                self.lists.clear();
            }
        }
    }
}

impl Searcher for IvfSearcher {
    fn name(&self) -> &'static str {
        "ivf"
    }

    fn rebuild(&mut self, store: &VectorStore) {
        self.centroids.clear();
        self.lists.clear();
        self.trained_len = None;

        if self.needs_training(store.len()) {
            self.train(store);
        }
    }

    fn observe(&mut self, store: &VectorStore, position: usize) {
        if self.needs_training(store.len()) {
            // Training lists every stored position, including this one
            self.train(store);
            return;
        }

        if self.is_trained() {
            if let Some(entry) = store.get(position) {
                let centroid_refs: Vec<&[f32]> =
                    self.centroids.iter().map(|c| c.as_slice()).collect();
                let cluster = assign_to_nearest_centroid(&entry.vector, &centroid_refs);
                self.lists[cluster.index()].push(position);
            }
        }
    }

    fn search(&self, store: &VectorStore, query: &[f32], k: NonZeroUsize) -> Vec<Candidate> {
        if !self.is_trained() {
            return scan_all(store, query, k);
        }

        let all_lists = NonZeroUsize::new(self.centroids.len()).unwrap_or(NonZeroUsize::MIN);
        let lists_by_distance = top_k(
            self.centroids
                .iter()
                .enumerate()
                .map(|(i, centroid)| Candidate::new(i, squared_euclidean(query, centroid))),
            all_lists,
        );

        // Probe past nprobe until k entries are gathered
        let mut positions = Vec::new();
        for (probed, list) in lists_by_distance.iter().enumerate() {
            if probed >= self.nprobe && positions.len() >= k.get() {
                break;
            }
            positions.extend_from_slice(&self.lists[list.position]);
        }

        let candidates = positions
            .into_iter()
            .filter_map(|position| {
                store
                    .get(position)
                    .map(|entry| Candidate::new(position, squared_euclidean(query, &entry.vector)))
            });

        top_k(candidates, k)
    }
}

/// Which searcher an index uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearcherKind {
    #[default]
    Exact,
    Ivf,
}

/// Searcher selection and IVF tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearcherConfig {
    /// "exact" or "ivf"
    #[serde(default)]
    pub kind: SearcherKind,

    /// Number of inverted lists (IVF only)
    #[serde(default = "default_nlist")]
    pub nlist: usize,

    /// Lists probed per query (IVF only)
    #[serde(default = "default_nprobe")]
    pub nprobe: usize,
}

fn default_nlist() -> usize {
    32
}
fn default_nprobe() -> usize {
    4
}

impl Default for SearcherConfig {
    fn default() -> Self {
        Self {
            kind: SearcherKind::default(),
            nlist: default_nlist(),
            nprobe: default_nprobe(),
        }
    }
}

impl SearcherConfig {
    /// Builds a fresh, empty searcher.
    #[must_use]
    pub fn build(&self) -> Box<dyn Searcher> {
        match self.kind {
            SearcherKind::Exact => Box::new(ExactSearcher),
            SearcherKind::Ivf => Box::new(IvfSearcher::new(self.nlist, self.nprobe)),
        }
    }
}
