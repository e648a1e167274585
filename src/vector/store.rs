//! In-memory vector store.
//!
//! Holds index entries in insertion order. The store only enforces its own
//! invariants (one dimension for every vector, append-only); it knows
//! nothing about projection, persistence or ranking.

use crate::error::IndexResult;
use crate::vector::types::{IndexEntry, VectorDimension};

/// Ordered collection of `(identifier, vector)` entries.
///
/// The dimension is either fixed up front or taken from the first entry
/// pushed into an empty store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorStore {
    entries: Vec<IndexEntry>,
    dimension: Option<VectorDimension>,
}

impl VectorStore {
    /// Creates an empty store, optionally with a fixed dimension.
    #[must_use]
    pub fn new(dimension: Option<VectorDimension>) -> Self {
        Self {
            entries: Vec::new(),
            dimension,
        }
    }

    /// Builds a store from already-validated parts.
    pub(crate) fn from_entries(
        dimension: Option<VectorDimension>,
        entries: Vec<IndexEntry>,
    ) -> IndexResult<Self> {
        let mut store = Self::new(dimension);
        store.entries.reserve_exact(entries.len());
        for entry in entries {
            store.push(entry)?;
        }
        Ok(store)
    }

    /// Checks that a vector could be pushed without mutating anything.
    pub fn check(&self, vector: &[f32]) -> IndexResult<()> {
        match self.dimension {
            Some(dimension) => dimension.validate_vector(vector),
            None => VectorDimension::new(vector.len()).map(|_| ()),
        }
    }

    /// Appends an entry and returns its position.
    ///
    /// Amortized O(1). Fails without side effects on a dimension mismatch.
    pub fn push(&mut self, entry: IndexEntry) -> IndexResult<usize> {
        self.check(&entry.vector)?;
        if self.dimension.is_none() {
            self.dimension = Some(VectorDimension::new(entry.vector.len())?);
        }

        self.entries.push(entry);
        Ok(self.entries.len() - 1)
    }

    /// Removes every entry and re-fixes the dimension (or unfixes it).
    pub(crate) fn reset(&mut self, dimension: Option<VectorDimension>) {
        self.entries = Vec::new();
        self.dimension = dimension;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Working dimension, `None` for an empty store with no fixed dimension.
    #[must_use]
    pub fn dimension(&self) -> Option<VectorDimension> {
        self.dimension
    }

    #[must_use]
    pub fn get(&self, position: usize) -> Option<&IndexEntry> {
        self.entries.get(position)
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Stored vectors in insertion order.
    pub fn vectors(&self) -> impl Iterator<Item = &[f32]> {
        self.entries.iter().map(|entry| entry.vector.as_slice())
    }
}
