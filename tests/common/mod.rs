//! Shared helpers for integration tests.

#![allow(dead_code)]

use nearshot::{IndexOptions, SearcherConfig, VectorIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated directory for index and artifact files.
pub struct TestWorkspace {
    pub dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.path().join("index.nsx")
    }

    /// Writes a projector artifact and returns its path.
    pub fn write_projector(
        &self,
        name: &str,
        input_dim: usize,
        output_dim: usize,
        matrix: &[f32],
        mean: Option<&[f32]>,
    ) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(
            &path,
            projector_bytes(input_dim, output_dim, matrix, mean),
        )
        .expect("Failed to write projector artifact");
        path
    }
}

/// Encodes a projector artifact: `NSPJ`, version 1, D_in, D_work, flags,
/// row-major matrix, optional mean.
pub fn projector_bytes(
    input_dim: usize,
    output_dim: usize,
    matrix: &[f32],
    mean: Option<&[f32]>,
) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"NSPJ");
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&(input_dim as u32).to_le_bytes());
    bytes.extend_from_slice(&(output_dim as u32).to_le_bytes());
    bytes.extend_from_slice(&u32::from(mean.is_some()).to_le_bytes());
    for value in matrix.iter().chain(mean.unwrap_or_default()) {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Row-major matrix keeping the first `output_dim` components.
pub fn truncation_matrix(input_dim: usize, output_dim: usize) -> Vec<f32> {
    let mut matrix = vec![0.0; input_dim * output_dim];
    for row in 0..output_dim {
        matrix[row * input_dim + row] = 1.0;
    }
    matrix
}

/// Deterministic pseudo-random embeddings in `[-1, 1)`.
pub fn random_embeddings(count: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..dim).map(|_| rng.random_range(-1.0..1.0)).collect())
        .collect()
}

/// Embeddings grouped tightly around `clusters` well-separated centers.
pub fn clustered_embeddings(
    clusters: usize,
    per_cluster: usize,
    dim: usize,
    seed: u64,
) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let centers: Vec<Vec<f32>> = (0..clusters)
        .map(|_| (0..dim).map(|_| rng.random_range(-10.0..10.0)).collect())
        .collect();

    centers
        .iter()
        .flat_map(|center| {
            (0..per_cluster)
                .map(|_| {
                    center
                        .iter()
                        .map(|c| c + rng.random_range(-0.1..0.1))
                        .collect::<Vec<f32>>()
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Unprojected index holding the three-entry `a`, `b`, `c` example.
pub fn abc_index() -> VectorIndex {
    let mut index = VectorIndex::new(None).expect("Failed to create index");
    index.add(&[1.0, 0.0, 0.0], "a").unwrap();
    index.add(&[0.0, 1.0, 0.0], "b").unwrap();
    index.add(&[0.9, 0.1, 0.0], "c").unwrap();
    index
}

/// Empty unprojected index using `searcher`.
pub fn index_with(searcher: SearcherConfig) -> VectorIndex {
    VectorIndex::with_options(IndexOptions {
        searcher,
        ..IndexOptions::default()
    })
    .expect("Failed to create index")
}
