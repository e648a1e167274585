//! Fixed linear projection applied to embeddings before storage.
//!
//! A projector is plain immutable data: a row-major `D_work × D_in` matrix
//! and an optional `D_in` mean vector, learned offline (PCA) and shipped as
//! a read-only artifact. `apply` computes `M · (v - mean)`.
//!
//! # Artifact Format
//!
//! All values little-endian:
//! - Header (20 bytes): magic `NSPJ`, version, D_in, D_work, flags
//! - Matrix: `D_work × D_in` f32, row-major
//! - Mean: `D_in` f32, present when flag bit 0 is set

use std::fs::File;
use std::path::Path;

use memmap2::MmapOptions;
use tracing::debug;

use crate::error::{IndexError, IndexResult};
use crate::vector::storage::{BYTES_PER_F32, ByteCursor};
use crate::vector::types::VectorDimension;

/// Current artifact format version.
const PROJECTOR_VERSION: u32 = 1;

/// Magic bytes to identify projector artifacts.
const PROJECTOR_MAGIC: &[u8; 4] = b"NSPJ";

/// Size of the artifact header in bytes.
const PROJECTOR_HEADER_SIZE: usize = 20;

/// Flag bit marking a trailing mean vector.
const FLAG_HAS_MEAN: u32 = 1;

/// Linear dimensionality reduction from `D_in` to `D_work`.
#[derive(Debug, Clone, PartialEq)]
pub struct Projector {
    input_dim: VectorDimension,
    output_dim: VectorDimension,
    /// Row-major, one row per output component.
    matrix: Vec<f32>,
    mean: Option<Vec<f32>>,
}

impl Projector {
    /// Builds a projector from in-memory coefficients.
    ///
    /// Rejects zero dimensions, `output_dim > input_dim`, and coefficient or
    /// mean lengths that disagree with the dimensions.
    pub fn from_parts(
        input_dim: usize,
        output_dim: usize,
        matrix: Vec<f32>,
        mean: Option<Vec<f32>>,
    ) -> IndexResult<Self> {
        Self::validated(input_dim, output_dim, matrix, mean)
            .map_err(|reason| IndexError::artifact("<in-memory>", reason))
    }

    /// Loads a projector artifact from disk.
    ///
    /// Any problem with the file is an [`IndexError::Artifact`]: the
    /// artifact ships with the application, so callers treat this as fatal.
    pub fn load(path: impl AsRef<Path>) -> IndexResult<Self> {
        let path = path.as_ref();

        let file = File::open(path)
            .map_err(|e| IndexError::artifact(path, format!("cannot open artifact: {e}")))?;
        let file_len = file
            .metadata()
            .map_err(|e| IndexError::artifact(path, format!("cannot stat artifact: {e}")))?
            .len() as usize;

        if file_len < PROJECTOR_HEADER_SIZE {
            return Err(IndexError::artifact(
                path,
                format!("file too small to contain header ({file_len} bytes)"),
            ));
        }

        // SAFETY: the artifact is a read-only shipped resource; it is not
        // modified while mapped.
        let mmap = unsafe { MmapOptions::new().map(&file) }
            .map_err(|e| IndexError::artifact(path, format!("cannot map artifact: {e}")))?;

        let projector = Self::parse(&mmap).map_err(|reason| IndexError::artifact(path, reason))?;

        debug!(
            "Loaded projector {} -> {} (mean: {}) from {}",
            projector.input_dim,
            projector.output_dim,
            projector.has_mean(),
            path.display()
        );

        Ok(projector)
    }

    fn parse(bytes: &[u8]) -> Result<Self, String> {
        let mut cursor = ByteCursor::new(bytes);

        let magic = cursor.take(4).ok_or("truncated header")?;
        if magic != PROJECTOR_MAGIC {
            return Err("invalid magic bytes".to_string());
        }

        let version = cursor.read_u32().ok_or("truncated header")?;
        if version != PROJECTOR_VERSION {
            return Err(format!(
                "unsupported version {version}, expected {PROJECTOR_VERSION}"
            ));
        }

        let input_dim = cursor.read_u32().ok_or("truncated header")? as usize;
        let output_dim = cursor.read_u32().ok_or("truncated header")? as usize;
        let flags = cursor.read_u32().ok_or("truncated header")?;

        if flags & !FLAG_HAS_MEAN != 0 {
            return Err(format!("unknown flags {flags:#x}"));
        }
        let has_mean = flags & FLAG_HAS_MEAN != 0;

        let coefficient_count = input_dim
            .checked_mul(output_dim)
            .ok_or("matrix dimensions overflow")?;
        let mean_count = if has_mean { input_dim } else { 0 };
        let float_count = coefficient_count
            .checked_add(mean_count)
            .ok_or("matrix dimensions overflow")?;
        let expected_len = float_count
            .checked_mul(BYTES_PER_F32)
            .and_then(|n| n.checked_add(PROJECTOR_HEADER_SIZE))
            .ok_or("matrix dimensions overflow")?;

        if bytes.len() != expected_len {
            return Err(format!(
                "expected {expected_len} bytes for {output_dim}x{input_dim} matrix{}, found {}",
                if has_mean { " with mean" } else { "" },
                bytes.len()
            ));
        }

        let matrix = cursor
            .read_f32_vec(coefficient_count)
            .ok_or("truncated matrix")?;
        let mean = if has_mean {
            Some(cursor.read_f32_vec(input_dim).ok_or("truncated mean")?)
        } else {
            None
        };

        Self::validated(input_dim, output_dim, matrix, mean)
    }

    fn validated(
        input_dim: usize,
        output_dim: usize,
        matrix: Vec<f32>,
        mean: Option<Vec<f32>>,
    ) -> Result<Self, String> {
        let input = VectorDimension::new(input_dim).map_err(|_| "input dimension is zero")?;
        let output = VectorDimension::new(output_dim).map_err(|_| "output dimension is zero")?;

        if output_dim > input_dim {
            return Err(format!(
                "output dimension {output_dim} exceeds input dimension {input_dim}"
            ));
        }
        if matrix.len() != input_dim * output_dim {
            return Err(format!(
                "coefficient count {} does not match {output_dim}x{input_dim}",
                matrix.len()
            ));
        }
        if let Some(mean) = &mean {
            if mean.len() != input_dim {
                return Err(format!(
                    "mean length {} does not match input dimension {input_dim}",
                    mean.len()
                ));
            }
        }

        Ok(Self {
            input_dim: input,
            output_dim: output,
            matrix,
            mean,
        })
    }

    /// Projects one embedding: `M · (v - mean)`.
    ///
    /// Pure and deterministic; the same input always yields bit-identical
    /// output, so stored and query vectors land in the same space.
    pub fn apply(&self, vector: &[f32]) -> IndexResult<Vec<f32>> {
        self.input_dim.validate_vector(vector)?;

        let rows = self.matrix.chunks_exact(self.input_dim.get());
        let projected: Vec<f32> = match &self.mean {
            Some(mean) => rows
                .map(|row| {
                    row.iter()
                        .zip(vector.iter().zip(mean.iter()))
                        .map(|(m, (x, mu))| m * (x - mu))
                        .sum::<f32>()
                })
                .collect(),
            None => rows
                .map(|row| row.iter().zip(vector.iter()).map(|(m, x)| m * x).sum::<f32>())
                .collect(),
        };

        Ok(projected)
    }

    #[must_use]
    pub fn input_dim(&self) -> VectorDimension {
        self.input_dim
    }

    #[must_use]
    pub fn output_dim(&self) -> VectorDimension {
        self.output_dim
    }

    #[must_use]
    pub fn has_mean(&self) -> bool {
        self.mean.is_some()
    }
}
