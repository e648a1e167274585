//! Search through a projector artifact loaded from disk.

use crate::common::{TestWorkspace, projector_bytes, random_embeddings, truncation_matrix};
use nearshot::vector::squared_euclidean;
use nearshot::{ErrorKind, Projector, VectorIndex};
use std::fs;

#[test]
fn test_mean_centering_and_projection() {
    let workspace = TestWorkspace::new();
    // Sums pairs of centered components
    let matrix = [1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0];
    let mean = [1.0, 1.0, 2.0, 2.0];
    let artifact = workspace.write_projector("pca.nsp", 4, 2, &matrix, Some(&mean));

    let projector = Projector::load(&artifact).unwrap();
    assert!(projector.has_mean());
    assert_eq!(projector.input_dim().get(), 4);
    assert_eq!(projector.output_dim().get(), 2);
    assert_eq!(
        projector.apply(&[2.0, 3.0, 2.0, 0.0]).unwrap(),
        vec![3.0, -2.0]
    );

    let mut index = VectorIndex::new(Some(&artifact)).unwrap();
    index.add(&[2.0, 3.0, 2.0, 0.0], "x").unwrap();
    assert_eq!(index.entries()[0].vector, vec![3.0, -2.0]);
}

#[test]
fn test_distances_are_measured_after_projection() {
    let workspace = TestWorkspace::new();
    let artifact = workspace.write_projector("pca.nsp", 16, 4, &truncation_matrix(16, 4), None);
    let projector = Projector::load(&artifact).unwrap();

    let embeddings = random_embeddings(50, 16, 42);
    let mut index = VectorIndex::new(Some(&artifact)).unwrap();
    for (i, embedding) in embeddings.iter().enumerate() {
        index.add(embedding, format!("img-{i}")).unwrap();
    }

    let query = random_embeddings(1, 16, 99).remove(0);
    let projected_query = projector.apply(&query).unwrap();
    let hits = index.search(&query, 5).unwrap();

    assert_eq!(hits.len(), 5);
    for hit in &hits {
        let position: usize = hit.id.trim_start_matches("img-").parse().unwrap();
        let stored = projector.apply(&embeddings[position]).unwrap();
        assert_eq!(hit.distance, squared_euclidean(&projected_query, &stored));
    }
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
}

#[test]
fn test_query_must_match_projector_input() {
    let workspace = TestWorkspace::new();
    let artifact = workspace.write_projector("pca.nsp", 6, 2, &truncation_matrix(6, 2), None);
    let mut index = VectorIndex::new(Some(&artifact)).unwrap();
    index.add(&[0.0; 6], "zero").unwrap();

    // Working-dimension vectors are not accepted as raw embeddings
    let err = index.search(&[0.0, 0.0], 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    let err = index.add(&[0.0; 7], "long").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(index.count(), 1);
}

#[test]
fn test_malformed_artifacts_are_fatal() {
    let workspace = TestWorkspace::new();
    let good = projector_bytes(4, 2, &truncation_matrix(4, 2), None);

    let cases: Vec<(&str, Vec<u8>)> = vec![
        ("empty.nsp", Vec::new()),
        ("truncated.nsp", good[..good.len() - 4].to_vec()),
        ("trailing.nsp", [good.as_slice(), &[0u8; 4][..]].concat()),
        ("magic.nsp", [b"XXXX".as_slice(), &good[4..]].concat()),
        ("widening.nsp", projector_bytes(2, 4, &[0.0; 8], None)),
        ("zero.nsp", projector_bytes(0, 0, &[], None)),
    ];

    for (name, bytes) in cases {
        let path = workspace.path().join(name);
        fs::write(&path, bytes).unwrap();
        let err = VectorIndex::new(Some(&path)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Artifact, "{name} should be rejected");
    }

    let missing = VectorIndex::new(Some(&workspace.path().join("missing.nsp"))).unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::Artifact);
}

#[test]
fn test_default_pipeline_dimensions() {
    use nearshot::vector::{DEFAULT_INPUT_DIMENSION, DEFAULT_WORKING_DIMENSION};

    let workspace = TestWorkspace::new();
    let artifact = workspace.write_projector(
        "pca.nsp",
        DEFAULT_INPUT_DIMENSION,
        DEFAULT_WORKING_DIMENSION,
        &truncation_matrix(DEFAULT_INPUT_DIMENSION, DEFAULT_WORKING_DIMENSION),
        None,
    );

    let mut index = VectorIndex::new(Some(&artifact)).unwrap();
    let embeddings = random_embeddings(12, DEFAULT_INPUT_DIMENSION, 5);
    for (i, embedding) in embeddings.iter().enumerate() {
        index.add(embedding, format!("photo-{i}")).unwrap();
    }

    assert_eq!(index.dimension().unwrap().get(), DEFAULT_WORKING_DIMENSION);
    let hits = index.search(&embeddings[3], 9).unwrap();
    assert_eq!(hits.len(), 9);
    assert_eq!(hits[0].id, "photo-3");
}
