//! Save/load behavior across index instances and processes.

use crate::common::{TestWorkspace, abc_index, random_embeddings, truncation_matrix};
use nearshot::{ErrorKind, VectorIndex};
use std::fs;

#[test]
fn test_reload_in_fresh_index_answers_identically() {
    let workspace = TestWorkspace::new();
    let path = workspace.index_path();

    let original = abc_index();
    original.save(&path).unwrap();

    let mut reloaded = VectorIndex::new(None).unwrap();
    reloaded.load(&path).unwrap();

    assert_eq!(reloaded.entries(), original.entries());
    for query in [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.3, 0.3, 0.3]] {
        assert_eq!(
            reloaded.search(&query, 3).unwrap(),
            original.search(&query, 3).unwrap()
        );
    }
}

#[test]
fn test_file_layout() {
    let workspace = TestWorkspace::new();
    let path = workspace.index_path();
    abc_index().save(&path).unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[0..4], b"NSIX");
    assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 1);
    assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 3);
    assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 3);
    // Each entry: 4-byte id length, 1-byte id, three f32 values
    assert_eq!(bytes.len(), 16 + 3 * (4 + 1 + 12));
}

#[test]
fn test_save_overwrites_and_empty_save_round_trips() {
    let workspace = TestWorkspace::new();
    let path = workspace.index_path();

    let mut index = abc_index();
    index.save(&path).unwrap();
    index.clear();
    index.save(&path).unwrap();

    let mut reloaded = abc_index();
    reloaded.load(&path).unwrap();
    assert!(reloaded.is_empty());
    assert!(reloaded.dimension().is_none());

    // The emptied store takes whatever dimension comes first
    reloaded.add(&[1.0, 2.0], "two-d").unwrap();
    assert_eq!(reloaded.dimension().unwrap().get(), 2);
}

#[test]
fn test_failed_save_keeps_previous_file() {
    let workspace = TestWorkspace::new();
    let path = workspace.index_path();
    abc_index().save(&path).unwrap();
    let before = fs::read(&path).unwrap();

    // A directory in place of the target makes the final rename fail
    let blocked = workspace.path().join("blocked.nsx");
    fs::create_dir(&blocked).unwrap();
    fs::write(blocked.join("keep"), b"x").unwrap();
    let err = abc_index().save(&blocked).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);

    assert_eq!(fs::read(&path).unwrap(), before);
    let leftovers: Vec<_> = fs::read_dir(workspace.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_truncated_file_is_rejected_and_state_kept() {
    let workspace = TestWorkspace::new();
    let path = workspace.index_path();
    abc_index().save(&path).unwrap();

    let bytes = fs::read(&path).unwrap();
    let truncated = workspace.path().join("truncated.nsx");
    fs::write(&truncated, &bytes[..bytes.len() - 2]).unwrap();

    let mut index = abc_index();
    index.add(&[0.0, 0.0, 1.0], "d").unwrap();
    let err = index.load(&truncated).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert_eq!(index.count(), 4);

    let mut trailing = bytes.clone();
    trailing.push(0);
    fs::write(&truncated, &trailing).unwrap();
    assert_eq!(index.load(&truncated).unwrap_err().kind(), ErrorKind::Format);
}

#[test]
fn test_projected_store_persists_working_vectors() {
    let workspace = TestWorkspace::new();
    let artifact = workspace.write_projector("pca.nsp", 8, 3, &truncation_matrix(8, 3), None);
    let path = workspace.index_path();

    let embeddings = random_embeddings(20, 8, 7);
    let mut index = VectorIndex::new(Some(&artifact)).unwrap();
    for (i, embedding) in embeddings.iter().enumerate() {
        index.add(embedding, format!("img-{i}")).unwrap();
    }
    index.save(&path).unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 3);

    let mut reloaded = VectorIndex::new(Some(&artifact)).unwrap();
    reloaded.load(&path).unwrap();
    assert_eq!(reloaded.count(), 20);
    let hits = reloaded.search(&embeddings[11], 1).unwrap();
    assert_eq!(hits[0].id, "img-11");
    assert_eq!(hits[0].distance, 0.0);

    // An unprojected index pinned to the raw size cannot read it
    let mut raw = VectorIndex::with_options(nearshot::IndexOptions {
        dimension: Some(8),
        ..nearshot::IndexOptions::default()
    })
    .unwrap();
    assert_eq!(raw.load(&path).unwrap_err().kind(), ErrorKind::Format);
}

#[test]
fn test_load_or_empty_first_run() {
    let workspace = TestWorkspace::new();
    let mut index = VectorIndex::new(None).unwrap();

    assert!(!index.load_or_empty(workspace.index_path()).unwrap());
    assert!(index.is_empty());

    fs::write(workspace.index_path(), b"NSIX").unwrap();
    assert_eq!(
        index.load_or_empty(workspace.index_path()).unwrap_err().kind(),
        ErrorKind::Format
    );
}
