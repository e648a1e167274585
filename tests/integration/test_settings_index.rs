//! Building indexes from layered settings files.

use crate::common::{TestWorkspace, truncation_matrix};
use nearshot::{ErrorKind, IndexOptions, SearcherKind, Settings, VectorIndex};
use std::fs;

fn write_settings(workspace: &TestWorkspace, body: &str) -> std::path::PathBuf {
    let config_dir = workspace.path().join(".nearshot");
    fs::create_dir_all(&config_dir).unwrap();
    let path = config_dir.join("settings.toml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_relative_paths_resolve_against_workspace() {
    let workspace = TestWorkspace::new();
    fs::create_dir_all(workspace.path().join("models")).unwrap();
    let artifact = workspace.path().join("models").join("pca.nsp");
    fs::write(
        &artifact,
        crate::common::projector_bytes(6, 3, &truncation_matrix(6, 3), None),
    )
    .unwrap();

    let config = write_settings(
        &workspace,
        r#"
index_path = "data/photos.nsx"
projector_path = "models/pca.nsp"

[searcher]
kind = "ivf"
nlist = 2
nprobe = 2
"#,
    );

    let settings = Settings::load_from(&config).unwrap();
    assert_eq!(settings.index_file(), workspace.path().join("data/photos.nsx"));

    let mut index = VectorIndex::with_options(IndexOptions::from(&settings)).unwrap();
    assert_eq!(index.searcher_name(), "ivf");
    assert_eq!(index.input_dimension().unwrap().get(), 6);
    assert_eq!(index.dimension().unwrap().get(), 3);

    index.add(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], "one").unwrap();
    index.save(settings.index_file()).unwrap();
    assert!(workspace.path().join("data/photos.nsx").exists());
}

#[test]
fn test_dimension_disagreeing_with_projector_is_config_error() {
    let workspace = TestWorkspace::new();
    let artifact = workspace.write_projector("pca.nsp", 6, 3, &truncation_matrix(6, 3), None);

    let options = IndexOptions {
        projector_path: Some(artifact.clone()),
        dimension: Some(5),
        ..IndexOptions::default()
    };
    let err = VectorIndex::with_options(options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);

    let options = IndexOptions {
        projector_path: Some(artifact),
        dimension: Some(6),
        ..IndexOptions::default()
    };
    assert!(VectorIndex::with_options(options).is_ok());
}

#[test]
fn test_zero_dimension_is_config_error() {
    let options = IndexOptions {
        dimension: Some(0),
        ..IndexOptions::default()
    };
    let err = VectorIndex::with_options(options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn test_defaults_without_file() {
    let workspace = TestWorkspace::new();
    let settings = Settings::load_from(workspace.path().join("absent.toml")).unwrap();

    assert_eq!(settings.search.default_k, 9);
    assert_eq!(settings.searcher.kind, SearcherKind::Exact);

    let index = VectorIndex::with_options(IndexOptions::from(&settings)).unwrap();
    assert_eq!(index.searcher_name(), "exact");
    assert!(index.dimension().is_none());
}
