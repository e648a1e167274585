//! IVF searcher against exact search on the same data.

use crate::common::{clustered_embeddings, index_with, random_embeddings};
use nearshot::vector::MIN_POINTS_PER_LIST;
use nearshot::{SearcherConfig, SearcherKind};
use std::collections::HashSet;

fn ivf(nlist: usize, nprobe: usize) -> SearcherConfig {
    SearcherConfig {
        kind: SearcherKind::Ivf,
        nlist,
        nprobe,
    }
}

#[test]
fn test_probing_every_list_matches_exact() {
    let embeddings = random_embeddings(200, 12, 3);
    let mut exact = index_with(SearcherConfig::default());
    let mut ivf_index = index_with(ivf(8, 8));
    for (i, embedding) in embeddings.iter().enumerate() {
        exact.add(embedding, format!("v{i}")).unwrap();
        ivf_index.add(embedding, format!("v{i}")).unwrap();
    }

    for query in random_embeddings(10, 12, 4) {
        assert_eq!(
            ivf_index.search(&query, 7).unwrap(),
            exact.search(&query, 7).unwrap()
        );
    }
}

#[test]
fn test_clustered_recall() {
    let embeddings = clustered_embeddings(8, 40, 16, 11);
    let mut exact = index_with(SearcherConfig::default());
    let mut ivf_index = index_with(ivf(8, 2));
    for (i, embedding) in embeddings.iter().enumerate() {
        exact.add(embedding, format!("v{i}")).unwrap();
        ivf_index.add(embedding, format!("v{i}")).unwrap();
    }

    let mut found = 0;
    let mut wanted = 0;
    for query in embeddings.iter().step_by(17) {
        let truth: HashSet<String> = exact
            .search(query, 10)
            .unwrap()
            .into_iter()
            .map(|hit| hit.id)
            .collect();
        let approx = ivf_index.search(query, 10).unwrap();

        wanted += truth.len();
        found += approx.iter().filter(|hit| truth.contains(&hit.id)).count();
    }

    // Tight, well separated clusters keep neighbors in the probed lists
    assert!(found * 10 >= wanted * 9, "recall {found}/{wanted}");
}

#[test]
fn test_small_store_scans_everything() {
    let nlist = 16;
    let embeddings = random_embeddings(nlist * MIN_POINTS_PER_LIST - 1, 4, 8);
    let mut exact = index_with(SearcherConfig::default());
    let mut ivf_index = index_with(ivf(nlist, 1));
    for (i, embedding) in embeddings.iter().enumerate() {
        exact.add(embedding, format!("v{i}")).unwrap();
        ivf_index.add(embedding, format!("v{i}")).unwrap();
    }

    // Below the training threshold a single probe still sees every entry
    let query = [0.1, 0.2, 0.3, 0.4];
    assert_eq!(
        ivf_index.search(&query, 20).unwrap(),
        exact.search(&query, 20).unwrap()
    );
}

#[test]
fn test_clear_resets_training() {
    let embeddings = random_embeddings(100, 5, 21);
    let mut index = index_with(ivf(4, 1));
    for (i, embedding) in embeddings.iter().enumerate() {
        index.add(embedding, format!("v{i}")).unwrap();
    }

    index.clear();
    index.add(&[1.0, 1.0], "a").unwrap();
    index.add(&[5.0, 5.0], "b").unwrap();

    let hits = index.search(&[4.0, 4.0], 2).unwrap();
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);
}

#[test]
fn test_single_probe_still_returns_k_hits() {
    let embeddings = clustered_embeddings(8, 25, 2, 19);
    let mut exact = index_with(SearcherConfig::default());
    let mut ivf_index = index_with(ivf(8, 1));
    for (i, embedding) in embeddings.iter().enumerate() {
        exact.add(embedding, format!("v{i}")).unwrap();
        ivf_index.add(embedding, format!("v{i}")).unwrap();
    }
    assert_eq!(ivf_index.searcher_name(), "ivf");

    // Most of these k exceed what a single list holds
    for k in [30, 100, 199, 200, 500] {
        let hits = ivf_index.search(&[0.0, 0.0], k).unwrap();
        assert_eq!(hits.len(), k.min(ivf_index.count()), "k = {k}");
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    // Every list probed gives the exact ranking
    assert_eq!(
        ivf_index.search(&[0.0, 0.0], 200).unwrap(),
        exact.search(&[0.0, 0.0], 200).unwrap()
    );
}
