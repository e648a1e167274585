//! Sharing one index between a writer and live readers.

use crate::common::random_embeddings;
use nearshot::{SharedVectorIndex, VectorIndex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

#[test]
fn test_readers_never_see_partial_batches() {
    let shared = SharedVectorIndex::new(VectorIndex::new(None).unwrap());
    let done = Arc::new(AtomicBool::new(false));
    let batches = random_embeddings(40 * 10, 8, 17);

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let shared = shared.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut observed = 0;
                while !done.load(Ordering::Acquire) {
                    // Counts only ever move in whole batches
                    let count = shared.with(VectorIndex::count);
                    assert_eq!(count % 10, 0);

                    if let Some(result) = shared.try_search(&[0.0; 8], 3) {
                        let hits = result.unwrap();
                        assert!(hits.len() <= 3);
                        observed += 1;
                    }
                    thread::yield_now();
                }
                observed
            })
        })
        .collect();

    for (batch_no, batch) in batches.chunks(10).enumerate() {
        shared
            .with_mut(|index| {
                index.add_batch(
                    batch
                        .iter()
                        .enumerate()
                        .map(|(i, v)| (v.as_slice(), format!("{batch_no}-{i}"))),
                )
            })
            .unwrap();
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(shared.with(VectorIndex::count), 400);
}
