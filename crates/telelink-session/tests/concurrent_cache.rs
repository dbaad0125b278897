//! Readers polling `get_all()` while one writer upserts never see a torn sample.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::SystemTime;

use telelink_schema::SemanticSample;
use telelink_session::LatestValueCache;

const FIELDS: [&str; 7] = [
    "motor_temp",
    "pwrstg_temp",
    "board1_temp",
    "board2_temp",
    "dc_bus_voltage",
    "dc_bus_power",
    "motor_rpm",
];

/// Every field carries the same value, so a mix of two writes is visible
/// as unequal fields.
fn uniform(key: &str, generation: u32) -> SemanticSample {
    let value = generation as f32;
    SemanticSample {
        channel_key: key.to_string(),
        channel_name: Some("POWERTRAIN"),
        fields: FIELDS.iter().map(|name| (*name, value)).collect::<BTreeMap<_, _>>(),
        sequence: Some((generation % u32::from(u16::MAX)) as u16),
        derived_at: SystemTime::now(),
    }
}

fn assert_whole(sample: &SemanticSample) {
    assert_eq!(sample.fields.len(), FIELDS.len(), "sample missing fields");
    let first = sample.fields.values().next().copied();
    assert!(
        sample.fields.values().all(|v| Some(*v) == first),
        "torn sample: {:?}",
        sample.fields
    );
    let expected_seq = first.map(|v| (v as u32 % u32::from(u16::MAX)) as u16);
    assert_eq!(sample.sequence, expected_seq, "sequence from a different write");
}

#[test]
fn readers_never_observe_partial_writes() {
    const READERS: usize = 4;
    const WRITES: u32 = 5_000;
    let keys = ["0x620", "0x640", "0x650"];

    let cache = Arc::new(LatestValueCache::new());
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut snapshots = 0u64;
                let mut last_version = 0u64;
                while !done.load(Ordering::Acquire) {
                    let snapshot = cache.get_all();
                    assert!(snapshot.version >= last_version, "version went backwards");
                    last_version = snapshot.version;
                    for sample in snapshot.samples.values() {
                        assert_whole(sample);
                    }
                    if let Some(sample) = cache.get("0x620") {
                        assert_whole(&sample);
                    }
                    snapshots += 1;
                }
                snapshots
            })
        })
        .collect();

    for generation in 1..=WRITES {
        let key = keys[generation as usize % keys.len()];
        cache
            .upsert(key, uniform(key, generation))
            .expect("upsert should succeed");
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        let snapshots = reader.join().expect("reader should not panic");
        assert!(snapshots > 0);
    }

    assert_eq!(cache.version(), u64::from(WRITES));
    let snapshot = cache.get_all();
    assert_eq!(snapshot.samples.len(), keys.len());
    let last = snapshot.get(keys[WRITES as usize % keys.len()]).expect("key should be cached");
    assert_eq!(last.get("motor_rpm"), Some(WRITES as f32));
}

#[test]
fn repeated_upsert_matches_single_upsert() {
    let cache = LatestValueCache::new();
    let sample = uniform("0x640", 3);

    cache.upsert("0x640", sample.clone()).expect("upsert should succeed");
    let once = cache.get("0x640");
    cache.upsert("0x640", sample.clone()).expect("upsert should succeed");

    assert_eq!(cache.get("0x640"), once);
    assert_eq!(cache.get("0x640"), Some(sample));
}

#[tokio::test]
async fn subscribers_wake_on_writes() {
    let cache = Arc::new(LatestValueCache::new());
    let mut rx = cache.subscribe();

    let writer = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            cache
                .upsert("0x650", uniform("0x650", 1))
                .expect("upsert should succeed");
        })
    };

    rx.changed().await.expect("cache should still be alive");
    assert!(*rx.borrow() >= 1);
    writer.join().expect("writer should not panic");
    assert!(cache.get("0x650").is_some());
}
