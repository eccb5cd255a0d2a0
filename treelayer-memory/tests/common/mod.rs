#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};

use chrono::{DateTime, TimeZone, Utc};

use treelayer_core::backend::StorageDriverBuilder;
use treelayer_memory::{Clock, InMemoryStorage};

/// A clock that advances one second on every reading, starting at `start_millis`.
pub fn stepping_clock(start_millis: i64) -> Clock {
    let ticks = Arc::new(AtomicI64::new(0));
    Clock::new(move || {
        let tick = ticks.fetch_add(1, Ordering::SeqCst);
        at(start_millis + tick * 1_000)
    })
}

pub fn at(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

pub async fn storage_with_stepping_clock() -> InMemoryStorage {
    InMemoryStorage::builder()
        .with_clock(stepping_clock(1_000_000))
        .build()
        .await
        .unwrap()
}

pub fn ids(records: &[treelayer_core::record::Record]) -> Vec<&str> {
    records.iter().map(|record| record.id.as_str()).collect()
}
