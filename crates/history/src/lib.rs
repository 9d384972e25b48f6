#![forbid(unsafe_code)]

pub mod snapshot;

pub use snapshot::SnapshotHistory;
