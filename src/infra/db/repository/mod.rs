//! Repository implementations for data access in clonewatch.
//!
//! One repository struct per table, each constructed with the shared
//! connection. Natural-key upserts make repeated inserts idempotent.

mod clone;
mod project;
mod pull;
mod repo;
mod snapshot;
mod user;

pub use clone::CloneRepository;
pub use project::ProjectRepository;
pub use pull::PullRepository;
pub use repo::RepoRepository;
pub use snapshot::SnapshotRepository;
pub use user::UserRepository;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use rusqlite::types::Type;
use std::sync::{Arc, Mutex};

pub(super) type DbConn = Arc<Mutex<Connection>>;

/// Timestamps are stored as fixed-width UTC RFC 3339 text so that
/// lexicographic comparison in SQL matches chronological order.
pub(crate) fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn decode_ts(idx: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod ts_tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn encoded_timestamps_order_lexicographically() {
        let earlier = Utc.with_ymd_and_hms(2020, 5, 2, 11, 30, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2020, 5, 2, 11, 30, 1).unwrap();
        assert!(encode_ts(&earlier) < encode_ts(&later));
    }

    #[test]
    fn round_trips() {
        let ts = Utc.with_ymd_and_hms(2021, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(decode_ts(0, &encode_ts(&ts)).unwrap(), ts);
    }
}
