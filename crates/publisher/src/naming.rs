//! Batch key derivation
//!
//! `<YYYY/MMDD>/<YYYYMMDD-HHMMSS>_[<host>_]<raw-name>.log[.gz]`
//!
//! Sinks that interpret the name as a storage path rely on these exact
//! separators.

use std::fmt::Display;

use chrono::{DateTime, TimeZone};

/// Suffix of every batch name
pub const LOG_SUFFIX: &str = ".log";
/// Extra suffix when the payload is gzipped
pub const GZIP_SUFFIX: &str = ".gz";

/// Compose the namespaced batch name for `raw_name` at `now`
pub fn compose_batch_name<Tz>(
    raw_name: &str,
    host: Option<&str>,
    compress: bool,
    now: DateTime<Tz>,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut name = format!(
        "{}/{}_",
        now.format("%Y/%m%d"),
        now.format("%Y%m%d-%H%M%S")
    );
    if let Some(host) = host {
        name.push_str(host);
        name.push('_');
    }
    name.push_str(raw_name);
    name.push_str(LOG_SUFFIX);
    if compress {
        name.push_str(GZIP_SUFFIX);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 7).unwrap()
    }

    #[test]
    fn test_name_with_host_and_gzip() {
        assert_eq!(
            compose_batch_name("3kq9x", Some("web01"), true, at()),
            "2024/0131/20240131-235907_web01_3kq9x.log.gz"
        );
    }

    #[test]
    fn test_name_without_host_plain() {
        assert_eq!(
            compose_batch_name("app", None, false, at()),
            "2024/0131/20240131-235907_app.log"
        );
    }

    #[test]
    fn test_single_digit_fields_are_padded() {
        let t = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(
            compose_batch_name("x", None, false, t),
            "2025/0304/20250304-050607_x.log"
        );
    }

    #[test]
    fn test_partition_follows_the_given_zone() {
        // 23:30 UTC on Jan 31 is already Feb 1 at +02:00.
        let utc = Utc.with_ymd_and_hms(2024, 1, 31, 23, 30, 0).unwrap();
        let east = utc.with_timezone(&FixedOffset::east_opt(2 * 3600).unwrap());
        assert_eq!(
            compose_batch_name("x", None, false, east),
            "2024/0201/20240201-013000_x.log"
        );
    }
}
