//! Catalog-local timestamps.

use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Europe/Istanbul has been fixed at UTC+03:00 without DST since 2016.
const ISTANBUL_OFFSET_SECS: i32 = 3 * 3600;

/// Format an instant as Istanbul civil time, `DD.MM.YYYY, HH.MM`.
pub fn format_istanbul(instant: DateTime<Utc>) -> String {
    let offset = FixedOffset::east_opt(ISTANBUL_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    instant
        .with_timezone(&offset)
        .format("%d.%m.%Y, %H.%M")
        .to_string()
}
