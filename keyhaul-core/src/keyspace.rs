//! Parsing of the `# Keyspace` section of `INFO`.
//!
//! Lines look like `db0:keys=1201,expires=0,avg_ttl=0`. Only the `keys` field
//! of the requested database is used.

use std::sync::LazyLock;

use regex::Regex;

static KEYSPACE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^db(\d+):keys=(\d+)").expect("keyspace regex is valid")
});

/// Key count reported for `db`, or `None` when the section has no line for
/// it or the count does not parse.
pub fn parse_keyspace_size(info: &str, db: u32) -> Option<u64> {
    KEYSPACE_LINE
        .captures_iter(info)
        .find(|caps| caps[1].parse::<u32>().ok() == Some(db))
        .and_then(|caps| caps[2].parse::<u64>().ok())
}
