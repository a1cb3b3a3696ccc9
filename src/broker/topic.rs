//! Topic model
//!
//! Topics are segment sequences joined by `::`. The first segment is the
//! permission scope. Subscription patterns are either the bare wildcard `#`,
//! a prefix followed by `::#`, or an exact topic.
//!
//! Everything here is pure; the hub and the listener registry call into it
//! from their match loops.

pub const DELIMITER: &str = "::";
pub const WILDCARD: &str = "#";

/// Return the permission scope of `topic`: the text before the first
/// delimiter, the whole topic when there is none, and `""` for `""`.
pub fn scope_of(topic: &str) -> &str {
    match topic.split_once(DELIMITER) {
        Some((scope, _)) => scope,
        None => topic,
    }
}

/// Check whether a subscription pattern accepts a message topic.
///
/// A trailing `::#` accepts any topic whose leading segments equal the
/// pattern's prefix segments, including the prefix itself. Without the
/// wildcard the topic must be segment-for-segment identical.
pub fn matches(pattern: &str, topic: &str) -> bool {
    if pattern == WILDCARD {
        return true;
    }

    match pattern
        .strip_suffix(WILDCARD)
        .and_then(|p| p.strip_suffix(DELIMITER))
    {
        Some(prefix) => {
            let mut topic_segments = topic.split(DELIMITER);
            prefix
                .split(DELIMITER)
                .all(|segment| topic_segments.next() == Some(segment))
        }
        None => pattern == topic,
    }
}

/// Iterate the segments of a topic.
pub fn segments(topic: &str) -> impl Iterator<Item = &str> {
    topic.split(DELIMITER)
}
