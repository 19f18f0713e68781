//! Classification of worker output lines into leveled, attributed events.
//!
//! The worker's structured lines look like
//! `DBG 12:00:00 trackd::sync > synced to height 100`; anything else is
//! attributed to the worker itself. Pure function, independent of I/O, so
//! it is testable without spawning a process.

use crate::types::{LogEvent, LogLevel, WORKER_NAME};

/// Classify one pre-trimmed, non-blank line of worker output.
///
/// Rules, tried in order:
/// 1. structured line (`::` module marker plus a `>` separator): level
///    token, discarded timestamp, then `source > message`;
/// 2. `error: ` prefix (case-insensitive): ERROR attributed to the worker;
/// 3. anything else: INFO attributed to the worker.
///
/// Never fails on content; malformed structured lines fall through.
pub fn classify(line: &str) -> LogEvent {
    if line.contains("::") && line.contains('>') {
        if let Some(event) = split_structured(line) {
            return event;
        }
    }

    if line.to_ascii_lowercase().starts_with("error: ") {
        return LogEvent {
            level: LogLevel::Error,
            source: WORKER_NAME.to_owned(),
            message: line["error: ".len()..].to_owned(),
        };
    }

    LogEvent {
        level: LogLevel::Info,
        source: WORKER_NAME.to_owned(),
        message: line.to_owned(),
    }
}

fn split_structured(line: &str) -> Option<LogEvent> {
    let (level, rest) = line.split_once(' ')?;
    // Second token is the timestamp; only the level survives.
    let (_timestamp, rest) = rest.trim_start().split_once(' ')?;
    let (source, message) = rest.split_once('>')?;
    Some(LogEvent {
        level: LogLevel::parse(level).unwrap_or(LogLevel::Info),
        source: source.trim().to_owned(),
        message: message.trim().to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn structured_line_splits_level_source_message() {
        let event = classify("DBG 12:00:00 electrs_like::sync > synced to height 100");
        assert_eq!(event.level, LogLevel::Debug);
        assert_eq!(event.source, "electrs_like::sync");
        assert_eq!(event.message, "synced to height 100");
    }

    #[rstest]
    #[case("INFO 09:15:01 trackd::electrum > serving", LogLevel::Info)]
    #[case("WARN 09:15:01 trackd::bitcoind > slow response", LogLevel::Warn)]
    #[case("ERRO 09:15:01 trackd::bitcoind > connection lost", LogLevel::Error)]
    fn structured_levels(#[case] line: &str, #[case] expected: LogLevel) {
        assert_eq!(classify(line).level, expected);
    }

    #[test]
    fn unknown_level_token_falls_back_to_info() {
        let event = classify("WEIRD 09:15:01 trackd::sync > hmm");
        assert_eq!(event.level, LogLevel::Info);
        assert_eq!(event.source, "trackd::sync");
    }

    #[test]
    fn error_prefix_is_case_insensitive() {
        let event = classify("Error: failed to connect");
        assert_eq!(event.level, LogLevel::Error);
        assert_eq!(event.source, "trackd");
        assert_eq!(event.message, "failed to connect");
    }

    #[test]
    fn plain_line_is_info_from_worker() {
        let event = classify("waiting for bitcoind to warm up");
        assert_eq!(event.level, LogLevel::Info);
        assert_eq!(event.source, "trackd");
        assert_eq!(event.message, "waiting for bitcoind to warm up");
    }

    #[test]
    fn markers_without_structured_shape_fall_through() {
        // Contains :: and > but no room for level + timestamp tokens.
        let event = classify("a::b>c");
        assert_eq!(event.level, LogLevel::Info);
        assert_eq!(event.source, "trackd");
        assert_eq!(event.message, "a::b>c");
    }

    #[test]
    fn message_may_contain_further_separators() {
        let event = classify("INFO 09:15:01 trackd::electrum > height 10 -> 20");
        assert_eq!(event.message, "height 10 -> 20");
    }
}
