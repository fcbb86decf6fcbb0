//! Classifier for chat, command and killfeed lines in the BepInEx server log.
//! Parsing is best effort: lines that match no marker or do not split as
//! expected are skipped.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

const CHAT_MARKER: &str = "[Info   :Bloodstone] [Chat]";
const COMMANDS_MARKER: &str = "[Info   :KindredCommands]";
const KILLFEED_MARKERS: [&str; 2] = ["[Message:  Killfeed]", "[Warning:  Killfeed]"];
const KILLFEED_INFO_MARKER: &str = "[Info   :  Killfeed]";

const CHAT_CHANNELS: [(&str, LogCategory); 4] = [
    ("[Global]", LogCategory::Global),
    ("[Team]", LogCategory::Team),
    ("[Local]", LogCategory::Local),
    ("[Whisper]", LogCategory::Whisper),
];

const SYSTEM_SENDER: &str = "System";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogCategory {
    Global,
    Team,
    Local,
    Whisper,
    Players,
    Commands,
    Killfeed,
}

impl LogCategory {
    pub const ALL: [LogCategory; 7] = [
        LogCategory::Global,
        LogCategory::Team,
        LogCategory::Local,
        LogCategory::Whisper,
        LogCategory::Players,
        LogCategory::Commands,
        LogCategory::Killfeed,
    ];
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogLine {
    pub timestamp: String,
    pub category: LogCategory,
    pub sender: String,
    pub message: String,
}

/// Result of classifying one raw line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineOutcome {
    Record(LogLine),
    Skip,
}

/// Time of the first `[HH:MM:SS...]` token in the line.
pub fn extract_timestamp(line: &str) -> Option<&str> {
    line.match_indices('[').find_map(|(idx, _)| {
        let candidate = line.get(idx + 1..idx + 9)?;
        let bytes = candidate.as_bytes();
        let shaped = bytes.iter().enumerate().all(|(i, b)| match i {
            2 | 5 => *b == b':',
            _ => b.is_ascii_digit(),
        });
        let closed = line[idx + 9..]
            .find(']')
            .is_some_and(|end| !line[idx + 9..idx + 9 + end].contains('['));
        (shaped && closed).then_some(candidate)
    })
}

fn after<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.find(marker).map(|idx| &line[idx + marker.len()..])
}

/// Classify one line. `fallback_time` stands in when the line carries no
/// timestamp of its own.
pub fn classify_line(line: &str, fallback_time: &str) -> LineOutcome {
    let timestamp = extract_timestamp(line).unwrap_or(fallback_time).to_string();

    if let Some(rest) = after(line, CHAT_MARKER) {
        // The earliest channel marker wins; later ones are message text
        let Some((_, category, body)) = CHAT_CHANNELS
            .iter()
            .filter_map(|(marker, category)| {
                rest.find(marker)
                    .map(|idx| (idx, *category, &rest[idx + marker.len()..]))
            })
            .min_by_key(|(idx, _, _)| *idx)
        else {
            return LineOutcome::Skip;
        };
        let Some((sender, message)) = body.split_once(':') else {
            return LineOutcome::Skip;
        };
        return LineOutcome::Record(LogLine {
            timestamp,
            category,
            sender: sender.trim().to_string(),
            message: message.trim().to_string(),
        });
    }

    if let Some(rest) = after(line, COMMANDS_MARKER) {
        let category = if rest.contains("Player") {
            LogCategory::Players
        } else {
            LogCategory::Commands
        };
        return LineOutcome::Record(system_line(timestamp, category, rest));
    }

    let killfeed = KILLFEED_MARKERS
        .iter()
        .find_map(|marker| after(line, marker))
        .or_else(|| {
            after(line, KILLFEED_INFO_MARKER)
                .filter(|_| line.to_lowercase().contains("killed"))
        });
    if let Some(rest) = killfeed {
        return LineOutcome::Record(system_line(timestamp, LogCategory::Killfeed, rest));
    }

    LineOutcome::Skip
}

fn system_line(timestamp: String, category: LogCategory, rest: &str) -> LogLine {
    LogLine {
        timestamp,
        category,
        sender: SYSTEM_SENDER.to_string(),
        message: rest.trim().to_string(),
    }
}

/// Classify every line of `text`, keeping original order. Lines without a
/// timestamp get the current local time.
pub fn parse_log(text: &str) -> Vec<LogLine> {
    let now = chrono::Local::now().format("%H:%M:%S").to_string();
    parse_log_at(text, &now)
}

pub fn parse_log_at(text: &str, fallback_time: &str) -> Vec<LogLine> {
    text.lines()
        .filter_map(|line| match classify_line(line, fallback_time) {
            LineOutcome::Record(record) => Some(record),
            LineOutcome::Skip => None,
        })
        .collect()
}

/// The set of categories shown to the operator. Applying it never changes
/// the parsed lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFilter {
    enabled: BTreeSet<LogCategory>,
}

impl Default for CategoryFilter {
    fn default() -> Self {
        Self {
            enabled: LogCategory::ALL.into_iter().collect(),
        }
    }
}

impl CategoryFilter {
    pub fn only(categories: impl IntoIterator<Item = LogCategory>) -> Self {
        Self {
            enabled: categories.into_iter().collect(),
        }
    }

    pub fn set(&mut self, category: LogCategory, enabled: bool) {
        if enabled {
            self.enabled.insert(category);
        } else {
            self.enabled.remove(&category);
        }
    }

    pub fn allows(&self, category: LogCategory) -> bool {
        self.enabled.contains(&category)
    }

    pub fn apply<'a>(&self, lines: &'a [LogLine]) -> Vec<&'a LogLine> {
        lines.iter().filter(|l| self.allows(l.category)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: &str = "12:00:00";

    fn record(line: &str) -> LogLine {
        match classify_line(line, NOW) {
            LineOutcome::Record(r) => r,
            LineOutcome::Skip => panic!("line was skipped: {line}"),
        }
    }

    #[test]
    fn test_global_chat() {
        let r = record("[Info   :Bloodstone] [Chat] [Global] PlayerOne: hello world");
        assert_eq!(r.category, LogCategory::Global);
        assert_eq!(r.sender, "PlayerOne");
        assert_eq!(r.message, "hello world");
        assert_eq!(r.timestamp, NOW);
    }

    #[test]
    fn test_chat_message_keeps_later_colons() {
        let r = record("[Info   :Bloodstone] [Chat] [Whisper] Mairwyn: meet at 21:00: castle");
        assert_eq!(r.category, LogCategory::Whisper);
        assert_eq!(r.message, "meet at 21:00: castle");
    }

    #[test]
    fn test_first_channel_marker_wins() {
        let r = record("[Info   :Bloodstone] [Chat] [Team] Alucard: use [Global] chat: ok");
        assert_eq!(r.category, LogCategory::Team);
        assert_eq!(r.sender, "Alucard");
        assert_eq!(r.message, "use [Global] chat: ok");
    }

    #[test]
    fn test_chat_without_channel_or_sender_is_skipped() {
        assert_eq!(
            classify_line("[Info   :Bloodstone] [Chat] [Clan] Someone: hi", NOW),
            LineOutcome::Skip
        );
        assert_eq!(
            classify_line("[Info   :Bloodstone] [Chat] [Team] no separator here", NOW),
            LineOutcome::Skip
        );
    }

    #[test]
    fn test_kindred_commands() {
        let r = record("[Info   :KindredCommands] Player Alucard connected");
        assert_eq!(r.category, LogCategory::Players);
        assert_eq!(r.sender, "System");
        assert_eq!(r.message, "Player Alucard connected");

        let r = record("[Info   :KindredCommands] Executed .give 1 2");
        assert_eq!(r.category, LogCategory::Commands);
    }

    #[test]
    fn test_killfeed() {
        let r = record("[Message:  Killfeed] Alucard (80) defeated Dracula (91)");
        assert_eq!(r.category, LogCategory::Killfeed);
        assert_eq!(r.message, "Alucard (80) defeated Dracula (91)");

        assert!(matches!(
            classify_line("[Warning:  Killfeed] stats reset", NOW),
            LineOutcome::Record(_)
        ));
        assert!(matches!(
            classify_line("[Info   :  Killfeed] Alucard KILLED Dracula", NOW),
            LineOutcome::Record(_)
        ));
        assert_eq!(
            classify_line("[Info   :  Killfeed] Loaded 42 players", NOW),
            LineOutcome::Skip
        );
    }

    #[test]
    fn test_unmarked_line_is_skipped() {
        assert_eq!(
            classify_line("[Info   :   BepInEx] Loading [Bloodstone 0.2.1]", NOW),
            LineOutcome::Skip
        );
        assert_eq!(classify_line("", NOW), LineOutcome::Skip);
    }

    #[test]
    fn test_timestamp_extraction() {
        assert_eq!(
            extract_timestamp("[21:04:55] [Info   :Bloodstone] [Chat] [Local] A: b"),
            Some("21:04:55")
        );
        assert_eq!(
            extract_timestamp("[Info] [2024-05-01 07:08:09.123] text"),
            None
        );
        assert_eq!(extract_timestamp("[07:08:09.123] text"), Some("07:08:09"));
        assert_eq!(extract_timestamp("[7:08:09] text"), None);
        assert_eq!(extract_timestamp("no brackets 07:08:09"), None);

        let r = record("[21:04:55] [Info   :Bloodstone] [Chat] [Local] A: b");
        assert_eq!(r.timestamp, "21:04:55");
    }

    #[test]
    fn test_parse_log_keeps_order() {
        let text = "[Info   :Bloodstone] [Chat] [Global] A: one\n\
            [Info   :   BepInEx] noise\n\
            [Info   :KindredCommands] Player B joined\n\
            [Message:  Killfeed] A killed B\n";
        let lines = parse_log_at(text, NOW);
        let categories: Vec<_> = lines.iter().map(|l| l.category).collect();
        assert_eq!(
            categories,
            vec![LogCategory::Global, LogCategory::Players, LogCategory::Killfeed]
        );
    }

    #[test]
    fn test_filter_does_not_mutate() {
        let text = "[Info   :Bloodstone] [Chat] [Global] A: one\n\
            [Info   :Bloodstone] [Chat] [Team] B: two\n\
            [Message:  Killfeed] A killed B\n";
        let lines = parse_log_at(text, NOW);

        let mut filter = CategoryFilter::default();
        assert_eq!(filter.apply(&lines).len(), 3);

        filter.set(LogCategory::Team, false);
        let shown = filter.apply(&lines);
        assert_eq!(shown.len(), 2);
        assert!(shown.iter().all(|l| l.category != LogCategory::Team));

        filter.set(LogCategory::Team, true);
        assert_eq!(filter.apply(&lines).len(), 3);
        assert_eq!(lines.len(), 3);

        let only = CategoryFilter::only([LogCategory::Killfeed]);
        assert_eq!(only.apply(&lines)[0].sender, "System");
    }
}
