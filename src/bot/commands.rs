use crate::db::types::RoomTypes;

const LIST_KEYWORDS: &[&str] = &["list", "確認", "リスト"];
const HELP_KEYWORDS: &[&str] = &["help", "ヘルプ"];

/// A text message from a user, classified.
///
/// Grammar:
/// - `-<name>` unsubscribes from `<name>`
/// - `<name>` or `<name>:<type>&<type>...` subscribes, optionally filtered by room type
/// - `list` / `確認` / `リスト` lists subscriptions
/// - `help` / `ヘルプ` shows usage
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Subscribe {
        unit_name: String,
        room_types: RoomTypes,
    },
    Unsubscribe {
        unit_name: String,
    },
    List,
    Help,
    Unrecognized,
}

impl Command {
    pub fn parse(text: &str) -> Self {
        let text = normalize_separators(text.trim());
        let text = text.trim();

        if text.is_empty() || text.contains('\n') {
            return Command::Unrecognized;
        }

        let lowered = text.to_lowercase();
        if LIST_KEYWORDS.contains(&lowered.as_str()) {
            return Command::List;
        }
        if HELP_KEYWORDS.contains(&lowered.as_str()) {
            return Command::Help;
        }

        if let Some(rest) = text.strip_prefix('-') {
            let unit_name = rest.trim();
            if unit_name.is_empty() {
                return Command::Unrecognized;
            }
            return Command::Unsubscribe {
                unit_name: unit_name.to_string(),
            };
        }

        let (unit_name, room_types) = match text.split_once(':') {
            Some((name, types)) => (name.trim(), RoomTypes::parse(types)),
            None => (text, RoomTypes::default()),
        };

        if unit_name.is_empty() {
            return Command::Unrecognized;
        }

        Command::Subscribe {
            unit_name: unit_name.to_string(),
            room_types,
        }
    }
}

/// Full-width separators typed from a Japanese IME
fn normalize_separators(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '－' => '-',
            '：' => ':',
            '＆' => '&',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscribe(name: &str, types: &[&str]) -> Command {
        Command::Subscribe {
            unit_name: name.to_string(),
            room_types: RoomTypes::normalized(types.iter().copied()),
        }
    }

    #[test]
    fn test_plain_name_subscribes() {
        assert_eq!(Command::parse("  代々木ビュー "), subscribe("代々木ビュー", &[]));
    }

    #[test]
    fn test_subscribe_with_room_types() {
        assert_eq!(
            Command::parse("代々木ビュー:2LDK&3LDK"),
            subscribe("代々木ビュー", &["2LDK", "3LDK"])
        );
        assert_eq!(
            Command::parse("代々木ビュー ： 2ldk ＆ 3LDK"),
            subscribe("代々木ビュー", &["2LDK", "3LDK"])
        );
    }

    #[test]
    fn test_colon_without_types_watches_all() {
        assert_eq!(Command::parse("代々木ビュー:"), subscribe("代々木ビュー", &[]));
    }

    #[test]
    fn test_unsubscribe() {
        assert_eq!(
            Command::parse("-代々木ビュー"),
            Command::Unsubscribe {
                unit_name: "代々木ビュー".to_string()
            }
        );
        assert_eq!(
            Command::parse("－ 代々木ビュー"),
            Command::Unsubscribe {
                unit_name: "代々木ビュー".to_string()
            }
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(Command::parse("list"), Command::List);
        assert_eq!(Command::parse("LIST"), Command::List);
        assert_eq!(Command::parse("確認"), Command::List);
        assert_eq!(Command::parse("リスト"), Command::List);
        assert_eq!(Command::parse("Help"), Command::Help);
        assert_eq!(Command::parse("ヘルプ"), Command::Help);
    }

    #[test]
    fn test_keyword_must_match_exactly() {
        assert_eq!(Command::parse("listing"), subscribe("listing", &[]));
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(Command::parse(""), Command::Unrecognized);
        assert_eq!(Command::parse("   "), Command::Unrecognized);
        assert_eq!(Command::parse("-"), Command::Unrecognized);
        assert_eq!(Command::parse(":2LDK"), Command::Unrecognized);
        assert_eq!(Command::parse("a\nb"), Command::Unrecognized);
    }
}
