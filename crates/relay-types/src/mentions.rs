//! `@name` extraction from message bodies.

use std::sync::LazyLock;

use regex::Regex;

/// `@` must open the body or follow a non-alphanumeric character, which
/// keeps email addresses like `test@example.com` from matching.
static MENTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^a-zA-Z0-9])@([a-zA-Z][a-zA-Z0-9_-]*)").expect("mention pattern is valid")
});

/// Mentions found in one message body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mentions {
    /// Lowercased specific names in first-occurrence order, without `all`/`here`.
    pub names: Vec<String>,
    pub all: bool,
    pub here: bool,
}

impl Mentions {
    /// True when `name` is addressed directly or through `@all`/`@here`.
    pub fn contains(&self, name: &str) -> bool {
        if self.all || self.here {
            return true;
        }
        let name = name.to_lowercase();
        self.names.iter().any(|n| *n == name)
    }

    /// Token list persisted alongside the body: names, then `all`, then `here`.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = self.names.clone();
        if self.all {
            tokens.push("all".to_string());
        }
        if self.here {
            tokens.push("here".to_string());
        }
        tokens
    }
}

pub fn parse_mentions(body: &str) -> Mentions {
    let mut result = Mentions::default();

    for caps in MENTION_PATTERN.captures_iter(body) {
        let Some(m) = caps.get(1) else { continue };
        let name = m.as_str().to_lowercase();

        match name.as_str() {
            "all" => result.all = true,
            "here" => result.here = true,
            _ => {
                if !result.names.contains(&name) {
                    result.names.push(name);
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_mention() {
        let m = parse_mentions("hey @alice can you look");
        assert_eq!(m.names, vec!["alice"]);
        assert!(!m.all);
        assert!(!m.here);
    }

    #[test]
    fn mention_at_start_of_body() {
        assert_eq!(parse_mentions("@bob ping").names, vec!["bob"]);
    }

    #[test]
    fn names_with_digits_dashes_and_underscores() {
        let m = parse_mentions("@agent-one and @agent_two and @bot3");
        assert_eq!(m.names, vec!["agent-one", "agent_two", "bot3"]);
    }

    #[test]
    fn email_address_is_not_a_mention() {
        let m = parse_mentions("contact me at test@example.com");
        assert!(m.names.is_empty());
        assert!(!m.all);
        assert!(!m.here);
    }

    #[test]
    fn broadcast_mentions_set_flags_only() {
        let m = parse_mentions("@all @here wake up");
        assert!(m.all);
        assert!(m.here);
        assert!(m.names.is_empty());
    }

    #[test]
    fn names_are_lowercased_and_deduplicated() {
        let m = parse_mentions("@Bob @alice @BOB @bob");
        assert_eq!(m.names, vec!["bob", "alice"]);
    }

    #[test]
    fn mention_must_start_with_letter() {
        assert!(parse_mentions("costs @5 each").names.is_empty());
    }

    #[test]
    fn punctuation_before_mention_is_allowed() {
        let m = parse_mentions("(@carol),@dave");
        assert_eq!(m.names, vec!["carol", "dave"]);
    }

    #[test]
    fn adjacent_mentions_need_a_separator() {
        // The second `@` follows `a`, so it reads like an email.
        assert_eq!(parse_mentions("@a@b").names, vec!["a"]);
    }

    #[test]
    fn contains_is_case_insensitive() {
        let m = parse_mentions("ping @agent-one");
        assert!(m.contains("AGENT-ONE"));
        assert!(m.contains("agent-one"));
        assert!(!m.contains("agent-two"));
    }

    #[test]
    fn broadcast_contains_everyone() {
        assert!(parse_mentions("@all hi").contains("anyone"));
        assert!(parse_mentions("@here hi").contains("anyone"));
    }

    #[test]
    fn tokens_append_broadcast_markers() {
        let m = parse_mentions("@here @bob @all");
        assert_eq!(m.tokens(), vec!["bob", "all", "here"]);
        assert!(parse_mentions("no mentions").tokens().is_empty());
    }

    #[test]
    fn parsing_is_deterministic() {
        let body = "@x @Y @all";
        assert_eq!(parse_mentions(body), parse_mentions(body));
    }
}
