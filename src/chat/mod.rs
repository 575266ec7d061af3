//! Chat-style command parsing.
//!
//! Messages may select a strategy with a leading command: `/quick`,
//! `/research`, or `/deep`. Anything else is a plain question answered with
//! the configured default strategy.

use crate::domain::Strategy;

/// Split a raw message into (question, strategy). Commands are matched
/// case-insensitively; the question's internal whitespace is collapsed.
/// Unknown commands are treated as plain text.
pub fn parse_query_command(text: &str, default_strategy: Strategy) -> (String, Strategy) {
    let text = text.trim();

    if text.is_empty() {
        return (String::new(), default_strategy);
    }

    if !text.starts_with('/') {
        return (text.to_string(), default_strategy);
    }

    let (command, rest) = match text.split_once(' ') {
        Some((command, rest)) => (command.to_lowercase(), normalize_spaces(rest)),
        None => (text.to_lowercase(), String::new()),
    };

    match command.as_str() {
        "/quick" => (rest, Strategy::quick()),
        "/research" => (rest, Strategy::standard()),
        "/deep" => (rest, Strategy::deep()),
        _ => (text.to_string(), default_strategy),
    }
}

fn normalize_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StrategyKind;

    #[test]
    fn test_plain_text_uses_default() {
        let (question, strategy) = parse_query_command("what is psd2", Strategy::standard());
        assert_eq!(question, "what is psd2");
        assert_eq!(strategy.kind, StrategyKind::Standard);
    }

    #[test]
    fn test_quick_command() {
        let (question, strategy) = parse_query_command("/quick what is psd2", Strategy::standard());
        assert_eq!(question, "what is psd2");
        assert_eq!(strategy.kind, StrategyKind::Quick);
    }

    #[test]
    fn test_research_command() {
        let (question, strategy) = parse_query_command("/research topic", Strategy::quick());
        assert_eq!(question, "topic");
        assert_eq!(strategy.kind, StrategyKind::Standard);
    }

    #[test]
    fn test_deep_command() {
        let (question, strategy) = parse_query_command("/deep topic", Strategy::standard());
        assert_eq!(question, "topic");
        assert_eq!(strategy.kind, StrategyKind::Deep);
    }

    #[test]
    fn test_commands_are_case_insensitive() {
        let (question, strategy) = parse_query_command("/DEEP Topic Here", Strategy::standard());
        assert_eq!(question, "Topic Here");
        assert_eq!(strategy.kind, StrategyKind::Deep);
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        let (question, _) = parse_query_command("/quick   spaced    out   words ", Strategy::standard());
        assert_eq!(question, "spaced out words");
    }

    #[test]
    fn test_unknown_command_is_plain_text() {
        let (question, strategy) = parse_query_command("/help", Strategy::standard());
        assert_eq!(question, "/help");
        assert_eq!(strategy.kind, StrategyKind::Standard);
    }

    #[test]
    fn test_bare_command_yields_empty_question() {
        let (question, strategy) = parse_query_command("/quick", Strategy::standard());
        assert!(question.is_empty());
        assert_eq!(strategy.kind, StrategyKind::Quick);
    }

    #[test]
    fn test_empty_message() {
        let (question, strategy) = parse_query_command("   ", Strategy::deep());
        assert!(question.is_empty());
        assert_eq!(strategy.kind, StrategyKind::Deep);
    }
}
