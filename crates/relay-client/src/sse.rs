use relay_types::Message;

/// Decode one line of the `/stream` feed.
///
/// Blank lines, comments and `event:` lines yield `Ok(None)`; a `data:` line
/// yields the message it carries.
pub fn parse_sse_line(line: &str) -> Result<Option<Message>, serde_json::Error> {
    let line = line.trim();

    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };

    serde_json::from_str(data.trim()).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_blank_comment_and_event_lines() {
        assert!(parse_sse_line("").unwrap().is_none());
        assert!(parse_sse_line("\n").unwrap().is_none());
        assert!(parse_sse_line(": connected").unwrap().is_none());
        assert!(parse_sse_line("event: message").unwrap().is_none());
        assert!(parse_sse_line("id: 4").unwrap().is_none());
    }

    #[test]
    fn decodes_data_lines() {
        let line = r#"data: {"id":3,"ts":"2024-01-02T03:04:05Z","from":"alice","body":"hi @bob","mentions":["bob"]}"#;
        let msg = parse_sse_line(line).unwrap().unwrap();
        assert_eq!(msg.id, 3);
        assert_eq!(msg.sender, "alice");
        assert_eq!(msg.mentions, vec!["bob"]);
    }

    #[test]
    fn data_without_space_is_accepted() {
        let line = r#"data:{"id":1,"ts":"2024-01-02T03:04:05Z","from":"a","body":"b"}"#;
        assert_eq!(parse_sse_line(line).unwrap().unwrap().id, 1);
    }

    #[test]
    fn malformed_data_is_an_error() {
        assert!(parse_sse_line("data: {oops").is_err());
    }
}
