use std::io::{self, Write};

use chrono::SecondsFormat;
use relay_types::Message;

/// `<from>: <body>` per message.
pub fn write_messages(w: &mut impl Write, messages: &[Message]) -> io::Result<()> {
    for msg in messages {
        write_message(w, msg)?;
    }
    Ok(())
}

pub fn write_message(w: &mut impl Write, msg: &Message) -> io::Result<()> {
    writeln!(w, "{}: {}", msg.sender, msg.body)
}

/// `[<ts>] <from>: <body>` per message.
pub fn write_log(w: &mut impl Write, messages: &[Message]) -> io::Result<()> {
    for msg in messages {
        writeln!(
            w,
            "[{}] {}: {}",
            msg.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            msg.sender,
            msg.body
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn msg(sender: &str, body: &str) -> Message {
        Message {
            id: 1,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap(),
            sender: sender.into(),
            body: body.into(),
            mentions: vec![],
        }
    }

    #[test]
    fn hear_format() {
        let mut out = Vec::new();
        write_messages(&mut out, &[msg("alice", "hi"), msg("bob", "yo")]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "alice: hi\nbob: yo\n");
    }

    #[test]
    fn log_format() {
        let mut out = Vec::new();
        write_log(&mut out, &[msg("alice", "hi")]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "[2024-05-06T07:08:09Z] alice: hi\n");
    }
}
