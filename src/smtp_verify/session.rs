use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::{TcpStream, lookup_host};
use tokio::time::timeout;

use super::error::SessionError;
use super::types::{AttemptStage, SmtpReply};

/// Longest reply line accepted, terminator included.
pub(crate) const MAX_REPLY_LINE_LEN: usize = 1024;
/// Most lines accepted in one multi-line reply.
pub(crate) const MAX_REPLY_LINES: usize = 64;

/// A plain-TCP SMTP client connection with a deadline on every operation.
pub(crate) struct SmtpSession {
    stream: BufStream<TcpStream>,
    command_timeout: Duration,
}

impl SmtpSession {
    /// Resolve `host` and connect to the first reachable address.
    ///
    /// Resolution and connection together are bounded by `connect_timeout`.
    pub(crate) async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Result<(Self, SocketAddr), SessionError> {
        let (stream, peer) = timeout(connect_timeout, open_stream(host, port))
            .await
            .map_err(|_| SessionError::Timeout {
                stage: AttemptStage::Connect,
            })??;
        let session = Self {
            stream: BufStream::new(stream),
            command_timeout,
        };
        Ok((session, peer))
    }

    /// Read one (possibly multi-line) reply, e.g. the greeting banner.
    pub(crate) async fn read_reply(
    stream: &mut BufStream<TcpStream>,
    stage: AttemptStage,
) -> Result<SmtpReply, SessionError> {
    let mut code = None;
    let mut message_lines = Vec::new();
    let mut raw = Vec::with_capacity(128);
    loop {
        if message_lines.len() == MAX_REPLY_LINES {
            return Err(SessionError::protocol(format!(
                "SMTP reply exceeds {MAX_REPLY_LINES} lines"
            )));
        }
        raw.clear();
        let bytes = (&mut *stream)
            .take(MAX_REPLY_LINE_LEN as u64)
            .read_until(b'\n', &mut raw)
            .await
            .map_err(SessionError::io(stage))?;
        if bytes == 0 {
            return Err(SessionError::protocol(
                "connection closed while reading reply",
            ));
        }
        if raw.len() >= MAX_REPLY_LINE_LEN && !raw.ends_with(b"\n") {
            return Err(SessionError::protocol(format!(
                "SMTP reply line exceeds {MAX_REPLY_LINE_LEN} bytes"
            )));
        }
        let line = parse_reply_line(&raw)?;
        if let Some(existing) = code {
            if existing != line.code {
                return Err(SessionError::protocol(format!(
                    "inconsistent SMTP reply codes: {} vs {}",
                    existing, line.code
                )));
            }
        } else {
            code = Some(line.code);
        }
        message_lines.push(line.text);
        if !line.continuation {
            break;
        }
    }
    Ok(SmtpReply {
        code: code.ok_or_else(|| SessionError::protocol("SMTP reply missing status code"))?,
        message: message_lines.join("\n"),
    })
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ReplyLine {
    pub code: u16,
    pub continuation: bool,
    pub text: String,
}

/// Parse one `NNN-text` / `NNN text` reply line, with or without its line terminator.
///
/// Only the status code must be ASCII; the text is decoded lossily.
pub(crate) fn parse_reply_line(raw: &[u8]) -> Result<ReplyLine, SessionError> {
    let line = raw
        .strip_suffix(b"\n")
        .unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let Some((code_part, rest)) = line.split_first_chunk::<3>() else {
        return Err(SessionError::protocol(format!(
            "invalid SMTP reply: '{}'",
            String::from_utf8_lossy(line)
        )));
    };
    if !code_part.iter().all(u8::is_ascii_digit) {
        return Err(SessionError::protocol(format!(
            "invalid SMTP status code: '{}'",
            String::from_utf8_lossy(code_part)
        )));
    }
    let code = code_part
        .iter()
        .fold(0u16, |acc, digit| acc * 10 + u16::from(digit - b'0'));
    let continuation = rest.first() == Some(&b'-');
    let text = String::from_utf8_lossy(rest.get(1..).unwrap_or_default()).into_owned();
    Ok(ReplyLine {
        code,
        continuation,
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_final_line() {
        let line = parse_reply_line(b"250 2.1.5 Ok\r\n").expect("valid");
        assert_eq!(
            line,
            ReplyLine {
                code: 250,
                continuation: false,
                text: "2.1.5 Ok".to_string(),
            }
        );
    }

    #[test]
    fn parses_continuation_line() {
        let line = parse_reply_line(b"250-mx.example.com Hello\n").expect("valid");
        assert_eq!(line.code, 250);
        assert!(line.continuation);
        assert_eq!(line.text, "mx.example.com Hello");
    }

    #[test]
    fn bare_code_has_empty_text() {
        let line = parse_reply_line(b"221\r\n").expect("valid");
        assert_eq!(line.code, 221);
        assert!(!line.continuation);
        assert!(line.text.is_empty());
    }

    #[test]
    fn rejects_short_and_non_numeric_lines() {
        assert!(matches!(
            parse_reply_line(b"25\r\n"),
            Err(SessionError::Protocol(_))
        ));
        assert!(matches!(
            parse_reply_line(b"OK. whatever\r\n"),
            Err(SessionError::Protocol(_))
        ));
        assert!(matches!(
            parse_reply_line(b"+25 nope\r\n"),
            Err(SessionError::Protocol(_))
        ));
    }

    #[test]
    fn non_utf8_text_is_decoded_lossily() {
        let line = parse_reply_line(b"220 mx.example.fr Serveur pr\xeat ESMTP\r\n").expect("valid");
        assert_eq!(line.code, 220);
        assert_eq!(line.text, "mx.example.fr Serveur pr\u{fffd}t ESMTP");
    }
}
