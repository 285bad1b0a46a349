//! The authentication handshake.
//!
//! Before any binary framing, the client sends a single null byte and then
//! speaks a line-oriented, CRLF-terminated ASCII protocol:
//!
//! ```text
//! C: AUTH ANONYMOUS          (or AUTH EXTERNAL <hex-user-id>)
//! S: OK 1234abcd5678ef90
//! C: BEGIN
//! ```
//!
//! After `BEGIN` the stream carries marshalled messages. Anything the
//! caller tried to send in the meantime is queued here and replayed, in
//! order, right behind the `BEGIN` line.

use std::collections::VecDeque;

/// Frames queued while the handshake is still running. The queue is
/// bounded; the connection stops accepting outbound messages when it
/// fills up and resumes after `BEGIN`.
pub(crate) const MAX_PENDING_FRAMES: usize = 64;

/// How the client identifies itself.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum AuthMechanism {
    Anonymous,
    /// EXTERNAL with the given user id (an ASCII digit string, e.g. a
    /// decimal uid on unix systems).
    External { uid: String },
}

impl AuthMechanism {
    /// EXTERNAL as the user this process runs as.
    #[cfg(unix)]
    pub fn external_from_process_uid() -> Self {
        let uid: u32 = nix::unistd::getuid().as_raw();
        Self::External {
            uid: format!("{}", uid),
        }
    }

    /// The opening AUTH command line, without the line ending.
    ///
    /// The EXTERNAL user id goes over the wire hex-encoded byte by byte,
    /// each byte as two lowercase hex characters.
    fn auth_command(&self) -> String {
        match self {
            Self::Anonymous => String::from("AUTH ANONYMOUS"),
            Self::External { uid } => format!("AUTH EXTERNAL {}", hex::encode(uid)),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum AuthState {
    /// Waiting for an optional null byte from the server.
    WaitingForNullReply,
    /// AUTH sent; waiting for `OK <guid>`.
    WaitingForOk,
    /// BEGIN sent; bytes pass through as message frames.
    Authenticated,
    /// The handshake failed; nothing passes any more.
    Failed,
}

pub(crate) struct Authenticator {
    state: AuthState,
    pending_frames: VecDeque<Vec<u8>>,
    server_guid: Option<String>,
}

impl Authenticator {
    pub fn new() -> Self {
        Self {
            state: AuthState::WaitingForNullReply,
            pending_frames: VecDeque::new(),
            server_guid: None,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    /// The guid the server presented with its OK.
    pub fn server_guid(&self) -> Option<&str> {
        self.server_guid.as_deref()
    }

    /// The opening bytes of the conversation: one null byte, then the
    /// AUTH command.
    pub fn activate(&mut self, mechanism: &AuthMechanism) -> Vec<u8> {
        let command = mechanism.auth_command();
        log::debug!("C: {}", command);

        let mut out = vec![0x00];
        out.extend_from_slice(command.as_bytes());
        out.extend_from_slice(b"\r\n");
        out
    }

    pub fn can_queue(&self) -> bool {
        self.pending_frames.len() < MAX_PENDING_FRAMES
    }

    /// Hold an outbound frame back until the handshake completes.
    pub fn queue_frame(&mut self, frame: Vec<u8>) {
        debug_assert!(self.can_queue());
        self.pending_frames.push_back(frame);
    }

    /// Eat the optional null byte some servers send first.
    ///
    /// Returns how many bytes of `buffer` were consumed. Seeing any first
    /// byte, null or not, settles the question and moves the handshake on
    /// to waiting for the OK line.
    pub fn consume_leading_null(&mut self, buffer: &[u8]) -> usize {
        if self.state != AuthState::WaitingForNullReply {
            return 0;
        }

        match buffer.first() {
            Some(0) => {
                self.state = AuthState::WaitingForOk;
                1
            }
            Some(_) => {
                self.state = AuthState::WaitingForOk;
                0
            }
            None => 0,
        }
    }

    /// React to one server line (without its CRLF).
    ///
    /// On `OK <guid>` the returned bytes are the `BEGIN` line followed by
    /// every queued frame, in submission order; the machine is then
    /// authenticated. Anything else fails the handshake.
    pub fn handle_line(&mut self, line: &str) -> crate::Result<Vec<u8>> {
        log::debug!("S: {}", line);

        match self.state {
            AuthState::WaitingForNullReply | AuthState::WaitingForOk => {}
            AuthState::Authenticated | AuthState::Failed => {
                return Err(crate::Error::InvalidAuthCommand(line.to_string()));
            }
        }

        match parse_server_reply(line) {
            ServerReply::Ok { guid } => {
                self.server_guid = Some(guid.to_string());
                self.state = AuthState::Authenticated;

                log::debug!("C: BEGIN");
                let mut out = b"BEGIN\r\n".to_vec();
                for frame in self.pending_frames.drain(..) {
                    out.extend_from_slice(&frame);
                }
                Ok(out)
            }
            ServerReply::Rejected { mechanisms } => {
                log::warn!("server rejected authentication, offers: {}", mechanisms);
                self.state = AuthState::Failed;
                Err(crate::Error::InvalidAuthCommand(line.to_string()))
            }
            ServerReply::Other => {
                self.state = AuthState::Failed;
                Err(crate::Error::InvalidAuthCommand(line.to_string()))
            }
        }
    }
}

enum ServerReply<'a> {
    Ok { guid: &'a str },
    Rejected { mechanisms: &'a str },
    Other,
}

/// Classify one server line. Only a complete `OK <guid>` counts as
/// success; the guid is a nonempty run of hex digits.
fn parse_server_reply(line: &str) -> ServerReply<'_> {
    use nom::bytes::complete::tag;
    use nom::character::complete::hex_digit1;
    use nom::combinator::all_consuming;
    use nom::combinator::rest;
    use nom::sequence::preceded;
    use nom::IResult;

    let ok: IResult<&str, &str> = all_consuming(preceded(tag("OK "), hex_digit1))(line);
    if let Ok((_, guid)) = ok {
        return ServerReply::Ok { guid };
    }

    let rejected: IResult<&str, &str> = preceded(tag("REJECTED "), rest)(line);
    if let Ok((_, mechanisms)) = rejected {
        return ServerReply::Rejected { mechanisms };
    }

    ServerReply::Other
}

/// Split one CRLF-terminated line off the front of `buffer`.
///
/// Returns the line (without the CRLF) and the number of bytes it took
/// up, or `None` when no complete line has arrived yet.
pub(crate) fn split_line(buffer: &[u8]) -> crate::Result<Option<(String, usize)>> {
    use nom::bytes::streaming::tag;
    use nom::bytes::streaming::take_until;
    use nom::sequence::terminated;

    let parsed: nom::IResult<&[u8], &[u8]> =
        terminated(take_until("\r\n"), tag("\r\n"))(buffer);

    match parsed {
        Ok((rest, line)) => {
            let consumed = buffer.len() - rest.len();
            let line = std::str::from_utf8(line)
                .map_err(|_| {
                    crate::Error::InvalidAuthCommand(String::from_utf8_lossy(line).into_owned())
                })?
                .to_string();
            Ok(Some((line, consumed)))
        }
        Err(nom::Err::Incomplete(_)) => Ok(None),
        Err(_) => Err(crate::Error::InvalidAuthCommand(
            String::from_utf8_lossy(buffer).into_owned(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_opening_bytes() {
        let mut authenticator = Authenticator::new();
        let opening = authenticator.activate(&AuthMechanism::Anonymous);
        assert_eq!(opening, b"\x00AUTH ANONYMOUS\r\n".to_vec());
        assert_eq!(authenticator.state(), AuthState::WaitingForNullReply);
    }

    #[test]
    fn external_uid_is_hex_encoded() {
        let mechanism = AuthMechanism::External {
            uid: String::from("1000"),
        };
        let mut authenticator = Authenticator::new();
        let opening = authenticator.activate(&mechanism);
        // "1000" as ASCII, each byte two lowercase hex characters.
        assert_eq!(opening, b"\x00AUTH EXTERNAL 31303030\r\n".to_vec());
    }

    #[test]
    fn ok_line_begins_and_replays_queued_frames() {
        let mut authenticator = Authenticator::new();
        authenticator.activate(&AuthMechanism::Anonymous);
        authenticator.consume_leading_null(&[b'O']);

        authenticator.queue_frame(vec![1, 2, 3]);
        authenticator.queue_frame(vec![4, 5]);

        let out = authenticator.handle_line("OK 1234abcd5678ef90").unwrap();

        let mut expected = b"BEGIN\r\n".to_vec();
        expected.extend_from_slice(&[1, 2, 3, 4, 5]);
        assert_eq!(out, expected);

        assert!(authenticator.is_authenticated());
        assert_eq!(authenticator.server_guid(), Some("1234abcd5678ef90"));
    }

    #[test]
    fn rejected_line_fails_without_begin() {
        let mut authenticator = Authenticator::new();
        authenticator.activate(&AuthMechanism::Anonymous);
        authenticator.consume_leading_null(&[b'R']);

        let result = authenticator.handle_line("REJECTED EXTERNAL");
        assert!(matches!(
            result,
            Err(crate::Error::InvalidAuthCommand(line)) if line == "REJECTED EXTERNAL"
        ));
        assert_eq!(authenticator.state(), AuthState::Failed);
    }

    #[test]
    fn garbage_lines_fail() {
        for line in &["OK", "OK ", "OK not-hex", "DATA deadbeef", ""] {
            let mut authenticator = Authenticator::new();
            authenticator.activate(&AuthMechanism::Anonymous);
            authenticator.consume_leading_null(&[1]);
            assert!(
                authenticator.handle_line(line).is_err(),
                "line {:?} must not authenticate",
                line
            );
            assert_eq!(authenticator.state(), AuthState::Failed);
        }
    }

    #[test]
    fn server_null_byte_is_optional() {
        let mut with_null = Authenticator::new();
        with_null.activate(&AuthMechanism::Anonymous);
        assert_eq!(with_null.consume_leading_null(&[0, b'O', b'K']), 1);
        assert_eq!(with_null.state(), AuthState::WaitingForOk);

        let mut without_null = Authenticator::new();
        without_null.activate(&AuthMechanism::Anonymous);
        assert_eq!(without_null.consume_leading_null(&[b'O', b'K']), 0);
        assert_eq!(without_null.state(), AuthState::WaitingForOk);

        // An empty buffer decides nothing.
        let mut undecided = Authenticator::new();
        undecided.activate(&AuthMechanism::Anonymous);
        assert_eq!(undecided.consume_leading_null(&[]), 0);
        assert_eq!(undecided.state(), AuthState::WaitingForNullReply);

        // Only the first byte is ever in question.
        assert_eq!(with_null.consume_leading_null(&[0]), 0);
    }

    #[test]
    fn split_line_framing() {
        assert_eq!(split_line(b"").unwrap(), None);
        assert_eq!(split_line(b"OK 12").unwrap(), None);
        assert_eq!(split_line(b"OK 12\r").unwrap(), None);

        let (line, consumed) = split_line(b"OK 12\r\nrest").unwrap().unwrap();
        assert_eq!(line, "OK 12");
        assert_eq!(consumed, 7);

        let (line, consumed) = split_line(b"\r\n").unwrap().unwrap();
        assert_eq!(line, "");
        assert_eq!(consumed, 2);
    }
}
