use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StompError {
    #[error("empty frame")]
    MissingCommand,
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("malformed header line {0:?}")]
    BadHeader(String),
    #[error("invalid escape sequence in header {0:?}")]
    BadEscape(String),
    #[error("invalid content-length {0:?}")]
    BadContentLength(String),
    #[error("frame ended before the body")]
    Truncated,
    #[error("frame body is not NUL terminated")]
    Unterminated,
    #[error("binary frame is not UTF-8")]
    NotUtf8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Stomp,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    Disconnect,
    Message,
    Receipt,
    Error,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Stomp => "STOMP",
            Command::Connected => "CONNECTED",
            Command::Send => "SEND",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Ack => "ACK",
            Command::Nack => "NACK",
            Command::Begin => "BEGIN",
            Command::Commit => "COMMIT",
            Command::Abort => "ABORT",
            Command::Disconnect => "DISCONNECT",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
        }
    }

    /// CONNECT and CONNECTED headers are sent verbatim, without escaping.
    fn escapes_headers(self) -> bool {
        !matches!(self, Command::Connect | Command::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = StompError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let command = match s {
            "CONNECT" => Command::Connect,
            "STOMP" => Command::Stomp,
            "CONNECTED" => Command::Connected,
            "SEND" => Command::Send,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "ACK" => Command::Ack,
            "NACK" => Command::Nack,
            "BEGIN" => Command::Begin,
            "COMMIT" => Command::Commit,
            "ABORT" => Command::Abort,
            "DISCONNECT" => Command::Disconnect,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            other => return Err(StompError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }
}

/// One STOMP 1.2 frame carried in a single text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn connect(host: &str, heartbeat: Duration) -> Self {
        let millis = heartbeat.as_millis();
        Frame::new(Command::Connect)
            .with_header("accept-version", "1.2")
            .with_header("host", host)
            .with_header("heart-beat", format!("{},{}", millis, millis))
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Frame::new(Command::Subscribe)
            .with_header("id", id)
            .with_header("destination", destination)
    }

    pub fn send_json<T: Serialize>(destination: &str, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Frame::new(Command::Send)
            .with_header("destination", destination)
            .with_header("content-type", "application/json")
            .with_body(serde_json::to_string(payload)?))
    }

    pub fn disconnect() -> Self {
        Frame::new(Command::Disconnect)
    }

    /// First occurrence wins when a header is repeated.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');

        for (name, value) in &self.headers {
            if escape {
                push_escaped(&mut out, name);
                out.push(':');
                push_escaped(&mut out, value);
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        if !self.body.is_empty() && self.header("content-length").is_none() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }

        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse one text payload. `Ok(None)` is a heart-beat (only end-of-line
    /// characters).
    pub fn decode(payload: &str) -> Result<Option<Frame>, StompError> {
        let text = payload.trim_start_matches(['\r', '\n']);
        if text.is_empty() {
            return Ok(None);
        }

        let mut pos = 0;
        let command_line = read_line(text, &mut pos).ok_or(StompError::Truncated)?;
        if command_line.is_empty() {
            return Err(StompError::MissingCommand);
        }
        let command: Command = command_line.parse()?;

        let mut headers = Vec::new();
        loop {
            let line = read_line(text, &mut pos).ok_or(StompError::Truncated)?;
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| StompError::BadHeader(line.to_string()))?;
            if command.escapes_headers() {
                headers.push((unescape(name)?, unescape(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let mut frame = Frame {
            command,
            headers,
            body: String::new(),
        };

        let rest = &text[pos..];
        frame.body = match frame.header("content-length") {
            Some(raw) => {
                let len: usize = raw
                    .trim()
                    .parse()
                    .map_err(|_| StompError::BadContentLength(raw.to_string()))?;
                let body = rest
                    .get(..len)
                    .ok_or_else(|| StompError::BadContentLength(raw.to_string()))?;
                if !rest[len..].starts_with('\0') {
                    return Err(StompError::Unterminated);
                }
                body.to_string()
            }
            None => {
                let end = rest.find('\0').ok_or(StompError::Unterminated)?;
                rest[..end].to_string()
            }
        };

        Ok(Some(frame))
    }
}

fn read_line<'a>(text: &'a str, pos: &mut usize) -> Option<&'a str> {
    let rest = &text[*pos..];
    let end = rest.find('\n')?;
    *pos += end + 1;
    let line = &rest[..end];
    Some(line.strip_suffix('\r').unwrap_or(line))
}

fn push_escaped(out: &mut String, raw: &str) {
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
}

fn unescape(raw: &str) -> Result<String, StompError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            _ => return Err(StompError::BadEscape(raw.to_string())),
        }
    }
    Ok(out)
}

/// Heart-beat intervals agreed with the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Heartbeat {
    /// How often this side must send something.
    pub outgoing: Option<Duration>,
    /// How often the server promised to send something.
    pub incoming: Option<Duration>,
}

impl Heartbeat {
    /// Negotiate from our symmetric request and the server's `heart-beat`
    /// header. A missing or unparseable header disables both directions.
    pub fn negotiate(requested: Duration, server: Option<&str>) -> Self {
        let Some((sx, sy)) = server.and_then(parse_heartbeat) else {
            return Self::default();
        };
        let ours = requested.as_millis() as u64;
        let pick = |a: u64, b: u64| {
            if a == 0 || b == 0 {
                None
            } else {
                Some(Duration::from_millis(a.max(b)))
            }
        };
        Self {
            outgoing: pick(ours, sy),
            incoming: pick(ours, sx),
        }
    }
}

fn parse_heartbeat(value: &str) -> Option<(u64, u64)> {
    let (x, y) = value.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}
