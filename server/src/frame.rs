//! Fixed-size framing for the wire protocol.
//!
//! Every `Message` crosses the wire as one constant-size binary record:
//! a 4-byte little-endian kind tag, a 32-byte null-terminated username,
//! and a 1024-byte null-terminated payload. There is no length prefix
//! and no partial-message framing: a record is either read/written in
//! full or the connection is treated as dead.

use std::convert::TryFrom;
use std::fmt;
use std::io;
use std::str;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Maximum username length, not counting the null terminator.
pub const USERNAME_MAX: usize = 31;
/// Maximum payload length, not counting the null terminator.
pub const DATA_MAX: usize = 1023;

const USERNAME_FIELD_LEN: usize = USERNAME_MAX + 1;
const DATA_FIELD_LEN: usize = DATA_MAX + 1;
const KIND_FIELD_LEN: usize = 4;

/// Total size in bytes of one framed record.
pub const RECORD_LEN: usize = KIND_FIELD_LEN + USERNAME_FIELD_LEN + DATA_FIELD_LEN;

/// The kind tag carried by every `Message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text = 0,
    Exit = 1,
    Server = 2,
    Info = 3,
    Private = 4,
    GameChat = 5,
}

impl TryFrom<u32> for MessageKind {
    type Error = FrameError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageKind::Text),
            1 => Ok(MessageKind::Exit),
            2 => Ok(MessageKind::Server),
            3 => Ok(MessageKind::Info),
            4 => Ok(MessageKind::Private),
            5 => Ok(MessageKind::GameChat),
            other => Err(FrameError::UnknownKind(other)),
        }
    }
}

/// The wire-level unit exchanged in both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub username: String,
    pub data: String,
}

impl Message {
    pub fn new(kind: MessageKind, username: impl Into<String>, data: impl Into<String>) -> Self {
        let mut username = username.into();
        username.truncate(USERNAME_MAX);
        let mut data = data.into();
        data.truncate(DATA_MAX);

        Message {
            kind,
            username,
            data,
        }
    }

    pub fn server(data: impl Into<String>) -> Self {
        Message::new(MessageKind::Server, "", data)
    }

    pub fn info(data: impl Into<String>) -> Self {
        Message::new(MessageKind::Info, "", data)
    }

    pub fn exit(data: impl Into<String>) -> Self {
        Message::new(MessageKind::Exit, "", data)
    }

    pub fn text(username: impl Into<String>, data: impl Into<String>) -> Self {
        Message::new(MessageKind::Text, username, data)
    }

    pub fn private(username: impl Into<String>, data: impl Into<String>) -> Self {
        Message::new(MessageKind::Private, username, data)
    }

    pub fn game_chat(username: impl Into<String>, data: impl Into<String>) -> Self {
        Message::new(MessageKind::GameChat, username, data)
    }
}

#[derive(Debug)]
pub enum FrameError {
    Io(io::Error),
    UnknownKind(u32),
    InvalidUtf8,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FrameError::Io(e) => write!(f, "I/O error while framing a message: {}", e),
            FrameError::UnknownKind(k) => write!(f, "unknown message kind tag: {}", k),
            FrameError::InvalidUtf8 => write!(f, "message field was not valid UTF-8"),
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FrameError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FrameError {
    fn from(source: io::Error) -> Self {
        FrameError::Io(source)
    }
}

fn write_fixed_field(dst: &mut BytesMut, text: &str, field_len: usize) {
    let bytes = text.as_bytes();
    let n = bytes.len().min(field_len - 1);
    dst.put_slice(&bytes[..n]);
    // Zero-fill the rest, including the null terminator.
    dst.put_bytes(0u8, field_len - n);
}

fn read_fixed_field(src: &[u8]) -> Result<String, FrameError> {
    let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
    str::from_utf8(&src[..end])
        .map(|s| s.to_owned())
        .map_err(|_| FrameError::InvalidUtf8)
}

/// Tokio codec implementing the fixed-size record framing described above.
#[derive(Debug, Default)]
pub struct MessageCodec;

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, FrameError> {
        if src.len() < RECORD_LEN {
            src.reserve(RECORD_LEN - src.len());
            return Ok(None);
        }

        let record = src.split_to(RECORD_LEN);
        let kind = MessageKind::try_from(u32::from_le_bytes([
            record[0], record[1], record[2], record[3],
        ]))?;

        let username_start = KIND_FIELD_LEN;
        let username_end = username_start + USERNAME_FIELD_LEN;
        let username = read_fixed_field(&record[username_start..username_end])?;

        let data_start = username_end;
        let data_end = data_start + DATA_FIELD_LEN;
        let data = read_fixed_field(&record[data_start..data_end])?;

        Ok(Some(Message {
            kind,
            username,
            data,
        }))
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), FrameError> {
        dst.reserve(RECORD_LEN);
        dst.put_u32_le(item.kind as u32);
        write_fixed_field(dst, &item.username, USERNAME_FIELD_LEN);
        write_fixed_field(dst, &item.data, DATA_FIELD_LEN);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_message() {
        let mut codec = MessageCodec;
        let mut buf = BytesMut::new();
        let original = Message::text("alice", "hello there");

        codec.encode(original.clone(), &mut buf).unwrap();
        assert_eq!(buf.len(), RECORD_LEN);

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, original);
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_returns_none_on_short_buffer() {
        let mut codec = MessageCodec;
        let mut buf = BytesMut::from(&b"not enough bytes"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn truncates_overlong_fields() {
        let long_name = "a".repeat(100);
        let long_data = "b".repeat(2000);
        let msg = Message::new(MessageKind::Text, long_name, long_data);

        assert_eq!(msg.username.len(), USERNAME_MAX);
        assert_eq!(msg.data.len(), DATA_MAX);
    }

    #[test]
    fn rejects_unknown_kind_tag() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(99);
        buf.put_bytes(0, USERNAME_FIELD_LEN + DATA_FIELD_LEN);

        let mut codec = MessageCodec;
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, FrameError::UnknownKind(99)));
    }
}
