//! # RESP2 Encoding and Parsing
//!
//! Purpose: Encode client commands and parse server replies for one
//! connection, reusing the connection's buffers between calls.
//!
//! ## Design Principles
//! 1. **State-Free Parsing**: Replies are parsed top-down; the only state kept
//!    between calls is the reusable line buffer.
//! 2. **Binary-Safe**: Bulk strings are treated as raw bytes.
//! 3. **Fail Fast**: Invalid framing returns `ClientError::Protocol`, which the
//!    pooling layer treats as a broken connection.

use std::io::{BufRead, Read};

use bytes::{BufMut, BytesMut};

use crate::error::{ClientError, ClientResult};

/// Upper bound on nested aggregate replies.
const MAX_DEPTH: usize = 32;

/// Largest bulk payload accepted from a server (matches Redis proto-max-bulk-len).
const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Longest header or simple-string line, CRLF included.
const MAX_LINE_LEN: u64 = 64 * 1024;

/// RESP reply value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// +OK or +PONG style replies.
    Simple(Vec<u8>),
    /// -ERR ... replies.
    Error(Vec<u8>),
    /// :123 replies.
    Integer(i64),
    /// $... bulk strings, with None for null.
    Bulk(Option<Vec<u8>>),
    /// *... arrays. Null arrays decode as empty.
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Converts an error reply into `ClientError::Server`, passing every other
    /// reply through.
    pub fn into_result(self) -> ClientResult<RespValue> {
        match self {
            RespValue::Error(message) => Err(ClientError::Server { message }),
            other => Ok(other),
        }
    }
}

/// Encodes a RESP2 array command into `out`.
pub fn encode_command(args: &[&[u8]], out: &mut BytesMut) {
    let payload: usize = args.iter().map(|arg| arg.len() + 16).sum();
    out.reserve(payload + 16);

    put_header(out, b'*', args.len());
    for arg in args {
        put_header(out, b'$', arg.len());
        out.put_slice(arg);
        out.put_slice(b"\r\n");
    }
}

fn put_header(out: &mut BytesMut, prefix: u8, len: usize) {
    // Digits are staged on the stack to keep encoding allocation-free.
    let mut digits = [0u8; 20];
    let mut pos = digits.len();
    let mut value = len;
    loop {
        pos -= 1;
        digits[pos] = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 {
            break;
        }
    }

    out.put_u8(prefix);
    out.put_slice(&digits[pos..]);
    out.put_slice(b"\r\n");
}

/// Reads RESP replies from a buffered stream.
pub struct RespReader<R> {
    inner: R,
    line: Vec<u8>,
}

impl<R: BufRead> RespReader<R> {
    pub fn new(inner: R) -> Self {
        RespReader {
            inner,
            line: Vec::with_capacity(128),
        }
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Reads one complete reply.
    pub fn read_value(&mut self) -> ClientResult<RespValue> {
        self.read_nested(0)
    }

    fn read_nested(&mut self, depth: usize) -> ClientResult<RespValue> {
        if depth > MAX_DEPTH {
            return Err(ClientError::Protocol);
        }

        self.read_line()?;
        let (&kind, rest) = self.line.split_first().ok_or(ClientError::Protocol)?;
        match kind {
            b'+' => Ok(RespValue::Simple(rest.to_vec())),
            b'-' => Ok(RespValue::Error(rest.to_vec())),
            b':' => Ok(RespValue::Integer(parse_i64(rest)?)),
            b'$' => {
                let len = parse_i64(rest)?;
                self.read_bulk(len)
            }
            b'*' => {
                let len = parse_i64(rest)?;
                if len <= 0 {
                    return Ok(RespValue::Array(Vec::new()));
                }
                let mut items = Vec::with_capacity(len.min(1024) as usize);
                for _ in 0..len {
                    items.push(self.read_nested(depth + 1)?);
                }
                Ok(RespValue::Array(items))
            }
            _ => Err(ClientError::Protocol),
        }
    }

    fn read_bulk(&mut self, len: i64) -> ClientResult<RespValue> {
        if len < 0 {
            return Ok(RespValue::Bulk(None));
        }

        if len > MAX_BULK_LEN {
            return Err(ClientError::Protocol);
        }

        // Grow with the bytes actually received rather than the declared length.
        let len = len as usize;
        let mut data = Vec::with_capacity(len.min(MAX_LINE_LEN as usize));
        (&mut self.inner).take(len as u64).read_to_end(&mut data)?;
        if data.len() != len {
            return Err(ClientError::Protocol);
        }

        let mut crlf = [0u8; 2];
        self.inner.read_exact(&mut crlf)?;
        if crlf != *b"\r\n" {
            return Err(ClientError::Protocol);
        }
        Ok(RespValue::Bulk(Some(data)))
    }

    fn read_line(&mut self) -> ClientResult<()> {
        self.line.clear();
        let bytes = (&mut self.inner)
            .take(MAX_LINE_LEN)
            .read_until(b'\n', &mut self.line)?;
        if bytes == 0 {
            // Peer closed the stream between replies.
            return Err(ClientError::Protocol);
        }
        if !self.line.ends_with(b"\r\n") {
            return Err(ClientError::Protocol);
        }
        self.line.truncate(self.line.len() - 2);
        Ok(())
    }
}

fn parse_i64(data: &[u8]) -> ClientResult<i64> {
    let (negative, digits) = match data.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, data),
    };
    if digits.is_empty() {
        return Err(ClientError::Protocol);
    }

    let mut value: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return Err(ClientError::Protocol);
        }
        value = value.saturating_mul(10).saturating_add((b - b'0') as i64);
    }

    Ok(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(input: &[u8]) -> ClientResult<RespValue> {
        RespReader::new(Cursor::new(input.to_vec())).read_value()
    }

    #[test]
    fn encodes_command() {
        let mut buf = BytesMut::new();
        encode_command(&[b"GET", b"key"], &mut buf);
        assert_eq!(&buf[..], b"*2\r\n$3\r\nGET\r\n$3\r\nkey\r\n");
    }

    #[test]
    fn encodes_empty_argument() {
        let mut buf = BytesMut::new();
        encode_command(&[b"SET", b"k", b""], &mut buf);
        assert_eq!(&buf[..], b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$0\r\n\r\n");
    }

    #[test]
    fn parses_simple_string() {
        assert_eq!(parse(b"+OK\r\n").unwrap(), RespValue::Simple(b"OK".to_vec()));
    }

    #[test]
    fn parses_bulk_string() {
        assert_eq!(
            parse(b"$5\r\nhello\r\n").unwrap(),
            RespValue::Bulk(Some(b"hello".to_vec()))
        );
    }

    #[test]
    fn parses_null_bulk_string() {
        assert_eq!(parse(b"$-1\r\n").unwrap(), RespValue::Bulk(None));
    }

    #[test]
    fn parses_negative_integer() {
        assert_eq!(parse(b":-2\r\n").unwrap(), RespValue::Integer(-2));
    }

    #[test]
    fn parses_nested_array() {
        let value = parse(b"*2\r\n:1\r\n*1\r\n+x\r\n").unwrap();
        assert_eq!(
            value,
            RespValue::Array(vec![
                RespValue::Integer(1),
                RespValue::Array(vec![RespValue::Simple(b"x".to_vec())]),
            ])
        );
    }

    #[test]
    fn error_reply_is_a_value_until_converted() {
        let value = parse(b"-ERR bad\r\n").unwrap();
        assert_eq!(value, RespValue::Error(b"ERR bad".to_vec()));
        assert!(matches!(
            value.into_result(),
            Err(ClientError::Server { message }) if message == b"ERR bad"
        ));
    }

    #[test]
    fn eof_is_a_protocol_error() {
        assert!(matches!(parse(b""), Err(ClientError::Protocol)));
    }

    #[test]
    fn oversized_bulk_is_protocol_error() {
        assert!(matches!(
            parse(b"$9223372036854775807\r\n"),
            Err(ClientError::Protocol)
        ));
        assert!(matches!(
            parse(b"$536870913\r\nabc\r\n"),
            Err(ClientError::Protocol)
        ));
    }

    #[test]
    fn truncated_bulk_is_protocol_error() {
        assert!(matches!(parse(b"$10\r\nabc"), Err(ClientError::Protocol)));
    }

    #[test]
    fn unterminated_line_is_bounded() {
        let mut input = vec![b'+'];
        input.resize(MAX_LINE_LEN as usize * 2, b'a');
        let mut reader = RespReader::new(Cursor::new(input));
        assert!(matches!(reader.read_value(), Err(ClientError::Protocol)));
        assert!(reader.line.len() as u64 <= MAX_LINE_LEN);
    }

    #[test]
    fn rejects_bad_framing() {
        assert!(matches!(parse(b"+OK\n"), Err(ClientError::Protocol)));
        assert!(matches!(parse(b":12a\r\n"), Err(ClientError::Protocol)));
        assert!(matches!(parse(b"?\r\n"), Err(ClientError::Protocol)));
        assert!(matches!(parse(b"$2\r\nabXY"), Err(ClientError::Protocol)));
    }
}
