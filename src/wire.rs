//! Wire format of the game-server status protocol.
//!
//! Every packet is `varint(len) || payload` and every payload starts with a
//! varint packet id. Varints carry 7 data bits per byte, least significant
//! group first, with the high bit as continuation flag.

use thiserror::Error;

pub const MAX_VARINT_LEN: usize = 5;
/// Largest response frame accepted from a peer.
pub const MAX_FRAME_LEN: usize = 2 * 1024 * 1024;

pub const HANDSHAKE_PACKET_ID: u32 = 0x00;
pub const STATUS_REQUEST_PACKET_ID: u32 = 0x00;
pub const STATUS_RESPONSE_PACKET_ID: u32 = 0x00;
pub const NEXT_STATE_STATUS: u32 = 0x01;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("buffer ended before the value was complete")]
    Truncated,
    #[error("varint longer than 5 bytes")]
    VarIntTooLong,
    #[error("frame length {0} out of range")]
    BadLength(u32),
    #[error("unexpected packet id {0:#04x}")]
    UnexpectedPacket(u32),
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
}

pub fn write_varint(buf: &mut Vec<u8>, mut value: u32) {
    loop {
        if value & !0x7F == 0 {
            buf.push(value as u8);
            return;
        }
        buf.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
}

/// Decodes a varint from the front of `buf`, returning the value and the
/// number of bytes consumed.
pub fn read_varint(buf: &[u8]) -> Result<(u32, usize), WireError> {
    let mut value: u32 = 0;
    for (i, byte) in buf.iter().enumerate() {
        if i >= MAX_VARINT_LEN {
            return Err(WireError::VarIntTooLong);
        }
        value |= u32::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if buf.len() >= MAX_VARINT_LEN {
        Err(WireError::VarIntTooLong)
    } else {
        Err(WireError::Truncated)
    }
}

pub fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_varint(buf, s.len() as u32);
    buf.extend_from_slice(s.as_bytes());
}

pub fn read_string(buf: &[u8]) -> Result<(String, usize), WireError> {
    let (len, n) = read_varint(buf)?;
    let end = n.checked_add(len as usize).ok_or(WireError::BadLength(len))?;
    let bytes = buf.get(n..end).ok_or(WireError::Truncated)?;
    let s = std::str::from_utf8(bytes).map_err(|_| WireError::InvalidUtf8)?;
    Ok((s.to_owned(), end))
}

/// Prefixes `payload` with its varint length.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + MAX_VARINT_LEN);
    write_varint(&mut out, payload.len() as u32);
    out.extend_from_slice(payload);
    out
}

pub fn handshake_packet(protocol_version: i32, host: &str, port: u16) -> Vec<u8> {
    let mut payload = Vec::with_capacity(host.len() + 16);
    write_varint(&mut payload, HANDSHAKE_PACKET_ID);
    write_varint(&mut payload, protocol_version as u32);
    write_string(&mut payload, host);
    payload.extend_from_slice(&port.to_be_bytes());
    write_varint(&mut payload, NEXT_STATE_STATUS);
    frame(&payload)
}

pub fn status_request_packet() -> Vec<u8> {
    let mut payload = Vec::with_capacity(1);
    write_varint(&mut payload, STATUS_REQUEST_PACKET_ID);
    frame(&payload)
}

/// Handshake followed by status request, ready to write to the socket.
pub fn encode_status_query(protocol_version: i32, host: &str, port: u16) -> Vec<u8> {
    let mut out = handshake_packet(protocol_version, host, port);
    out.extend(status_request_packet());
    out
}

/// Whether `buf` already holds one whole frame. Errors only on input that
/// can never become valid.
pub fn frame_complete(buf: &[u8]) -> Result<bool, WireError> {
    let (len, n) = match read_varint(buf) {
        Ok(v) => v,
        Err(WireError::Truncated) => return Ok(false),
        Err(e) => return Err(e),
    };
    if len as usize > MAX_FRAME_LEN {
        return Err(WireError::BadLength(len));
    }
    Ok(buf.len() - n >= len as usize)
}

/// Parses one status response frame and returns the embedded status document.
pub fn decode_status_response(buf: &[u8]) -> Result<String, WireError> {
    let (len, n) = read_varint(buf)?;
    if len == 0 || len as usize > MAX_FRAME_LEN {
        return Err(WireError::BadLength(len));
    }
    let body = buf.get(n..n + len as usize).ok_or(WireError::Truncated)?;

    let (packet_id, m) = read_varint(body)?;
    if packet_id != STATUS_RESPONSE_PACKET_ID {
        return Err(WireError::UnexpectedPacket(packet_id));
    }
    let (doc, _) = read_string(&body[m..])?;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varint(v: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        write_varint(&mut buf, v);
        buf
    }

    #[test]
    fn varint_known_encodings() {
        assert_eq!(varint(0), [0x00]);
        assert_eq!(varint(127), [0x7f]);
        assert_eq!(varint(128), [0x80, 0x01]);
        assert_eq!(varint(255), [0xff, 0x01]);
        assert_eq!(varint(25565), [0xdd, 0xc7, 0x01]);
        assert_eq!(varint(1 << 31), [0x80, 0x80, 0x80, 0x80, 0x08]);
        assert_eq!(varint(u32::MAX), [0xff, 0xff, 0xff, 0xff, 0x0f]);
    }

    #[test]
    fn varint_decodes_with_consumed_length() {
        assert_eq!(read_varint(&[0xdd, 0xc7, 0x01, 0xaa]), Ok((25565, 3)));
        assert_eq!(read_varint(&[0x80, 0x80, 0x80, 0x80, 0x08]), Ok((1 << 31, 5)));
    }

    #[test]
    fn varint_rejects_bad_input() {
        assert_eq!(read_varint(&[]), Err(WireError::Truncated));
        assert_eq!(read_varint(&[0x80, 0x80]), Err(WireError::Truncated));
        assert_eq!(read_varint(&[0x80; 6]), Err(WireError::VarIntTooLong));
        assert_eq!(read_varint(&[0x80; 5]), Err(WireError::VarIntTooLong));
    }

    #[test]
    fn handshake_layout() {
        let packet = handshake_packet(47, "h", 25565);
        assert_eq!(packet, [0x07, 0x00, 0x2f, 0x01, b'h', 0x63, 0xdd, 0x01]);
        assert_eq!(status_request_packet(), [0x01, 0x00]);

        let query = encode_status_query(47, "h", 25565);
        assert_eq!(&query[..8], packet.as_slice());
        assert_eq!(&query[8..], [0x01, 0x00]);
    }

    #[test]
    fn frame_completeness() {
        let mut payload = Vec::new();
        write_varint(&mut payload, 0);
        write_string(&mut payload, "{}");
        let framed = frame(&payload);

        assert_eq!(frame_complete(&[]), Ok(false));
        assert_eq!(frame_complete(&framed[..2]), Ok(false));
        assert_eq!(frame_complete(&framed), Ok(true));
        assert_eq!(decode_status_response(&framed).unwrap(), "{}");
    }

    #[test]
    fn response_errors() {
        // length prefix promises more than is there
        assert_eq!(decode_status_response(&[0x10, 0x00, 0x02]), Err(WireError::Truncated));
        assert_eq!(
            decode_status_response(&[0x03, 0x01, 0x01, b'x']),
            Err(WireError::UnexpectedPacket(1))
        );
        assert_eq!(decode_status_response(&[0x00]), Err(WireError::BadLength(0)));
        assert_eq!(
            decode_status_response(&[0x03, 0x00, 0x01, 0xff]),
            Err(WireError::InvalidUtf8)
        );
        let huge = varint(MAX_FRAME_LEN as u32 + 1);
        assert!(matches!(frame_complete(&huge), Err(WireError::BadLength(_))));
    }
}
