//! Raw binary frame header decoding
//!
//! The lower-level diagnostic path consumes binary frames whose prefix is
//! a CBOR map `{op: int, t: text}` followed by an opaque payload. Only the
//! header is decoded here; the payload starts at `payload_offset`.
//! Malformed headers are reported to the caller, which logs and skips them.

use minicbor::Decoder;
use thiserror::Error;

/// Decoded frame header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHeader {
    /// Frame operation; negative values are error frames.
    pub op: i64,
    /// Frame type tag, e.g. `#commit`. Absent on error frames.
    pub ty: Option<String>,
    /// Byte offset where the payload begins.
    pub payload_offset: usize,
}

impl RawHeader {
    /// Census label for this frame.
    pub fn label(&self) -> &str {
        if self.op < 0 {
            return "error";
        }
        self.ty.as_deref().unwrap_or("unknown")
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("indefinite-length header map not allowed")]
    IndefiniteHeader,
    #[error("header missing op field")]
    MissingOp,
    #[error("cbor decode: {0}")]
    Cbor(#[from] minicbor::decode::Error),
}

/// Decode the header map at the front of `frame`.
pub fn decode_header(frame: &[u8]) -> Result<RawHeader, FrameError> {
    let mut d = Decoder::new(frame);
    let len = d.map()?.ok_or(FrameError::IndefiniteHeader)?;

    let mut op = None;
    let mut ty = None;
    for _ in 0..len {
        match d.str()? {
            "op" => op = Some(d.i64()?),
            "t" => ty = Some(d.str()?.to_owned()),
            _ => d.skip()?,
        }
    }

    Ok(RawHeader {
        op: op.ok_or(FrameError::MissingOp)?,
        ty,
        payload_offset: d.position(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use minicbor::Encoder;

    fn header_bytes(op: i64, ty: Option<&str>) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut e = Encoder::new(&mut buf);
        match ty {
            Some(ty) => {
                e.map(2).unwrap().str("op").unwrap().i64(op).unwrap();
                e.str("t").unwrap().str(ty).unwrap();
            }
            None => {
                e.map(1).unwrap().str("op").unwrap().i64(op).unwrap();
            }
        }
        buf
    }

    #[test]
    fn decodes_commit_header_and_payload_offset() {
        let mut frame = header_bytes(1, Some("#commit"));
        let header_len = frame.len();
        frame.push(0xa0); // payload: empty map

        let header = decode_header(&frame).unwrap();
        assert_eq!(header.op, 1);
        assert_eq!(header.ty.as_deref(), Some("#commit"));
        assert_eq!(header.payload_offset, header_len);
        assert_eq!(header.label(), "#commit");
    }

    #[test]
    fn error_frames_have_no_type() {
        let frame = header_bytes(-1, None);
        let header = decode_header(&frame).unwrap();
        assert_eq!(header.op, -1);
        assert_eq!(header.ty, None);
        assert_eq!(header.label(), "error");
    }

    #[test]
    fn missing_op_is_rejected() {
        let mut buf = Vec::new();
        let mut e = Encoder::new(&mut buf);
        e.map(1).unwrap().str("t").unwrap().str("#commit").unwrap();
        assert!(matches!(decode_header(&buf), Err(FrameError::MissingOp)));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(
            decode_header(&[0xff, 0x00, 0x01]),
            Err(FrameError::Cbor(_)) | Err(FrameError::IndefiniteHeader)
        ));
    }
}
