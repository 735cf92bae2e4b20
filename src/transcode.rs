//! Transcoding between the text, binary and component views of a multiaddr.

use std::sync::Arc;

use crate::errors::{Error, ParseError};
use crate::protocol::{Protocol, Registry, Size};
use crate::varint;

/// Tokenizer over the binary form: yields one `(offset, protocol, value)`
/// triple per component. Iteration stops after the first error.
///
/// In strict mode a path-terminal component must end the stream; the text
/// forms would otherwise stop round-tripping. Construction validates
/// strictly, while iteration over an already-accepted multiaddr is
/// lenient, so that values composed through `encapsulate` and `push` stay
/// inspectable.
pub(crate) struct Components<'a> {
    registry: &'a Registry,
    buf: &'a [u8],
    offset: usize,
    strict: bool,
    /// Set once a path-terminal component has been consumed.
    path_seen: bool,
}

impl<'a> Components<'a> {
    pub(crate) fn strict(registry: &'a Registry, buf: &'a [u8]) -> Self {
        Components { registry, buf, offset: 0, strict: true, path_seen: false }
    }

    pub(crate) fn lenient(registry: &'a Registry, buf: &'a [u8]) -> Self {
        Components { registry, buf, offset: 0, strict: false, path_seen: false }
    }

    fn step(&mut self) -> Result<(usize, Arc<Protocol>, &'a [u8]), Error> {
        let start = self.offset;
        if self.strict && self.path_seen {
            return Err(ParseError::TrailingGarbage.into());
        }
        let rest = &self.buf[self.offset..];
        let (code, rest) = varint::decode_u64(rest)?;
        let proto = self
            .registry
            .by_code(code)
            .map_err(|_| ParseError::UnknownProtocolCode(code))?
            .clone();
        let (len, rest) = match proto.fixed_len() {
            Some(len) => (len, rest),
            None => {
                let (len, rest) = varint::decode_u64(rest)?;
                let len = usize::try_from(len).map_err(|_| ParseError::Truncated)?;
                (len, rest)
            }
        };
        if rest.len() < len {
            return Err(ParseError::Truncated.into());
        }
        let value = &rest[..len];
        self.offset = self.buf.len() - rest.len() + len;
        self.path_seen = proto.path;
        Ok((start, proto, value))
    }
}

impl<'a> Iterator for Components<'a> {
    type Item = Result<(usize, Arc<Protocol>, &'a [u8]), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset == self.buf.len() {
            return None;
        }
        let item = self.step();
        if item.is_err() {
            // Park the iterator at the end so the error is yielded once.
            self.offset = self.buf.len();
        }
        Some(item)
    }
}

/// Walk the whole buffer and run every codec validator. This is the
/// construction-time check: a buffer that passes can be tokenized and
/// rendered without errors from then on.
pub(crate) fn validate(registry: &Registry, buf: &[u8]) -> Result<(), Error> {
    for item in Components::strict(registry, buf) {
        let (_, proto, value) = item?;
        if let Some(codec) = proto.codec {
            codec.validate(&proto, value)?;
        }
    }
    Ok(())
}

/// Parse the text form into canonical bytes.
pub(crate) fn string_to_bytes(registry: &Registry, s: &str) -> Result<Vec<u8>, Error> {
    // Both spellings of the empty multiaddr.
    if s.is_empty() || s == "/" {
        return Ok(Vec::new());
    }
    let Some(s) = s.strip_prefix('/') else {
        return Err(ParseError::InvalidFormat.into());
    };
    let mut out = Vec::new();
    let mut parts = s.split('/');
    while let Some(name) = parts.next() {
        if name.is_empty() {
            return Err(ParseError::UnknownProtocolName(String::new()).into());
        }
        let proto = registry
            .by_name(name)
            .map_err(|_| ParseError::UnknownProtocolName(name.to_string()))?
            .clone();
        let Some(codec) = proto.codec else {
            varint::encode_u64(proto.code, &mut out);
            continue;
        };
        let value = if proto.path {
            // Path-terminal: the rest of the string, slashes included.
            let tail = parts.by_ref().collect::<Vec<_>>().join("/");
            if tail.is_empty() {
                return Err(ParseError::MissingValue(name.to_string()).into());
            }
            tail
        } else {
            match parts.next() {
                Some(v) if !v.is_empty() => v.to_string(),
                _ => return Err(ParseError::MissingValue(name.to_string()).into()),
            }
        };
        let bytes = codec.to_bytes(&proto, &value)?;
        varint::encode_u64(proto.code, &mut out);
        if proto.size == Size::Variable {
            varint::encode_u64(bytes.len() as u64, &mut out);
        }
        out.extend_from_slice(&bytes);
    }
    Ok(out)
}

/// Render canonical bytes as the text form. The empty multiaddr renders
/// as the empty string.
pub(crate) fn bytes_to_string(registry: &Registry, buf: &[u8]) -> Result<String, Error> {
    let mut out = String::new();
    for item in Components::lenient(registry, buf) {
        let (_, proto, value) = item?;
        out.push('/');
        out.push_str(&proto.name);
        if let Some(codec) = proto.codec {
            let text = codec.to_string(&proto, value)?;
            // Path values carry their own leading slash.
            if !(proto.path && text.starts_with('/')) {
                out.push('/');
            }
            out.push_str(&text);
        }
    }
    Ok(out)
}
