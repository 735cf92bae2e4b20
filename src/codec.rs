//! Per-protocol value transcoders.
//!
//! Each codec is a pure bijection between the textual value form and the
//! canonical binary value form of a protocol. `validate` is the
//! construction-time check run on binary values; it accepts exactly the
//! byte strings `to_string` can render.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::str;

use arrayref::array_ref;
use byteorder::{BigEndian, ByteOrder};
use data_encoding::{Encoding, Specification, BASE32, BASE32_NOPAD};
use once_cell::sync::Lazy;

use crate::errors::{CodecError, CodecErrorKind};
use crate::protocol::Protocol;

/// Type-alias for how multiaddrs use `Multihash`.
///
/// The `64` defines the allocation size for the digest within the
/// `Multihash`. This allows us to use hashes such as SHA512.
pub type Multihash = multihash::Multihash<64>;

/// Multicodec of a libp2p public key, the only codec accepted in CIDv1
/// peer ids.
const LIBP2P_KEY_CODEC: u64 = 0x72;

/// Shortest valid garlic64 value: a 384-byte I2P destination plus the
/// two-byte certificate length field.
const GARLIC64_MIN_LEN: usize = 386;

/// Full-length garlic32 values are at least 35 bytes; 32 bytes is the
/// hash-only short form. These are the canonical Go reference thresholds.
const GARLIC32_FULL_MIN_LEN: usize = 35;
const GARLIC32_HASH_LEN: usize = 32;

/// I2P-flavored base64: the standard alphabet with `+/` replaced by `-~`,
/// no padding.
static GARLIC64: Lazy<Encoding> = Lazy::new(|| {
    let mut spec = Specification::new();
    spec.symbols
        .push_str("ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-~");
    spec.encoding().expect("the garlic64 alphabet is a valid encoding specification")
});

/// Handle to a value transcoder, referenced by protocol descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Ip4,
    Ip6,
    Uint16Be,
    Cidr,
    Domain,
    Ip6Zone,
    FsPath,
    Onion,
    Onion3,
    Garlic32,
    Garlic64,
    P2p,
    Certhash,
}

impl Codec {
    /// Parse the textual value form into canonical bytes.
    pub fn to_bytes(&self, proto: &Protocol, s: &str) -> Result<Vec<u8>, CodecError> {
        match self {
            Codec::Ip4 => ip4_to_bytes(proto, s),
            Codec::Ip6 => ip6_to_bytes(proto, s),
            Codec::Uint16Be => uint16_to_bytes(proto, s),
            Codec::Cidr => cidr_to_bytes(proto, s),
            Codec::Domain => domain_to_bytes(proto, s),
            Codec::Ip6Zone => zone_to_bytes(proto, s),
            Codec::FsPath => path_to_bytes(proto, s),
            Codec::Onion => onion_to_bytes(proto, s, 10, 16),
            Codec::Onion3 => onion_to_bytes(proto, s, 35, 56),
            Codec::Garlic32 => garlic32_to_bytes(proto, s),
            Codec::Garlic64 => garlic64_to_bytes(proto, s),
            Codec::P2p => p2p_to_bytes(proto, s),
            Codec::Certhash => certhash_to_bytes(proto, s),
        }
    }

    /// Render canonical bytes as the textual value form.
    pub fn to_string(&self, proto: &Protocol, buf: &[u8]) -> Result<String, CodecError> {
        match self {
            Codec::Ip4 => {
                expect_len(proto, buf, 4)?;
                Ok(Ipv4Addr::from(*array_ref!(buf, 0, 4)).to_string())
            }
            Codec::Ip6 => {
                expect_len(proto, buf, 16)?;
                Ok(Ipv6Addr::from(*array_ref!(buf, 0, 16)).to_string())
            }
            Codec::Uint16Be => {
                expect_len(proto, buf, 2)?;
                Ok(BigEndian::read_u16(buf).to_string())
            }
            Codec::Cidr => {
                expect_len(proto, buf, 1)?;
                Ok(buf[0].to_string())
            }
            Codec::Domain => domain_to_string(proto, buf),
            Codec::Ip6Zone => zone_to_string(proto, buf),
            Codec::FsPath => path_to_string(proto, buf),
            Codec::Onion => onion_to_string(proto, buf, 10),
            Codec::Onion3 => onion_to_string(proto, buf, 35),
            Codec::Garlic32 => {
                garlic32_check_len(proto, buf)?;
                Ok(BASE32_NOPAD.encode(buf).to_lowercase())
            }
            Codec::Garlic64 => {
                garlic64_check_len(proto, buf)?;
                Ok(GARLIC64.encode(buf))
            }
            Codec::P2p => {
                self.validate(proto, buf)?;
                Ok(multibase::Base::Base58Btc.encode(buf))
            }
            Codec::Certhash => {
                self.validate(proto, buf)?;
                Ok(multibase::encode(multibase::Base::Base64Url, buf))
            }
        }
    }

    /// Check that `buf` is a canonical binary value for this codec.
    pub fn validate(&self, proto: &Protocol, buf: &[u8]) -> Result<(), CodecError> {
        match self {
            Codec::Ip4 => expect_len(proto, buf, 4),
            Codec::Ip6 => expect_len(proto, buf, 16),
            Codec::Uint16Be => expect_len(proto, buf, 2),
            Codec::Cidr => expect_len(proto, buf, 1),
            Codec::Domain => domain_to_string(proto, buf).map(drop),
            Codec::Ip6Zone => zone_to_string(proto, buf).map(drop),
            Codec::FsPath => path_to_string(proto, buf).map(drop),
            Codec::Onion => onion_to_string(proto, buf, 10).map(drop),
            Codec::Onion3 => onion_to_string(proto, buf, 35).map(drop),
            Codec::Garlic32 => garlic32_check_len(proto, buf),
            Codec::Garlic64 => garlic64_check_len(proto, buf),
            Codec::P2p | Codec::Certhash => Multihash::from_bytes(buf)
                .map(drop)
                .map_err(|_| err(proto, CodecErrorKind::InvalidMultihash)),
        }
    }
}

fn err(proto: &Protocol, kind: CodecErrorKind) -> CodecError {
    CodecError { protocol: proto.name.to_string(), kind }
}

fn expect_len(proto: &Protocol, buf: &[u8], expected: usize) -> Result<(), CodecError> {
    if buf.len() != expected {
        return Err(err(proto, CodecErrorKind::LengthMismatch { expected, got: buf.len() }));
    }
    Ok(())
}

fn ip4_to_bytes(proto: &Protocol, s: &str) -> Result<Vec<u8>, CodecError> {
    // `Ipv4Addr::from_str` already rejects shorthand, octal and
    // out-of-range octets.
    let addr: Ipv4Addr = s.parse().map_err(|_| err(proto, CodecErrorKind::InvalidIp))?;
    Ok(addr.octets().to_vec())
}

fn ip6_to_bytes(proto: &Protocol, s: &str) -> Result<Vec<u8>, CodecError> {
    // Zone identifiers travel in a separate `ip6zone` component.
    if s.contains('%') {
        return Err(err(proto, CodecErrorKind::UnexpectedZone));
    }
    let addr: Ipv6Addr = s.parse().map_err(|_| err(proto, CodecErrorKind::InvalidIp))?;
    Ok(addr.octets().to_vec())
}

fn uint16_to_bytes(proto: &Protocol, s: &str) -> Result<Vec<u8>, CodecError> {
    let n: u64 = s.parse().map_err(|_| err(proto, CodecErrorKind::InvalidInteger))?;
    if n > u64::from(u16::MAX) {
        return Err(err(proto, CodecErrorKind::PortOutOfRange));
    }
    let mut buf = [0u8; 2];
    BigEndian::write_u16(&mut buf, n as u16);
    Ok(buf.to_vec())
}

fn cidr_to_bytes(proto: &Protocol, s: &str) -> Result<Vec<u8>, CodecError> {
    let n: u64 = s.parse().map_err(|_| err(proto, CodecErrorKind::InvalidInteger))?;
    if n > u64::from(u8::MAX) {
        return Err(err(proto, CodecErrorKind::PrefixOutOfRange));
    }
    Ok(vec![n as u8])
}

fn domain_to_bytes(proto: &Protocol, s: &str) -> Result<Vec<u8>, CodecError> {
    if s.is_empty() {
        return Err(err(proto, CodecErrorKind::EmptyName));
    }
    Ok(s.as_bytes().to_vec())
}

fn domain_to_string(proto: &Protocol, buf: &[u8]) -> Result<String, CodecError> {
    if buf.is_empty() {
        return Err(err(proto, CodecErrorKind::EmptyName));
    }
    let s = str::from_utf8(buf).map_err(|_| err(proto, CodecErrorKind::InvalidUtf8))?;
    Ok(s.to_string())
}

fn zone_to_bytes(proto: &Protocol, s: &str) -> Result<Vec<u8>, CodecError> {
    if s.is_empty() {
        return Err(err(proto, CodecErrorKind::EmptyName));
    }
    if s.contains('%') {
        return Err(err(proto, CodecErrorKind::UnexpectedZone));
    }
    Ok(s.as_bytes().to_vec())
}

fn zone_to_string(proto: &Protocol, buf: &[u8]) -> Result<String, CodecError> {
    if buf.is_empty() {
        return Err(err(proto, CodecErrorKind::EmptyName));
    }
    let s = str::from_utf8(buf).map_err(|_| err(proto, CodecErrorKind::InvalidUtf8))?;
    if s.contains('%') {
        return Err(err(proto, CodecErrorKind::UnexpectedZone));
    }
    Ok(s.to_string())
}

fn path_to_bytes(proto: &Protocol, s: &str) -> Result<Vec<u8>, CodecError> {
    if s.is_empty() {
        return Err(err(proto, CodecErrorKind::EmptyPath));
    }
    // The canonical text form re-prepends a single `/`; the binary form
    // stores the path without it.
    let stripped = if s != "/" { s.strip_prefix('/').unwrap_or(s) } else { s };
    if stripped.is_empty() {
        return Err(err(proto, CodecErrorKind::EmptyPath));
    }
    Ok(stripped.as_bytes().to_vec())
}

fn path_to_string(proto: &Protocol, buf: &[u8]) -> Result<String, CodecError> {
    if buf.is_empty() {
        return Err(err(proto, CodecErrorKind::EmptyPath));
    }
    let s = str::from_utf8(buf).map_err(|_| err(proto, CodecErrorKind::InvalidUtf8))?;
    if s.starts_with('/') {
        Ok(s.to_string())
    } else {
        Ok(format!("/{s}"))
    }
}

/// Parse `<base32 address>:<port>` into `address bytes || port be16`.
fn onion_to_bytes(
    proto: &Protocol,
    s: &str,
    addr_len: usize,
    encoded_len: usize,
) -> Result<Vec<u8>, CodecError> {
    let (b32, port) = s.split_once(':').ok_or_else(|| err(proto, CodecErrorKind::MissingPort))?;
    if b32.len() != encoded_len {
        return Err(err(
            proto,
            CodecErrorKind::LengthMismatch { expected: encoded_len, got: b32.len() },
        ));
    }
    let addr = BASE32
        .decode(b32.to_uppercase().as_bytes())
        .map_err(|_| err(proto, CodecErrorKind::BadBase32))?;
    if addr.len() != addr_len {
        return Err(err(proto, CodecErrorKind::LengthMismatch { expected: addr_len, got: addr.len() }));
    }
    let port: u16 = port.parse().map_err(|_| err(proto, CodecErrorKind::InvalidInteger))?;
    // Port zero is not routable for onion services.
    if port == 0 {
        return Err(err(proto, CodecErrorKind::PortOutOfRange));
    }
    let mut out = addr;
    out.extend_from_slice(&port.to_be_bytes());
    Ok(out)
}

fn onion_to_string(proto: &Protocol, buf: &[u8], addr_len: usize) -> Result<String, CodecError> {
    expect_len(proto, buf, addr_len + 2)?;
    let port = BigEndian::read_u16(&buf[addr_len..]);
    if port == 0 {
        return Err(err(proto, CodecErrorKind::PortOutOfRange));
    }
    let b32 = BASE32.encode(&buf[..addr_len]).to_lowercase();
    Ok(format!("{b32}:{port}"))
}

fn garlic32_to_bytes(proto: &Protocol, s: &str) -> Result<Vec<u8>, CodecError> {
    let bytes = BASE32_NOPAD
        .decode(s.to_uppercase().as_bytes())
        .map_err(|_| err(proto, CodecErrorKind::BadBase32))?;
    garlic32_check_len(proto, &bytes)?;
    Ok(bytes)
}

fn garlic32_check_len(proto: &Protocol, buf: &[u8]) -> Result<(), CodecError> {
    if buf.len() != GARLIC32_HASH_LEN && buf.len() < GARLIC32_FULL_MIN_LEN {
        return Err(err(
            proto,
            CodecErrorKind::LengthMismatch { expected: GARLIC32_FULL_MIN_LEN, got: buf.len() },
        ));
    }
    Ok(())
}

fn garlic64_to_bytes(proto: &Protocol, s: &str) -> Result<Vec<u8>, CodecError> {
    let bytes = GARLIC64
        .decode(s.as_bytes())
        .map_err(|_| err(proto, CodecErrorKind::BadBase64))?;
    garlic64_check_len(proto, &bytes)?;
    Ok(bytes)
}

fn garlic64_check_len(proto: &Protocol, buf: &[u8]) -> Result<(), CodecError> {
    if buf.len() < GARLIC64_MIN_LEN {
        return Err(err(
            proto,
            CodecErrorKind::LengthMismatch { expected: GARLIC64_MIN_LEN, got: buf.len() },
        ));
    }
    Ok(())
}

/// Accepts a base58btc multihash (legacy peer id) or a base32 CIDv1 whose
/// multicodec is `libp2p-key`; both normalize to the raw multihash.
fn p2p_to_bytes(proto: &Protocol, s: &str) -> Result<Vec<u8>, CodecError> {
    if let Ok(bytes) = multibase::Base::Base58Btc.decode(s) {
        if Multihash::from_bytes(&bytes).is_ok() {
            return Ok(bytes);
        }
    }
    let (_base, data) =
        multibase::decode(s).map_err(|_| err(proto, CodecErrorKind::BadBase58))?;
    let (version, rest) = crate::varint::decode_u64(&data)
        .map_err(|_| err(proto, CodecErrorKind::InvalidCid))?;
    if version != 1 {
        return Err(err(proto, CodecErrorKind::InvalidCid));
    }
    let (codec, multihash) = crate::varint::decode_u64(rest)
        .map_err(|_| err(proto, CodecErrorKind::InvalidCid))?;
    if codec != LIBP2P_KEY_CODEC {
        return Err(err(proto, CodecErrorKind::InvalidCid));
    }
    Multihash::from_bytes(multihash)
        .map_err(|_| err(proto, CodecErrorKind::InvalidMultihash))?;
    Ok(multihash.to_vec())
}

fn certhash_to_bytes(proto: &Protocol, s: &str) -> Result<Vec<u8>, CodecError> {
    let (_base, decoded) =
        multibase::decode(s).map_err(|_| err(proto, CodecErrorKind::BadBase64))?;
    Multihash::from_bytes(&decoded)
        .map_err(|_| err(proto, CodecErrorKind::InvalidMultihash))?;
    Ok(decoded)
}
