use std::{error, fmt, io};

pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type of the crate.
#[derive(Debug, PartialEq)]
pub enum Error {
    Parse(ParseError),
    Codec(CodecError),
    Registry(RegistryError),
    Usage(UsageError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse(e) => write!(f, "{e}"),
            Error::Codec(e) => write!(f, "{e}"),
            Error::Registry(e) => write!(f, "{e}"),
            Error::Usage(e) => write!(f, "{e}"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Parse(e) => Some(e),
            Error::Codec(e) => Some(e),
            Error::Registry(e) => Some(e),
            Error::Usage(e) => Some(e),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Error {
        Error::Parse(e)
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Error {
        Error::Codec(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Error {
        Error::Registry(e)
    }
}

impl From<UsageError> for Error {
    fn from(e: UsageError) -> Error {
        Error::Usage(e)
    }
}

/// Errors produced while tokenizing the text or binary form of a multiaddr.
#[derive(Debug, PartialEq)]
pub enum ParseError {
    UnknownProtocolCode(u64),
    UnknownProtocolName(String),
    Truncated,
    TrailingGarbage,
    MissingValue(String),
    UnexpectedValue(String),
    VarintOverflow,
    VarintTruncated,
    NonMinimalVarint,
    InvalidFormat,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnknownProtocolCode(code) => write!(f, "unknown protocol code {code}"),
            ParseError::UnknownProtocolName(name) => write!(f, "unknown protocol name {name:?}"),
            ParseError::Truncated => f.write_str("buffer ends inside a component value"),
            ParseError::TrailingGarbage => f.write_str("trailing bytes after final component"),
            ParseError::MissingValue(proto) => {
                write!(f, "protocol {proto} requires a value, none given")
            }
            ParseError::UnexpectedValue(proto) => {
                write!(f, "protocol {proto} does not take a value")
            }
            ParseError::VarintOverflow => f.write_str("varint exceeds 63 bits"),
            ParseError::VarintTruncated => f.write_str("buffer ends mid-varint"),
            ParseError::NonMinimalVarint => f.write_str("non-minimal varint encoding"),
            ParseError::InvalidFormat => f.write_str("multiaddr must begin with `/`"),
        }
    }
}

impl error::Error for ParseError {}

/// A value failed its protocol codec, e.g. an out-of-range port or an
/// IPv4 address that is not a dotted quad.
#[derive(Debug, PartialEq)]
pub struct CodecError {
    pub protocol: String,
    pub kind: CodecErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum CodecErrorKind {
    InvalidIp,
    InvalidInteger,
    PortOutOfRange,
    PrefixOutOfRange,
    MissingPort,
    BadBase32,
    BadBase58,
    BadBase64,
    LengthMismatch { expected: usize, got: usize },
    InvalidMultihash,
    InvalidCid,
    EmptyName,
    InvalidUtf8,
    EmptyPath,
    UnexpectedZone,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} value: ", self.protocol)?;
        match &self.kind {
            CodecErrorKind::InvalidIp => f.write_str("not a valid IP address"),
            CodecErrorKind::InvalidInteger => f.write_str("not a base-10 integer"),
            CodecErrorKind::PortOutOfRange => f.write_str("port out of range"),
            CodecErrorKind::PrefixOutOfRange => f.write_str("prefix length out of range"),
            CodecErrorKind::MissingPort => f.write_str("missing `:<port>` suffix"),
            CodecErrorKind::BadBase32 => f.write_str("invalid base32"),
            CodecErrorKind::BadBase58 => f.write_str("invalid base58"),
            CodecErrorKind::BadBase64 => f.write_str("invalid base64"),
            CodecErrorKind::LengthMismatch { expected, got } => {
                write!(f, "expected {expected} bytes, got {got}")
            }
            CodecErrorKind::InvalidMultihash => f.write_str("not a valid multihash"),
            CodecErrorKind::InvalidCid => f.write_str("not a valid CID"),
            CodecErrorKind::EmptyName => f.write_str("name must not be empty"),
            CodecErrorKind::InvalidUtf8 => f.write_str("not valid UTF-8"),
            CodecErrorKind::EmptyPath => f.write_str("path must not be empty"),
            CodecErrorKind::UnexpectedZone => f.write_str("unexpected zone identifier"),
        }
    }
}

impl error::Error for CodecError {}

/// Errors from protocol registry lookups and registrations.
#[derive(Debug, PartialEq)]
pub enum RegistryError {
    Duplicate { code: u64, name: String },
    NotFound { id: String },
    InvalidName(String),
    InvalidSize { name: String, bits: u32 },
    CodecMismatch { name: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Duplicate { code, name } => {
                write!(f, "protocol {name:?} (code {code}) already registered")
            }
            RegistryError::NotFound { id } => write!(f, "no protocol {id} in registry"),
            RegistryError::InvalidName(name) => write!(f, "invalid protocol name {name:?}"),
            RegistryError::InvalidSize { name, bits } => {
                write!(f, "protocol {name:?} has a non-byte-aligned size of {bits} bits")
            }
            RegistryError::CodecMismatch { name } => {
                write!(f, "protocol {name:?} must carry a codec exactly when it takes a value")
            }
        }
    }
}

impl error::Error for RegistryError {}

/// API misuse that is not a data error.
#[derive(Debug, PartialEq)]
pub enum UsageError {
    IndexOutOfRange { index: isize, len: usize },
    PeerIdMismatch,
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageError::IndexOutOfRange { index, len } => {
                write!(f, "component index {index} out of range for length {len}")
            }
            UsageError::PeerIdMismatch => f.write_str("multiaddr ends with a different peer id"),
        }
    }
}

impl error::Error for UsageError {}

/// Failures reported by a [`NameResolver`](crate::NameResolver) capability.
#[derive(Debug)]
pub enum LookupError {
    NxDomain,
    Timeout,
    Network(io::Error),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::NxDomain => f.write_str("name does not exist"),
            LookupError::Timeout => f.write_str("query timed out"),
            LookupError::Network(e) => write!(f, "network error: {e}"),
        }
    }
}

impl error::Error for LookupError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            LookupError::Network(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for LookupError {
    fn from(e: io::Error) -> LookupError {
        LookupError::Network(e)
    }
}

/// Errors produced while expanding name components of a multiaddr.
#[derive(Debug)]
pub enum ResolverError {
    ResolutionTimeout,
    ResolutionFailed(LookupError),
    RecursionLimit(usize),
    Cancelled,
}

impl fmt::Display for ResolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverError::ResolutionTimeout => f.write_str("resolution timed out"),
            ResolverError::ResolutionFailed(e) => write!(f, "resolution failed: {e}"),
            ResolverError::RecursionLimit(n) => {
                write!(f, "recursion limit of {n} expansions exceeded")
            }
            ResolverError::Cancelled => f.write_str("resolution cancelled"),
        }
    }
}

impl error::Error for ResolverError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ResolverError::ResolutionFailed(e) => Some(e),
            _ => None,
        }
    }
}
