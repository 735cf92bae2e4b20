//! Protocol descriptors and the registry that maps codes and names to them.

use std::{borrow::Cow, collections::HashMap, fmt, sync::Arc};

use once_cell::sync::Lazy;

use crate::codec::Codec;
use crate::errors::RegistryError;

/// All the values are obtained by converting hexadecimal protocol codes to
/// integers. Protocols as well as their corresponding codes are defined in
/// <https://github.com/multiformats/multiaddr/blob/master/protocols.csv>.
pub mod code {
    pub const IP4: u64 = 4;
    pub const TCP: u64 = 6;
    pub const DCCP: u64 = 33;
    pub const IP6: u64 = 41;
    pub const IP6ZONE: u64 = 42;
    pub const IPCIDR: u64 = 43;
    pub const DNS: u64 = 53;
    pub const DNS4: u64 = 54;
    pub const DNS6: u64 = 55;
    pub const DNSADDR: u64 = 56;
    pub const SCTP: u64 = 132;
    pub const UDP: u64 = 273;
    pub const P2P_WEBRTC_STAR: u64 = 275;
    pub const P2P_WEBRTC_DIRECT: u64 = 276;
    pub const P2P_STARDUST: u64 = 277;
    pub const P2P_CIRCUIT: u64 = 290;
    pub const UDT: u64 = 301;
    pub const UTP: u64 = 302;
    pub const UNIX: u64 = 400;
    pub const P2P: u64 = 421;
    pub const HTTPS: u64 = 443;
    pub const ONION: u64 = 444;
    pub const ONION3: u64 = 445;
    pub const GARLIC64: u64 = 446;
    pub const GARLIC32: u64 = 447;
    pub const TLS: u64 = 448;
    pub const SNI: u64 = 449;
    pub const NOISE: u64 = 454;
    pub const QUIC: u64 = 460;
    pub const QUIC_V1: u64 = 461;
    pub const WEBTRANSPORT: u64 = 465;
    pub const CERTHASH: u64 = 466;
    pub const WS: u64 = 477;
    pub const WSS: u64 = 478;
    pub const P2P_WEBSOCKET_STAR: u64 = 479;
    pub const HTTP: u64 = 480;
}

/// Wire size class of a protocol value.
///
/// `Fixed(0)` means the protocol carries no value at all. `Variable` values
/// are length-prefixed on the wire; this includes path-terminal protocols
/// like `unix`, whose special treatment is confined to the text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Size {
    /// Fixed width in bits. Always a multiple of 8, zero for tag-only
    /// protocols.
    Fixed(u32),
    /// Varint length prefix followed by that many bytes.
    Variable,
}

/// Descriptor of a single multiaddr protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protocol {
    pub code: u64,
    pub name: Cow<'static, str>,
    pub size: Size,
    /// Transcoder for the value, absent for tag-only protocols.
    pub codec: Option<Codec>,
    /// Whether a resolver may expand this component into others.
    pub resolvable: bool,
    /// Whether the text form consumes the remainder of the string,
    /// embedded slashes included.
    pub path: bool,
}

impl Protocol {
    pub fn new(
        code: u64,
        name: impl Into<Cow<'static, str>>,
        size: Size,
        codec: Option<Codec>,
    ) -> Self {
        Protocol { code, name: name.into(), size, codec, resolvable: false, path: false }
    }

    /// Number of value bytes for fixed-size protocols, `None` for
    /// length-prefixed ones.
    pub(crate) fn fixed_len(&self) -> Option<usize> {
        match self.size {
            Size::Fixed(bits) => Some(bits as usize / 8),
            Size::Variable => None,
        }
    }
}

/// A protocol reference by either code or name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolId<'a> {
    Code(u64),
    Name(&'a str),
}

impl From<u64> for ProtocolId<'static> {
    fn from(code: u64) -> Self {
        ProtocolId::Code(code)
    }
}

impl<'a> From<&'a str> for ProtocolId<'a> {
    fn from(name: &'a str) -> Self {
        ProtocolId::Name(name)
    }
}

impl fmt::Display for ProtocolId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolId::Code(code) => write!(f, "code {code}"),
            ProtocolId::Name(name) => write!(f, "name {name:?}"),
        }
    }
}

/// A table of protocols, keyed by both code and name.
///
/// The process-wide default returned by [`Registry::global`] holds the
/// canonical protocol set and is immutable. Private extensions are built
/// with [`Registry::layered`], which falls back to the global table for
/// anything not registered locally, and are passed explicitly to the parse
/// operations that should use them.
#[derive(Debug, Default)]
pub struct Registry {
    parent: Option<Arc<Registry>>,
    by_code: HashMap<u64, Arc<Protocol>>,
    by_name: HashMap<String, Arc<Protocol>>,
}

static GLOBAL: Lazy<Arc<Registry>> = Lazy::new(|| {
    let mut registry = Registry::new();
    for proto in canonical_protocols() {
        registry
            .register(proto)
            .expect("canonical protocol table contains no duplicates");
    }
    // Deprecated alias: accepted on input, never emitted.
    registry.alias("ipfs", code::P2P);
    Arc::new(registry)
});

impl Registry {
    /// An empty registry with no fallback.
    pub fn new() -> Self {
        Registry::default()
    }

    /// The process-wide default registry with the canonical protocol set.
    pub fn global() -> &'static Arc<Registry> {
        &GLOBAL
    }

    /// An empty registry whose lookups fall back to the global one.
    pub fn layered() -> Self {
        Registry { parent: Some(Registry::global().clone()), ..Registry::default() }
    }

    /// Add a protocol. Fails if the code or name is already taken, here or
    /// in any fallback layer.
    pub fn register(&mut self, proto: Protocol) -> Result<(), RegistryError> {
        if proto.name.is_empty() || !proto.name.is_ascii() || proto.name.contains('/') {
            return Err(RegistryError::InvalidName(proto.name.into_owned()));
        }
        if let Size::Fixed(bits) = proto.size {
            if bits % 8 != 0 {
                return Err(RegistryError::InvalidSize { name: proto.name.into_owned(), bits });
            }
        }
        // A protocol carries a codec exactly when it takes a value.
        if proto.codec.is_some() != (proto.size != Size::Fixed(0)) {
            return Err(RegistryError::CodecMismatch { name: proto.name.into_owned() });
        }
        if self.by_code(proto.code).is_ok() || self.by_name(&proto.name).is_ok() {
            return Err(RegistryError::Duplicate {
                code: proto.code,
                name: proto.name.into_owned(),
            });
        }
        let proto = Arc::new(proto);
        self.by_code.insert(proto.code, proto.clone());
        self.by_name.insert(proto.name.to_string(), proto);
        Ok(())
    }

    /// Map an additional name onto an already registered code.
    fn alias(&mut self, name: &str, code: u64) {
        if let Some(proto) = self.by_code.get(&code) {
            self.by_name.insert(name.to_string(), proto.clone());
        }
    }

    pub fn by_code(&self, code: u64) -> Result<&Arc<Protocol>, RegistryError> {
        if let Some(proto) = self.by_code.get(&code) {
            return Ok(proto);
        }
        match &self.parent {
            Some(parent) => parent.by_code(code),
            None => Err(RegistryError::NotFound { id: ProtocolId::Code(code).to_string() }),
        }
    }

    pub fn by_name(&self, name: &str) -> Result<&Arc<Protocol>, RegistryError> {
        if let Some(proto) = self.by_name.get(name) {
            return Ok(proto);
        }
        match &self.parent {
            Some(parent) => parent.by_name(name),
            None => Err(RegistryError::NotFound { id: ProtocolId::Name(name).to_string() }),
        }
    }

    /// Look up by code or name.
    pub fn find<'a>(&self, id: impl Into<ProtocolId<'a>>) -> Result<&Arc<Protocol>, RegistryError> {
        match id.into() {
            ProtocolId::Code(code) => self.by_code(code),
            ProtocolId::Name(name) => self.by_name(name),
        }
    }
}

fn canonical_protocols() -> Vec<Protocol> {
    use code::*;
    let fixed = |code, name, bits, codec| Protocol::new(code, name, Size::Fixed(bits), Some(codec));
    let var = |code, name, codec| Protocol::new(code, name, Size::Variable, Some(codec));
    let tag = |code, name| Protocol::new(code, name, Size::Fixed(0), None);
    let dns = |code, name| Protocol { resolvable: true, ..var(code, name, Codec::Domain) };

    vec![
        fixed(IP4, "ip4", 32, Codec::Ip4),
        fixed(TCP, "tcp", 16, Codec::Uint16Be),
        fixed(DCCP, "dccp", 16, Codec::Uint16Be),
        fixed(IP6, "ip6", 128, Codec::Ip6),
        var(IP6ZONE, "ip6zone", Codec::Ip6Zone),
        fixed(IPCIDR, "ipcidr", 8, Codec::Cidr),
        dns(DNS, "dns"),
        dns(DNS4, "dns4"),
        dns(DNS6, "dns6"),
        dns(DNSADDR, "dnsaddr"),
        fixed(SCTP, "sctp", 16, Codec::Uint16Be),
        fixed(UDP, "udp", 16, Codec::Uint16Be),
        tag(P2P_WEBRTC_STAR, "p2p-webrtc-star"),
        tag(P2P_WEBRTC_DIRECT, "p2p-webrtc-direct"),
        tag(P2P_STARDUST, "p2p-stardust"),
        tag(P2P_CIRCUIT, "p2p-circuit"),
        tag(UDT, "udt"),
        tag(UTP, "utp"),
        Protocol { path: true, ..var(UNIX, "unix", Codec::FsPath) },
        var(P2P, "p2p", Codec::P2p),
        tag(HTTPS, "https"),
        fixed(ONION, "onion", 96, Codec::Onion),
        fixed(ONION3, "onion3", 296, Codec::Onion3),
        var(GARLIC64, "garlic64", Codec::Garlic64),
        var(GARLIC32, "garlic32", Codec::Garlic32),
        tag(TLS, "tls"),
        var(SNI, "sni", Codec::Domain),
        tag(NOISE, "noise"),
        tag(QUIC, "quic"),
        tag(QUIC_V1, "quic-v1"),
        tag(WEBTRANSPORT, "webtransport"),
        var(CERTHASH, "certhash", Codec::Certhash),
        tag(WS, "ws"),
        tag(WSS, "wss"),
        tag(P2P_WEBSOCKET_STAR, "p2p-websocket-star"),
        tag(HTTP, "http"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_lookup_by_code_and_name() {
        let registry = Registry::global();
        let tcp = registry.by_code(code::TCP).unwrap();
        assert_eq!(tcp.name, "tcp");
        assert_eq!(tcp.size, Size::Fixed(16));
        let quic = registry.by_name("quic-v1").unwrap();
        assert_eq!(quic.code, code::QUIC_V1);
        assert!(registry.by_code(9999).is_err());
        assert!(registry.by_name("bogus").is_err());
    }

    #[test]
    fn ipfs_is_an_alias_for_p2p() {
        let registry = Registry::global();
        let via_alias = registry.by_name("ipfs").unwrap();
        assert_eq!(via_alias.code, code::P2P);
        assert_eq!(via_alias.name, "p2p");
    }

    #[test]
    fn find_accepts_code_or_name() {
        let registry = Registry::global();
        assert_eq!(registry.find(code::UDP).unwrap().name, "udp");
        assert_eq!(registry.find("udp").unwrap().code, code::UDP);
    }

    #[test]
    fn layered_registry_falls_back() {
        let mut registry = Registry::layered();
        registry
            .register(Protocol::new(0x7777, "my-proto", Size::Fixed(0), None))
            .unwrap();
        assert!(registry.by_name("my-proto").is_ok());
        assert!(registry.by_name("tcp").is_ok());
        // The global table is unaffected.
        assert!(Registry::global().by_name("my-proto").is_err());
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = Registry::layered();
        let dup_code = Protocol::new(code::TCP, "not-tcp", Size::Fixed(0), None);
        assert!(matches!(registry.register(dup_code), Err(RegistryError::Duplicate { .. })));
        let dup_name = Protocol::new(0x7778, "tcp", Size::Fixed(0), None);
        assert!(matches!(registry.register(dup_name), Err(RegistryError::Duplicate { .. })));
    }

    #[test]
    fn invalid_names_are_rejected() {
        let mut registry = Registry::new();
        for name in ["", "has/slash", "ünïcode"] {
            let proto = Protocol::new(0x7779, name.to_string(), Size::Fixed(0), None);
            assert!(matches!(registry.register(proto), Err(RegistryError::InvalidName(_))));
        }
    }
}
