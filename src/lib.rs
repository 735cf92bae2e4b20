//! Implementation of [multiaddr](https://github.com/multiformats/multiaddr):
//! self-describing, composable network addresses.
//!
//! A [`Multiaddr`] is an ordered sequence of `(protocol, value)` components
//! with a human-readable text form (`/ip4/127.0.0.1/tcp/4001`) and a
//! compact binary form. Both forms round-trip without loss. Addresses are
//! immutable; composition (`encapsulate`) and truncation (`decapsulate`)
//! return new values.
//!
//! Protocols are described by a [`Registry`]: the process-wide default
//! carries the canonical multiformats table, and private registries layered
//! over it can add application protocols without touching the default.
//!
//! Name-based components (`dns`, `dns4`, `dns6`, `dnsaddr`) are expanded
//! asynchronously by [`Resolver`] against a caller-supplied [`NameResolver`]
//! capability; wildcard-bound addresses are expanded against local
//! interfaces by [`expand_wildcard`].

pub use multihash;

mod codec;
mod errors;
mod protocol;
mod resolve;
mod thin_waist;
mod transcode;
mod varint;

use std::{
    borrow::Cow,
    fmt, hash,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    ops::{Bound, RangeBounds},
    result::Result as StdResult,
    str::FromStr,
    sync::Arc,
};

use bytes::Bytes;
use serde::{
    de::{self, Error as DeserializerError},
    Deserialize, Deserializer, Serialize, Serializer,
};

pub use self::codec::{Codec, Multihash};
pub use self::errors::{
    CodecError, CodecErrorKind, Error, LookupError, ParseError, RegistryError, ResolverError,
    Result, UsageError,
};
pub use self::protocol::{code, Protocol, ProtocolId, Registry, Size};
pub use self::resolve::{NameResolver, Resolver, DEFAULT_RECURSION_LIMIT};
pub use self::thin_waist::{expand_wildcard, IfaceAddr, IfaceFlags, NetIfaceProvider};

/// A single `(protocol, value)` pair of a multiaddr.
///
/// The value is kept in its canonical binary form and borrows from the
/// owning [`Multiaddr`] where possible; [`Component::acquire`] turns it
/// into an owned value valid for any lifetime.
#[derive(Debug, Clone)]
pub struct Component<'a> {
    protocol: Arc<Protocol>,
    value: Cow<'a, [u8]>,
}

impl<'a> Component<'a> {
    /// Build a component from a protocol and its textual value, validating
    /// both. Tag-only protocols take `None`.
    pub fn new(protocol: Arc<Protocol>, value: Option<&str>) -> Result<Component<'static>> {
        match (protocol.codec, value) {
            (None, None) => Ok(Component { protocol, value: Cow::Borrowed(&[]) }),
            (None, Some(_)) => {
                Err(ParseError::UnexpectedValue(protocol.name.to_string()).into())
            }
            (Some(_), None) => Err(ParseError::MissingValue(protocol.name.to_string()).into()),
            (Some(codec), Some(text)) => {
                let bytes = codec.to_bytes(&protocol, text)?;
                Ok(Component { protocol, value: Cow::Owned(bytes) })
            }
        }
    }

    /// Build a component from a protocol and a canonical binary value.
    pub fn from_value_bytes(protocol: Arc<Protocol>, value: Vec<u8>) -> Result<Component<'static>> {
        match protocol.codec {
            None if value.is_empty() => Ok(Component { protocol, value: Cow::Borrowed(&[]) }),
            None => Err(ParseError::UnexpectedValue(protocol.name.to_string()).into()),
            Some(codec) => {
                codec.validate(&protocol, &value)?;
                Ok(Component { protocol, value: Cow::Owned(value) })
            }
        }
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    /// The canonical binary value, empty for tag-only protocols.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// The textual value, `None` for tag-only protocols.
    pub fn value_string(&self) -> Result<Option<String>> {
        match self.protocol.codec {
            None => Ok(None),
            Some(codec) => Ok(Some(codec.to_string(&self.protocol, &self.value)?)),
        }
    }

    /// Turn this component into one that owns its data, thus being valid
    /// for any lifetime.
    pub fn acquire(self) -> Component<'static> {
        Component { protocol: self.protocol, value: Cow::Owned(self.value.into_owned()) }
    }

    /// Append the wire form (`varint(code) [varint(len)] value`) to `out`.
    pub fn write_bytes(&self, out: &mut Vec<u8>) {
        varint::encode_u64(self.protocol.code, out);
        if self.protocol.size == Size::Variable {
            varint::encode_u64(self.value.len() as u64, out);
        }
        out.extend_from_slice(&self.value);
    }
}

impl PartialEq for Component<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.protocol.code == other.protocol.code && self.value == other.value
    }
}

impl Eq for Component<'_> {}

impl fmt::Display for Component<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.protocol.name)?;
        if let Some(codec) = self.protocol.codec {
            let text = codec.to_string(&self.protocol, &self.value).map_err(|_| fmt::Error)?;
            if self.protocol.path && text.starts_with('/') {
                f.write_str(&text)?;
            } else {
                write!(f, "/{text}")?;
            }
        }
        Ok(())
    }
}

fn global_component(code: u64, value: Vec<u8>) -> Component<'static> {
    let protocol = Registry::global()
        .by_code(code)
        .expect("canonical registry contains the protocol")
        .clone();
    Component { protocol, value: Cow::Owned(value) }
}

impl From<Ipv4Addr> for Component<'static> {
    fn from(addr: Ipv4Addr) -> Self {
        global_component(code::IP4, addr.octets().to_vec())
    }
}

impl From<Ipv6Addr> for Component<'static> {
    fn from(addr: Ipv6Addr) -> Self {
        global_component(code::IP6, addr.octets().to_vec())
    }
}

impl From<IpAddr> for Component<'static> {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(a) => a.into(),
            IpAddr::V6(a) => a.into(),
        }
    }
}

/// Representation of a multiaddr.
///
/// Immutable and cheap to clone; equality, hashing and serialization
/// depend only on the canonical byte form.
#[derive(Clone)]
pub struct Multiaddr {
    bytes: Bytes,
    registry: Arc<Registry>,
}

impl Multiaddr {
    /// Create a new, empty multiaddress.
    pub fn empty() -> Self {
        Self { bytes: Bytes::new(), registry: Registry::global().clone() }
    }

    /// Create a new, empty multiaddress with the given capacity.
    pub fn with_capacity(n: usize) -> Self {
        Self { bytes: Vec::with_capacity(n).into(), registry: Registry::global().clone() }
    }

    /// Parse the text form against an explicit registry.
    pub fn parse_with(s: &str, registry: &Arc<Registry>) -> Result<Self> {
        let bytes = transcode::string_to_bytes(registry, s)?;
        Ok(Self { bytes: bytes.into(), registry: registry.clone() })
    }

    /// Validate the binary form against an explicit registry.
    pub fn from_bytes_with(bytes: Vec<u8>, registry: &Arc<Registry>) -> Result<Self> {
        transcode::validate(registry, &bytes)?;
        Ok(Self { bytes: bytes.into(), registry: registry.clone() })
    }

    /// Return the length in bytes of this multiaddress.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether this is the empty (zero-component) multiaddress.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Return a copy of this [`Multiaddr`]'s byte representation.
    pub fn to_vec(&self) -> Vec<u8> {
        Vec::from(&self.bytes[..])
    }

    /// Returns the components of this multiaddress.
    ///
    /// # Example
    ///
    /// ```rust
    /// use multiaddr::Multiaddr;
    ///
    /// let address: Multiaddr = "/ip4/127.0.0.1/udt/sctp/5678".parse().unwrap();
    ///
    /// let components = address.iter().collect::<Vec<_>>();
    /// assert_eq!(components[0].protocol().name, "ip4");
    /// assert_eq!(components[1].protocol().name, "udt");
    /// assert_eq!(components[2].value_string().unwrap(), Some("5678".to_string()));
    /// ```
    pub fn iter(&self) -> Iter<'_> {
        Iter(transcode::Components::lenient(&self.registry, &self.bytes))
    }

    /// Byte offsets of component boundaries, including the end of the
    /// buffer. Every slice between two adjacent offsets is one component.
    fn boundaries(&self) -> Vec<usize> {
        let mut offsets = Vec::new();
        for item in transcode::Components::lenient(&self.registry, &self.bytes) {
            let (offset, _, _) = item.expect("`Multiaddr` is known to be valid.");
            offsets.push(offset);
        }
        offsets.push(self.bytes.len());
        offsets
    }

    fn sliced(&self, start: usize, end: usize) -> Multiaddr {
        Multiaddr { bytes: self.bytes.slice(start..end), registry: self.registry.clone() }
    }

    /// The component at `index`; negative indices count from the end.
    pub fn get(&self, index: isize) -> Result<Component<'_>> {
        let len = self.iter().count();
        let resolved = if index < 0 { index + len as isize } else { index };
        if resolved < 0 || resolved as usize >= len {
            return Err(UsageError::IndexOutOfRange { index, len }.into());
        }
        Ok(self
            .iter()
            .nth(resolved as usize)
            .expect("index was checked against the component count"))
    }

    /// A new multiaddr made of the selected contiguous components. Bounds
    /// are clamped; an empty selection yields the empty multiaddr.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Multiaddr {
        let offsets = self.boundaries();
        let count = offsets.len() - 1;
        let start = match range.start_bound() {
            Bound::Included(&i) => i,
            Bound::Excluded(&i) => i + 1,
            Bound::Unbounded => 0,
        }
        .min(count);
        let end = match range.end_bound() {
            Bound::Included(&i) => i + 1,
            Bound::Excluded(&i) => i,
            Bound::Unbounded => count,
        }
        .min(count);
        if start >= end {
            return Multiaddr { bytes: Bytes::new(), registry: self.registry.clone() };
        }
        self.sliced(offsets[start], offsets[end])
    }

    /// Wrap this multiaddr around another; the byte form is the
    /// concatenation of both.
    ///
    /// # Example
    ///
    /// ```
    /// use multiaddr::Multiaddr;
    ///
    /// let a: Multiaddr = "/ip4/1.2.3.4".parse().unwrap();
    /// let b: Multiaddr = "/tcp/80".parse().unwrap();
    /// assert_eq!(a.encapsulate(&b).to_string(), "/ip4/1.2.3.4/tcp/80");
    /// ```
    pub fn encapsulate(&self, other: &Multiaddr) -> Multiaddr {
        let mut bytes = self.to_vec();
        bytes.extend_from_slice(other.as_ref());
        Multiaddr { bytes: bytes.into(), registry: self.registry.clone() }
    }

    /// Whether `suffix`'s component sequence is a contiguous suffix of this
    /// multiaddr's.
    pub fn ends_with(&self, suffix: &Multiaddr) -> bool {
        if suffix.bytes.len() > self.bytes.len() {
            return false;
        }
        let target = self.bytes.len() - suffix.bytes.len();
        self.boundaries().contains(&target) && self.bytes[target..] == suffix.bytes[..]
    }

    /// Remove a trailing multiaddr.
    ///
    /// If `suffix`'s component sequence is not a suffix of this one, this
    /// is a no-op returning a copy rather than an error.
    pub fn decapsulate(&self, suffix: &Multiaddr) -> Multiaddr {
        if suffix.is_empty() || !self.ends_with(suffix) {
            return self.clone();
        }
        self.sliced(0, self.bytes.len() - suffix.bytes.len())
    }

    /// Remove the rightmost component with the given protocol code and
    /// everything after it. Returns a copy if the code does not occur.
    pub fn decapsulate_code(&self, code: u64) -> Multiaddr {
        let mut cut = None;
        for item in transcode::Components::lenient(&self.registry, &self.bytes) {
            let (offset, proto, _) = item.expect("`Multiaddr` is known to be valid.");
            if proto.code == code {
                cut = Some(offset);
            }
        }
        match cut {
            Some(offset) => self.sliced(0, offset),
            None => self.clone(),
        }
    }

    /// The textual value of the first component with the given protocol
    /// (by code or name); `Ok(None)` for tag-only protocols.
    pub fn value_for_protocol<'a>(&self, id: impl Into<ProtocolId<'a>>) -> Result<Option<String>> {
        let proto = self.registry.find(id)?.clone();
        for comp in self.iter() {
            if comp.protocol().code == proto.code {
                return comp.value_string();
            }
        }
        Err(RegistryError::NotFound { id: ProtocolId::Name(proto.name.as_ref()).to_string() }.into())
    }

    /// The ordered protocol descriptors of this multiaddr.
    pub fn protocols(&self) -> Vec<Arc<Protocol>> {
        self.iter().map(|comp| comp.protocol).collect()
    }

    /// The ordered protocol names of this multiaddr.
    pub fn protocol_stack(&self) -> impl Iterator<Item = String> + '_ {
        self.iter().map(|comp| comp.protocol.name.to_string())
    }

    /// Adds an already-validated component to the end of this multiaddr.
    ///
    /// # Examples
    ///
    /// ```
    /// use multiaddr::{Component, Multiaddr, Registry};
    ///
    /// let mut address: Multiaddr = "/ip4/127.0.0.1".parse().unwrap();
    /// let tcp = Registry::global().by_name("tcp").unwrap().clone();
    /// address.push(Component::new(tcp, Some("10000")).unwrap());
    /// assert_eq!(address, "/ip4/127.0.0.1/tcp/10000".parse().unwrap());
    /// ```
    pub fn push(&mut self, component: Component<'_>) {
        let mut bytes = self.to_vec();
        component.write_bytes(&mut bytes);
        self.bytes = bytes.into();
    }

    /// Pops the last component of this multiaddr, or `None` if it is empty.
    pub fn pop(&mut self) -> Option<Component<'static>> {
        if self.bytes.is_empty() {
            return None;
        }
        let offsets = self.boundaries();
        let start = offsets[offsets.len() - 2];
        let component = transcode::Components::lenient(&self.registry, &self.bytes[start..])
            .next()
            .expect("a non-empty multiaddr has a final component")
            .map(|(_, protocol, value)| Component { protocol, value: Cow::Owned(value.to_vec()) })
            .expect("`Multiaddr` is known to be valid.");
        self.bytes.truncate(start);
        Some(component)
    }

    /// Like [`Multiaddr::push`] but consuming and returning the address.
    pub fn with(mut self, component: Component<'_>) -> Self {
        self.push(component);
        self
    }

    /// Replace the component at some position in this multiaddr.
    ///
    /// The parameter `at` denotes the index of the component at which the
    /// function `by` will be applied, returning an optional replacement.
    ///
    /// If `at` is out of bounds or `by` does not yield a replacement value,
    /// `None` will be returned. Otherwise a copy of this multiaddr with the
    /// updated component at position `at` will be returned.
    pub fn replace<'a, F>(&self, at: usize, by: F) -> Option<Multiaddr>
    where
        F: FnOnce(&Component<'_>) -> Option<Component<'a>>,
    {
        let mut address = Multiaddr { bytes: Bytes::new(), registry: self.registry.clone() };
        let mut fun = Some(by);
        let mut replaced = false;

        for (i, comp) in self.iter().enumerate() {
            if i == at {
                let f = fun.take().expect("i == at only happens once");
                if let Some(q) = f(&comp) {
                    address = address.with(q);
                    replaced = true;
                    continue;
                }
                return None;
            }
            address = address.with(comp)
        }

        if replaced {
            Some(address)
        } else {
            None
        }
    }

    /// Append a `p2p` component carrying `peer`, or verify an existing
    /// trailing one. A trailing peer id different from `peer` is a
    /// [`UsageError::PeerIdMismatch`].
    pub fn with_p2p(self, peer: Multihash) -> Result<Multiaddr> {
        let peer_bytes = peer.to_bytes();
        if let Some(last) = self.iter().last() {
            if last.protocol().code == code::P2P {
                return if last.value() == peer_bytes.as_slice() {
                    Ok(self)
                } else {
                    Err(UsageError::PeerIdMismatch.into())
                };
            }
        }
        let protocol = self.registry.by_code(code::P2P)?.clone();
        let component = Component::from_value_bytes(protocol, peer_bytes)?;
        Ok(self.with(component))
    }
}

impl Default for Multiaddr {
    fn default() -> Self {
        Multiaddr::empty()
    }
}

impl PartialEq for Multiaddr {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Multiaddr {}

impl hash::Hash for Multiaddr {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.bytes.hash(state)
    }
}

impl fmt::Debug for Multiaddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_string().fmt(f)
    }
}

impl fmt::Display for Multiaddr {
    /// Convert a multiaddr to its canonical text form.
    ///
    /// # Example
    ///
    /// ```
    /// use multiaddr::Multiaddr;
    ///
    /// let address: Multiaddr = "/ip4/127.0.0.1/udt".parse().unwrap();
    /// assert_eq!(address.to_string(), "/ip4/127.0.0.1/udt");
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text =
            transcode::bytes_to_string(&self.registry, &self.bytes).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl AsRef<[u8]> for Multiaddr {
    fn as_ref(&self) -> &[u8] {
        self.bytes.as_ref()
    }
}

/// Iterator over the [`Component`]s of a multiaddr.
pub struct Iter<'a>(transcode::Components<'a>);

impl<'a> Iterator for Iter<'a> {
    type Item = Component<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (_, protocol, value) =
            self.0.next()?.expect("`Multiaddr` is known to be valid.");
        Some(Component { protocol, value: Cow::Borrowed(value) })
    }
}

impl<'a> IntoIterator for &'a Multiaddr {
    type Item = Component<'a>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl<'a> FromIterator<Component<'a>> for Multiaddr {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = Component<'a>>,
    {
        let mut bytes = Vec::new();
        for comp in iter {
            comp.write_bytes(&mut bytes);
        }
        Multiaddr { bytes: bytes.into(), registry: Registry::global().clone() }
    }
}

impl FromStr for Multiaddr {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        Multiaddr::parse_with(input, Registry::global())
    }
}

impl<'a> From<Component<'a>> for Multiaddr {
    fn from(comp: Component<'a>) -> Multiaddr {
        let mut bytes = Vec::new();
        comp.write_bytes(&mut bytes);
        Multiaddr { bytes: bytes.into(), registry: Registry::global().clone() }
    }
}

impl From<IpAddr> for Multiaddr {
    fn from(v: IpAddr) -> Multiaddr {
        match v {
            IpAddr::V4(a) => a.into(),
            IpAddr::V6(a) => a.into(),
        }
    }
}

impl From<Ipv4Addr> for Multiaddr {
    fn from(v: Ipv4Addr) -> Multiaddr {
        Component::from(v).into()
    }
}

impl From<Ipv6Addr> for Multiaddr {
    fn from(v: Ipv6Addr) -> Multiaddr {
        Component::from(v).into()
    }
}

impl TryFrom<Vec<u8>> for Multiaddr {
    type Error = Error;

    fn try_from(v: Vec<u8>) -> Result<Self> {
        Multiaddr::from_bytes_with(v, Registry::global())
    }
}

impl TryFrom<String> for Multiaddr {
    type Error = Error;

    fn try_from(s: String) -> Result<Multiaddr> {
        s.parse()
    }
}

impl<'a> TryFrom<&'a str> for Multiaddr {
    type Error = Error;

    fn try_from(s: &'a str) -> Result<Multiaddr> {
        s.parse()
    }
}

impl Serialize for Multiaddr {
    fn serialize<S>(&self, serializer: S) -> StdResult<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            serializer.serialize_bytes(self.as_ref())
        }
    }
}

impl<'de> Deserialize<'de> for Multiaddr {
    fn deserialize<D>(deserializer: D) -> StdResult<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor {
            is_human_readable: bool,
        }

        impl<'de> de::Visitor<'de> for Visitor {
            type Value = Multiaddr;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("multiaddress")
            }
            fn visit_seq<A: de::SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> StdResult<Self::Value, A::Error> {
                let mut buf: Vec<u8> = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(e) = seq.next_element()? {
                    buf.push(e);
                }
                if self.is_human_readable {
                    let s = String::from_utf8(buf).map_err(DeserializerError::custom)?;
                    s.parse().map_err(DeserializerError::custom)
                } else {
                    Multiaddr::try_from(buf).map_err(DeserializerError::custom)
                }
            }
            fn visit_str<E: de::Error>(self, v: &str) -> StdResult<Self::Value, E> {
                v.parse().map_err(DeserializerError::custom)
            }
            fn visit_borrowed_str<E: de::Error>(self, v: &'de str) -> StdResult<Self::Value, E> {
                self.visit_str(v)
            }
            fn visit_string<E: de::Error>(self, v: String) -> StdResult<Self::Value, E> {
                self.visit_str(&v)
            }
            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> StdResult<Self::Value, E> {
                self.visit_byte_buf(v.into())
            }
            fn visit_borrowed_bytes<E: de::Error>(self, v: &'de [u8]) -> StdResult<Self::Value, E> {
                self.visit_byte_buf(v.into())
            }
            fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> StdResult<Self::Value, E> {
                Multiaddr::try_from(v).map_err(DeserializerError::custom)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(Visitor { is_human_readable: true })
        } else {
            deserializer.deserialize_bytes(Visitor { is_human_readable: false })
        }
    }
}
