//! Expansion of wildcard-bound addresses against local interfaces.
//!
//! Listeners commonly bind to `/ip4/0.0.0.0/...` or `/ip6/::/...`. To
//! advertise such an address it has to be rewritten once per concrete
//! interface address; everything past the IP component is preserved.

use std::io;
use std::net::IpAddr;

use futures::future::BoxFuture;

use crate::protocol::code;
use crate::{Component, Multiaddr};

/// State bits of one interface address as reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IfaceFlags {
    pub up: bool,
    pub loopback: bool,
    pub multicast: bool,
}

/// One address of one local network interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfaceAddr {
    pub name: String,
    pub addr: IpAddr,
    pub flags: IfaceFlags,
}

/// Capability listing the local interface addresses. Implementations may
/// answer immediately or suspend.
pub trait NetIfaceProvider {
    fn list(&self) -> BoxFuture<'_, io::Result<Vec<IfaceAddr>>>;
}

/// Expand a wildcard-bound multiaddr into one multiaddr per non-loopback
/// unicast address of the matching family, the wildcard IP component
/// replaced and everything else kept verbatim. Non-wildcard input is
/// returned unchanged as a single-element list.
pub async fn expand_wildcard<P>(addr: &Multiaddr, provider: &P) -> io::Result<Vec<Multiaddr>>
where
    P: NetIfaceProvider + ?Sized,
{
    let Some(first) = addr.iter().next() else {
        return Ok(vec![addr.clone()]);
    };
    let want_v4 = first.protocol().code == code::IP4 && first.value() == &[0u8; 4][..];
    let want_v6 = first.protocol().code == code::IP6 && first.value() == &[0u8; 16][..];
    if !want_v4 && !want_v6 {
        return Ok(vec![addr.clone()]);
    }

    let mut out = Vec::new();
    for iface in provider.list().await? {
        match iface.addr {
            IpAddr::V4(_) if want_v4 => {}
            IpAddr::V6(_) if want_v6 => {}
            _ => continue,
        }
        if iface.flags.loopback || iface.addr.is_loopback() || iface.addr.is_multicast() {
            continue;
        }
        if let Some(expanded) = addr.replace(0, |_| Some(Component::from(iface.addr))) {
            out.push(expanded);
        }
    }
    Ok(out)
}
