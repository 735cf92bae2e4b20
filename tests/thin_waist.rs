use std::io;
use std::net::IpAddr;

use futures::executor::block_on;
use futures::future::{self, BoxFuture, FutureExt};
use multiaddr::{expand_wildcard, IfaceAddr, IfaceFlags, Multiaddr, NetIfaceProvider};

struct StubProvider {
    addrs: Vec<IfaceAddr>,
}

impl NetIfaceProvider for StubProvider {
    fn list(&self) -> BoxFuture<'_, io::Result<Vec<IfaceAddr>>> {
        future::ready(Ok(self.addrs.clone())).boxed()
    }
}

fn iface(name: &str, addr: &str, loopback: bool) -> IfaceAddr {
    IfaceAddr {
        name: name.to_string(),
        addr: addr.parse::<IpAddr>().unwrap(),
        flags: IfaceFlags { up: true, loopback, multicast: false },
    }
}

fn addr(s: &str) -> Multiaddr {
    s.parse().unwrap()
}

fn machine() -> StubProvider {
    StubProvider {
        addrs: vec![
            iface("lo", "127.0.0.1", true),
            iface("lo", "::1", true),
            iface("eth0", "192.168.1.5", false),
            iface("eth0", "fe80::aabb", false),
            iface("wlan0", "10.0.0.7", false),
        ],
    }
}

#[test]
fn expands_ip4_wildcard_per_interface() {
    let expanded =
        block_on(expand_wildcard(&addr("/ip4/0.0.0.0/tcp/4001"), &machine())).unwrap();
    assert_eq!(
        expanded,
        vec![addr("/ip4/192.168.1.5/tcp/4001"), addr("/ip4/10.0.0.7/tcp/4001")]
    );
}

#[test]
fn expands_ip6_wildcard_per_interface() {
    let expanded =
        block_on(expand_wildcard(&addr("/ip6/::/udp/9090/quic-v1"), &machine())).unwrap();
    assert_eq!(expanded, vec![addr("/ip6/fe80::aabb/udp/9090/quic-v1")]);
}

#[test]
fn trailing_components_are_preserved() {
    let expanded = block_on(expand_wildcard(
        &addr("/ip4/0.0.0.0/tcp/4001/ws/p2p/QmNnooDu7bfjPFoTZYxMNLWUQJyrVwtbZg5gBMjTezGAJN"),
        &StubProvider { addrs: vec![iface("eth0", "192.168.1.5", false)] },
    ))
    .unwrap();
    assert_eq!(
        expanded,
        vec![addr(
            "/ip4/192.168.1.5/tcp/4001/ws/p2p/QmNnooDu7bfjPFoTZYxMNLWUQJyrVwtbZg5gBMjTezGAJN"
        )]
    );
}

#[test]
fn non_wildcard_passes_through() {
    let input = addr("/ip4/192.168.1.5/tcp/4001");
    let expanded = block_on(expand_wildcard(&input, &machine())).unwrap();
    assert_eq!(expanded, vec![input]);
}

#[test]
fn non_ip_head_passes_through() {
    let input = addr("/unix/var/run/sock");
    let expanded = block_on(expand_wildcard(&input, &machine())).unwrap();
    assert_eq!(expanded, vec![input]);

    let empty = Multiaddr::empty();
    let expanded = block_on(expand_wildcard(&empty, &machine())).unwrap();
    assert_eq!(expanded, vec![empty]);
}

#[test]
fn loopback_and_multicast_are_skipped() {
    let provider = StubProvider {
        addrs: vec![
            iface("lo", "127.0.0.1", true),
            // Loopback address on a non-loopback interface.
            iface("weird0", "127.0.0.2", false),
            IfaceAddr {
                name: "eth0".to_string(),
                addr: "224.0.0.1".parse().unwrap(),
                flags: IfaceFlags { up: true, loopback: false, multicast: true },
            },
            iface("eth0", "192.168.1.5", false),
        ],
    };
    let expanded =
        block_on(expand_wildcard(&addr("/ip4/0.0.0.0/tcp/1"), &provider)).unwrap();
    assert_eq!(expanded, vec![addr("/ip4/192.168.1.5/tcp/1")]);
}

#[test]
fn no_matching_family_yields_nothing() {
    let provider = StubProvider { addrs: vec![iface("eth0", "fe80::aabb", false)] };
    let expanded =
        block_on(expand_wildcard(&addr("/ip4/0.0.0.0/tcp/1"), &provider)).unwrap();
    assert!(expanded.is_empty());
}
