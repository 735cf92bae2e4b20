//! Expansion of name-based components into concrete addresses.
//!
//! A [`Resolver`] walks a multiaddr for `dns`, `dns4`, `dns6` and
//! `dnsaddr` components and expands them through a caller-supplied
//! [`NameResolver`] capability. Expansion is recursive because `dnsaddr`
//! TXT records may themselves contain resolvable components; the depth is
//! bounded to break cycles.

use std::collections::HashSet;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use futures::future::{self, BoxFuture, Either, FutureExt};
use futures::stream::{FuturesOrdered, StreamExt};
use log::{debug, trace};

use crate::errors::{LookupError, ResolverError};
use crate::protocol::code;
use crate::{Component, Multiaddr};

/// Maximum number of nested expansions before resolution fails with
/// [`ResolverError::RecursionLimit`].
pub const DEFAULT_RECURSION_LIMIT: usize = 32;

/// TXT records carrying a multiaddr start with this marker.
const TXT_RECORD_PREFIX: &str = "dnsaddr=";

/// The DNS name queried for `dnsaddr` expansions of `<name>`.
fn dnsaddr_target(name: &str) -> String {
    format!("_dnsaddr.{name}")
}

/// Capability consumed by [`Resolver`]: A, AAAA and TXT queries against
/// some name service. Implementations may suspend; timeouts are theirs to
/// enforce and surface as [`LookupError::Timeout`].
pub trait NameResolver {
    fn query_a<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<Ipv4Addr>, LookupError>>;
    fn query_aaaa<'a>(&'a self, name: &'a str)
        -> BoxFuture<'a, Result<Vec<Ipv6Addr>, LookupError>>;
    fn query_txt<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<String>, LookupError>>;
}

/// Expands the resolvable components of multiaddrs.
pub struct Resolver<R> {
    resolver: R,
    max_recursion: usize,
}

impl<R: NameResolver + Sync> Resolver<R> {
    pub fn new(resolver: R) -> Self {
        Resolver { resolver, max_recursion: DEFAULT_RECURSION_LIMIT }
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.max_recursion = limit;
        self
    }

    /// Expand every resolvable component of `addr`, returning the fully
    /// numeric addresses in expansion order, deduplicated by byte form.
    ///
    /// An address without resolvable components is returned unchanged as a
    /// single-element list.
    pub async fn resolve(&self, addr: &Multiaddr) -> Result<Vec<Multiaddr>, ResolverError> {
        let results = self.resolve_rec(addr.clone(), self.max_recursion).await?;
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(results.len());
        for addr in results {
            if seen.insert(addr.to_vec()) {
                out.push(addr);
            }
        }
        Ok(out)
    }

    /// Like [`Resolver::resolve`], aborted as soon as `cancel` completes.
    /// Cancellation drops all in-flight queries and discards any results
    /// produced so far.
    pub async fn resolve_with_cancel(
        &self,
        addr: &Multiaddr,
        cancel: impl Future<Output = ()>,
    ) -> Result<Vec<Multiaddr>, ResolverError> {
        let resolve = self.resolve(addr);
        futures::pin_mut!(resolve);
        futures::pin_mut!(cancel);
        match future::select(resolve, cancel).await {
            Either::Left((result, _)) => result,
            Either::Right(((), _)) => {
                debug!("resolution of {addr} cancelled");
                Err(ResolverError::Cancelled)
            }
        }
    }

    fn resolve_rec(
        &self,
        addr: Multiaddr,
        depth: usize,
    ) -> BoxFuture<'_, Result<Vec<Multiaddr>, ResolverError>> {
        async move {
            let Some(position) = addr.iter().position(|c| c.protocol().resolvable) else {
                return Ok(vec![addr]);
            };
            if depth == 0 {
                return Err(ResolverError::RecursionLimit(self.max_recursion));
            }
            let prefix = addr.slice(..position);
            let suffix = addr.slice(position + 1..);
            let component = addr
                .get(position as isize)
                .expect("the position comes from iterating this multiaddr");
            let name = component
                .value_string()
                .ok()
                .flatten()
                .expect("resolvable components carry a UTF-8 name");
            let proto_code = component.protocol().code;
            trace!("expanding /{}/{}", component.protocol().name, name);

            let mut tolerant = false;
            let candidates: Vec<Multiaddr> = match proto_code {
                code::DNS4 => {
                    let ips = self.resolver.query_a(&name).await.map_err(lookup_err)?;
                    ips.into_iter()
                        .map(|ip| assemble(&prefix, Component::from(ip), &suffix))
                        .collect()
                }
                code::DNS6 => {
                    let ips = self.resolver.query_aaaa(&name).await.map_err(lookup_err)?;
                    ips.into_iter()
                        .map(|ip| assemble(&prefix, Component::from(ip), &suffix))
                        .collect()
                }
                code::DNS => {
                    let (v4, v6) = future::join(
                        self.resolver.query_a(&name),
                        self.resolver.query_aaaa(&name),
                    )
                    .await;
                    merge_families(v4, v6)?
                        .into_iter()
                        .map(|ip| assemble(&prefix, Component::from(ip), &suffix))
                        .collect()
                }
                code::DNSADDR => {
                    // Per-record failures are tolerated below; only the TXT
                    // query itself is required to succeed.
                    tolerant = true;
                    let target = dnsaddr_target(&name);
                    let records =
                        self.resolver.query_txt(&target).await.map_err(lookup_err)?;
                    dnsaddr_candidates(&addr, &prefix, &suffix, records)
                }
                _ => {
                    // A user-registered resolvable protocol this resolver
                    // has no expansion for.
                    debug!("no expansion for resolvable protocol {}", component.protocol().name);
                    return Ok(vec![addr.clone()]);
                }
            };

            let mut results = Vec::new();
            let mut branches: FuturesOrdered<_> = candidates
                .into_iter()
                .map(|candidate| self.resolve_rec(candidate, depth - 1))
                .collect();
            while let Some(branch) = branches.next().await {
                match branch {
                    Ok(addrs) => results.extend(addrs),
                    Err(ResolverError::ResolutionFailed(cause)) if tolerant => {
                        debug!("ignoring failed dnsaddr record: {cause}");
                    }
                    Err(e) => return Err(e),
                }
            }
            Ok(results)
        }
        .boxed()
    }
}

/// `prefix ‖ expansion ‖ suffix`.
fn assemble(prefix: &Multiaddr, expansion: Component<'static>, suffix: &Multiaddr) -> Multiaddr {
    prefix.clone().with(expansion).encapsulate(suffix)
}

/// Build the candidate addresses for a `dnsaddr` expansion.
///
/// Records carry complete multiaddrs. When the suffix holds a peer id,
/// only records ending with the same peer id qualify, and that suffix
/// component is consumed by the record rather than re-appended.
fn dnsaddr_candidates(
    addr: &Multiaddr,
    prefix: &Multiaddr,
    suffix: &Multiaddr,
    records: Vec<String>,
) -> Vec<Multiaddr> {
    let peer = suffix
        .iter()
        .enumerate()
        .find(|(_, c)| c.protocol().code == code::P2P)
        .map(|(i, c)| (i, c.value().to_vec()));
    let mut candidates = Vec::new();
    for record in records {
        let Some(rest) = record.strip_prefix(TXT_RECORD_PREFIX) else {
            continue;
        };
        let parsed = match Multiaddr::parse_with(rest, &addr.registry) {
            Ok(parsed) => parsed,
            Err(e) => {
                trace!("skipping malformed dnsaddr record {rest:?}: {e}");
                continue;
            }
        };
        match &peer {
            Some((peer_index, peer_bytes)) => {
                let matches = parsed
                    .iter()
                    .last()
                    .map_or(false, |c| {
                        c.protocol().code == code::P2P && c.value() == peer_bytes.as_slice()
                    });
                if !matches {
                    trace!("skipping dnsaddr record for another peer: {parsed}");
                    continue;
                }
                let rest_suffix = suffix.slice(peer_index + 1..);
                candidates.push(prefix.encapsulate(&parsed).encapsulate(&rest_suffix));
            }
            None => candidates.push(prefix.encapsulate(&parsed).encapsulate(suffix)),
        }
    }
    candidates
}

/// Merge the outcome of concurrent A and AAAA queries for a `dns`
/// component, A results first. One family may fail as long as the other
/// succeeds.
fn merge_families(
    v4: Result<Vec<Ipv4Addr>, LookupError>,
    v6: Result<Vec<Ipv6Addr>, LookupError>,
) -> Result<Vec<IpAddr>, ResolverError> {
    match (v4, v6) {
        (Err(e), Err(_)) => Err(lookup_err(e)),
        (v4, v6) => {
            let mut ips = Vec::new();
            if let Ok(list) = v4 {
                ips.extend(list.into_iter().map(IpAddr::V4));
            }
            if let Ok(list) = v6 {
                ips.extend(list.into_iter().map(IpAddr::V6));
            }
            Ok(ips)
        }
    }
}

fn lookup_err(e: LookupError) -> ResolverError {
    match e {
        LookupError::Timeout => ResolverError::ResolutionTimeout,
        other => ResolverError::ResolutionFailed(other),
    }
}
