// ── Identity resolver ──
//
// Pure function over a mapping snapshot. No I/O, no locks: safe to run
// with any parallelism.

use tracing::debug;

use crate::error::CoreError;
use crate::model::{IdentityQuery, MappingConfig, MappingType, ResolutionResult, parse_ipv4};

/// Resolve a query against a mapping snapshot.
///
/// All three tables are consulted independently and every raw hit is
/// reported. The first hit in [`MappingType::PRIORITY`] order becomes
/// `resolved_zone_identifier`. "No mapping" is a successful result with
/// every field `None`; the only failure is an invalid IPv4 address.
pub fn resolve(
    config: &MappingConfig,
    query: &IdentityQuery,
) -> Result<ResolutionResult, CoreError> {
    let ip = parse_ipv4(&query.ip)?.to_string();
    let tables = &config.mappings;

    // The secondary key falls back to the IP when the caller has none.
    let router_key = non_empty(query.router_key.as_deref()).unwrap_or(&ip);
    let interface = non_empty(query.interface.as_deref());
    let hit = |kind: MappingType, key: Option<&str>| {
        key.and_then(|k| tables.lookup(kind, k)).map(str::to_owned)
    };

    let mut result = ResolutionResult {
        router_identifier_mapping_hit: hit(MappingType::RouterIdentifierMapping, Some(ip.as_str())),
        router_mapping_hit: hit(MappingType::RouterMapping, Some(router_key)),
        interface_mapping_hit: hit(MappingType::InterfaceMapping, interface),
        resolved_zone_identifier: None,
        ip,
    };
    result.resolved_zone_identifier = result
        .resolved_by()
        .and_then(|kind| result.hit(kind))
        .map(str::to_owned);

    debug!(
        ip = %result.ip,
        resolved = ?result.resolved_zone_identifier,
        via = ?result.resolved_by(),
        "identity resolved"
    );
    Ok(result)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
