//! # Distance Resolution
//!
//! Turning a free-text delivery address into a road distance. The engine does
//! not speak to any mapping provider itself; the host supplies a
//! [`DistanceResolver`] and the engine treats every failure the same way:
//! the distance stays 0.0 ("unknown") and pricing degrades to
//! manual-confirmation instead of blocking the checkout or booking.

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

/// Geocoding failures. All of them degrade to an unknown distance.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Address could not be resolved: {0}")]
    AddressNotFound(String),

    #[error("Geocoding provider unreachable: {0}")]
    Unreachable(String),

    #[error("Geocoding provider rejected the request: {0}")]
    Rejected(String),
}

/// A resolved address.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedDistance {
    /// Road distance from the shop in km.
    pub distance_km: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Host-supplied address-to-distance collaborator.
#[async_trait]
pub trait DistanceResolver: Send + Sync {
    async fn resolve(&self, address: &str) -> Result<ResolvedDistance, ResolveError>;
}

/// Resolves an address, degrading every failure to the unknown distance 0.0.
///
/// Unknown distances flow through pricing as out-of-range: zero charge now,
/// admin confirms a figure by hand.
pub async fn resolve_or_unknown(resolver: &dyn DistanceResolver, address: &str) -> f64 {
    match resolver.resolve(address).await {
        Ok(resolved) => resolved.distance_km,
        Err(err) => {
            warn!(%address, error = %err, "Distance resolution failed; treating as unknown");
            0.0
        }
    }
}

/// A resolver that always answers with a fixed distance. Test double and a
/// sensible stand-in for single-locality deployments.
#[derive(Debug, Clone, Copy)]
pub struct FixedDistanceResolver {
    pub distance_km: f64,
}

impl FixedDistanceResolver {
    pub fn new(distance_km: f64) -> Self {
        FixedDistanceResolver { distance_km }
    }
}

#[async_trait]
impl DistanceResolver for FixedDistanceResolver {
    async fn resolve(&self, _address: &str) -> Result<ResolvedDistance, ResolveError> {
        Ok(ResolvedDistance {
            distance_km: self.distance_km,
            latitude: 0.0,
            longitude: 0.0,
        })
    }
}

/// A resolver that always fails. Test double for degradation paths.
#[derive(Debug, Clone, Copy)]
pub struct FailingResolver;

#[async_trait]
impl DistanceResolver for FailingResolver {
    async fn resolve(&self, address: &str) -> Result<ResolvedDistance, ResolveError> {
        Err(ResolveError::AddressNotFound(address.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_resolver() {
        let resolver = FixedDistanceResolver::new(4.2);
        let distance = resolve_or_unknown(&resolver, "12 MG Road, Indore").await;
        assert_eq!(distance, 4.2);
    }

    #[tokio::test]
    async fn test_failure_degrades_to_unknown() {
        let distance = resolve_or_unknown(&FailingResolver, "???").await;
        assert_eq!(distance, 0.0);
    }
}
