//! # Pricing Engine
//!
//! Pure pricing rules: distance-tiered delivery charges, the once-per-lifetime
//! free delivery rule, and service visiting-charge brackets.
//!
//! ## Delivery Charge Tiers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   distance (km)        charge                                           │
//! │   ──────────────       ──────────────────────────────────────────       │
//! │   0 < d ≤ 3.0          ₹50                                              │
//! │   3.0 < d ≤ 5.0        ₹70                                              │
//! │   5.0 < d ≤ 7.0        ₹80                                              │
//! │   d > 7.0 / unknown    ₹0, out of range - admin must confirm manually   │
//! │                        (never silently charged)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is a pure function: callers always get *some* displayable
//! charge or an explicit pending marker, never an error.
//!
//! ## Usage
//! ```rust
//! use volta_core::money::Money;
//! use volta_core::pricing::{delivery_charge, DeliveryQuote};
//!
//! assert_eq!(delivery_charge(2.5), DeliveryQuote::Tiered(Money::from_rupees(50)));
//! assert_eq!(delivery_charge(9.0), DeliveryQuote::OutOfRange);
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::ServiceType;
use crate::DEFAULT_FREE_DELIVERY_MAX_KM;

// =============================================================================
// Delivery Charge
// =============================================================================

/// Result of quoting a delivery charge for a distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "charge", rename_all = "snake_case")]
pub enum DeliveryQuote {
    /// Distance fell into a configured tier.
    Tiered(Money),
    /// Distance is beyond the last tier or unknown. The charge stays at zero
    /// and the order's delivery charge remains ESTIMATED until an admin
    /// confirms a figure by hand.
    OutOfRange,
}

impl DeliveryQuote {
    /// The charge to record right now (zero for out-of-range quotes).
    #[inline]
    pub fn charge(&self) -> Money {
        match self {
            DeliveryQuote::Tiered(charge) => *charge,
            DeliveryQuote::OutOfRange => Money::zero(),
        }
    }

    /// Whether an admin has to settle the charge manually.
    #[inline]
    pub fn needs_manual_review(&self) -> bool {
        matches!(self, DeliveryQuote::OutOfRange)
    }
}

/// Quotes the delivery charge for a road distance in km.
///
/// A distance of 0.0 (or anything non-positive, or NaN) means "unknown" -
/// geocoding failed or the address could not be resolved - and is treated
/// exactly like out-of-range: zero now, manual confirmation later.
///
/// ## Example
/// ```rust
/// use volta_core::money::Money;
/// use volta_core::pricing::{delivery_charge, DeliveryQuote};
///
/// assert_eq!(delivery_charge(3.0), DeliveryQuote::Tiered(Money::from_rupees(50)));
/// assert_eq!(delivery_charge(3.01), DeliveryQuote::Tiered(Money::from_rupees(70)));
/// assert_eq!(delivery_charge(7.01), DeliveryQuote::OutOfRange);
/// assert_eq!(delivery_charge(0.0), DeliveryQuote::OutOfRange);
/// ```
pub fn delivery_charge(distance_km: f64) -> DeliveryQuote {
    if !(distance_km > 0.0) {
        // Catches 0.0 (unknown), negatives and NaN in one comparison.
        return DeliveryQuote::OutOfRange;
    }

    if distance_km <= 3.0 {
        DeliveryQuote::Tiered(Money::from_rupees(50))
    } else if distance_km <= 5.0 {
        DeliveryQuote::Tiered(Money::from_rupees(70))
    } else if distance_km <= 7.0 {
        DeliveryQuote::Tiered(Money::from_rupees(80))
    } else {
        DeliveryQuote::OutOfRange
    }
}

// =============================================================================
// Free Delivery
// =============================================================================

/// Tunable pricing knobs. Hosts load this from the environment; defaults
/// match shop policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingConfig {
    /// Free delivery applies only within this many km.
    ///
    /// The legacy system checked 3 km at checkout but 2 km on the admin
    /// confirmation path. One knob now; both call sites read it.
    pub free_delivery_max_km: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            free_delivery_max_km: DEFAULT_FREE_DELIVERY_MAX_KM,
        }
    }
}

/// Whether a customer qualifies for their one lifetime free delivery.
///
/// Requires a KNOWN distance within the configured ceiling and an unused
/// free-delivery counter. The counter itself is bumped by the caller with a
/// guarded update; this function only answers the eligibility question.
pub fn free_delivery_eligible(
    config: &PricingConfig,
    distance_km: f64,
    free_delivery_used_count: i64,
) -> bool {
    distance_km > 0.0 && distance_km <= config.free_delivery_max_km && free_delivery_used_count == 0
}

/// Locks in the final order price.
///
/// `final_price = total_price + delivery_charge`, except a free delivery
/// excludes the charge entirely.
#[inline]
pub fn final_price(total_price: Money, delivery_charge: Money, free_delivery: bool) -> Money {
    if free_delivery {
        total_price
    } else {
        total_price + delivery_charge
    }
}

// =============================================================================
// Visiting Charge
// =============================================================================

/// Result of quoting a visiting charge for a service appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "charge", rename_all = "snake_case")]
pub enum VisitingQuote {
    /// Service type and distance produced a definite charge.
    Priced(Money),
    /// No charge can be assigned yet; an admin fills it in later.
    NeedsConfirmation,
}

impl VisitingQuote {
    /// The charge, if one was assigned.
    #[inline]
    pub fn charge(&self) -> Option<Money> {
        match self {
            VisitingQuote::Priced(charge) => Some(*charge),
            VisitingQuote::NeedsConfirmation => None,
        }
    }
}

/// Quotes the visiting charge for a service type at a distance.
///
/// Rules, in order:
/// - bracket pricing (any bracket configured): pick the TIGHTEST configured
///   bracket whose upper bound covers the distance; unknown distance or a
///   distance beyond every configured bracket → needs confirmation.
/// - flat pricing (no brackets): the base charge applies regardless of
///   distance; a service type with neither → needs confirmation.
///
/// ## Example
/// ```text
/// brackets configured at 1 km (₹100) and 5 km (₹180):
///   distance 0.8 km → ₹100   (1 km bracket is the tightest cover)
///   distance 2.0 km → ₹180   (5 km bracket covers; 3 km bracket unset)
///   distance 6.0 km → needs confirmation
/// ```
pub fn visiting_charge(service: &ServiceType, distance_km: f64) -> VisitingQuote {
    if service.has_brackets() {
        if !(distance_km > 0.0) {
            return VisitingQuote::NeedsConfirmation;
        }

        for (upper_km, charge) in service.brackets() {
            if distance_km <= upper_km {
                if let Some(paise) = charge {
                    return VisitingQuote::Priced(Money::from_paise(paise));
                }
                // Bracket covers the distance but has no charge configured;
                // a wider configured bracket may still apply.
            }
        }

        return VisitingQuote::NeedsConfirmation;
    }

    match service.base_visiting_charge_paise {
        Some(paise) => VisitingQuote::Priced(Money::from_paise(paise)),
        None => VisitingQuote::NeedsConfirmation,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn quote(d: f64) -> DeliveryQuote {
        delivery_charge(d)
    }

    #[test]
    fn test_delivery_tiers() {
        assert_eq!(quote(0.5), DeliveryQuote::Tiered(Money::from_rupees(50)));
        assert_eq!(quote(3.0), DeliveryQuote::Tiered(Money::from_rupees(50)));
        assert_eq!(quote(3.01), DeliveryQuote::Tiered(Money::from_rupees(70)));
        assert_eq!(quote(4.0), DeliveryQuote::Tiered(Money::from_rupees(70)));
        assert_eq!(quote(5.0), DeliveryQuote::Tiered(Money::from_rupees(70)));
        assert_eq!(quote(5.01), DeliveryQuote::Tiered(Money::from_rupees(80)));
        assert_eq!(quote(7.0), DeliveryQuote::Tiered(Money::from_rupees(80)));
    }

    #[test]
    fn test_delivery_out_of_range_and_unknown() {
        assert_eq!(quote(7.01), DeliveryQuote::OutOfRange);
        assert_eq!(quote(25.0), DeliveryQuote::OutOfRange);
        assert_eq!(quote(0.0), DeliveryQuote::OutOfRange);
        assert_eq!(quote(-1.0), DeliveryQuote::OutOfRange);
        assert_eq!(quote(f64::NAN), DeliveryQuote::OutOfRange);

        assert!(quote(9.0).needs_manual_review());
        assert_eq!(quote(9.0).charge(), Money::zero());
    }

    /// The tier function is a monotonic step function: charge never decreases
    /// as distance grows within the serviced range.
    #[test]
    fn test_delivery_charge_monotonic_within_range() {
        let mut last = Money::zero();
        let mut d = 0.1;
        while d <= 7.0 {
            let charge = quote(d).charge();
            assert!(charge >= last, "charge dropped at {d} km");
            last = charge;
            d += 0.1;
        }
    }

    #[test]
    fn test_free_delivery_eligibility() {
        let config = PricingConfig::default();

        // In range, never used
        assert!(free_delivery_eligible(&config, 2.0, 0));
        assert!(free_delivery_eligible(&config, 3.0, 0));

        // Already used the lifetime freebie
        assert!(!free_delivery_eligible(&config, 2.0, 1));

        // Too far, or unknown distance
        assert!(!free_delivery_eligible(&config, 3.01, 0));
        assert!(!free_delivery_eligible(&config, 0.0, 0));
    }

    #[test]
    fn test_free_delivery_custom_threshold() {
        let config = PricingConfig {
            free_delivery_max_km: 2.0,
        };
        assert!(free_delivery_eligible(&config, 2.0, 0));
        assert!(!free_delivery_eligible(&config, 2.5, 0));
    }

    #[test]
    fn test_final_price() {
        let total = Money::from_rupees(500);
        let charge = Money::from_rupees(70);

        assert_eq!(final_price(total, charge, false), Money::from_rupees(570));
        assert_eq!(final_price(total, charge, true), Money::from_rupees(500));
    }

    fn service(base: Option<i64>, brackets: [Option<i64>; 5]) -> ServiceType {
        ServiceType {
            id: "svc-1".into(),
            name: "Wiring Check".into(),
            description: None,
            base_visiting_charge_paise: base,
            charge_upto_500m_paise: brackets[0],
            charge_upto_1km_paise: brackets[1],
            charge_upto_3km_paise: brackets[2],
            charge_upto_5km_paise: brackets[3],
            charge_upto_7km_paise: brackets[4],
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_visiting_charge_picks_tightest_bracket() {
        let svc = service(
            None,
            [Some(8000), Some(10000), Some(15000), Some(18000), Some(25000)],
        );

        assert_eq!(
            visiting_charge(&svc, 0.4),
            VisitingQuote::Priced(Money::from_paise(8000))
        );
        // Exactly on a boundary takes that bracket, not the next one up
        assert_eq!(
            visiting_charge(&svc, 0.5),
            VisitingQuote::Priced(Money::from_paise(8000))
        );
        assert_eq!(
            visiting_charge(&svc, 2.4),
            VisitingQuote::Priced(Money::from_paise(15000))
        );
        assert_eq!(
            visiting_charge(&svc, 7.0),
            VisitingQuote::Priced(Money::from_paise(25000))
        );
    }

    #[test]
    fn test_visiting_charge_skips_unconfigured_brackets() {
        // Only the 1 km and 5 km brackets carry charges
        let svc = service(None, [None, Some(10000), None, Some(18000), None]);

        // 2 km: the 3 km bracket would be tightest but is unset, so the
        // 5 km bracket is the smallest configured cover
        assert_eq!(
            visiting_charge(&svc, 2.0),
            VisitingQuote::Priced(Money::from_paise(18000))
        );
        // 6 km: beyond every configured bracket
        assert_eq!(visiting_charge(&svc, 6.0), VisitingQuote::NeedsConfirmation);
    }

    #[test]
    fn test_visiting_charge_beyond_all_brackets() {
        let svc = service(None, [Some(8000), None, None, None, Some(25000)]);
        assert_eq!(visiting_charge(&svc, 7.5), VisitingQuote::NeedsConfirmation);
    }

    #[test]
    fn test_visiting_charge_unknown_distance_with_brackets() {
        let svc = service(None, [Some(8000), None, None, None, None]);
        assert_eq!(visiting_charge(&svc, 0.0), VisitingQuote::NeedsConfirmation);
    }

    #[test]
    fn test_visiting_charge_flat_ignores_distance() {
        let svc = service(Some(20000), [None, None, None, None, None]);

        assert_eq!(
            visiting_charge(&svc, 1.0),
            VisitingQuote::Priced(Money::from_paise(20000))
        );
        // Flat attendance fee holds even far out or with unknown distance
        assert_eq!(
            visiting_charge(&svc, 12.0),
            VisitingQuote::Priced(Money::from_paise(20000))
        );
        assert_eq!(
            visiting_charge(&svc, 0.0),
            VisitingQuote::Priced(Money::from_paise(20000))
        );
    }

    #[test]
    fn test_visiting_charge_nothing_configured() {
        let svc = service(None, [None, None, None, None, None]);
        assert_eq!(visiting_charge(&svc, 1.0), VisitingQuote::NeedsConfirmation);
    }
}
