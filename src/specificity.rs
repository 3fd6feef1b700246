//! Specificity ordering over default/override scope triples.
//!
//! A scope is the triple `(subApp, tier, dataCenter)` a default or override
//! was registered against. Resolution always prefers the most specific scope
//! that matches the caller's actual `(subApp, tier, dataCenter)`.

use serde::{Deserialize, Serialize};

/// A tier identifier. `0` means "any tier" (REDESIGN FLAGS: tagged integer
/// sets instead of a generic enum type parameter).
pub type TierId = u32;

/// A data center identifier. `0` means "any data center".
pub type DataCenterId = u32;

/// Tier/data-center value meaning "matches any value of this axis".
pub const ANY_TIER: TierId = 0;
pub const ANY_DATA_CENTER: DataCenterId = 0;

/// The scope a default or override value was registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub sub_app: Option<u32>,
    pub tier: TierId,
    pub data_center: DataCenterId,
}

impl Scope {
    #[must_use]
    pub fn root() -> Self {
        Self {
            sub_app: None,
            tier: ANY_TIER,
            data_center: ANY_DATA_CENTER,
        }
    }

    #[must_use]
    pub fn new(sub_app: Option<u32>, tier: TierId, data_center: DataCenterId) -> Self {
        Self {
            sub_app,
            tier,
            data_center,
        }
    }

    /// Whether this scope matches a concrete `(subApp, tier, dataCenter)`
    /// triple. Any axis fixed to "any" matches unconditionally; a fixed
    /// `sub_app` must equal the caller's sub-app exactly.
    #[must_use]
    pub fn matches(&self, sub_app: Option<u32>, tier: TierId, data_center: DataCenterId) -> bool {
        let sub_app_ok = match self.sub_app {
            None => true,
            Some(s) => Some(s) == sub_app,
        };
        let tier_ok = self.tier == ANY_TIER || self.tier == tier;
        let dc_ok = self.data_center == ANY_DATA_CENTER || self.data_center == data_center;
        sub_app_ok && tier_ok && dc_ok
    }

    fn rank_tuple(&self, is_override: bool) -> (bool, bool, bool, bool) {
        (
            is_override,
            self.sub_app.is_some(),
            self.tier != ANY_TIER,
            self.data_center != ANY_DATA_CENTER,
        )
    }
}

/// A total ordering key for a candidate value: overrides outrank defaults,
/// and within a kind a more specific scope outranks a less specific one.
/// Lexicographic tuple order gives transitivity and antisymmetry for free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SpecificityRank(bool, bool, bool, bool);

impl SpecificityRank {
    #[must_use]
    pub fn of(scope: &Scope, is_override: bool) -> Self {
        let (a, b, c, d) = scope.rank_tuple(is_override);
        Self(a, b, c, d)
    }
}

/// Picks the most specific of two candidate scopes that both match the same
/// request, given whether each is an override. Returns `true` if `candidate`
/// outranks `current`.
#[must_use]
pub fn outranks(
    candidate: &Scope,
    candidate_is_override: bool,
    current: &Scope,
    current_is_override: bool,
) -> bool {
    SpecificityRank::of(candidate, candidate_is_override)
        > SpecificityRank::of(current, current_is_override)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_scope_matches_everything() {
        let s = Scope::root();
        assert!(s.matches(None, 0, 0));
        assert!(s.matches(Some(7), 3, 7));
    }

    #[test]
    fn fixed_sub_app_requires_exact_match() {
        let s = Scope::new(Some(7), ANY_TIER, ANY_DATA_CENTER);
        assert!(s.matches(Some(7), 1, 1));
        assert!(!s.matches(Some(8), 1, 1));
        assert!(!s.matches(None, 1, 1));
    }

    #[test]
    fn override_always_outranks_default() {
        let root = Scope::root();
        assert!(outranks(&root, true, &root, false));
        assert!(!outranks(&root, false, &root, true));
    }

    #[test]
    fn sub_app_outranks_tier_and_data_center() {
        let by_sub_app = Scope::new(Some(7), ANY_TIER, ANY_DATA_CENTER);
        let by_tier_and_dc = Scope::new(None, 2, 3);
        assert!(outranks(&by_sub_app, false, &by_tier_and_dc, false));
    }

    #[test]
    fn more_axes_fixed_outranks_fewer() {
        let one_axis = Scope::new(None, 2, ANY_DATA_CENTER);
        let two_axes = Scope::new(None, 2, 3);
        assert!(outranks(&two_axes, false, &one_axis, false));
    }

    #[test]
    fn ordering_is_transitive_and_antisymmetric() {
        let a = Scope::root();
        let b = Scope::new(None, 1, ANY_DATA_CENTER);
        let c = Scope::new(None, 1, 1);
        assert!(outranks(&b, false, &a, false));
        assert!(outranks(&c, false, &b, false));
        assert!(outranks(&c, false, &a, false));
        assert!(!outranks(&a, false, &c, false));
    }
}
