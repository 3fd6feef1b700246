//! Resolution of the active override for a setting, given a snapshot.

use crate::model::OverrideValue;
use crate::specificity::{ANY_TIER, DataCenterId, Scope, outranks};
use time::OffsetDateTime;

/// Pick the most specific non-expired override matching `(target_sub_app,
/// data_center)` among `candidates`, if any.
pub(crate) fn active_override<'a>(
    candidates: &'a [OverrideValue],
    target_sub_app: Option<u32>,
    data_center: DataCenterId,
    now: OffsetDateTime,
) -> Option<&'a OverrideValue> {
    let mut best: Option<(&OverrideValue, Scope)> = None;
    for candidate in candidates {
        if candidate.is_expired(now) {
            continue;
        }
        let scope = Scope::new(candidate.sub_app_id, ANY_TIER, candidate.data_center);
        if !scope.matches(target_sub_app, ANY_TIER, data_center) {
            continue;
        }
        match &best {
            None => best = Some((candidate, scope)),
            Some((_, best_scope)) => {
                if outranks(&scope, true, best_scope, true) {
                    best = Some((candidate, scope));
                }
            }
        }
    }
    best.map(|(v, _)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ov(sub_app: Option<u32>, dc: u32, value: &str) -> OverrideValue {
        OverrideValue {
            name: "Rate".into(),
            string_value: value.into(),
            sub_app_id: sub_app,
            data_center: dc,
            expiration_time: None,
        }
    }

    #[test]
    fn picks_most_specific_matching_override() {
        let values = vec![ov(None, 0, "1"), ov(None, 1, "2"), ov(Some(7), 1, "3")];
        let now = OffsetDateTime::now_utc();
        let active = active_override(&values, Some(7), 1, now).unwrap();
        assert_eq!(active.string_value, "3");
    }

    #[test]
    fn expired_overrides_are_ignored() {
        let mut expiring = ov(None, 0, "99");
        expiring.expiration_time = Some(OffsetDateTime::UNIX_EPOCH);
        let values = vec![expiring];
        let now = OffsetDateTime::now_utc();
        assert!(active_override(&values, None, 0, now).is_none());
    }

    #[test]
    fn mismatched_data_center_is_excluded() {
        let values = vec![ov(None, 5, "1")];
        let now = OffsetDateTime::now_utc();
        assert!(active_override(&values, None, 6, now).is_none());
    }
}
