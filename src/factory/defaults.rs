//! Default collection: turning a [`SettingDef`]'s declared default records
//! into the filtered, stringified list used by one sub-app registration.

use crate::config::SettingDef;
use crate::error::{Error, Result};
use crate::model::{DefaultValue, SubAppId};
use crate::specificity::TierId;
use std::collections::HashMap;

/// Collect the per-setting default list visible to a registration of
/// `target_sub_app` at `tier`. Root registrations (`target_sub_app = None`)
/// only ever see root-scoped records; sub-app registrations see their own
/// records plus every root-scoped record.
///
/// # Errors
/// Returns [`Error::InvalidDefaultValue`] if a declared default cannot be
/// stringified by its setting's converter.
pub(crate) fn collect_defaults(
    defs: &HashMap<String, SettingDef>,
    target_sub_app: SubAppId,
    tier: TierId,
) -> Result<HashMap<String, Vec<DefaultValue>>> {
    let mut out = HashMap::with_capacity(defs.len());

    for def in defs.values() {
        let mut values = Vec::new();

        for record in &def.defaults {
            let tier_ok = record.tier == crate::specificity::ANY_TIER || record.tier == tier;
            if !tier_ok {
                continue;
            }
            let sub_app_ok = match target_sub_app {
                None => record.sub_app_id.is_none(),
                Some(target) => record.sub_app_id.is_none() || record.sub_app_id == Some(target),
            };
            if !sub_app_ok {
                continue;
            }

            let string_value = if record.is_ciphertext {
                record
                    .value
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::InvalidDefaultValue {
                        key: def.name.clone(),
                        reason: "encrypted default must be a ciphertext string".into(),
                    })?
            } else {
                def.converter
                    .to_string_value(&record.value)
                    .map_err(|_| Error::InvalidDefaultValue {
                        key: def.name.clone(),
                        reason: format!("value does not match declared type {}", def.converter.type_name()),
                    })?
            };

            // Round-trip validation: a default that cannot be parsed back is
            // a fatal schema error, not a deferred runtime failure.
            if !record.is_ciphertext {
                def.converter
                    .from_string_value(&string_value)
                    .map_err(|_| Error::InvalidDefaultValue {
                        key: def.name.clone(),
                        reason: "default value does not round-trip through its converter".into(),
                    })?;
            }

            values.push(DefaultValue {
                name: def.name.clone(),
                string_value,
                sub_app_id: record.sub_app_id,
                tier: record.tier,
                data_center: record.data_center,
                allows_overrides: record.allows_overrides,
            });
        }

        out.insert(def.name.clone(), values);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::PrimitiveType;

    fn defs_with_rate() -> HashMap<String, SettingDef> {
        let mut map = HashMap::new();
        let def = SettingDef::new("Rate", PrimitiveType::I32, 1)
            .default_for(5, None, 2, 0, true)
            .build()
            .unwrap();
        map.insert("Rate".to_string(), def);
        map
    }

    #[test]
    fn root_registration_sees_only_root_scoped_defaults_for_its_tier() {
        let defs = defs_with_rate();
        let collected = collect_defaults(&defs, None, 2).unwrap();
        let rate = &collected["Rate"];
        assert_eq!(rate.len(), 2);
    }

    #[test]
    fn tier_mismatch_is_discarded() {
        let defs = defs_with_rate();
        let collected = collect_defaults(&defs, None, 9).unwrap();
        let rate = &collected["Rate"];
        assert_eq!(rate.len(), 1);
        assert!(rate[0].is_root());
    }

    #[test]
    fn sub_app_specific_default_excluded_from_other_sub_apps() {
        let mut map = HashMap::new();
        let def = SettingDef::new("Quota", PrimitiveType::I32, 100)
            .default_for(200, Some(7), 0, 0, true)
            .build()
            .unwrap();
        map.insert("Quota".to_string(), def);

        let for_seven = collect_defaults(&map, Some(7), 0).unwrap();
        assert_eq!(for_seven["Quota"].len(), 2);

        let for_eight = collect_defaults(&map, Some(8), 0).unwrap();
        assert_eq!(for_eight["Quota"].len(), 1);
    }
}
