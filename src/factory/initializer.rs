//! Compiled-initializer replacement: merge the active default/override for
//! every setting into one JSON value, then deserialize it into `Schema`.
//!
//! This is the systems-language substitute for the source's per-leaf
//! generated accessors (see the dependency-order note in the crate root
//! docs): instead of a closure pair per setting, every setting's active
//! string value is parsed once via its converter and folded into a
//! `serde_json::Value` tree shaped like the dotted setting names, which
//! `serde_json::from_value` then materializes into the user's struct.

use crate::config::SettingDef;
use crate::encryptor::Encryptor;
use crate::error::{Error, InvalidOverrideEntry, Result};
use crate::model::{DefaultValue, OverridesSnapshot, SubAppId};
use crate::specificity::{DataCenterId, Scope, TierId, outranks};
use std::collections::HashMap;
use time::OffsetDateTime;

use super::overrides::active_override;

pub(crate) fn active_default<'a>(
    candidates: &'a [DefaultValue],
    target_sub_app: SubAppId,
    tier: TierId,
    data_center: DataCenterId,
) -> Option<&'a DefaultValue> {
    let mut best: Option<(&DefaultValue, Scope)> = None;
    for candidate in candidates {
        let scope = Scope::new(candidate.sub_app_id, candidate.tier, candidate.data_center);
        if !scope.matches(target_sub_app, tier, data_center) {
            continue;
        }
        match &best {
            None => best = Some((candidate, scope)),
            Some((_, best_scope)) => {
                if outranks(&scope, false, best_scope, false) {
                    best = Some((candidate, scope));
                }
            }
        }
    }
    best.map(|(v, _)| v)
}

fn set_dotted(root: &mut serde_json::Map<String, serde_json::Value>, path: &str, value: serde_json::Value) {
    let mut segments = path.split('.').peekable();
    let mut current = root;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
        current = entry.as_object_mut().expect("nested setting group collides with a leaf setting");
    }
}

/// Resolve every setting's active value and fold the result into a single
/// merged JSON object, ready for `serde_json::from_value`.
///
/// Returns the merged tree plus the list of override parse failures
/// encountered (each such setting falls back to its active default so the
/// rest of the object remains fully populated).
///
/// # Errors
/// Returns [`crate::error::Error::MissingEncryptor`] or
/// [`crate::error::Error::EncryptorError`] if an encrypted setting's active
/// *default* is ciphertext and cannot be decrypted; unlike a bad override,
/// there is no plaintext fallback for a default, so this is fatal rather
/// than recorded as a per-entry [`InvalidOverrideEntry`].
pub(crate) fn merge_values(
    defs: &HashMap<String, SettingDef>,
    defaults_by_setting: &HashMap<String, Vec<DefaultValue>>,
    snapshot: &OverridesSnapshot,
    target_sub_app: SubAppId,
    tier: TierId,
    data_center: DataCenterId,
    encryptor: Option<&dyn Encryptor>,
) -> Result<(serde_json::Value, Vec<InvalidOverrideEntry>)> {
    let mut root = serde_json::Map::new();
    let mut errors = Vec::new();
    let now = OffsetDateTime::now_utc();

    for (name, def) in defs {
        let empty = Vec::new();
        let default_candidates = defaults_by_setting.get(name).unwrap_or(&empty);
        let Some(active_def) = active_default(default_candidates, target_sub_app, tier, data_center) else {
            // A root default always exists by construction invariant; absence here
            // means the schema was built without registering this sub-app's
            // defaults yet, so fall back to the type's implicit null.
            continue;
        };

        let override_candidates = snapshot.overrides.get(name).map(Vec::as_slice).unwrap_or(&[]);
        let active = if active_def.allows_overrides {
            active_override(override_candidates, target_sub_app, data_center, now)
        } else {
            None
        };

        let (raw, is_ciphertext, raw_key, used_override) = match active {
            Some(o) => (o.string_value.as_str(), def.is_encrypted, format!("{},{:?};{}", o.data_center, o.sub_app_id, o.name), true),
            None => (active_def.string_value.as_str(), def.is_encrypted && is_ciphertext_default(active_def), String::new(), false),
        };

        let plaintext_owned;
        let plaintext: &str = if is_ciphertext {
            match decrypt(encryptor, raw) {
                Ok(p) => {
                    plaintext_owned = p;
                    &plaintext_owned
                }
                Err(reason) => {
                    if used_override {
                        errors.push(InvalidOverrideEntry {
                            setting_name: name.clone(),
                            raw_key,
                            reason,
                        });
                        set_dotted(&mut root, name, fallback_value(def, active_def, encryptor));
                        continue;
                    }
                    // The active value is a ciphertext *default*, not an override:
                    // there is no fallback plaintext to fall back to, so a failed
                    // decrypt here is fatal rather than a per-entry parse failure.
                    return Err(if encryptor.is_none() {
                        Error::MissingEncryptor(name.clone())
                    } else {
                        Error::EncryptorError(reason)
                    });
                }
            }
        } else {
            raw
        };

        match def.converter.from_string_value(plaintext) {
            Ok(value) => set_dotted(&mut root, name, value),
            Err(e) => {
                if used_override {
                    errors.push(InvalidOverrideEntry {
                        setting_name: name.clone(),
                        raw_key,
                        reason: e.to_string(),
                    });
                    set_dotted(&mut root, name, fallback_value(def, active_def, encryptor));
                } else {
                    // Default values are round-trip validated at registration
                    // time; reaching here indicates a logic error, not bad
                    // runtime input. Fall back to null rather than panic.
                    set_dotted(&mut root, name, serde_json::Value::Null);
                }
            }
        }
    }

    Ok((serde_json::Value::Object(root), errors))
}

fn is_ciphertext_default(default: &DefaultValue) -> bool {
    // The root zero-value default of an encrypted setting is plaintext; any
    // other default on an encrypted setting must already be ciphertext.
    !default.is_root()
}

fn fallback_value(def: &SettingDef, active_def: &DefaultValue, encryptor: Option<&dyn Encryptor>) -> serde_json::Value {
    let plaintext = if def.is_encrypted && is_ciphertext_default(active_def) {
        match decrypt(encryptor, &active_def.string_value) {
            Ok(p) => p,
            Err(_) => return serde_json::Value::Null,
        }
    } else {
        active_def.string_value.clone()
    };
    def.converter
        .from_string_value(&plaintext)
        .unwrap_or(serde_json::Value::Null)
}

fn decrypt(encryptor: Option<&dyn Encryptor>, ciphertext: &str) -> std::result::Result<String, String> {
    let Some(encryptor) = encryptor else {
        return Err("setting is encrypted but no Encryptor is configured".to_string());
    };
    encryptor
        .decrypt(Some(ciphertext))
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "encryptor returned no plaintext for a non-null ciphertext".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::PrimitiveType;
    use crate::model::OverridesSnapshot;
    use std::collections::HashMap;

    fn defs_with(name: &str, root_default: i64) -> HashMap<String, SettingDef> {
        let mut map = HashMap::new();
        map.insert(
            name.to_string(),
            SettingDef::new(name, PrimitiveType::I32, root_default).build().unwrap(),
        );
        map
    }

    #[test]
    fn root_only_read_uses_root_default() {
        let defs = defs_with("Foo.Bar", 7);
        let mut defaults = HashMap::new();
        defaults.insert(
            "Foo.Bar".to_string(),
            vec![DefaultValue::root("Foo.Bar", "7")],
        );
        let snapshot = OverridesSnapshot::initial("app");
        let (value, errors) = merge_values(&defs, &defaults, &snapshot, None, 1, 1, None).unwrap();
        assert!(errors.is_empty());
        assert_eq!(value["Foo"]["Bar"], serde_json::json!(7));
    }

    #[test]
    fn dotted_names_build_nested_objects() {
        let defs = defs_with("A.B.C", 1);
        let mut defaults = HashMap::new();
        defaults.insert("A.B.C".to_string(), vec![DefaultValue::root("A.B.C", "1")]);
        let snapshot = OverridesSnapshot::initial("app");
        let (value, _) = merge_values(&defs, &defaults, &snapshot, None, 0, 0, None).unwrap();
        assert_eq!(value["A"]["B"]["C"], serde_json::json!(1));
    }

    #[test]
    fn ciphertext_default_without_encryptor_is_fatal() {
        use crate::config::SettingDef;

        let mut defs = HashMap::new();
        defs.insert(
            "Secret".to_string(),
            SettingDef::encrypted("Secret", PrimitiveType::String, "").build().unwrap(),
        );
        let mut defaults = HashMap::new();
        defaults.insert(
            "Secret".to_string(),
            vec![
                DefaultValue::root("Secret", ""),
                DefaultValue {
                    name: "Secret".to_string(),
                    string_value: "ciphertext-blob".to_string(),
                    sub_app_id: None,
                    tier: 1,
                    data_center: 0,
                    allows_overrides: true,
                },
            ],
        );
        let snapshot = OverridesSnapshot::initial("app");
        let err = merge_values(&defs, &defaults, &snapshot, None, 1, 0, None).unwrap_err();
        assert!(matches!(err, crate::error::Error::MissingEncryptor(_)));
    }
}
