//! Core data-model entities: defaults, overrides, sub-apps, snapshots, and
//! the metadata published to a backend.

use crate::commit::Commit;
use crate::specificity::{ANY_DATA_CENTER, ANY_TIER, DataCenterId, TierId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// A sub-app id. `None` denotes the root app.
pub type SubAppId = Option<u32>;

/// A compile-time-declared value, scoped to `(subApp, tier, dataCenter)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultValue {
    pub name: String,
    pub string_value: String,
    pub sub_app_id: SubAppId,
    pub tier: TierId,
    pub data_center: DataCenterId,
    pub allows_overrides: bool,
}

impl DefaultValue {
    #[must_use]
    pub fn root(name: impl Into<String>, string_value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            string_value: string_value.into(),
            sub_app_id: None,
            tier: ANY_TIER,
            data_center: ANY_DATA_CENTER,
            allows_overrides: true,
        }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.sub_app_id.is_none() && self.tier == ANY_TIER && self.data_center == ANY_DATA_CENTER
    }

    /// The `(subAppId, tier, dataCenter)` triple this default is keyed on,
    /// for duplicate-default detection.
    #[must_use]
    pub fn key_triple(&self) -> (SubAppId, TierId, DataCenterId) {
        (self.sub_app_id, self.tier, self.data_center)
    }
}

/// A runtime-declared override. Tier is implicit (the store's own tier).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideValue {
    pub name: String,
    pub string_value: String,
    pub sub_app_id: SubAppId,
    pub data_center: DataCenterId,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expiration_time: Option<OffsetDateTime>,
}

impl OverrideValue {
    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        matches!(self.expiration_time, Some(exp) if exp <= now)
    }

    /// The `(settingName, subAppId, dataCenter)` storage key.
    #[must_use]
    pub fn storage_key(&self) -> (String, SubAppId, DataCenterId) {
        (self.name.clone(), self.sub_app_id, self.data_center)
    }
}

/// `(id, name)` pair identifying a tenant under an app. `id = None` is root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubApp {
    pub id: Option<u32>,
    pub name: String,
}

/// Metadata for one setting, derived from the schema and published to the
/// backend for introspection/admin tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingMetadata {
    pub name: String,
    pub description: Option<String>,
    pub type_name: String,
    pub is_encrypted: bool,
    pub is_enum: bool,
    pub converter_type_name: String,
    pub is_default_converter: bool,
    pub change_requires_restart: bool,
}

/// Per-sub-app defaults published to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubAppMetadata {
    pub app_name: String,
    pub sub_app_id: Option<u32>,
    pub sub_app_name: String,
    pub defaults_by_setting: BySetting<DefaultValue>,
}

/// An alphabetically-ordered map keyed by setting name. `BTreeMap` gives the
/// ordering guarantee for free on both sides of a JSON round-trip.
pub type BySetting<T> = BTreeMap<String, T>;

/// As [`BySetting`], but each setting may have several values (e.g. one
/// override per `(subApp, dataCenter)` pair).
pub type ListBySetting<T> = BTreeMap<String, Vec<T>>;

/// Immutable `(commit, overrides)` pair for one app at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverridesSnapshot {
    pub app_name: String,
    pub commit: Commit,
    pub overrides: ListBySetting<OverrideValue>,
}

impl OverridesSnapshot {
    #[must_use]
    pub fn initial(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            commit: Commit::INITIAL,
            overrides: ListBySetting::new(),
        }
    }

    /// Iterate every override value across all settings.
    pub fn iter_all(&self) -> impl Iterator<Item = &OverrideValue> {
        self.overrides.values().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_default_has_any_scope() {
        let d = DefaultValue::root("Foo.Bar", "7");
        assert!(d.is_root());
        assert_eq!(d.key_triple(), (None, ANY_TIER, ANY_DATA_CENTER));
    }

    #[test]
    fn override_expiration_is_checked_against_now() {
        let past = OffsetDateTime::UNIX_EPOCH;
        let o = OverrideValue {
            name: "Rate".into(),
            string_value: "10".into(),
            sub_app_id: None,
            data_center: 0,
            expiration_time: Some(past),
        };
        assert!(o.is_expired(OffsetDateTime::now_utc()));
    }

    #[test]
    fn snapshot_initial_has_nil_commit_and_no_overrides() {
        let s = OverridesSnapshot::initial("my-app");
        assert!(s.commit.is_initial());
        assert_eq!(s.iter_all().count(), 0);
    }
}
