//! Mutation-side façade: overrides, snapshots, encryption passthrough.

use crate::commit::Commit;
use crate::config::SettingsSchema;
use crate::error::{Error, Result};
use crate::model::{OverrideValue, OverridesSnapshot, SubApp, SubAppId};
use crate::specificity::DataCenterId;
use crate::store::Store;
use std::sync::Arc;
use time::OffsetDateTime;

/// Thin façade pinned to `(Arc<Store>, appName)`. Independent of the
/// settings type binding — usable without ever instantiating an
/// [`super::AppClient`].
pub struct AdminClient<Schema: SettingsSchema> {
    store: Arc<Store<Schema>>,
}

impl<Schema: SettingsSchema> AdminClient<Schema> {
    #[must_use]
    pub fn new(store: Arc<Store<Schema>>) -> Self {
        Self { store }
    }

    /// # Errors
    /// Propagates backend errors.
    pub fn get_sub_apps(&self) -> Result<Vec<SubApp>> {
        Ok(self
            .store
            .backend()
            .get_sub_apps(self.store.app_name())?
            .unwrap_or_default()
            .into_iter()
            .map(|m| SubApp {
                id: m.sub_app_id,
                name: m.sub_app_name,
            })
            .collect())
    }

    /// # Errors
    /// Propagates backend errors.
    pub fn get_current_commit(&self) -> Result<Commit> {
        self.store.get_current_commit()
    }

    /// # Errors
    /// Propagates backend errors. Returns `Ok(None)` on a commit mismatch.
    #[allow(clippy::too_many_arguments)]
    pub fn set_override(
        &self,
        name: &str,
        string_value: &str,
        data_center: DataCenterId,
        sub_app_id: SubAppId,
        user: Option<&str>,
        expected_commit: Option<Commit>,
        expiration_time: Option<OffsetDateTime>,
    ) -> Result<Option<OverridesSnapshot>> {
        let value = OverrideValue {
            name: name.to_string(),
            string_value: string_value.to_string(),
            sub_app_id,
            data_center,
            expiration_time,
        };
        self.store.set_override(value, user, expected_commit)
    }

    /// # Errors
    /// Propagates backend errors. Returns `Ok(None)` on a commit mismatch.
    pub fn clear_override(
        &self,
        name: &str,
        data_center: DataCenterId,
        sub_app_id: SubAppId,
        user: Option<&str>,
        expected_commit: Option<Commit>,
    ) -> Result<Option<OverridesSnapshot>> {
        self.store.clear_override(name, data_center, sub_app_id, user, expected_commit)
    }

    /// # Errors
    /// Propagates backend errors.
    pub fn get_snapshot(&self) -> Result<Arc<OverridesSnapshot>> {
        self.store.get_snapshot()
    }

    /// # Errors
    /// Propagates backend errors.
    pub fn restore_snapshot(&self, snapshot: &OverridesSnapshot, user: Option<&str>) -> Result<OverridesSnapshot> {
        self.store.restore_snapshot(snapshot, user)
    }

    /// # Errors
    /// Returns [`Error::MissingEncryptor`] if no encryptor is configured, or
    /// propagates the encryptor's own error.
    pub fn encrypt(&self, plaintext: Option<&str>) -> Result<Option<String>> {
        self.store
            .encryptor()?
            .ok_or_else(|| Error::MissingEncryptor(self.store.app_name().to_string()))?
            .encrypt(plaintext)
    }

    /// # Errors
    /// Returns [`Error::MissingEncryptor`] if no encryptor is configured, or
    /// propagates the encryptor's own error.
    pub fn decrypt(&self, ciphertext: Option<&str>) -> Result<Option<String>> {
        self.store
            .encryptor()?
            .ok_or_else(|| Error::MissingEncryptor(self.store.app_name().to_string()))?
            .decrypt(ciphertext)
    }

    /// Whether this process has a converter available for `name` (either
    /// built-in or previously loaded).
    #[must_use]
    pub fn can_validate(&self, name: &str) -> bool {
        self.store.factory().converter_for(name).is_some()
    }

    /// Best-effort validation: parses `value` through the setting's
    /// converter if one is known in this process; otherwise accepts the
    /// string unconditionally and lets the eventual consumer error on load.
    #[must_use]
    pub fn is_valid_for_setting(&self, name: &str, value: &str) -> bool {
        match self.store.factory().converter_for(name) {
            Some(converter) => converter.from_string_value(value).is_ok(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::config::SettingDef;
    use crate::converters::PrimitiveType;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Schema {
        #[serde(rename = "Rate")]
        rate: i32,
    }

    impl SettingsSchema for Schema {
        fn setting_defs() -> Result<Vec<SettingDef>> {
            Ok(vec![SettingDef::new("Rate", PrimitiveType::I32, 1).build()?])
        }
    }

    fn admin() -> AdminClient<Schema> {
        let backend = Arc::new(InMemoryBackend::new());
        let store = Arc::new(Store::<Schema>::new("app", 0, 0, backend).unwrap());
        store.factory().register_root_app().unwrap();
        AdminClient::new(store)
    }

    #[test]
    fn set_override_with_cas_success_then_stale_then_fresh() {
        let admin = admin();
        let c0 = admin.get_current_commit().unwrap();
        let snapshot = admin.set_override("Rate", "10", 0, None, Some("u"), Some(c0), None).unwrap().unwrap();
        let c1 = snapshot.commit;
        assert_ne!(c0, c1);
        assert!(admin.set_override("Rate", "99", 0, None, Some("u"), Some(c0), None).unwrap().is_none());
        assert!(admin.set_override("Rate", "20", 0, None, Some("u"), Some(c1), None).unwrap().is_some());
    }

    #[test]
    fn is_valid_for_setting_round_trips_known_converter() {
        let admin = admin();
        assert!(admin.is_valid_for_setting("Rate", "42"));
        assert!(!admin.is_valid_for_setting("Rate", "not-an-int"));
    }

    #[test]
    fn is_valid_for_setting_accepts_unknown_setting_best_effort() {
        let admin = admin();
        assert!(admin.is_valid_for_setting("Mystery", "anything"));
        assert!(!admin.can_validate("Mystery"));
    }

    #[test]
    fn encrypt_without_encryptor_is_an_error() {
        let admin = admin();
        assert!(admin.encrypt(Some("x")).is_err());
    }
}
