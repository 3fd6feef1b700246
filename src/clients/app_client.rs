//! Read-side façade: settings retrieval, reflection helpers, subscriptions.

use super::Settings;
use crate::commit::Commit;
use crate::config::SettingsSchema;
use crate::error::{Error, Result};
use crate::model::SubAppId;
use crate::store::Store;
use crate::store::subscriptions::{RootCallback, SubAppsCallback, SubscriptionToken};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Thin façade pinned to `(Arc<Store>, appName)`. Holds the "root
/// registered" flag so schema metadata and root defaults are pushed to the
/// backend exactly once.
pub struct AppClient<Schema: SettingsSchema> {
    store: Arc<Store<Schema>>,
    root_published: AtomicBool,
}

impl<Schema: SettingsSchema> AppClient<Schema> {
    #[must_use]
    pub fn new(store: Arc<Store<Schema>>) -> Self {
        Self {
            store,
            root_published: AtomicBool::new(false),
        }
    }

    fn ensure_root_published(&self) -> Result<()> {
        if self.root_published.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.store.factory().register_root_app()?;
        self.store.publish_schema()
    }

    /// # Errors
    /// Propagates backend/registration errors.
    pub fn get_settings(&self, sub_app: SubAppId) -> Result<Settings<Schema>> {
        self.ensure_root_published()?;
        let (value, commit, errors) = self.store.get_settings(sub_app)?;
        if !errors.is_empty() {
            log::warn!(
                target: "nfig::client",
                "{} invalid override(s) while materializing '{}': {:?}",
                errors.len(),
                self.store.app_name(),
                errors
            );
        }
        let sub_app_name = sub_app.and_then(|id| {
            self.store
                .factory()
                .sub_app_registrations()
                .into_iter()
                .find(|s| s.id == Some(id))
                .map(|s| s.name)
        });
        Ok(Settings {
            app_name: self.store.app_name().to_string(),
            commit,
            sub_app_id: sub_app,
            sub_app_name,
            tier: self.store.tier(),
            data_center: self.store.data_center(),
            value,
        })
    }

    /// # Errors
    /// Returns [`Error::AppNotRegistered`] if `settings` belongs to a
    /// different app, or propagates backend errors.
    pub fn is_current(&self, settings: &Settings<Schema>) -> Result<bool> {
        if settings.app_name != self.store.app_name() {
            return Err(Error::AppNotRegistered(settings.app_name.clone()));
        }
        Ok(self.store.get_current_commit()? == settings.commit)
    }

    /// # Errors
    /// Propagates backend errors.
    pub fn get_current_commit(&self) -> Result<Commit> {
        self.store.get_current_commit()
    }

    /// # Errors
    /// Propagates backend/registration errors.
    pub fn register_sub_apps(&self, sub_apps: Vec<(u32, String)>) -> Result<()> {
        self.ensure_root_published()?;
        self.store.publish_sub_apps(sub_apps)
    }

    /// Subscribe to root settings changes. Delivers once synchronously
    /// before returning.
    ///
    /// # Errors
    /// Propagates backend/registration errors.
    pub fn subscribe(&self, callback: RootCallback<Schema>) -> Result<SubscriptionToken> {
        self.ensure_root_published()?;
        self.store.ensure_push_registered();
        let snapshot = self.store.get_snapshot()?;
        self.store.subscriptions().subscribe_root(self.store.factory(), &snapshot, callback)
    }

    /// Subscribe to a set of sub-apps' settings changes. Delivers once
    /// synchronously before returning.
    ///
    /// # Errors
    /// Propagates backend/registration errors.
    pub fn subscribe_to_sub_apps(&self, sub_app_ids: Vec<u32>, callback: SubAppsCallback<Schema>) -> Result<SubscriptionToken> {
        self.store.ensure_push_registered();
        let snapshot = self.store.get_snapshot()?;
        self.store
            .subscriptions()
            .subscribe_sub_apps(self.store.factory(), &snapshot, sub_app_ids, callback)
    }

    /// Remove subscriptions matching `token`, or every subscription when
    /// `token` is `None`.
    ///
    /// # Errors
    /// Propagates lock-poison recovery failures.
    pub fn unsubscribe(&self, token: Option<SubscriptionToken>) -> Result<usize> {
        self.store.subscriptions().unsubscribe(token)
    }

    #[must_use]
    pub fn setting_exists(&self, name: &str) -> bool {
        self.store.factory().setting_exists(name)
    }

    #[must_use]
    pub fn get_setting_type(&self, name: &str) -> Option<&'static str> {
        self.store.factory().setting_type(name)
    }

    /// Read a setting's value out of an already-materialized [`Settings`] by
    /// dotted name.
    #[must_use]
    pub fn get_setting_value(&self, settings: &Settings<Schema>, name: &str) -> Option<serde_json::Value> {
        let value = serde_json::to_value(&settings.value).ok()?;
        let pointer = format!("/{}", name.replace('.', "/"));
        value.pointer(&pointer).cloned()
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
        #[serde(rename = "Foo")]
        foo: Foo,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Foo {
        #[serde(rename = "Bar")]
        bar: i32,
    }

    impl SettingsSchema for Schema {
        fn setting_defs() -> Result<Vec<SettingDef>> {
            Ok(vec![SettingDef::new("Foo.Bar", PrimitiveType::I32, 7).build()?])
        }
    }

    fn client() -> AppClient<Schema> {
        let backend = Arc::new(InMemoryBackend::new());
        let store = Arc::new(Store::<Schema>::new("app", 0, 0, backend).unwrap());
        AppClient::new(store)
    }

    #[test]
    fn root_only_default_read_matches_literal_scenario() {
        let client = client();
        let settings = client.get_settings(None).unwrap();
        assert_eq!(settings.foo.bar, 7);
        assert!(settings.commit.is_initial());
    }

    #[test]
    fn is_current_rejects_settings_from_a_different_app() {
        let client = client();
        let mut settings = client.get_settings(None).unwrap();
        settings.app_name = "other-app".to_string();
        assert!(client.is_current(&settings).is_err());
    }

    #[test]
    fn get_setting_value_reads_by_dotted_name() {
        let client = client();
        let settings = client.get_settings(None).unwrap();
        let value = client.get_setting_value(&settings, "Foo.Bar").unwrap();
        assert_eq!(value, serde_json::json!(7));
    }
}
