//! In-memory [`Backend`] reference implementation.
//!
//! Ships as a documented reference/testing backend, the same way this
//! crate's teacher always ships one concrete, always-available storage
//! implementation alongside its trait. Not durable across process restarts;
//! real deployments plug in their own backend.

use super::Backend;
use crate::commit::Commit;
use crate::error::Result;
use crate::model::{BySetting, DefaultValue, ListBySetting, OverrideValue, OverridesSnapshot, SettingMetadata, SubAppId, SubAppMetadata};
use crate::sync::RwLockExt;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Default)]
struct AppRecord {
    commit: Commit,
    overrides: ListBySetting<OverrideValue>,
    sub_apps: Option<Vec<SubAppMetadata>>,
    metadata: Option<BySetting<SettingMetadata>>,
    defaults: HashMap<SubAppId, Vec<DefaultValue>>,
    push: Vec<Arc<dyn Fn() + Send + Sync>>,
}

impl AppRecord {
    fn snapshot(&self, app_name: &str) -> OverridesSnapshot {
        OverridesSnapshot {
            app_name: app_name.to_string(),
            commit: self.commit,
            overrides: self.overrides.clone(),
        }
    }
}

fn notify_all(push: &[Arc<dyn Fn() + Send + Sync>]) {
    for callback in push {
        callback();
    }
}

/// Process-local backend. Every app starts with an empty, commit-initial
/// snapshot the first time it's touched.
#[derive(Default)]
pub struct InMemoryBackend {
    apps: RwLock<HashMap<String, AppRecord>>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for InMemoryBackend {
    fn get_app_names(&self) -> Result<Vec<String>> {
        Ok(self.apps.read_recovered()?.keys().cloned().collect())
    }

    fn get_current_commit(&self, app_name: &str) -> Result<Commit> {
        Ok(self
            .apps
            .read_recovered()?
            .get(app_name)
            .map_or(Commit::INITIAL, |r| r.commit))
    }

    fn get_snapshot(&self, app_name: &str) -> Result<OverridesSnapshot> {
        Ok(self
            .apps
            .read_recovered()?
            .get(app_name)
            .map_or_else(|| OverridesSnapshot::initial(app_name), |r| r.snapshot(app_name)))
    }

    fn set_override(
        &self,
        app_name: &str,
        value: OverrideValue,
        user: Option<&str>,
        expected_commit: Option<Commit>,
    ) -> Result<Option<OverridesSnapshot>> {
        let (snapshot, push) = {
            let mut apps = self.apps.write_recovered()?;
            let record = apps.entry(app_name.to_string()).or_default();

            if let Some(expected) = expected_commit {
                if record.commit != expected {
                    return Ok(None);
                }
            }

            let bucket = record.overrides.entry(value.name.clone()).or_default();
            bucket.retain(|existing| (existing.sub_app_id, existing.data_center) != (value.sub_app_id, value.data_center));
            bucket.push(value);

            record.commit = Commit::generate();
            log::info!(target: "nfig::backend", "set_override on '{app_name}' by {user:?}, new commit {}", record.commit);
            (record.snapshot(app_name), record.push.clone())
        };
        notify_all(&push);
        Ok(Some(snapshot))
    }

    fn clear_override(
        &self,
        app_name: &str,
        setting_name: &str,
        data_center: u32,
        sub_app_id: SubAppId,
        user: Option<&str>,
        expected_commit: Option<Commit>,
    ) -> Result<Option<OverridesSnapshot>> {
        let (snapshot, push) = {
            let mut apps = self.apps.write_recovered()?;
            let record = apps.entry(app_name.to_string()).or_default();

            if let Some(expected) = expected_commit {
                if record.commit != expected {
                    return Ok(None);
                }
            }

            if let Some(bucket) = record.overrides.get_mut(setting_name) {
                bucket.retain(|existing| (existing.sub_app_id, existing.data_center) != (sub_app_id, data_center));
                if bucket.is_empty() {
                    record.overrides.remove(setting_name);
                }
            }

            // Bumping the commit even when nothing matched keeps clear_override
            // idempotent-but-visible: callers polling on commit still observe
            // that the operation was accepted.
            record.commit = Commit::generate();
            log::info!(target: "nfig::backend", "clear_override on '{app_name}' by {user:?}, new commit {}", record.commit);
            (record.snapshot(app_name), record.push.clone())
        };
        notify_all(&push);
        Ok(Some(snapshot))
    }

    fn restore_snapshot(
        &self,
        app_name: &str,
        snapshot: &OverridesSnapshot,
        user: Option<&str>,
    ) -> Result<OverridesSnapshot> {
        let (result, push) = {
            let mut apps = self.apps.write_recovered()?;
            let record = apps.entry(app_name.to_string()).or_default();
            record.overrides = snapshot.overrides.clone();
            record.commit = Commit::generate();
            log::info!(target: "nfig::backend", "restore_snapshot on '{app_name}' by {user:?}, new commit {}", record.commit);
            (record.snapshot(app_name), record.push.clone())
        };
        notify_all(&push);
        Ok(result)
    }

    fn update_sub_apps(&self, app_name: &str, sub_apps: Vec<SubAppMetadata>) -> Result<()> {
        let mut apps = self.apps.write_recovered()?;
        let record = apps.entry(app_name.to_string()).or_default();
        for m in &sub_apps {
            record.defaults.insert(m.sub_app_id, m.defaults_by_setting.values().cloned().collect());
        }
        record.sub_apps = Some(sub_apps);
        Ok(())
    }

    fn set_metadata(&self, app_name: &str, metadata: BySetting<SettingMetadata>) -> Result<()> {
        let mut apps = self.apps.write_recovered()?;
        apps.entry(app_name.to_string()).or_default().metadata = Some(metadata);
        Ok(())
    }

    fn get_sub_apps(&self, app_name: &str) -> Result<Option<Vec<SubAppMetadata>>> {
        Ok(self.apps.read_recovered()?.get(app_name).and_then(|r| r.sub_apps.clone()))
    }

    fn get_settings_metadata(&self, app_name: &str) -> Result<Option<BySetting<SettingMetadata>>> {
        Ok(self.apps.read_recovered()?.get(app_name).and_then(|r| r.metadata.clone()))
    }

    fn get_defaults(&self, app_name: &str, sub_app_id: SubAppId) -> Result<Option<Vec<DefaultValue>>> {
        Ok(self
            .apps
            .read_recovered()?
            .get(app_name)
            .and_then(|r| r.defaults.get(&sub_app_id).cloned()))
    }

    fn subscribe_push(&self, app_name: &str, notify: Arc<dyn Fn() + Send + Sync>) {
        if let Ok(mut apps) = self.apps.write_recovered() {
            apps.entry(app_name.to_string()).or_default().push.push(notify);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_override(name: &str, value: &str) -> OverrideValue {
        OverrideValue {
            name: name.to_string(),
            string_value: value.to_string(),
            sub_app_id: None,
            data_center: 0,
            expiration_time: None,
        }
    }

    #[test]
    fn unknown_app_yields_initial_snapshot() {
        let backend = InMemoryBackend::new();
        let snapshot = backend.get_snapshot("nope").unwrap();
        assert!(snapshot.commit.is_initial());
    }

    #[test]
    fn set_override_bumps_commit_and_is_visible() {
        let backend = InMemoryBackend::new();
        let snapshot = backend
            .set_override("app", sample_override("Rate", "10"), Some("alice"), None)
            .unwrap()
            .unwrap();
        assert!(!snapshot.commit.is_initial());
        assert_eq!(snapshot.overrides["Rate"][0].string_value, "10");
    }

    #[test]
    fn set_override_rejects_stale_expected_commit() {
        let backend = InMemoryBackend::new();
        backend.set_override("app", sample_override("Rate", "10"), None, None).unwrap();
        let result = backend
            .set_override("app", sample_override("Rate", "20"), None, Some(Commit::INITIAL))
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn clear_override_bumps_commit_even_when_absent() {
        let backend = InMemoryBackend::new();
        let before = backend.get_current_commit("app").unwrap();
        let snapshot = backend
            .clear_override("app", "Rate", 0, None, None, None)
            .unwrap()
            .unwrap();
        assert_ne!(snapshot.commit, before);
    }

    #[test]
    fn restore_snapshot_replaces_overrides_wholesale() {
        let backend = InMemoryBackend::new();
        backend.set_override("app", sample_override("Rate", "10"), None, None).unwrap();
        let mut replacement = OverridesSnapshot::initial("app");
        replacement.overrides.insert("Other".to_string(), vec![sample_override("Other", "5")]);
        let result = backend.restore_snapshot("app", &replacement, None).unwrap();
        assert!(!result.overrides.contains_key("Rate"));
        assert!(result.overrides.contains_key("Other"));
    }

    #[test]
    fn push_subscribers_fire_on_mutation() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let backend = InMemoryBackend::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        backend.subscribe_push("app", Arc::new(move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        }));
        backend.set_override("app", sample_override("Rate", "10"), None, None).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
