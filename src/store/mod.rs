//! Per-process coordination layer: app registry state, snapshot cache,
//! subscriptions, and background polling against a pluggable [`Backend`].
//!
//! Grounded on `manager::mod`'s registry + caching split and `events.rs`'s
//! listener lists, generalized to commit-tracked delivery per Design Notes.

pub mod polling;
pub mod snapshot_cache;
pub mod subscriptions;

use crate::backend::Backend;
use crate::commit::Commit;
use crate::config::SettingsSchema;
use crate::encryptor::Encryptor;
use crate::error::{Error, Result};
use crate::factory::SettingsFactory;
use crate::log_event::{LogEvent, LogEventType};
use crate::model::{BySetting, OverrideValue, OverridesSnapshot, SettingMetadata, SubAppId, SubAppMetadata};
use crate::specificity::{DataCenterId, TierId};
use crate::sync::RwLockExt;
use polling::PollHandle;
use snapshot_cache::SnapshotCache;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;
use subscriptions::SubscriptionRegistry;
use time::OffsetDateTime;

/// Per-process object representing one backend connection for one app, at a
/// fixed `(tier, dataCenter)`.
pub struct Store<Schema: SettingsSchema> {
    app_name: String,
    tier: TierId,
    data_center: DataCenterId,
    backend: Arc<dyn Backend>,
    factory: Arc<SettingsFactory<Schema>>,
    encryptor: RwLock<Option<Arc<dyn Encryptor>>>,
    cache: SnapshotCache,
    subscriptions: SubscriptionRegistry<Schema>,
    poll: Mutex<Option<PollHandle>>,
    push_registered: AtomicBool,
}

impl<Schema: SettingsSchema> Store<Schema> {
    /// # Errors
    /// Propagates [`Error::SchemaError`] from factory construction.
    pub fn new(app_name: impl Into<String>, tier: TierId, data_center: DataCenterId, backend: Arc<dyn Backend>) -> Result<Self> {
        let factory = Arc::new(SettingsFactory::<Schema>::new(tier, data_center)?);
        Ok(Self {
            app_name: app_name.into(),
            tier,
            data_center,
            backend,
            factory,
            encryptor: RwLock::new(None),
            cache: SnapshotCache::new(),
            subscriptions: SubscriptionRegistry::new(),
            poll: Mutex::new(None),
            push_registered: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    #[must_use]
    pub fn tier(&self) -> TierId {
        self.tier
    }

    #[must_use]
    pub fn data_center(&self) -> DataCenterId {
        self.data_center
    }

    #[must_use]
    pub fn factory(&self) -> &Arc<SettingsFactory<Schema>> {
        &self.factory
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Set the app's encryptor. Must precede any access to encrypted
    /// settings. Replacement is forbidden.
    ///
    /// # Errors
    /// Returns [`Error::AppAlreadyRegistered`] if an encryptor is already
    /// set, or propagates [`crate::encryptor::verify_round_trip`] failures.
    pub fn set_encryptor(&self, encryptor: Arc<dyn Encryptor>) -> Result<()> {
        crate::encryptor::verify_round_trip(encryptor.as_ref(), "nfig-encryptor-round-trip-probe")?;
        let mut guard = self.encryptor.write_recovered()?;
        if guard.is_some() {
            return Err(Error::AppAlreadyRegistered(format!(
                "encryptor for app '{}' is already set",
                self.app_name
            )));
        }
        *guard = Some(encryptor);
        Ok(())
    }

    /// # Errors
    /// Propagates lock-poison recovery failures.
    pub fn encryptor(&self) -> Result<Option<Arc<dyn Encryptor>>> {
        Ok(self.encryptor.read_recovered()?.clone())
    }

    /// # Errors
    /// Propagates backend errors.
    pub fn get_current_commit(&self) -> Result<Commit> {
        self.backend.get_current_commit(&self.app_name)
    }

    /// Fetch (or reuse the cached) current snapshot. Triggers the one-time
    /// orphan sweep on the first successful fetch per process.
    ///
    /// # Errors
    /// Propagates backend errors.
    pub fn get_snapshot(&self) -> Result<Arc<OverridesSnapshot>> {
        let snapshot = self.cache.get(self.backend.as_ref(), &self.app_name)?;
        if self.cache.claim_first_fetch() {
            self.sweep_orphans(&snapshot);
        }
        Ok(snapshot)
    }

    /// Best-effort, non-transactional deletion of overrides whose setting
    /// name is not in the published schema metadata.
    fn sweep_orphans(&self, snapshot: &OverridesSnapshot) {
        let known = self.factory.metadata();
        for (name, values) in &snapshot.overrides {
            if known.contains_key(name) {
                continue;
            }
            for value in values {
                if let Err(e) = self.backend.clear_override(&self.app_name, name, value.data_center, value.sub_app_id, None, None) {
                    log::warn!(target: "nfig::store", "orphan sweep failed to clear '{name}' on '{}': {e}", self.app_name);
                }
            }
        }
    }

    /// Materialize `Schema` for `sub_app` against the current snapshot.
    ///
    /// # Errors
    /// Propagates backend or registration errors.
    pub fn get_settings(&self, sub_app: SubAppId) -> Result<(Schema, Commit, Vec<crate::error::InvalidOverrideEntry>)> {
        let snapshot = self.get_snapshot()?;
        let encryptor = self.encryptor()?;
        let (settings, errors) = self
            .factory
            .try_get_settings(sub_app, &snapshot, encryptor.as_deref())?;
        Ok((settings, snapshot.commit, errors))
    }

    /// # Errors
    /// Propagates backend errors.
    pub fn set_override(&self, value: OverrideValue, user: Option<&str>, expected_commit: Option<Commit>) -> Result<Option<OverridesSnapshot>> {
        let outcome = self.backend.set_override(&self.app_name, value.clone(), user, expected_commit)?;
        if let Some(snapshot) = &outcome {
            self.cache.set(snapshot.clone())?;
            self.log_mutation(LogEventType::SetOverride, Some(&value.name), Some(&value.string_value), None, value.data_center, user, snapshot.commit);
            self.notify_subscribers()?;
        }
        Ok(outcome)
    }

    /// # Errors
    /// Propagates backend errors.
    pub fn clear_override(
        &self,
        setting_name: &str,
        data_center: DataCenterId,
        sub_app_id: SubAppId,
        user: Option<&str>,
        expected_commit: Option<Commit>,
    ) -> Result<Option<OverridesSnapshot>> {
        let outcome = self
            .backend
            .clear_override(&self.app_name, setting_name, data_center, sub_app_id, user, expected_commit)?;
        if let Some(snapshot) = &outcome {
            self.cache.set(snapshot.clone())?;
            self.log_mutation(LogEventType::ClearOverride, Some(setting_name), None, None, data_center, user, snapshot.commit);
            self.notify_subscribers()?;
        }
        Ok(outcome)
    }

    /// # Errors
    /// Propagates backend errors.
    pub fn restore_snapshot(&self, snapshot: &OverridesSnapshot, user: Option<&str>) -> Result<OverridesSnapshot> {
        let restored = self.backend.restore_snapshot(&self.app_name, snapshot, user)?;
        self.cache.set(restored.clone())?;
        self.log_mutation(LogEventType::RestoreSnapshot, None, None, Some(restored.commit), self.data_center, user, restored.commit);
        self.notify_subscribers()?;
        Ok(restored)
    }

    fn log_mutation(
        &self,
        event_type: LogEventType,
        setting_name: Option<&str>,
        setting_value: Option<&str>,
        restored_commit: Option<Commit>,
        data_center: DataCenterId,
        user: Option<&str>,
        commit: Commit,
    ) {
        let event = LogEvent {
            event_type,
            app_name: Some(self.app_name.clone()),
            commit: Some(commit),
            timestamp: OffsetDateTime::now_utc(),
            setting_name: setting_name.map(str::to_string),
            setting_value: setting_value.map(str::to_string),
            restored_commit,
            data_center,
            user: user.map(str::to_string),
        };
        log::info!(
            target: "nfig::store",
            "{:?} on '{}' -> commit {commit} ({} bytes)",
            event.event_type,
            self.app_name,
            event.encode().len()
        );
    }

    /// # Errors
    /// Propagates backend/registration errors.
    pub fn notify_subscribers(&self) -> Result<()> {
        if !self.subscriptions.has_subscribers() {
            return Ok(());
        }
        let snapshot = self.get_snapshot()?;
        self.subscriptions.notify_all(&self.factory, &snapshot)
    }

    pub fn subscriptions(&self) -> &SubscriptionRegistry<Schema> {
        &self.subscriptions
    }

    /// # Errors
    /// Propagates backend errors.
    pub fn publish_schema(&self) -> Result<()> {
        self.backend.set_metadata(&self.app_name, self.factory.metadata().clone())
    }

    /// # Errors
    /// Propagates backend/registration errors.
    pub fn publish_sub_apps(&self, sub_apps: Vec<(u32, String)>) -> Result<()> {
        let mut published = Vec::with_capacity(sub_apps.len());
        for (id, name) in sub_apps {
            self.factory.register_sub_app(id, &name)?;
            published.push(SubAppMetadata {
                app_name: self.app_name.clone(),
                sub_app_id: Some(id),
                sub_app_name: name,
                defaults_by_setting: self.factory.active_defaults(Some(id))?,
            });
        }
        self.backend.update_sub_apps(&self.app_name, published)
    }

    #[must_use]
    pub fn metadata(&self) -> &BySetting<SettingMetadata> {
        self.factory.metadata()
    }

    /// Start a background poll loop. Skips ticks entirely while there are no
    /// subscriptions.
    pub fn start_polling(self: &Arc<Self>, interval: Duration) {
        let ticker = self.clone();
        let gate = self.clone();
        let handle = PollHandle::spawn(
            interval,
            move || gate.subscriptions.has_subscribers(),
            move || {
                if let Err(e) = ticker.notify_subscribers() {
                    log::warn!(target: "nfig::store", "poll tick failed for '{}': {e}", ticker.app_name);
                }
            },
        );
        *self.poll.lock().unwrap() = Some(handle);
    }

    pub fn stop_polling(&self) {
        if let Some(handle) = self.poll.lock().unwrap().take() {
            handle.stop();
        }
    }

    /// Register this store's notify routine with the backend's push channel,
    /// exactly once per process. Backends that don't support push (the
    /// default `subscribe_push` no-op) simply never call it back.
    pub fn ensure_push_registered(self: &Arc<Self>) {
        if self.push_registered.swap(true, Ordering::SeqCst) {
            return;
        }
        let weak = Arc::downgrade(self);
        self.backend.subscribe_push(
            &self.app_name,
            Arc::new(move || {
                let Some(store) = Weak::upgrade(&weak) else { return };
                if let Err(e) = store.notify_subscribers() {
                    log::warn!(target: "nfig::store", "push-driven notify failed for '{}': {e}", store.app_name);
                }
            }),
        );
    }
}
