//! The pluggable backend contract: a thin, blocking key/value store.
//!
//! Concrete backend implementations (remote KV stores, etc.) are an
//! external collaborator; this module only defines the trait plus one
//! reference implementation ([`InMemoryBackend`]) so the crate is runnable
//! and testable standalone.

pub mod encoding;
mod memory;

pub use memory::InMemoryBackend;

use crate::commit::Commit;
use crate::error::Result;
use crate::model::{BySetting, DefaultValue, OverrideValue, OverridesSnapshot, SettingMetadata, SubAppId, SubAppMetadata};
use std::sync::Arc;

/// A thin, blocking key/value store holding one app's overrides, metadata,
/// and per-sub-app defaults.
pub trait Backend: Send + Sync {
    /// Every app name the backend currently knows about.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::BackendError`] on I/O/transport
    /// failure.
    fn get_app_names(&self) -> Result<Vec<String>>;

    /// The current commit for `app_name` (`Commit::INITIAL` if unknown).
    ///
    /// # Errors
    /// Returns [`crate::error::Error::BackendError`] on I/O/transport
    /// failure.
    fn get_current_commit(&self, app_name: &str) -> Result<Commit>;

    /// The current overrides snapshot (the initial empty snapshot for an
    /// app the backend has never seen).
    ///
    /// # Errors
    /// Returns [`crate::error::Error::BackendError`] on I/O/transport
    /// failure.
    fn get_snapshot(&self, app_name: &str) -> Result<OverridesSnapshot>;

    /// Set an override, subject to compare-and-set on `expected_commit`
    /// (checked only when `Some`). Returns `None` on a commit mismatch.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::BackendError`] on I/O/transport
    /// failure.
    fn set_override(
        &self,
        app_name: &str,
        value: OverrideValue,
        user: Option<&str>,
        expected_commit: Option<Commit>,
    ) -> Result<Option<OverridesSnapshot>>;

    /// Clear an override, subject to the same CAS semantics as
    /// [`Backend::set_override`]. Whether a no-op clear (the override didn't
    /// exist) still bumps the commit is backend-defined.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::BackendError`] on I/O/transport
    /// failure.
    #[allow(clippy::too_many_arguments)]
    fn clear_override(
        &self,
        app_name: &str,
        setting_name: &str,
        data_center: u32,
        sub_app_id: SubAppId,
        user: Option<&str>,
        expected_commit: Option<Commit>,
    ) -> Result<Option<OverridesSnapshot>>;

    /// Replace the entire override set for `app_name` in one commit.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::BackendError`] on I/O/transport
    /// failure.
    fn restore_snapshot(
        &self,
        app_name: &str,
        snapshot: &OverridesSnapshot,
        user: Option<&str>,
    ) -> Result<OverridesSnapshot>;

    /// Publish sub-app metadata (and their defaults) for `app_name`.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::BackendError`] on I/O/transport
    /// failure.
    fn update_sub_apps(&self, app_name: &str, sub_apps: Vec<SubAppMetadata>) -> Result<()>;

    /// Publish schema metadata for `app_name`.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::BackendError`] on I/O/transport
    /// failure.
    fn set_metadata(&self, app_name: &str, metadata: BySetting<SettingMetadata>) -> Result<()>;

    /// Previously published sub-app metadata, if any.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::BackendError`] on I/O/transport
    /// failure.
    fn get_sub_apps(&self, app_name: &str) -> Result<Option<Vec<SubAppMetadata>>>;

    /// Previously published schema metadata, if any.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::BackendError`] on I/O/transport
    /// failure.
    fn get_settings_metadata(&self, app_name: &str) -> Result<Option<BySetting<SettingMetadata>>>;

    /// Previously published defaults for one sub-app, if any.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::BackendError`] on I/O/transport
    /// failure.
    fn get_defaults(&self, app_name: &str, sub_app_id: SubAppId) -> Result<Option<Vec<DefaultValue>>>;

    /// Register a push callback invoked when `app_name`'s overrides change.
    /// Polling-only backends can leave this a no-op (the default).
    fn subscribe_push(&self, app_name: &str, notify: Arc<dyn Fn() + Send + Sync>) {
        let _ = (app_name, notify);
    }
}
