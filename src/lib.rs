//! # NFig
//!
//! A hierarchical runtime-configuration library: settings are declared as a
//! typed schema, given defaults per tier/data-center/sub-app, and can be
//! overridden at runtime through a pluggable [`Backend`] without a restart.
//!
//! ## Concepts
//!
//! - **Schema**: a `#[derive(Serialize, Deserialize)]` struct implementing
//!   [`SettingsSchema`], declaring its settings via [`SettingDef`].
//! - **Specificity**: an override for a specific sub-app beats one for a
//!   tier, which beats one for a data center, which beats the plain default.
//! - **Commit**: every published snapshot of overrides carries a [`Commit`]
//!   (a UUID). Mutations are compare-and-swap against the caller's last-seen
//!   commit.
//! - **Store**: owns one `(appName, Schema)` pair's backend connection,
//!   snapshot cache, subscriptions, and polling loop.
//! - **AppClient / AdminClient**: thin façades over a [`Store`] — the
//!   former reads settings, the latter mutates overrides and snapshots.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nfig::{Store, AppClient, InMemoryBackend, SettingDef, SettingsSchema, Result};
//! use nfig::converters::PrimitiveType;
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct AppSettings {
//!     #[serde(rename = "Foo")]
//!     foo: FooGroup,
//! }
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct FooGroup {
//!     #[serde(rename = "Bar")]
//!     bar: i32,
//! }
//!
//! impl SettingsSchema for AppSettings {
//!     fn setting_defs() -> Result<Vec<SettingDef>> {
//!         Ok(vec![SettingDef::new("Foo.Bar", PrimitiveType::I32, 7).build()?])
//!     }
//! }
//!
//! # fn example() -> Result<()> {
//! let backend = Arc::new(InMemoryBackend::new());
//! let store = Arc::new(Store::<AppSettings>::new("my-app", 1, 1, backend)?);
//! let client = AppClient::new(store);
//!
//! let settings = client.get_settings(None)?;
//! assert_eq!(settings.foo.bar, 7);
//! # Ok(())
//! # }
//! ```
//!
//! ## Subscriptions
//!
//! `AppClient::subscribe` delivers the current value synchronously, then
//! again on every subsequent commit:
//!
//! ```rust,no_run
//! # use nfig::{Store, AppClient, InMemoryBackend, SettingDef, SettingsSchema, Result};
//! # use nfig::converters::PrimitiveType;
//! # use serde::{Deserialize, Serialize};
//! # use std::sync::Arc;
//! # #[derive(Default, Serialize, Deserialize)] struct AppSettings;
//! # impl SettingsSchema for AppSettings { fn setting_defs() -> Result<Vec<SettingDef>> { Ok(vec![]) } }
//! # fn example() -> Result<()> {
//! # let backend = Arc::new(InMemoryBackend::new());
//! # let store = Arc::new(Store::<AppSettings>::new("my-app", 1, 1, backend)?);
//! # let client = AppClient::new(store);
//! let token = client.subscribe(Arc::new(|result| {
//!     if let Ok(settings) = result {
//!         println!("settings changed");
//!         let _ = settings;
//!     }
//! }))?;
//! client.unsubscribe(Some(token))?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod clients;
pub mod commit;
pub mod config;
pub mod converters;
pub mod encryptor;
mod error;
pub mod log_event;
pub mod model;
pub mod specificity;
pub mod store;
mod sync;

pub use backend::{Backend, InMemoryBackend};
pub use clients::{AdminClient, AppClient, Settings};
pub use commit::Commit;
pub use config::{SettingDef, SettingDefBuilder, SettingsSchema};
pub use encryptor::Encryptor;
#[cfg(feature = "encrypted")]
pub use encryptor::AesGcmEncryptor;
pub use error::{Error, InvalidOverrideEntry, Result};
pub use log_event::{LogEvent, LogEventType};
pub use model::{
    BySetting, DefaultValue, ListBySetting, OverrideValue, OverridesSnapshot, SettingMetadata,
    SubApp, SubAppId, SubAppMetadata,
};
pub use specificity::{DataCenterId, Scope, TierId, ANY_DATA_CENTER, ANY_TIER};
pub use store::Store;
