//! Declarative schema construction.

mod schema;

pub use schema::{SettingDef, SettingDefBuilder, SettingsSchema};
