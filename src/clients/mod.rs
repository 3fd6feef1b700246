//! Thin façades pinned to `(Arc<Store>, appName)`, in the style of the
//! teacher's `BackupManager::new(&manager)` borrowing back into its owner.

mod admin_client;
mod app_client;

pub use admin_client::AdminClient;
pub use app_client::AppClient;

use crate::commit::Commit;
use crate::config::SettingsSchema;
use crate::specificity::{DataCenterId, TierId};
use std::ops::Deref;

/// A materialized settings object, carrying the identifying facts the
/// specification requires inlined alongside the value.
#[derive(Debug, Clone)]
pub struct Settings<Schema> {
    pub app_name: String,
    pub commit: Commit,
    pub sub_app_id: Option<u32>,
    pub sub_app_name: Option<String>,
    pub tier: TierId,
    pub data_center: DataCenterId,
    pub value: Schema,
}

impl<Schema> Deref for Settings<Schema> {
    type Target = Schema;

    fn deref(&self) -> &Schema {
        &self.value
    }
}

impl<Schema: SettingsSchema> Settings<Schema> {
    #[must_use]
    pub fn is_for_app(&self, app_name: &str) -> bool {
        self.app_name == app_name
    }
}
