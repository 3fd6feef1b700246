//! The settings factory: compiles a declarative schema into per-sub-app
//! initializers and applies override snapshots on top of them.

mod defaults;
mod initializer;
mod overrides;

use crate::config::{SettingDef, SettingsSchema};
use crate::converters::Converter;
use crate::encryptor::Encryptor;
use crate::error::{Error, InvalidOverrideEntry, Result};
use crate::model::{BySetting, DefaultValue, OverridesSnapshot, SettingMetadata, SubApp, SubAppId};
use crate::specificity::{DataCenterId, TierId};
use crate::sync::RwLockExt;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

/// Per-sub-app compiled state: the filtered, stringified default list this
/// registration sees. Computed once per `(subAppId)` and cached.
struct SubAppState {
    defaults: HashMap<String, Vec<DefaultValue>>,
}

/// Compiles a [`SettingsSchema`] into per-sub-app initializers.
///
/// Fixed to one `(tier, dataCenter)` for its whole lifetime, matching the
/// store it belongs to.
pub struct SettingsFactory<Schema: SettingsSchema> {
    tier: TierId,
    data_center: DataCenterId,
    defs: HashMap<String, SettingDef>,
    metadata: BySetting<SettingMetadata>,
    registrations: RwLock<HashMap<SubAppId, Arc<SubAppState>>>,
    registered_names: RwLock<HashMap<Option<u32>, String>>,
    _schema: PhantomData<Schema>,
}

impl<Schema: SettingsSchema> SettingsFactory<Schema> {
    /// Walk `Schema::setting_defs()` and build the factory.
    ///
    /// # Errors
    /// Returns [`Error::SchemaError`] if two settings share a name, or any
    /// schema error the definitions themselves report.
    pub fn new(tier: TierId, data_center: DataCenterId) -> Result<Self> {
        let defined = Schema::setting_defs()?;
        let mut defs = HashMap::with_capacity(defined.len());
        let mut metadata = BySetting::new();

        for def in defined {
            if defs.contains_key(&def.name) {
                return Err(Error::SchemaError(format!(
                    "duplicate setting name '{}'",
                    def.name
                )));
            }
            metadata.insert(
                def.name.clone(),
                SettingMetadata {
                    name: def.name.clone(),
                    description: def.description.clone(),
                    type_name: def.converter.type_name().to_string(),
                    is_encrypted: def.is_encrypted,
                    is_enum: def.is_enum,
                    converter_type_name: def.converter.type_name().to_string(),
                    is_default_converter: def.is_default_converter,
                    change_requires_restart: def.change_requires_restart,
                },
            );
            defs.insert(def.name.clone(), def);
        }

        Ok(Self {
            tier,
            data_center,
            defs,
            metadata,
            registrations: RwLock::new(HashMap::new()),
            registered_names: RwLock::new(HashMap::new()),
            _schema: PhantomData,
        })
    }

    #[must_use]
    pub fn metadata(&self) -> &BySetting<SettingMetadata> {
        &self.metadata
    }

    #[must_use]
    pub fn setting_exists(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    #[must_use]
    pub fn setting_type(&self, name: &str) -> Option<&'static str> {
        self.defs.get(name).map(|d| d.converter.type_name())
    }

    /// Register the root app (`subAppId = None`), returning its resolved
    /// default list.
    ///
    /// # Errors
    /// Propagates [`Error::InvalidDefaultValue`] from default conversion.
    pub fn register_root_app(&self) -> Result<()> {
        self.register(None)
    }

    /// Register a sub-app. Registering an id already bound to a different
    /// name is fatal.
    ///
    /// # Errors
    /// Returns [`Error::AppAlreadyRegistered`]-flavored mismatch error (via
    /// [`Error::SchemaError`]) when `id` is already bound to another name,
    /// or propagates default-resolution errors.
    pub fn register_sub_app(&self, id: u32, name: &str) -> Result<()> {
        {
            let mut names = self.registered_names.write_recovered()?;
            match names.get(&Some(id)) {
                Some(existing) if existing != name => {
                    return Err(Error::SchemaError(format!(
                        "sub-app {id} already registered as '{existing}', cannot re-register as '{name}'"
                    )));
                }
                _ => {
                    names.insert(Some(id), name.to_string());
                }
            }
        }
        self.register(Some(id))
    }

    fn register(&self, sub_app: SubAppId) -> Result<()> {
        if self.registrations.read_recovered()?.contains_key(&sub_app) {
            return Ok(());
        }
        let mut guard = self.registrations.write_recovered()?;
        if guard.contains_key(&sub_app) {
            return Ok(());
        }
        let defaults = defaults::collect_defaults(&self.defs, sub_app, self.tier)?;
        guard.insert(sub_app, Arc::new(SubAppState { defaults }));
        Ok(())
    }

    fn state_for(&self, sub_app: SubAppId) -> Result<Arc<SubAppState>> {
        if let Some(state) = self.registrations.read_recovered()?.get(&sub_app) {
            return Ok(state.clone());
        }
        self.register(sub_app)?;
        Ok(self.registrations.read_recovered()?[&sub_app].clone())
    }

    /// Materialize `Schema` for `sub_app` against `snapshot`, returning any
    /// override values that failed to parse (the returned object still has
    /// every field populated — failing settings fall back to their active
    /// default).
    ///
    /// # Errors
    /// Returns an error if the sub-app has never been registered and
    /// registration itself fails (e.g. a malformed default), or if an
    /// encrypted setting's active default is ciphertext and cannot be
    /// decrypted (see [`initializer::merge_values`]).
    pub fn try_get_settings(
        &self,
        sub_app: SubAppId,
        snapshot: &OverridesSnapshot,
        encryptor: Option<&dyn Encryptor>,
    ) -> Result<(Schema, Vec<InvalidOverrideEntry>)> {
        let state = self.state_for(sub_app)?;
        let (merged, errors) = initializer::merge_values(
            &self.defs,
            &state.defaults,
            snapshot,
            sub_app,
            self.tier,
            self.data_center,
            encryptor,
        )?;
        let schema: Schema = serde_json::from_value(merged)?;
        Ok((schema, errors))
    }

    #[must_use]
    pub fn default_list(&self, sub_app: SubAppId) -> Option<Vec<DefaultValue>> {
        self.registrations
            .read()
            .ok()?
            .get(&sub_app)
            .map(|s| s.defaults.values().flatten().cloned().collect())
    }

    /// The active default for every setting, as seen by `sub_app` — the same
    /// resolution `try_get_settings` applies before overrides, published to
    /// the backend as [`crate::model::SubAppMetadata::defaults_by_setting`].
    ///
    /// # Errors
    /// Propagates registration/default-collection errors.
    pub fn active_defaults(&self, sub_app: SubAppId) -> Result<BySetting<DefaultValue>> {
        let state = self.state_for(sub_app)?;
        let empty = Vec::new();
        let mut out = BySetting::new();
        for name in self.defs.keys() {
            let candidates = state.defaults.get(name).unwrap_or(&empty);
            if let Some(active) = initializer::active_default(candidates, sub_app, self.tier, self.data_center) {
                out.insert(name.clone(), active.clone());
            }
        }
        Ok(out)
    }

    /// Resolve the converter for `name`, for admin-side validation.
    #[must_use]
    pub fn converter_for(&self, name: &str) -> Option<Arc<dyn Converter>> {
        self.defs.get(name).map(|d| d.converter.clone())
    }

    #[must_use]
    pub fn sub_app_registrations(&self) -> Vec<SubApp> {
        self.registered_names
            .read()
            .map(|names| {
                names
                    .iter()
                    .map(|(id, name)| SubApp { id: *id, name: name.clone() })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::PrimitiveType;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct TestSchema {
        #[serde(rename = "Foo")]
        foo: FooGroup,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct FooGroup {
        #[serde(rename = "Bar")]
        bar: i32,
    }

    impl SettingsSchema for TestSchema {
        fn setting_defs() -> Result<Vec<SettingDef>> {
            Ok(vec![SettingDef::new("Foo.Bar", PrimitiveType::I32, 7).build()?])
        }
    }

    #[test]
    fn root_only_default_read_matches_literal_scenario() {
        let factory = SettingsFactory::<TestSchema>::new(1, 1).unwrap();
        factory.register_root_app().unwrap();
        let snapshot = OverridesSnapshot::initial("app");
        let (settings, errors) = factory.try_get_settings(None, &snapshot, None).unwrap();
        assert!(errors.is_empty());
        assert_eq!(settings.foo.bar, 7);
    }

    #[test]
    fn deterministic_for_the_same_snapshot() {
        let factory = SettingsFactory::<TestSchema>::new(1, 1).unwrap();
        factory.register_root_app().unwrap();
        let snapshot = OverridesSnapshot::initial("app");
        let (a, _) = factory.try_get_settings(None, &snapshot, None).unwrap();
        let (b, _) = factory.try_get_settings(None, &snapshot, None).unwrap();
        assert_eq!(a.foo.bar, b.foo.bar);
    }

    #[test]
    fn re_registering_sub_app_with_different_name_is_fatal() {
        let factory = SettingsFactory::<TestSchema>::new(1, 1).unwrap();
        factory.register_sub_app(7, "web").unwrap();
        assert!(factory.register_sub_app(7, "api").is_err());
    }
}
