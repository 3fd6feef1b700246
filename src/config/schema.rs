//! Builder surface for declaring a settings schema.
//!
//! A generated-code/attribute-discovery front end is an external
//! collaborator; this crate exposes the same per-setting facts (name, type,
//! defaults, converter, flags) through a fluent builder instead, in the
//! style of [`crate`]'s other config builders.

use crate::converters::{Converter, PrimitiveType};
use crate::error::{Error, Result};
use crate::model::SubAppId;
use crate::specificity::{ANY_DATA_CENTER, ANY_TIER, DataCenterId, TierId};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// One candidate default value attached to a [`SettingDef`], before it has
/// been filtered for a particular sub-app registration.
#[derive(Debug, Clone)]
pub(crate) struct DefaultRecord {
    pub value: serde_json::Value,
    pub sub_app_id: SubAppId,
    pub tier: TierId,
    pub data_center: DataCenterId,
    pub allows_overrides: bool,
    /// True when `value` is already ciphertext and must not be re-encrypted
    /// nor decrypted as though it were plaintext-zero.
    pub is_ciphertext: bool,
}

/// A fully-declared setting: its converter, flags, and every candidate
/// default value scanned from the schema.
pub struct SettingDef {
    pub(crate) name: String,
    pub(crate) primitive: PrimitiveType,
    pub(crate) converter: Arc<dyn Converter>,
    pub(crate) is_default_converter: bool,
    pub(crate) is_encrypted: bool,
    pub(crate) is_enum: bool,
    pub(crate) change_requires_restart: bool,
    pub(crate) allow_inline: bool,
    pub(crate) description: Option<String>,
    pub(crate) defaults: Vec<DefaultRecord>,
}

impl SettingDef {
    /// Declare a plain (non-encrypted) setting with its root default value.
    #[must_use]
    pub fn new(name: impl Into<String>, primitive: PrimitiveType, root_default: impl Into<serde_json::Value>) -> SettingDefBuilder {
        let name = name.into();
        let converter = primitive.built_in_converter();
        SettingDefBuilder {
            def: SettingDef {
                name,
                primitive,
                converter,
                is_default_converter: true,
                is_encrypted: false,
                is_enum: matches!(primitive, PrimitiveType::EnumInt),
                change_requires_restart: false,
                allow_inline: true,
                description: None,
                defaults: vec![DefaultRecord {
                    value: root_default.into(),
                    sub_app_id: None,
                    tier: ANY_TIER,
                    data_center: ANY_DATA_CENTER,
                    allows_overrides: true,
                    is_ciphertext: false,
                }],
            },
        }
    }

    /// Declare an encrypted setting. Its root default is the zero value of
    /// the declared type (never ciphertext); every other default supplied
    /// via [`SettingDefBuilder::default_for`] must already be ciphertext.
    #[must_use]
    pub fn encrypted(name: impl Into<String>, primitive: PrimitiveType, zero_value: impl Into<serde_json::Value>) -> SettingDefBuilder {
        let mut builder = Self::new(name, primitive, zero_value);
        builder.def.is_encrypted = true;
        builder.def.defaults[0].is_ciphertext = false;
        builder
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.is_encrypted
    }

    #[must_use]
    pub fn allow_inline(&self) -> bool {
        self.allow_inline
    }
}

/// Fluent builder for a [`SettingDef`], mirroring the chainable setter style
/// used throughout this crate's other config builders.
pub struct SettingDefBuilder {
    def: SettingDef,
}

impl SettingDefBuilder {
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.def.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn change_requires_restart(mut self) -> Self {
        self.def.change_requires_restart = true;
        self
    }

    #[must_use]
    pub fn do_not_inline(mut self) -> Self {
        self.def.allow_inline = false;
        self
    }

    /// Attach an explicit converter, overriding the built-in one resolved
    /// from the declared primitive type.
    #[must_use]
    pub fn converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.def.converter = converter;
        self.def.is_default_converter = false;
        self
    }

    /// Add an additional scoped default. For encrypted settings the value
    /// must already be ciphertext (the schema never re-encrypts at
    /// declaration time).
    #[must_use]
    pub fn default_for(
        mut self,
        value: impl Into<serde_json::Value>,
        sub_app_id: SubAppId,
        tier: TierId,
        data_center: DataCenterId,
        allows_overrides: bool,
    ) -> Self {
        self.def.defaults.push(DefaultRecord {
            value: value.into(),
            sub_app_id,
            tier,
            data_center,
            allows_overrides,
            is_ciphertext: self.def.is_encrypted,
        });
        self
    }

    /// Finalize the definition, checking for duplicate `(subApp, tier,
    /// dataCenter)` triples among its declared defaults.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateDefault`] if two defaults share a triple.
    pub fn build(self) -> Result<SettingDef> {
        let def = self.def;
        let mut seen = std::collections::HashSet::new();
        for d in &def.defaults {
            let triple = (d.sub_app_id, d.tier, d.data_center);
            if !seen.insert(triple) {
                return Err(Error::DuplicateDefault {
                    setting: def.name.clone(),
                    sub_app: d.sub_app_id.map(|id| id.to_string()),
                    tier: d.tier,
                    data_center: d.data_center,
                });
            }
        }
        Ok(def)
    }
}

/// Implemented by a user's settings struct to expose its declarative schema.
///
/// The struct itself is the materialization target: the factory builds one
/// instance per sub-app by merging scoped defaults with the active override
/// snapshot and deserializing the result into `Self`.
pub trait SettingsSchema: Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Returns every setting this schema declares, in any order.
    ///
    /// # Errors
    /// Returns an error if any definition is malformed (e.g. duplicate
    /// defaults for the same scope triple).
    fn setting_defs() -> Result<Vec<SettingDef>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_default_triple_is_rejected() {
        let result = SettingDef::new("Rate", PrimitiveType::I32, 1)
            .default_for(5, None, 2, 0, true)
            .default_for(9, None, 2, 0, true)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn root_default_always_present() {
        let def = SettingDef::new("Foo.Bar", PrimitiveType::I32, 7).build().unwrap();
        assert!(def.defaults.iter().any(|d| d.sub_app_id.is_none() && d.tier == ANY_TIER && d.data_center == ANY_DATA_CENTER));
    }

    #[test]
    fn encrypted_setting_marks_non_root_defaults_as_ciphertext() {
        let def = SettingDef::encrypted("Secret", PrimitiveType::String, "")
            .default_for("c1phert3xt", None, 1, 0, true)
            .build()
            .unwrap();
        assert!(def.is_encrypted());
        assert!(def.defaults[1].is_ciphertext);
        assert!(!def.defaults[0].is_ciphertext);
    }
}
