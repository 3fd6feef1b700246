//! Error types for the nfig library

use thiserror::Error;

/// Result type alias for nfig operations
pub type Result<T> = std::result::Result<T, Error>;

/// A single invalid override encountered while materializing settings.
///
/// Carried inside [`Error::InvalidOverrideValues`] so a caller can see every
/// failing override at once rather than only the first one found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidOverrideEntry {
    pub setting_name: String,
    pub raw_key: String,
    pub reason: String,
}

impl std::fmt::Display for InvalidOverrideEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (key '{}'): {}",
            self.setting_name, self.raw_key, self.reason
        )
    }
}

/// Main error type for the nfig library
#[derive(Error, Debug)]
pub enum Error {
    // -------------------------------------------------------------------------
    // Schema errors
    // -------------------------------------------------------------------------
    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("No default value registered for setting '{0}' at the root scope")]
    MissingRootDefault(String),

    #[error("Setting '{setting}' already has a default for subApp={sub_app:?}, tier={tier}, dataCenter={data_center}")]
    DuplicateDefault {
        setting: String,
        sub_app: Option<String>,
        tier: u32,
        data_center: u32,
    },

    #[error("Invalid default value for setting '{key}': {reason}")]
    InvalidDefaultValue { key: String, reason: String },

    #[error("Setting '{0}' is marked encrypted but no Encryptor is configured")]
    MissingEncryptor(String),

    // -------------------------------------------------------------------------
    // Override errors
    // -------------------------------------------------------------------------
    #[error("Invalid override value for setting '{key}' (raw key '{raw_key}'): {reason}")]
    InvalidOverrideValue {
        key: String,
        raw_key: String,
        reason: String,
    },

    #[error("{} invalid override value(s) encountered", .0.len())]
    InvalidOverrideValues(Vec<InvalidOverrideEntry>),

    #[error("Setting '{0}' does not allow overrides")]
    OverridesNotAllowed(String),

    #[error("Unknown setting '{0}'")]
    UnknownSetting(String),

    // -------------------------------------------------------------------------
    // App binding errors
    // -------------------------------------------------------------------------
    #[error("Unknown sub-app '{0}'")]
    UnknownSubApp(String),

    #[error("App '{0}' is not registered with this store")]
    AppNotRegistered(String),

    #[error("App '{0}' is already registered with this store")]
    AppAlreadyRegistered(String),

    // -------------------------------------------------------------------------
    // Backend errors
    // -------------------------------------------------------------------------
    #[error("Backend error: {0}")]
    BackendError(String),

    #[error("Backend is unreachable: {0}")]
    BackendUnreachable(String),

    // -------------------------------------------------------------------------
    // Encryptor errors
    // -------------------------------------------------------------------------
    #[error("Encryptor error: {0}")]
    EncryptorError(String),

    #[error("Encryptor failed round-trip identity check for setting '{0}'")]
    EncryptorRoundTripFailed(String),

    // -------------------------------------------------------------------------
    // Serialization / IO
    // -------------------------------------------------------------------------
    #[error("Failed to serialize or deserialize value: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid commit identifier '{0}'")]
    InvalidCommit(String),

    // -------------------------------------------------------------------------
    // Concurrency
    // -------------------------------------------------------------------------
    #[error("Internal lock was poisoned - possible thread panic. The operation may have left data in an inconsistent state.")]
    LockPoisoned,

    #[error("Store not initialized")]
    NotInitialized,
}

impl Error {
    /// True for errors arising from a malformed or incomplete schema.
    #[must_use]
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Error::SchemaError(_)
                | Error::MissingRootDefault(_)
                | Error::DuplicateDefault { .. }
                | Error::InvalidDefaultValue { .. }
                | Error::MissingEncryptor(_)
        )
    }

    /// True for errors arising from override data that could not be applied.
    #[must_use]
    pub fn is_override_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidOverrideValue { .. }
                | Error::InvalidOverrideValues(_)
                | Error::OverridesNotAllowed(_)
                | Error::UnknownSetting(_)
        )
    }

    /// True for errors surfaced by the backend implementation itself.
    #[must_use]
    pub fn is_backend_error(&self) -> bool {
        matches!(self, Error::BackendError(_) | Error::BackendUnreachable(_))
    }
}
