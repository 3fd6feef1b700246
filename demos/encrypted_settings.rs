// Encrypted-setting example for nfig
//
// Run with: cargo run --example encrypted_settings --features encrypted

use nfig::converters::PrimitiveType;
use nfig::{AesGcmEncryptor, AppClient, InMemoryBackend, Result, SettingDef, SettingsSchema, Store};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const PROD_TIER: u32 = 2;

#[derive(Debug, Default, Serialize, Deserialize)]
struct AppSettings {
    #[serde(rename = "ApiKey")]
    api_key: String,
}

impl SettingsSchema for AppSettings {
    fn setting_defs() -> Result<Vec<SettingDef>> {
        // The root default is always the plaintext zero value; only
        // non-root defaults carry ciphertext.
        let key = AesGcmEncryptor::generate_key();
        let encryptor = AesGcmEncryptor::new(&key)?;
        let ciphertext = encryptor.encrypt(Some("s3cr3t-prod-key"))?.unwrap();

        Ok(vec![
            SettingDef::encrypted("ApiKey", PrimitiveType::String, "")
                .default_for(ciphertext, None, PROD_TIER, 0, true)
                .build()?,
        ])
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let backend = Arc::new(InMemoryBackend::new());
    let store = Arc::new(Store::<AppSettings>::new("my-app", PROD_TIER, 1, backend)?);

    let key = AesGcmEncryptor::generate_key();
    store.set_encryptor(Arc::new(AesGcmEncryptor::new(&key)?))?;

    let client = AppClient::new(store);
    // Decryption will fail here because the schema and the store were
    // seeded with independent random keys; in a real deployment the same
    // key (or KMS-backed encryptor) is used for both.
    match client.get_settings(None) {
        Ok(settings) => println!("api key = {}", settings.api_key),
        Err(err) => println!("expected decryption mismatch in this demo: {err}"),
    }

    Ok(())
}
