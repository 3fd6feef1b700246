// Live-update subscription example for nfig
//
// Run with: cargo run --example subscriptions

use nfig::converters::PrimitiveType;
use nfig::{AdminClient, AppClient, InMemoryBackend, Result, SettingDef, SettingsSchema, Store};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Default, Serialize, Deserialize)]
struct AppSettings {
    #[serde(rename = "Rate")]
    rate: i32,
}

impl SettingsSchema for AppSettings {
    fn setting_defs() -> Result<Vec<SettingDef>> {
        Ok(vec![SettingDef::new("Rate", PrimitiveType::I32, 1).build()?])
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let backend = Arc::new(InMemoryBackend::new());
    let store = Arc::new(Store::<AppSettings>::new("my-app", 1, 1, backend)?);
    let admin = AdminClient::new(store.clone());
    let client = AppClient::new(store.clone());

    let token = client.subscribe(Arc::new(|result| match result {
        Ok(settings) => println!("rate is now {}", settings.rate),
        Err(err) => eprintln!("subscription error: {err}"),
    }))?;

    let commit = admin.get_current_commit()?;
    admin.set_override("Rate", "42", 1, None, Some("demo-user"), Some(commit), None)?;

    client.unsubscribe(Some(token))?;

    Ok(())
}
