// Basic usage example for nfig
//
// Run with: cargo run --example basic_usage

use nfig::converters::PrimitiveType;
use nfig::{AppClient, InMemoryBackend, Result, SettingDef, SettingsSchema, Store};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Default, Serialize, Deserialize)]
struct AppSettings {
    #[serde(rename = "Network")]
    network: NetworkSettings,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct NetworkSettings {
    #[serde(rename = "Port")]
    port: i32,
    #[serde(rename = "Debug")]
    debug: bool,
}

impl SettingsSchema for AppSettings {
    fn setting_defs() -> Result<Vec<SettingDef>> {
        Ok(vec![
            SettingDef::new("Network.Port", PrimitiveType::I32, 8080).build()?,
            SettingDef::new("Network.Debug", PrimitiveType::Bool, false).build()?,
        ])
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let backend = Arc::new(InMemoryBackend::new());
    let store = Arc::new(Store::<AppSettings>::new("my-app", 1, 1, backend)?);
    let client = AppClient::new(store);

    let settings = client.get_settings(None)?;
    println!("port = {}, debug = {}", settings.network.port, settings.network.debug);
    println!("commit = {:?}", settings.commit);

    Ok(())
}
