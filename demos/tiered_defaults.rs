// Tiered/sub-app specific defaults example for nfig
//
// Run with: cargo run --example tiered_defaults

use nfig::converters::PrimitiveType;
use nfig::{AppClient, InMemoryBackend, Result, SettingDef, SettingsSchema, Store};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const PROD_TIER: u32 = 2;
const DEV_TIER: u32 = 1;
const EAST: u32 = 1;
const WEST: u32 = 2;

#[derive(Debug, Default, Serialize, Deserialize)]
struct AppSettings {
    #[serde(rename = "Rate")]
    rate: i32,
    #[serde(rename = "Quota")]
    quota: i32,
}

impl SettingsSchema for AppSettings {
    fn setting_defs() -> Result<Vec<SettingDef>> {
        Ok(vec![
            SettingDef::new("Rate", PrimitiveType::I32, 1)
                .default_for(5, None, PROD_TIER, 0, true)
                .build()?,
            SettingDef::new("Quota", PrimitiveType::I32, 100)
                .default_for(200, Some(7), 0, 0, true)
                .default_for(300, Some(7), 0, WEST, true)
                .build()?,
        ])
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let backend = Arc::new(InMemoryBackend::new());

    let prod_east = Arc::new(Store::<AppSettings>::new("my-app", PROD_TIER, EAST, backend.clone())?);
    let prod_client = AppClient::new(prod_east);
    println!("prod rate = {}", prod_client.get_settings(None)?.rate);

    let dev = Arc::new(Store::<AppSettings>::new("my-app", DEV_TIER, EAST, backend.clone())?);
    let dev_client = AppClient::new(dev);
    println!("dev rate = {}", dev_client.get_settings(None)?.rate);

    let west = Arc::new(Store::<AppSettings>::new("my-app", PROD_TIER, WEST, backend)?);
    let west_client = AppClient::new(west);
    west_client.register_sub_apps(vec![(7, "checkout".to_string())])?;
    println!("sub-app 7 quota (west) = {}", west_client.get_settings(Some(7))?.quota);

    Ok(())
}
