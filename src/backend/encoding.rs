//! Flat key/value encoding for persisted overrides.
//!
//! ```text
//! key   := dataCenterInt "," subAppIdStr ";" settingName
//! value := (ISO-8601 expirationTime | "") ";" rawValue
//! ```

use crate::error::Error;
use crate::model::{OverrideValue, SubAppId};
use time::OffsetDateTime;
use time::format_description::well_known::Iso8601;

/// Encode an override's storage key.
#[must_use]
pub fn encode_key(setting_name: &str, sub_app_id: SubAppId, data_center: u32) -> String {
    let sub_app_str = sub_app_id.map(|id| id.to_string()).unwrap_or_default();
    format!("{data_center},{sub_app_str};{setting_name}")
}

/// Encode an override's storage value.
///
/// # Errors
/// Returns an error if the expiration timestamp cannot be formatted as
/// ISO-8601.
pub fn encode_value(value: &OverrideValue) -> Result<String, Error> {
    let expiration = match value.expiration_time {
        Some(t) => t
            .format(&Iso8601::DEFAULT)
            .map_err(|e| Error::BackendError(format!("cannot format expiration: {e}")))?,
        None => String::new(),
    };
    Ok(format!("{expiration};{}", value.string_value))
}

/// Parse a `(key, value)` pair back into an [`OverrideValue`].
///
/// # Errors
/// Returns [`Error::InvalidOverrideValue`] carrying the raw key if either
/// half of the pair is malformed.
pub fn decode(raw_key: &str, raw_value: &str) -> Result<OverrideValue, Error> {
    let invalid = |reason: &str| Error::InvalidOverrideValue {
        key: String::new(),
        raw_key: raw_key.to_string(),
        reason: reason.to_string(),
    };

    let (dc_str, rest) = raw_key.split_once(',').ok_or_else(|| invalid("missing ',' separator"))?;
    let (sub_app_str, setting_name) = rest.split_once(';').ok_or_else(|| invalid("missing ';' separator"))?;

    let data_center: u32 = dc_str.parse().map_err(|_| invalid("dataCenter is not an integer"))?;
    let sub_app_id = if sub_app_str.is_empty() {
        None
    } else {
        Some(sub_app_str.parse::<u32>().map_err(|_| invalid("subAppId is not an integer"))?)
    };

    let (expiration_str, string_value) = raw_value
        .split_once(';')
        .ok_or_else(|| invalid("value missing ';' separator"))?;

    let expiration_time = if expiration_str.is_empty() {
        None
    } else {
        Some(
            OffsetDateTime::parse(expiration_str, &Iso8601::DEFAULT)
                .map_err(|_| invalid("expiration is not valid ISO-8601"))?,
        )
    };

    Ok(OverrideValue {
        name: setting_name.to_string(),
        string_value: string_value.to_string(),
        sub_app_id,
        data_center,
        expiration_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OverrideValue {
        OverrideValue {
            name: "Rate".into(),
            string_value: "10".into(),
            sub_app_id: Some(7),
            data_center: 3,
            expiration_time: None,
        }
    }

    #[test]
    fn key_format_matches_the_documented_shape() {
        let key = encode_key("Rate", Some(7), 3);
        assert_eq!(key, "3,7;Rate");
    }

    #[test]
    fn null_sub_app_yields_empty_segment() {
        let key = encode_key("Rate", None, 3);
        assert_eq!(key, "3,;Rate");
    }

    #[test]
    fn round_trips_through_encode_and_decode() {
        let o = sample();
        let key = encode_key(&o.name, o.sub_app_id, o.data_center);
        let value = encode_value(&o).unwrap();
        let decoded = decode(&key, &value).unwrap();
        assert_eq!(decoded, o);
    }

    #[test]
    fn round_trips_with_expiration() {
        let mut o = sample();
        o.expiration_time = Some(OffsetDateTime::now_utc());
        let key = encode_key(&o.name, o.sub_app_id, o.data_center);
        let value = encode_value(&o).unwrap();
        let decoded = decode(&key, &value).unwrap();
        assert_eq!(decoded.name, o.name);
        assert!(decoded.expiration_time.is_some());
    }

    #[test]
    fn malformed_key_reports_invalid_override_value() {
        let err = decode("not-a-valid-key", "00").unwrap_err();
        match err {
            Error::InvalidOverrideValue { raw_key, .. } => assert_eq!(raw_key, "not-a-valid-key"),
            _ => panic!("expected InvalidOverrideValue"),
        }
    }
}
