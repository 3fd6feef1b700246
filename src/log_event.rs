//! Binary log-event layout recorded for every mutating store operation.
//!
//! Fixed, fully-specified byte layout (little-endian multi-byte integers);
//! hand-rolled rather than pulled in through a wire-format crate, the same
//! way this crate's override key/value pairs ([`crate::backend::encoding`])
//! are hand-rolled.
//!
//! ```text
//! version      : u8 = 1
//! eventType    : u8   (1=SetOverride, 2=ClearOverride, 3=RestoreSnapshot)
//! appName      : nullable string
//! commit       : nullable string   (post-event)
//! timestamp    : i64  (unix seconds)
//! settingName  : nullable string
//! settingValue : nullable string
//! restoredCommit : nullable string
//! dataCenter   : u32
//! user         : nullable string
//! ```
//! A nullable string is `0x00` (null) or `0x01` followed by a `u32` byte
//! length and that many UTF-8 bytes.

use crate::commit::Commit;
use crate::error::Error;
use time::OffsetDateTime;

const VERSION: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEventType {
    SetOverride = 1,
    ClearOverride = 2,
    RestoreSnapshot = 3,
}

impl LogEventType {
    fn from_byte(b: u8) -> Result<Self, Error> {
        match b {
            1 => Ok(Self::SetOverride),
            2 => Ok(Self::ClearOverride),
            3 => Ok(Self::RestoreSnapshot),
            other => Err(Error::BackendError(format!("unknown log event type byte {other}"))),
        }
    }
}

/// One recorded mutation against an app's overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub event_type: LogEventType,
    pub app_name: Option<String>,
    pub commit: Option<Commit>,
    pub timestamp: OffsetDateTime,
    pub setting_name: Option<String>,
    pub setting_value: Option<String>,
    pub restored_commit: Option<Commit>,
    pub data_center: u32,
    pub user: Option<String>,
}

fn write_nullable_string(buf: &mut Vec<u8>, value: Option<&str>) {
    match value {
        None => buf.push(0x00),
        Some(s) => {
            buf.push(0x01);
            let bytes = s.as_bytes();
            buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            buf.extend_from_slice(bytes);
        }
    }
}

fn read_nullable_string(bytes: &[u8], pos: &mut usize) -> Result<Option<String>, Error> {
    let tag = *bytes.get(*pos).ok_or_else(too_short)?;
    *pos += 1;
    match tag {
        0x00 => Ok(None),
        0x01 => {
            let len_bytes = bytes.get(*pos..*pos + 4).ok_or_else(too_short)?;
            let len = u32::from_le_bytes(len_bytes.try_into().unwrap()) as usize;
            *pos += 4;
            let str_bytes = bytes.get(*pos..*pos + len).ok_or_else(too_short)?;
            *pos += len;
            let s = String::from_utf8(str_bytes.to_vec())
                .map_err(|e| Error::BackendError(format!("log event string is not valid utf-8: {e}")))?;
            Ok(Some(s))
        }
        other => Err(Error::BackendError(format!("unknown nullable-string tag byte {other}"))),
    }
}

fn too_short() -> Error {
    Error::BackendError("log event buffer truncated".to_string())
}

impl LogEvent {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(VERSION);
        buf.push(self.event_type as u8);
        write_nullable_string(&mut buf, self.app_name.as_deref());
        write_nullable_string(&mut buf, self.commit.map(|c| c.to_string()).as_deref());
        buf.extend_from_slice(&self.timestamp.unix_timestamp().to_le_bytes());
        write_nullable_string(&mut buf, self.setting_name.as_deref());
        write_nullable_string(&mut buf, self.setting_value.as_deref());
        write_nullable_string(&mut buf, self.restored_commit.map(|c| c.to_string()).as_deref());
        buf.extend_from_slice(&self.data_center.to_le_bytes());
        write_nullable_string(&mut buf, self.user.as_deref());
        buf
    }

    /// # Errors
    /// Returns [`Error::BackendError`] if `bytes` is truncated or carries an
    /// unrecognized version/type tag.
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let mut pos = 0usize;
        let version = *bytes.first().ok_or_else(too_short)?;
        if version != VERSION {
            return Err(Error::BackendError(format!("unsupported log event version {version}")));
        }
        pos += 1;
        let event_type = LogEventType::from_byte(*bytes.get(pos).ok_or_else(too_short)?)?;
        pos += 1;

        let app_name = read_nullable_string(bytes, &mut pos)?;
        let commit = read_nullable_string(bytes, &mut pos)?
            .map(|s| s.parse())
            .transpose()?;

        let ts_bytes = bytes.get(pos..pos + 8).ok_or_else(too_short)?;
        let timestamp = OffsetDateTime::from_unix_timestamp(i64::from_le_bytes(ts_bytes.try_into().unwrap()))
            .map_err(|e| Error::BackendError(format!("invalid log event timestamp: {e}")))?;
        pos += 8;

        let setting_name = read_nullable_string(bytes, &mut pos)?;
        let setting_value = read_nullable_string(bytes, &mut pos)?;
        let restored_commit = read_nullable_string(bytes, &mut pos)?
            .map(|s| s.parse())
            .transpose()?;

        let dc_bytes = bytes.get(pos..pos + 4).ok_or_else(too_short)?;
        let data_center = u32::from_le_bytes(dc_bytes.try_into().unwrap());
        pos += 4;

        let user = read_nullable_string(bytes, &mut pos)?;

        Ok(Self {
            event_type,
            app_name,
            commit,
            timestamp,
            setting_name,
            setting_value,
            restored_commit,
            data_center,
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LogEvent {
        LogEvent {
            event_type: LogEventType::SetOverride,
            app_name: Some("billing".to_string()),
            commit: Some(Commit::generate()),
            timestamp: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
            setting_name: Some("Rate".to_string()),
            setting_value: Some("10".to_string()),
            restored_commit: None,
            data_center: 3,
            user: Some("alice".to_string()),
        }
    }

    #[test]
    fn round_trips_through_encode_and_decode() {
        let event = sample();
        let bytes = event.encode();
        let decoded = LogEvent::decode(&bytes).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn null_fields_round_trip() {
        let mut event = sample();
        event.app_name = None;
        event.commit = None;
        event.restored_commit = None;
        event.user = None;
        let bytes = event.encode();
        let decoded = LogEvent::decode(&bytes).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let bytes = sample().encode();
        assert!(LogEvent::decode(&bytes[..bytes.len() - 3]).is_err());
    }

    #[test]
    fn restore_snapshot_event_carries_restored_commit() {
        let mut event = sample();
        event.event_type = LogEventType::RestoreSnapshot;
        event.restored_commit = Some(Commit::generate());
        event.setting_name = None;
        event.setting_value = None;
        let bytes = event.encode();
        let decoded = LogEvent::decode(&bytes).unwrap();
        assert_eq!(decoded.restored_commit, event.restored_commit);
    }
}
