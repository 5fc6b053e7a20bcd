use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, instrument, warn};

use slotd_model::{ConfigRecord, RawFields, SlotId};

use crate::{config::SupervisorConfig, error::ConfigError};

/// Turns request payloads into slot config files.
///
/// The written file is the only copy; nothing is cached in memory.
#[derive(Debug, Clone)]
pub struct ConfigWriter {
    cfg: SupervisorConfig,
}

impl ConfigWriter {
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self { cfg }
    }

    /// Validate `fields`, then atomically replace the slot's config file.
    #[instrument(level = "debug", skip(self, fields), fields(slot = %slot))]
    pub async fn write(&self, slot: SlotId, fields: &RawFields) -> Result<PathBuf, ConfigError> {
        let record = parse_record(slot, fields)?;
        let path = self.cfg.config_path(slot);
        let body = serde_json::to_vec(&record).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e.into(),
        })?;

        write_atomic(&path, &body).await?;
        debug!(path = %path.display(), rivals = record.rival.len(), "slot config written");
        Ok(path)
    }
}

/// Build the config record for `slot` from slot-suffixed request keys.
pub fn parse_record(slot: SlotId, fields: &RawFields) -> Result<ConfigRecord, ConfigError> {
    Ok(ConfigRecord {
        rc: text(fields, &key("RC", slot))?,
        attack_time: integer(fields, &key("AttackTime", slot))?,
        defence_time: integer(fields, &key("DefenceTime", slot))?,
        planet_name: text(fields, &key("PlanetName", slot))?,
        interval: integer(fields, &key("IntervalTime", slot))?,
        rival: split_rivals(&text(fields, &key("Rival", slot))?),
    })
}

/// Split a comma-joined rival list.
///
/// Order and duplicates are preserved and interior empty entries are kept,
/// but an empty input yields no rivals at all.
pub fn split_rivals(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(',').map(str::to_string).collect()
}

fn key(name: &str, slot: SlotId) -> String {
    format!("{name}{slot}")
}

fn lookup<'a>(fields: &'a RawFields, field: &str) -> Result<&'a Value, ConfigError> {
    match fields.get(field) {
        None | Some(Value::Null) => Err(ConfigError::MissingField(field.to_string())),
        Some(v) => Ok(v),
    }
}

fn text(fields: &RawFields, field: &str) -> Result<String, ConfigError> {
    match lookup(fields, field)? {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected a string, got {other}"),
        }),
    }
}

fn integer(fields: &RawFields, field: &str) -> Result<i64, ConfigError> {
    let value = lookup(fields, field)?;
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ConfigError::InvalidNumber {
        field: field.to_string(),
        value: match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    })
}

async fn write_atomic(path: &Path, body: &[u8]) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, body).await.map_err(io_err)?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
            warn!(path = %tmp.display(), error = %cleanup, "failed to remove temporary config");
        }
        return Err(io_err(e));
    }
    Ok(())
}
