use std::collections::BTreeMap;
use tracing::{info, warn};

use super::{ByteStore, PersistenceError};
use crate::registry::FeatureRecord;

/// Every record, keyed by feature name.
pub type FeatureTable = BTreeMap<String, FeatureRecord>;

pub fn encode_table(table: &FeatureTable, pretty: bool) -> Result<Vec<u8>, PersistenceError> {
    let bytes = if pretty {
        serde_json::to_vec_pretty(table)?
    } else {
        serde_json::to_vec(table)?
    };
    Ok(bytes)
}

pub fn decode_table(bytes: &[u8]) -> Result<FeatureTable, PersistenceError> {
    let table: FeatureTable = serde_json::from_slice(bytes)?;
    if let Some((key, record)) = table.iter().find(|(key, record)| **key != record.feature_name) {
        return Err(PersistenceError::Corrupt {
            reason: format!(
                "entry '{key}' holds record for '{}'",
                record.feature_name
            ),
        });
    }
    Ok(table)
}

/// Load the table from `store`.
///
/// A missing location is an empty table. When `fail_open` is set, read and
/// decode failures are logged and also yield an empty table; otherwise they
/// are returned.
pub async fn load_table(
    store: &dyn ByteStore,
    fail_open: bool,
) -> Result<FeatureTable, PersistenceError> {
    let loaded = match store.read().await {
        Ok(None) => {
            info!(location = %store.location(), "No stored features, starting empty");
            return Ok(FeatureTable::new());
        }
        Ok(Some(bytes)) => decode_table(&bytes),
        Err(e) => Err(e),
    };

    match loaded {
        Ok(table) => {
            info!(
                location = %store.location(),
                features = table.len(),
                "Loaded feature table"
            );
            Ok(table)
        }
        Err(e) if fail_open => {
            warn!(
                location = %store.location(),
                error = %e,
                "Could not load feature table, starting empty"
            );
            Ok(FeatureTable::new())
        }
        Err(e) => Err(match e {
            PersistenceError::SerializationError(err) => PersistenceError::Corrupt {
                reason: err.to_string(),
            },
            other => other,
        }),
    }
}
