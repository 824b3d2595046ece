use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::DocumentStore;

use crate::document::PatientDocument;
use crate::error::PatientError;
use crate::models::PatientRecord;

pub const COLLECTION: &str = "patients";

/// Persists patient records as flat documents, keyed by patient id.
#[derive(Clone)]
pub struct PatientRepository {
    store: Arc<dyn DocumentStore>,
}

impl PatientRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Upserts the whole document.
    pub async fn save(&self, record: &PatientRecord) -> Result<(), PatientError> {
        debug!("Saving patient {}", record.id);
        let document = serde_json::to_value(PatientDocument::from(record))
            .map_err(|e| PatientError::CorruptDocument(e.to_string()))?;
        self.store
            .put(COLLECTION, &record.id.to_string(), document)
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<PatientRecord>, PatientError> {
        let Some(value) = self.store.get(COLLECTION, &id.to_string()).await? else {
            return Ok(None);
        };

        let document: PatientDocument = serde_json::from_value(value)
            .map_err(|e| PatientError::CorruptDocument(format!("{}: {}", id, e)))?;
        Ok(Some(document.into_record()))
    }

    /// Every decodable record, ordered by name (case-insensitive) then id.
    /// Documents that cannot be decoded are skipped with a warning.
    pub async fn list_all(&self) -> Result<Vec<PatientRecord>, PatientError> {
        let values = self.store.list(COLLECTION).await?;

        let mut records: Vec<PatientRecord> = values
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<PatientDocument>(value) {
                Ok(document) => Some(document.into_record()),
                Err(e) => {
                    warn!("Skipping malformed patient document: {}", e);
                    None
                }
            })
            .collect();

        records.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(records)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), PatientError> {
        debug!("Deleting patient {}", id);
        self.store.delete(COLLECTION, &id.to_string()).await?;
        Ok(())
    }
}
