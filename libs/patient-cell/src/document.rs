use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use screening_cell::Eye;

use crate::models::{EyeScan, PatientRecord, Sex};

/// Flat form of a [`PatientRecord`] as written to the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDocument {
    pub id: Uuid,
    pub name: String,
    pub age: u8,
    pub sex: Sex,
    pub address: String,
    pub national_id: String,
    pub phone: String,
    #[serde(default)]
    pub prior_symptoms: Option<String>,
    #[serde(default, with = "base64_photo")]
    pub right_eye_photo: Option<Vec<u8>>,
    #[serde(default)]
    pub right_eye_prediction: Option<f32>,
    #[serde(default)]
    pub right_eye_captured_at: Option<DateTime<Utc>>,
    #[serde(default, with = "base64_photo")]
    pub left_eye_photo: Option<Vec<u8>>,
    #[serde(default)]
    pub left_eye_prediction: Option<f32>,
    #[serde(default)]
    pub left_eye_captured_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub report: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&PatientRecord> for PatientDocument {
    fn from(record: &PatientRecord) -> Self {
        let right = record.right_eye.as_ref();
        let left = record.left_eye.as_ref();
        Self {
            id: record.id,
            name: record.name.clone(),
            age: record.age,
            sex: record.sex,
            address: record.address.clone(),
            national_id: record.national_id.clone(),
            phone: record.phone.clone(),
            prior_symptoms: record.prior_symptoms.clone(),
            right_eye_photo: right.map(|s| s.photo.clone()),
            right_eye_prediction: right.map(|s| s.prediction),
            right_eye_captured_at: right.map(|s| s.captured_at),
            left_eye_photo: left.map(|s| s.photo.clone()),
            left_eye_prediction: left.map(|s| s.prediction),
            left_eye_captured_at: left.map(|s| s.captured_at),
            report: record.report.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

impl PatientDocument {
    /// Rebuilds the record. An eye whose photo and prediction are not both
    /// present is dropped with a warning; the rest of the record survives.
    pub fn into_record(self) -> PatientRecord {
        let right_eye = pair(
            self.id,
            Eye::Right,
            self.right_eye_photo,
            self.right_eye_prediction,
            self.right_eye_captured_at.unwrap_or(self.updated_at),
        );
        let left_eye = pair(
            self.id,
            Eye::Left,
            self.left_eye_photo,
            self.left_eye_prediction,
            self.left_eye_captured_at.unwrap_or(self.updated_at),
        );

        PatientRecord {
            id: self.id,
            name: self.name,
            age: self.age,
            sex: self.sex,
            address: self.address,
            national_id: self.national_id,
            phone: self.phone,
            prior_symptoms: self.prior_symptoms,
            right_eye,
            left_eye,
            report: self.report,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn pair(
    id: Uuid,
    eye: Eye,
    photo: Option<Vec<u8>>,
    prediction: Option<f32>,
    captured_at: DateTime<Utc>,
) -> Option<EyeScan> {
    match (photo, prediction) {
        (Some(photo), Some(prediction)) => Some(EyeScan {
            photo,
            prediction,
            captured_at,
        }),
        (None, None) => None,
        (photo, _) => {
            warn!(
                "Patient {} has a broken {} eye pair (photo: {}), dropping it",
                id,
                eye,
                photo.is_some()
            );
            None
        }
    }
}

mod base64_photo {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) if !encoded.is_empty() => STANDARD.decode(encoded).map(Some).map_err(D::Error::custom),
            _ => Ok(None),
        }
    }
}
