use std::fmt;

use chrono::{DateTime, Utc};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use screening_cell::{decode_photo, Eye, GlaucomaAssessment, ScreeningError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    #[serde(alias = "Male", alias = "Masculino", alias = "masculino")]
    Male,
    #[serde(alias = "Female", alias = "Femenino", alias = "femenino")]
    Female,
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Male => write!(f, "Male"),
            Sex::Female => write!(f, "Female"),
        }
    }
}

/// A fundus photo together with the classifier output it produced. The two
/// only ever exist as a pair.
#[derive(Debug, Clone, PartialEq)]
pub struct EyeScan {
    /// JPEG bytes.
    pub photo: Vec<u8>,
    pub prediction: f32,
    pub captured_at: DateTime<Utc>,
}

impl EyeScan {
    pub fn image(&self) -> Result<DynamicImage, ScreeningError> {
        decode_photo(&self.photo)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatientRecord {
    pub id: Uuid,
    pub name: String,
    pub age: u8,
    pub sex: Sex,
    pub address: String,
    pub national_id: String,
    pub phone: String,
    pub prior_symptoms: Option<String>,
    pub right_eye: Option<EyeScan>,
    pub left_eye: Option<EyeScan>,
    pub report: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PatientRecord {
    pub fn scan(&self, eye: Eye) -> Option<&EyeScan> {
        match eye {
            Eye::Right => self.right_eye.as_ref(),
            Eye::Left => self.left_eye.as_ref(),
        }
    }

    pub fn set_scan(&mut self, eye: Eye, scan: EyeScan) {
        match eye {
            Eye::Right => self.right_eye = Some(scan),
            Eye::Left => self.left_eye = Some(scan),
        }
    }

    pub fn assessment(&self, eye: Eye) -> Option<GlaucomaAssessment> {
        self.scan(eye)
            .map(|scan| GlaucomaAssessment::from_prediction(eye, scan.prediction))
    }
}

/// Age as submitted. The intake form historically sent it as free text, so
/// both `54` and `"54"` are accepted and validated into a bounded integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgeInput {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: Option<AgeInput>,
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub national_id: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub prior_symptoms: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDemographicsRequest {
    pub name: Option<String>,
    pub age: Option<AgeInput>,
    pub sex: Option<Sex>,
    pub address: Option<String>,
    pub national_id: Option<String>,
    pub phone: Option<String>,
    pub prior_symptoms: Option<String>,
}

impl UpdateDemographicsRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.age.is_none()
            && self.sex.is_none()
            && self.address.is_none()
            && self.national_id.is_none()
            && self.phone.is_none()
            && self.prior_symptoms.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateReportRequest {
    pub report: Option<String>,
}

/// Raw photo bytes per eye, as uploaded.
#[derive(Debug, Clone, Default)]
pub struct PhotoUploads {
    pub right_eye: Option<Vec<u8>>,
    pub left_eye: Option<Vec<u8>>,
}

impl PhotoUploads {
    pub fn set(&mut self, eye: Eye, bytes: Vec<u8>) {
        match eye {
            Eye::Right => self.right_eye = Some(bytes),
            Eye::Left => self.left_eye = Some(bytes),
        }
    }

    pub fn take(&mut self, eye: Eye) -> Option<Vec<u8>> {
        match eye {
            Eye::Right => self.right_eye.take(),
            Eye::Left => self.left_eye.take(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.right_eye.is_none() && self.left_eye.is_none()
    }
}

/// What happened to one eye's upload during a save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PhotoOutcome {
    Stored { assessment: GlaucomaAssessment },
    Rejected { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotoReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_eye: Option<PhotoOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left_eye: Option<PhotoOutcome>,
}

impl PhotoReport {
    pub fn set(&mut self, eye: Eye, outcome: PhotoOutcome) {
        match eye {
            Eye::Right => self.right_eye = Some(outcome),
            Eye::Left => self.left_eye = Some(outcome),
        }
    }

    pub fn get(&self, eye: Eye) -> Option<&PhotoOutcome> {
        match eye {
            Eye::Right => self.right_eye.as_ref(),
            Eye::Left => self.left_eye.as_ref(),
        }
    }

    pub fn stored_any(&self) -> bool {
        Eye::BOTH
            .iter()
            .any(|eye| matches!(self.get(*eye), Some(PhotoOutcome::Stored { .. })))
    }
}

#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub patient: PatientRecord,
    pub photos: PhotoReport,
}

// Response views. Photo bytes are never inlined; they are served from
// `/patients/{id}/photos/{eye}`.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EyeScanView {
    pub prediction: f32,
    pub captured_at: DateTime<Utc>,
    pub assessment: GlaucomaAssessment,
    pub photo_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDetail {
    pub id: Uuid,
    pub name: String,
    pub age: u8,
    pub sex: Sex,
    pub address: String,
    pub national_id: String,
    pub phone: String,
    pub prior_symptoms: Option<String>,
    pub report: Option<String>,
    pub right_eye: Option<EyeScanView>,
    pub left_eye: Option<EyeScanView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn scan_view(record: &PatientRecord, eye: Eye) -> Option<EyeScanView> {
    record.scan(eye).map(|scan| EyeScanView {
        prediction: scan.prediction,
        captured_at: scan.captured_at,
        assessment: GlaucomaAssessment::from_prediction(eye, scan.prediction),
        photo_url: format!("/patients/{}/photos/{}", record.id, eye),
    })
}

impl From<&PatientRecord> for PatientDetail {
    fn from(record: &PatientRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            age: record.age,
            sex: record.sex,
            address: record.address.clone(),
            national_id: record.national_id.clone(),
            phone: record.phone.clone(),
            prior_symptoms: record.prior_symptoms.clone(),
            report: record.report.clone(),
            right_eye: scan_view(record, Eye::Right),
            left_eye: scan_view(record, Eye::Left),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: Uuid,
    pub name: String,
    pub age: u8,
    pub sex: Sex,
    pub right_eye: Option<GlaucomaAssessment>,
    pub left_eye: Option<GlaucomaAssessment>,
    pub has_report: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<&PatientRecord> for PatientSummary {
    fn from(record: &PatientRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            age: record.age,
            sex: record.sex,
            right_eye: record.assessment(Eye::Right),
            left_eye: record.assessment(Eye::Left),
            has_report: record.report.is_some(),
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavePatientResponse {
    pub patient: PatientDetail,
    pub photos: PhotoReport,
}

impl From<&SaveOutcome> for SavePatientResponse {
    fn from(outcome: &SaveOutcome) -> Self {
        Self {
            patient: PatientDetail::from(&outcome.patient),
            photos: outcome.photos.clone(),
        }
    }
}
