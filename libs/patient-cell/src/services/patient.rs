use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use screening_cell::{classify_photo, Eye, FundusClassifier, GlaucomaAssessment};
use shared_database::DocumentStore;

use crate::error::PatientError;
use crate::models::{
    CreatePatientRequest, EyeScan, PatientRecord, PhotoOutcome, PhotoReport, PhotoUploads,
    SaveOutcome, UpdateDemographicsRequest,
};
use crate::services::repository::PatientRepository;
use crate::validation::{self, MAX_FIELD_LEN, MAX_NAME_LEN};

pub struct PatientService {
    repository: PatientRepository,
    classifier: Arc<dyn FundusClassifier>,
}

impl PatientService {
    pub fn new(store: Arc<dyn DocumentStore>, classifier: Arc<dyn FundusClassifier>) -> Self {
        Self {
            repository: PatientRepository::new(store),
            classifier,
        }
    }

    /// Validates everything before touching the store, then classifies the
    /// supplied photos and writes a single document.
    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
        photos: PhotoUploads,
    ) -> Result<SaveOutcome, PatientError> {
        let demographics = validation::validate_new_patient(&request)?;
        let now = Utc::now();

        let mut patient = PatientRecord {
            id: Uuid::new_v4(),
            name: demographics.name,
            age: demographics.age,
            sex: demographics.sex,
            address: demographics.address,
            national_id: demographics.national_id,
            phone: demographics.phone,
            prior_symptoms: demographics.prior_symptoms,
            right_eye: None,
            left_eye: None,
            report: None,
            created_at: now,
            updated_at: now,
        };

        let photos = self.classify_uploads(&mut patient, photos).await;
        self.repository.save(&patient).await?;

        info!("Created patient {} ({})", patient.id, patient.name);
        Ok(SaveOutcome { patient, photos })
    }

    pub async fn get_patient(&self, id: Uuid) -> Result<PatientRecord, PatientError> {
        self.repository
            .get(id)
            .await?
            .ok_or(PatientError::NotFound(id))
    }

    pub async fn list_patients(&self) -> Result<Vec<PatientRecord>, PatientError> {
        self.repository.list_all().await
    }

    /// Applies only the supplied fields. Renaming keeps the same record.
    pub async fn update_demographics(
        &self,
        id: Uuid,
        update: UpdateDemographicsRequest,
    ) -> Result<PatientRecord, PatientError> {
        if update.is_empty() {
            return Err(PatientError::Validation("no fields to update".to_string()));
        }

        let mut patient = self.get_patient(id).await?;

        if let Some(name) = &update.name {
            patient.name = validation::required("name", name, MAX_NAME_LEN)?;
        }
        if let Some(age) = &update.age {
            patient.age = validation::age(age)?;
        }
        if let Some(sex) = update.sex {
            patient.sex = sex;
        }
        if let Some(address) = &update.address {
            patient.address = validation::required("address", address, MAX_FIELD_LEN)?;
        }
        if let Some(national_id) = &update.national_id {
            patient.national_id = validation::required("national_id", national_id, MAX_FIELD_LEN)?;
        }
        if let Some(phone) = &update.phone {
            patient.phone = validation::required("phone", phone, MAX_FIELD_LEN)?;
        }
        if let Some(symptoms) = &update.prior_symptoms {
            patient.prior_symptoms = validation::optional_text("prior_symptoms", Some(symptoms))?;
        }

        patient.updated_at = Utc::now();
        self.repository.save(&patient).await?;

        debug!("Updated demographics of patient {}", id);
        Ok(patient)
    }

    /// Replaces the medical report. A blank report clears it. Everything
    /// else is taken from the stored record.
    pub async fn update_report(
        &self,
        id: Uuid,
        report: Option<String>,
    ) -> Result<PatientRecord, PatientError> {
        let report = validation::optional_text("report", report.as_deref())?;

        let mut patient = self.get_patient(id).await?;
        patient.report = report;
        patient.updated_at = Utc::now();
        self.repository.save(&patient).await?;

        info!("Updated report of patient {}", id);
        Ok(patient)
    }

    /// Classifies and stores new photos. Eyes without an upload keep their
    /// current scan; an eye whose upload is rejected keeps it too.
    pub async fn attach_photos(
        &self,
        id: Uuid,
        photos: PhotoUploads,
    ) -> Result<SaveOutcome, PatientError> {
        if photos.is_empty() {
            return Err(PatientError::Validation(
                "at least one of right_eye or left_eye is required".to_string(),
            ));
        }

        let mut patient = self.get_patient(id).await?;
        let report = self.classify_uploads(&mut patient, photos).await;

        if report.stored_any() {
            patient.updated_at = Utc::now();
            self.repository.save(&patient).await?;
        }

        Ok(SaveOutcome {
            patient,
            photos: report,
        })
    }

    /// Removes the patient. Deleting an absent id succeeds.
    pub async fn delete_patient(&self, id: Uuid) -> Result<(), PatientError> {
        self.repository.delete(id).await?;
        info!("Deleted patient {}", id);
        Ok(())
    }

    /// Stored JPEG bytes for one eye.
    pub async fn photo(&self, id: Uuid, eye: Eye) -> Result<Vec<u8>, PatientError> {
        let mut patient = self.get_patient(id).await?;
        let scan = match eye {
            Eye::Right => patient.right_eye.take(),
            Eye::Left => patient.left_eye.take(),
        };
        scan.map(|scan| scan.photo)
            .ok_or(PatientError::PhotoNotFound(id, eye))
    }

    async fn classify_uploads(
        &self,
        patient: &mut PatientRecord,
        mut uploads: PhotoUploads,
    ) -> PhotoReport {
        let mut report = PhotoReport::default();

        for eye in Eye::BOTH {
            let Some(bytes) = uploads.take(eye) else {
                continue;
            };

            let outcome = match classify_photo(self.classifier.clone(), bytes).await {
                Ok(classified) => {
                    patient.set_scan(
                        eye,
                        EyeScan {
                            photo: classified.jpeg,
                            prediction: classified.prediction,
                            captured_at: Utc::now(),
                        },
                    );
                    PhotoOutcome::Stored {
                        assessment: GlaucomaAssessment::from_prediction(eye, classified.prediction),
                    }
                }
                Err(e) => {
                    warn!("Rejected {} eye photo for patient {}: {}", eye, patient.id, e);
                    PhotoOutcome::Rejected {
                        reason: e.to_string(),
                    }
                }
            };
            report.set(eye, outcome);
        }

        report
    }
}
