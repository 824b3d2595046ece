use crate::error::PatientError;
use crate::models::{AgeInput, CreatePatientRequest, Sex};

pub const MAX_AGE: u8 = 130;
pub const MAX_NAME_LEN: usize = 200;
pub const MAX_FIELD_LEN: usize = 500;
pub const MAX_TEXT_LEN: usize = 20_000;

/// Demographics that passed validation on create.
#[derive(Debug, Clone)]
pub struct ValidDemographics {
    pub name: String,
    pub age: u8,
    pub sex: Sex,
    pub address: String,
    pub national_id: String,
    pub phone: String,
    pub prior_symptoms: Option<String>,
}

pub fn required(field: &str, value: &str, max_len: usize) -> Result<String, PatientError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PatientError::Validation(format!("{} is required", field)));
    }
    if trimmed.chars().count() > max_len {
        return Err(PatientError::Validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(trimmed.to_string())
}

/// Free text that may be blank. Blank becomes `None`.
pub fn optional_text(field: &str, value: Option<&str>) -> Result<Option<String>, PatientError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) if text.chars().count() > MAX_TEXT_LEN => Err(PatientError::Validation(
            format!("{} must be at most {} characters", field, MAX_TEXT_LEN),
        )),
        Some(text) => Ok(Some(text.to_string())),
    }
}

pub fn age(input: &AgeInput) -> Result<u8, PatientError> {
    let value = match input {
        AgeInput::Number(n) => *n,
        AgeInput::Text(text) => text.trim().parse::<i64>().map_err(|_| {
            PatientError::Validation(format!("age must be a whole number, got '{}'", text.trim()))
        })?,
    };

    if value < 1 || value > i64::from(MAX_AGE) {
        return Err(PatientError::Validation(format!(
            "age must be between 1 and {}",
            MAX_AGE
        )));
    }
    Ok(value as u8)
}

pub fn validate_new_patient(request: &CreatePatientRequest) -> Result<ValidDemographics, PatientError> {
    let name = required("name", &request.name, MAX_NAME_LEN)?;
    let age = age(request
        .age
        .as_ref()
        .ok_or_else(|| PatientError::Validation("age is required".to_string()))?)?;
    let sex = request
        .sex
        .ok_or_else(|| PatientError::Validation("sex is required".to_string()))?;

    Ok(ValidDemographics {
        name,
        age,
        sex,
        address: required("address", &request.address, MAX_FIELD_LEN)?,
        national_id: required("national_id", &request.national_id, MAX_FIELD_LEN)?,
        phone: required("phone", &request.phone, MAX_FIELD_LEN)?,
        prior_symptoms: optional_text("prior_symptoms", request.prior_symptoms.as_deref())?,
    })
}
