use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Eye {
    Right,
    Left,
}

impl Eye {
    pub const BOTH: [Eye; 2] = [Eye::Right, Eye::Left];

    /// Multipart field name used for this eye's photo upload.
    pub fn field_name(&self) -> &'static str {
        match self {
            Eye::Right => "right_eye",
            Eye::Left => "left_eye",
        }
    }

    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::BOTH.into_iter().find(|eye| eye.field_name() == name)
    }
}

impl fmt::Display for Eye {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eye::Right => write!(f, "right"),
            Eye::Left => write!(f, "left"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    AtRisk,
    Negative,
}

/// Clinician-facing reading of a raw classifier output.
///
/// The model outputs the probability of a healthy eye. At or above 0.5 the
/// result is shown as the probability of NOT having glaucoma (`p`); below it,
/// as the probability of having glaucoma (`1 - p`). The displayed percentage
/// is therefore always at least 50%.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlaucomaAssessment {
    pub eye: Eye,
    pub prediction: f32,
    pub risk: RiskLevel,
    pub probability_percent: f64,
    pub message: String,
}

impl GlaucomaAssessment {
    pub const THRESHOLD: f32 = 0.5;

    pub fn from_prediction(eye: Eye, prediction: f32) -> Self {
        let p = f64::from(prediction);
        if prediction >= Self::THRESHOLD {
            let pct = p * 100.0;
            Self {
                eye,
                prediction,
                risk: RiskLevel::Negative,
                probability_percent: pct,
                message: format!(
                    "{:.2}% probability of NOT having glaucoma in the {} eye.",
                    pct, eye
                ),
            }
        } else {
            let pct = (1.0 - p) * 100.0;
            Self {
                eye,
                prediction,
                risk: RiskLevel::AtRisk,
                probability_percent: pct,
                message: format!(
                    "{:.2}% probability of having glaucoma in the {} eye.",
                    pct, eye
                ),
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub eye: Eye,
    pub prediction: f32,
    pub assessment: GlaucomaAssessment,
}
