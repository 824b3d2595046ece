pub mod document;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod validation;

pub use error::PatientError;
pub use models::*;
pub use router::{patient_routes, PatientState};
pub use services::{PatientRepository, PatientService};
