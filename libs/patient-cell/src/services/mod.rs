pub mod patient;
pub mod repository;

pub use patient::PatientService;
pub use repository::{PatientRepository, COLLECTION};
