pub mod pdf;

pub use pdf::{wrap_text, GeneratedReport, ReportGenerator};
