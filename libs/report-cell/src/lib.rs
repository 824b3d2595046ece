pub mod error;
pub mod handlers;
pub mod router;
pub mod services;

pub use error::ReportError;
pub use router::{report_routes, ReportState};
pub use services::{GeneratedReport, ReportGenerator};
