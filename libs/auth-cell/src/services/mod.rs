pub mod credentials;

pub use credentials::{hash_password, verify_password, CredentialProvider, StaticCredentialProvider};
