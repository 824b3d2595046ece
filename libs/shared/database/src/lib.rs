pub mod memory;
pub mod store;
pub mod supabase;

pub use memory::InMemoryDocumentStore;
pub use store::{DocumentStore, StoreError};
pub use supabase::{SupabaseClient, SupabaseDocumentStore};
