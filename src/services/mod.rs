// src/services/mod.rs
//
// Clients for the external collaborators: the identity provider and the
// object store holding the post log

pub mod blob_log;
pub mod identity;
pub mod object_store;

// Re-export commonly used types for convenience
pub use blob_log::BlobLog;
pub use identity::{FirebaseIdentity, ServiceAccountSigner};
pub use object_store::S3ObjectStore;
