//! Account storage for the authentication pipeline.
//!
//! The pipeline only reads accounts through [`suivi_core::AccountLookup`];
//! [`InMemoryAccountStore`] is the bundled implementation used by the
//! server binary and by tests.

pub mod memory;

pub use memory::InMemoryAccountStore;
