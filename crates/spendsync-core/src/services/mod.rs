//! Services shared by the sync engine and client binaries.

mod local_store;

pub use local_store::LocalStore;
