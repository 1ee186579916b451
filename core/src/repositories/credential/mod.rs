mod store;

pub use store::CredentialStore;
