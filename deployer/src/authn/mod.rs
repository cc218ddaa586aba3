//! Service account credentials and access tokens

pub mod credentials;
pub mod service_account;
pub mod token_mngr;
