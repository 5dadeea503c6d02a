//! Box registry HTTP client.
//!
//! Implements [`boxreg_upload::UploadRemote`] over the registry's upload
//! session endpoints.

pub mod client;

pub use client::{ClientError, RegistryClient};
