//! HTTP plumbing shared by the registry client and the tarball provider.

mod client;

pub use client::{error_message, HttpClient, HttpClientConfig, HttpError};
