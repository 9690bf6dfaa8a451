//! Platform API: HTTP client, wire types and errors.

pub mod client;
pub mod error;
pub mod types;

pub use client::{ApiClient, ProjectsApi};
pub use error::{FetchError, RemoteError};
pub use types::{PostgrestStatus, Profile, ProjectInfo, ProjectStatus};
