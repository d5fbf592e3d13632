//! Microsoft Graph directory lookup.
//!
//! Queries the `/users` collection with an OData filter on `mailNickname`
//! and classifies the first page of results.

pub mod client;
pub mod models;

pub use client::DirectoryLookup;
pub use models::LookupResult;
