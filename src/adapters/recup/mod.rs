//! ReCUP booking service integration
//!
//! - [`api`] - the [`RecupApi`] trait the workflows depend on
//! - [`client`] - the reqwest implementation
//! - [`models`] - wire DTOs and request bodies

pub mod api;
pub mod client;
pub mod models;

pub use api::{AccessToken, RecupApi};
pub use client::RecupHttpClient;
