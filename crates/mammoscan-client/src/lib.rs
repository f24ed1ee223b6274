//! mammoscan-client: Typed access to the imaging backend.
//!
//! Every call goes through [`ImagingApi`]; [`HttpImagingClient`] is the
//! reqwest implementation. Failures collapse into [`ApiError`], whose
//! `Display` is the text shown to the user.

pub mod api;
pub mod client;
pub mod error;

pub use api::{ImageFile, ImagingApi};
pub use client::{resolve_base_url, ClientConfig, HttpImagingClient};
pub use error::{ApiError, ApiResult};
