//! Optional connectors, one per remote service.

#[cfg(feature = "github")]
pub mod github;
