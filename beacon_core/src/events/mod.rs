#![forbid(unsafe_code)]

mod error;

pub mod console;
pub mod memory;
pub mod models;
pub mod traits;

pub use error::{Error, Result};
