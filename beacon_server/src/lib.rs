#![forbid(unsafe_code)]

pub mod cli;
pub mod registrations;
pub mod runtime;
