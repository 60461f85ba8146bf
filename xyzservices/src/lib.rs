#![cfg_attr(doc, doc = include_str!("../README.md"))]
#![forbid(unsafe_code)]

pub mod commands;
pub mod config;
pub mod logging;

mod error;
pub use error::{XyzError, XyzResult};
