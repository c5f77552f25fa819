// src/lib.rs

//! Course catalog crawler library.
//!
//! Crawls the university course catalog and publishes departments, courses,
//! sections and must courses as JSON artifacts.

pub mod error;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(feature = "lambda")]
pub mod lambda;
