//! State module for tracking per-page outcomes
//!
//! # Components
//!
//! - `PageResult`: the outcome of processing one listing page
//! - `PageFailure`: why a listing page did not contribute item URLs

mod page_result;

pub use page_result::{PageFailure, PageResult};
