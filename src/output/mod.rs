//! Output module for harvest reports
//!
//! This module handles:
//! - Loading per-category statistics from the database
//! - Printing statistics, failed pages and harvest summaries

pub mod stats;

pub use stats::{
    load_statistics, print_failed_pages, print_harvest_summary, print_statistics,
    CategoryStatistics, HarvestStatistics,
};
