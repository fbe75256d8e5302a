//! Integration test entry point

mod media_tests;
mod scrape_tests;
