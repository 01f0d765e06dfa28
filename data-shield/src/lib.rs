//! S3 Object Lambda function that strips pricing fields from JSON objects
//! before they reach the caller.

pub mod config;
pub mod error;
pub mod event;
pub mod event_handler;
pub mod fetch;
pub mod transform;
pub mod wiring;
pub mod writer;

#[cfg(test)]
mod test_helpers;
