//! Defines the data structures and models used throughout the application.
//!
//! This covers the dynamic rows returned by the Supabase REST API, the
//! outcome of a probe run, and the error body PostgREST sends on failure.

mod query;

pub use query::*;
