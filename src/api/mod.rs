//! Provides clients and utilities for interacting with external APIs.
//!
//! Includes:
//! - `supabase`: Client for the Supabase REST (PostgREST) API.

mod supabase;

pub use supabase::*;
