// src/ingest/providers/mod.rs
pub mod csv_http;
pub mod fixture;
