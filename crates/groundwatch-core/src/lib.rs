//! Domain logic for the Groundwatch incident backend.
//!
//! This crate owns the pure and self-contained pieces the HTTP surface is
//! built on: geographic distance, request rate limiting, and analytics
//! aggregation, plus the typed configuration tree.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `groundwatch-config.yaml`
//!   into strongly-typed structs.
//! - [`geo`] -- Haversine great-circle distance and radius queries over
//!   located records.
//! - [`limiter`] -- Per-client fixed-window rate limiting with a
//!   background eviction sweep.
//! - [`trends`] -- Daily trend buckets, pending-age averages, and grouped
//!   counts for the analytics endpoints.

pub mod config;
pub mod geo;
pub mod limiter;
pub mod trends;
