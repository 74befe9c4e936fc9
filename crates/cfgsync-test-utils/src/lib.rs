//! Shared test utilities for the cfgsync workspace.
//!
//! This crate provides standardised fixtures so the core and CLI test
//! suites build repositories and target environments the same way. It is a
//! dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`repo`]: [`TestRepo`](repo::TestRepo) builder for a repository plus host directories
//! - [`tree`]: whole-tree state capture for before/after comparisons

pub mod repo;
pub mod tree;
