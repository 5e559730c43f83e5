//! schema-provisioner - Idempotent schema and principal provisioning for MongoDB
//!
//! Reconciles a deployment with a declarative manifest: one application
//! user, its collections, and their indexes. Objects are only ever added.

pub mod auth;
pub mod cli;
pub mod observability;
pub mod provision;
pub mod schema;
pub mod target;
