//! study-provisioner - provisions study workspaces in a lakehouse catalog
//!
//! - `remote`: workspace API client with retry and backoff
//! - `access`: access level to permission mapping
//! - `provisioning`: study, analysis and snapshot flows
//! - `audit`: one audit record per inbound request
//! - `http_server` / `cli`: the service surfaces

pub mod access;
pub mod audit;
pub mod cli;
pub mod config;
pub mod http_server;
pub mod load_test;
pub mod observability;
pub mod provisioning;
pub mod remote;
