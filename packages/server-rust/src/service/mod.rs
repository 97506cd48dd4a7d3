//! Page pipeline framework.
//!
//! This module implements the server-side data-loading pipeline:
//!
//! 1. **Middleware** (`middleware`): Tower layers (tenant, GraphQL client, span)
//! 2. **Configuration** (`config`): Tenant host table and GraphQL endpoints

pub mod config;
pub mod middleware;

// Re-export key types for convenient access.
pub use config::{AppConfig, TenantConfig};
pub use middleware::{
    build_page_pipeline, GlobalLayer, GraphLayer, PageService, PageSpanLayer, TenantLayer,
};
