//! `PageProps` Server: tenant and GraphQL page decorators as tower layers,
//! served over axum.

pub mod error;
pub mod graph;
pub mod network;
pub mod pages;
pub mod render;
pub mod service;

#[cfg(test)]
mod testing;

pub use error::PageError;
pub use graph::{GraphClient, GraphClientFactory, GraphContext, GraphError};
pub use network::{NetworkConfig, PageServer};
pub use render::{hydrate, HydratedApp};
pub use service::{build_page_pipeline, AppConfig, GlobalLayer, PageService};
