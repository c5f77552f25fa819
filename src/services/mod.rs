//! Service layer for the crawler application.
//!
//! This module contains the network-facing logic for:
//! - Catalog page access (`CatalogClient`)
//! - Department prefix inference (`PrefixResolver`, `PrefixTable`)

mod catalog;
mod prefix;

pub use catalog::CatalogClient;
pub use prefix::{PrefixResolver, PrefixTable};
