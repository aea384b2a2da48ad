//! # Catalog Index
//!
//! Cached catalog content for the IPTV platform core: the Content Index
//! Store, its SQLite persistence, and the section sync checkpoints the
//! progressive sync coordinator resumes from.
//!
//! ## Components
//!
//! - **Models** (`models`): sections, content items, categories,
//!   checkpoints
//! - **Database** (`db`): pooled SQLite with embedded migrations
//! - **Repositories** (`repositories`): row-level data access with
//!   pagination
//! - **Store** (`store`): the account-scoped facade - indexing write path,
//!   epoch-validated pagers, metadata loaders

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;
pub mod store;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{CatalogError, Result};
pub use models::{
    normalize_name, Category, ContentItem, Section, SectionSyncCheckpoint, SYNC_SECTIONS,
};
pub use repositories::{Page, PageRequest};
pub use store::{
    CategoryPager, ContentIndexStore, ContentPager, SeasonPager, SectionOutcome,
    SectionProgressFn, StoreTuning,
};
