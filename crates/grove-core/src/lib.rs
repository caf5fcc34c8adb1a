//! Grove Core - entity model and extraction policy
//!
//! This crate defines the records Grove sends to the knowledge store and
//! the rules for turning filesystem paths into them.
//!
//! # Overview
//!
//! - [`Entity`] and [`Relation`] are the two record shapes, serialized with
//!   the store's wire names.
//! - [`ExtractionPolicy`] decides which paths are included and how much
//!   content is kept.
//! - [`EntityBuilder`] applies the policy to one path at a time.
//! - [`ContentReader`] reads bounded content and never fails.
//!
//! # Example
//!
//! ```no_run
//! use grove_core::{EntityBuilder, ExtractionPolicy};
//! use std::path::Path;
//!
//! let policy = ExtractionPolicy::default();
//! let builder = EntityBuilder::new(&policy, "/home/me/projects/demo");
//!
//! let project = builder.build_project("demo");
//! let batch = builder.build_for_path(Path::new("/home/me/projects/demo/src"), "demo");
//! ```

mod builder;
mod content;
mod entity;
mod error;
mod manifest;
mod policy;

pub use builder::{EntityBuilder, ProjectEntity};
pub use content::{cap_chars, too_large_marker, ContentReader, TRUNCATION_SUFFIX};
pub use entity::{Entity, EntityType, GraphBatch, Relation, RelationKind};
pub use error::{ContentReadError, ManifestError};
pub use manifest::{read_manifest, ManifestInfo, ManifestKind};
pub use policy::ExtractionPolicy;
