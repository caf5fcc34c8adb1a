//! Entity and relation extraction for single paths.
//!
//! The builder turns one filesystem path into the entity that represents it
//! and the relation linking it to its parent. It never recurses; the walker
//! drives it over a whole tree.

use crate::content::ContentReader;
use crate::entity::{Entity, EntityType, GraphBatch, Relation, RelationKind};
use crate::error::ManifestError;
use crate::manifest::{read_manifest, ManifestKind};
use crate::policy::ExtractionPolicy;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The project's root entity plus any manifest failures met while building it.
#[derive(Debug)]
pub struct ProjectEntity {
    pub entity: Entity,
    pub manifest_errors: Vec<ManifestError>,
}

/// Builds entities for paths below one project root.
pub struct EntityBuilder<'a> {
    policy: &'a ExtractionPolicy,
    root: PathBuf,
    content: ContentReader,
    key_content: ContentReader,
}

impl<'a> EntityBuilder<'a> {
    pub fn new(policy: &'a ExtractionPolicy, root: impl AsRef<Path>) -> Self {
        Self {
            policy,
            root: root.as_ref().to_path_buf(),
            content: policy.content_reader(),
            key_content: policy.key_file_reader(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> &ExtractionPolicy {
        self.policy
    }

    /// True if the path lies under an excluded directory of this project.
    ///
    /// Only segments below the root are checked, so a project that itself
    /// lives under e.g. `~/build/` is not excluded wholesale.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        self.policy.is_excluded_path(rel)
    }

    /// Builds the project entity with manifest and README observations.
    pub fn build_project(&self, project_name: &str) -> ProjectEntity {
        let mut entity = Entity::new(project_name, EntityType::Project)
            .with_observation(format!("Project directory: {}", self.root.display()));
        let mut manifest_errors = Vec::new();

        for kind in ManifestKind::ALL {
            let path = self.root.join(kind.file_name());
            if !path.is_file() {
                continue;
            }
            match read_manifest(kind, &path, self.policy.key_file_max_bytes) {
                Ok(info) => {
                    for obs in info.observations() {
                        entity.observe(obs);
                    }
                }
                Err(e) => {
                    warn!("Manifest error for {}: {}", project_name, e);
                    manifest_errors.push(e);
                }
            }
        }

        let readme = self.root.join("README.md");
        if readme.is_file() {
            entity.observe(format!("README: {}", self.key_content.read(&readme)));
        }

        ProjectEntity {
            entity,
            manifest_errors,
        }
    }

    /// Builds the entity and parent relation for one path.
    ///
    /// Returns an empty batch for excluded directories, filtered files and
    /// anything that is neither a file nor a directory.
    pub fn build_for_path(&self, path: &Path, parent_entity_name: &str) -> GraphBatch {
        let mut batch = GraphBatch::new();

        if self.is_excluded(path) {
            debug!("Excluded: {}", path.display());
            return batch;
        }

        let Some(segment) = path.file_name().and_then(|n| n.to_str()) else {
            debug!("Skipping non-UTF-8 path: {}", path.display());
            return batch;
        };

        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                return batch;
            }
        };

        let name = self.policy.child_name(parent_entity_name, segment);

        if meta.is_dir() {
            let (entity, kind) = if self.policy.is_component_dir(segment) {
                let entity = Entity::new(&name, EntityType::Component)
                    .with_observation(format!("Component in {}: {}", parent_entity_name, segment))
                    .with_observation(format!("Path: {}", path.display()));
                (entity, RelationKind::Has)
            } else {
                let entity = Entity::new(&name, EntityType::Directory).with_observation(format!(
                    "Directory in {}: {}",
                    parent_entity_name, segment
                ));
                (entity, RelationKind::Contains)
            };
            batch.entities.push(entity);
            batch
                .relations
                .push(Relation::new(parent_entity_name, name, kind));
            return batch;
        }

        if !meta.is_file() || !self.policy.includes_file(path) {
            return batch;
        }

        let in_component = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(|n| self.policy.is_component_dir(n))
            .unwrap_or(false);
        let entity_type = if in_component {
            EntityType::ConfigFile
        } else {
            EntityType::File
        };

        let reader = if self.policy.is_key_file(segment) {
            &self.key_content
        } else {
            &self.content
        };

        let entity = Entity::new(&name, entity_type)
            .with_observation(format!("File in {}: {}", parent_entity_name, segment))
            .with_observation(format!("Path: {}", path.display()))
            .with_observation(reader.read(path));

        batch.entities.push(entity);
        batch.relations.push(Relation::new(
            parent_entity_name,
            name,
            RelationKind::Contains,
        ));
        batch
    }
}
