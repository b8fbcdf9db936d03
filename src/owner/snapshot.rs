// SPDX-FileCopyrightText: © 2026 Kubvernor authors
// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2026 Kubvernor authors.
//         This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, version 3.
//         This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//         You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
//
//

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::{canonical_entity_type, owner_from_tags, EntityKey, OwnerResolver};
use crate::resource_error::OwnerReference;

/// Child collections the declarative format allows nesting inside their parent entity.
const NESTED_ENTITY_TYPES: [&str; 3] = ["routes", "plugins", "targets"];

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("declarative configuration is not an object")]
    NotAnObject,
    #[error("can't parse declarative configuration {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("snapshot lock poisoned")]
    LockingError,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmittedEntity {
    pub name: Option<String>,
    pub id: Option<String>,
    pub tags: Vec<String>,
}

impl SubmittedEntity {
    fn from_value(value: &serde_json::Map<String, Value>) -> Self {
        let string_field = |field: &str| value.get(field).and_then(Value::as_str).map(ToOwned::to_owned);
        let tags = value
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(Value::as_str).map(ToOwned::to_owned).collect())
            .unwrap_or_default();
        Self { name: string_field("name"), id: string_field("id"), tags }
    }

    pub fn owner(&self) -> Option<OwnerReference> {
        owner_from_tags(self.tags.iter().map(String::as_str))
    }

    fn is_named(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name) || self.id.as_deref() == Some(name)
    }
}

/// Index of the entities submitted in one declarative configuration push, per entity type and in submission order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigurationSnapshot {
    entities: BTreeMap<String, Vec<SubmittedEntity>>,
}

impl ConfigurationSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts JSON or YAML.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let config: Value = match serde_json::from_slice(bytes) {
            Ok(config) => config,
            Err(_) => serde_yaml::from_slice(bytes)?,
        };
        Self::from_declarative(&config)
    }

    pub fn from_declarative(config: &Value) -> Result<Self, SnapshotError> {
        let Value::Object(config) = config else {
            return Err(SnapshotError::NotAnObject);
        };

        let mut snapshot = Self::new();
        for (entity_type, entities) in config {
            if let Value::Array(entities) = entities {
                snapshot.index_entities(entity_type, entities);
            }
        }
        debug!("Indexed declarative configuration {:?}", snapshot.entities.iter().map(|(entity_type, entities)| (entity_type, entities.len())).collect::<Vec<_>>());
        Ok(snapshot)
    }

    fn index_entities(&mut self, entity_type: &str, entities: &[Value]) {
        for entity in entities {
            let Value::Object(entity) = entity else {
                continue;
            };
            self.push(entity_type, SubmittedEntity::from_value(entity));
            for nested_type in NESTED_ENTITY_TYPES {
                if let Some(Value::Array(nested)) = entity.get(nested_type) {
                    self.index_entities(nested_type, nested);
                }
            }
        }
    }

    pub fn push(&mut self, entity_type: &str, entity: SubmittedEntity) {
        self.entities.entry(canonical_entity_type(entity_type).to_owned()).or_default().push(entity);
    }

    pub fn entities(&self, entity_type: &str) -> &[SubmittedEntity] {
        self.entities.get(canonical_entity_type(entity_type)).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.values().all(Vec::is_empty)
    }

    fn find(&self, entity_type: &str, key: &EntityKey<'_>) -> Option<&SubmittedEntity> {
        let entities = self.entities(entity_type);
        match key {
            EntityKey::Position(position) => entities.get(*position),
            EntityKey::Name(name) => entities.iter().find(|entity| entity.is_named(name)),
        }
    }
}

impl OwnerResolver for ConfigurationSnapshot {
    fn lookup(&self, entity_type: &str, key: &EntityKey<'_>) -> Option<OwnerReference> {
        self.find(entity_type, key).and_then(SubmittedEntity::owner)
    }
}
