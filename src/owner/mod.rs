// SPDX-FileCopyrightText: © 2026 Kubvernor authors
// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2026 Kubvernor authors.
//         This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, version 3.
//         This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//         You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
//
//

mod snapshot;
mod store;
mod tags;

use std::{fmt::Display, sync::Arc};

pub use snapshot::{ConfigurationSnapshot, SnapshotError, SubmittedEntity};
pub use store::SnapshotStore;
pub use tags::owner_from_tags;

use crate::resource_error::OwnerReference;

/// How an entity reported by the admin API is correlated with the submitted configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKey<'a> {
    /// The n-th submitted entity of a type.
    Position(usize),
    /// Entity name, or id for entities that have no name.
    Name(&'a str),
}

impl Display for EntityKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKey::Position(position) => write!(f, "[{position}]"),
            EntityKey::Name(name) => write!(f, "{name}"),
        }
    }
}

/// Resolves gateway entities back to the Kubernetes objects they were generated from.
pub trait OwnerResolver: Send + Sync {
    fn lookup(&self, entity_type: &str, key: &EntityKey<'_>) -> Option<OwnerReference>;
}

impl<T> OwnerResolver for &T
where
    T: OwnerResolver + ?Sized,
{
    fn lookup(&self, entity_type: &str, key: &EntityKey<'_>) -> Option<OwnerReference> {
        (**self).lookup(entity_type, key)
    }
}

impl<T> OwnerResolver for Arc<T>
where
    T: OwnerResolver + ?Sized,
{
    fn lookup(&self, entity_type: &str, key: &EntityKey<'_>) -> Option<OwnerReference> {
        self.as_ref().lookup(entity_type, key)
    }
}

/// Legacy error bodies and declarative configs use plural entity type names ("routes"),
/// flattened errors use singular ones ("route"). Everything is indexed under the singular name.
pub fn canonical_entity_type(entity_type: &str) -> &str {
    entity_type.strip_suffix('s').unwrap_or(entity_type)
}
