// SPDX-FileCopyrightText: © 2026 Kubvernor authors
// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2026 Kubvernor authors.
//         This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, version 3.
//         This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//         You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
//
//

use std::{collections::HashMap, fmt::Display};

use itertools::Itertools;
use kube::{Resource, ResourceExt};
use serde::{ser::SerializeMap, Serialize, Serializer};

/// Identity of the Kubernetes object that caused a gateway entity to be generated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub api_version: String,
    pub uid: String,
}

impl OwnerReference {
    /// Builds the reference from a typed Kubernetes object. Objects without a name or uid can't own anything yet.
    pub fn from_resource<R>(resource: &R) -> Option<Self>
    where
        R: Resource<DynamicType = ()>,
    {
        let uid = resource.uid()?;
        let name = resource.meta().name.clone()?;
        Some(Self {
            kind: R::kind(&()).into_owned(),
            namespace: resource.namespace().unwrap_or_default(),
            name,
            api_version: R::api_version(&()).into_owned(),
            uid,
        })
    }
}

impl Display for OwnerReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{} {}", self.kind, self.name)
        } else {
            write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
        }
    }
}

/// Field path to message mapping. Keys are unique and iterate in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Problems(Vec<(String, String)>);

impl Problems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a problem and returns the key it was stored under.
    ///
    /// The first problem for a field keeps the bare field name, the following ones are stored as `field[0]`, `field[1]`, ...
    pub fn insert(&mut self, field: &str, message: String) -> String {
        let key = if self.contains_key(field) {
            (0..).map(|i| format!("{field}[{i}]")).find(|candidate| !self.contains_key(candidate)).unwrap_or_default()
        } else {
            field.to_owned()
        };
        self.0.push((key.clone(), message));
        key
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.iter().find(|(key, _)| key == field).map(|(_, message)| message.as_str())
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.0.iter().any(|(key, _)| key == field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, message)| (key.as_str(), message.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Problems
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut problems = Problems::new();
        for (field, message) in iter {
            problems.insert(field.as_ref(), message.into());
        }
        problems
    }
}

impl Serialize for Problems {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, message) in &self.0 {
            map.serialize_entry(field, message)?;
        }
        map.end()
    }
}

/// All validation problems the gateway reported for one owning Kubernetes object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceError {
    pub name: String,
    pub namespace: String,
    pub kind: String,
    pub api_version: String,
    pub uid: String,
    pub problems: Problems,
}

impl ResourceError {
    pub fn new(owner: &OwnerReference) -> Self {
        Self {
            name: owner.name.clone(),
            namespace: owner.namespace.clone(),
            kind: owner.kind.clone(),
            api_version: owner.api_version.clone(),
            uid: owner.uid.clone(),
            problems: Problems::new(),
        }
    }

    pub fn owner(&self) -> OwnerReference {
        OwnerReference {
            kind: self.kind.clone(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            api_version: self.api_version.clone(),
            uid: self.uid.clone(),
        }
    }

    pub fn message(&self) -> String {
        self.problems.iter().map(|(field, message)| format!("invalid {field}: {message}")).join(", ")
    }
}

impl Display for ResourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.owner(), self.message())
    }
}

/// Groups field errors by owner uid, keeping the order in which owners were first seen.
#[derive(Debug, Default)]
pub(crate) struct ResourceErrorsBuilder {
    resource_errors: Vec<ResourceError>,
    positions: HashMap<String, usize>,
}

impl ResourceErrorsBuilder {
    pub fn push(&mut self, owner: &OwnerReference, field: &str, message: String) {
        let position = *self.positions.entry(owner.uid.clone()).or_insert_with(|| {
            self.resource_errors.push(ResourceError::new(owner));
            self.resource_errors.len() - 1
        });
        if let Some(resource_error) = self.resource_errors.get_mut(position) {
            resource_error.problems.insert(field, message);
        }
    }

    pub fn build(self) -> Vec<ResourceError> {
        self.resource_errors
    }
}
