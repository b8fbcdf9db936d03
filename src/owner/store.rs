// SPDX-FileCopyrightText: © 2026 Kubvernor authors
// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2026 Kubvernor authors.
//         This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, version 3.
//         This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//         You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
//
//

use std::sync::{Arc, RwLock};

use tracing::warn;

use super::{ConfigurationSnapshot, EntityKey, OwnerResolver, SnapshotError};
use crate::resource_error::OwnerReference;

/// Last successfully submitted configuration, shared between the submit pipeline and result interpretation.
#[derive(Clone, Debug, Default)]
pub struct SnapshotStore {
    current: Arc<RwLock<Arc<ConfigurationSnapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, snapshot: ConfigurationSnapshot) -> Result<(), SnapshotError> {
        let mut lock = self.current.write().map_err(|_| SnapshotError::LockingError)?;
        *lock = Arc::new(snapshot);
        Ok(())
    }

    pub fn current(&self) -> Result<Arc<ConfigurationSnapshot>, SnapshotError> {
        let lock = self.current.read().map_err(|_| SnapshotError::LockingError)?;
        Ok(Arc::clone(&*lock))
    }
}

impl OwnerResolver for SnapshotStore {
    fn lookup(&self, entity_type: &str, key: &EntityKey<'_>) -> Option<OwnerReference> {
        match self.current() {
            Ok(snapshot) => snapshot.lookup(entity_type, key),
            Err(e) => {
                warn!("Can't resolve owner of {entity_type} {key} {e}");
                None
            }
        }
    }
}
