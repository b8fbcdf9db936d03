// SPDX-FileCopyrightText: © 2026 Kubvernor authors
// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2026 Kubvernor authors.
//         This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, version 3.
//         This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//         You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
//
//

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::Result;

#[derive(Debug, TypedBuilder, Deserialize)]
pub struct Configuration {
    pub controller_name: String,
    pub snapshot_file: String,
    #[builder(default)]
    pub reporting_instance: Option<String>,
    #[builder(default)]
    pub log_file: Option<String>,
}

#[derive(Error, Debug)]
enum ConfigurationError {
    #[error("controller name must be not empty")]
    ControllerName,
    #[error("snapshot file must be not empty")]
    SnapshotFile,
}

impl Configuration {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let configuration = serde_yaml::from_str(&std::fs::read_to_string(path)?)?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<()> {
        if self.controller_name.is_empty() {
            return Err(ConfigurationError::ControllerName.into());
        }
        if self.snapshot_file.is_empty() {
            return Err(ConfigurationError::SnapshotFile.into());
        }
        Ok(())
    }
}
