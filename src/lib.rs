// SPDX-FileCopyrightText: © 2026 Kubvernor authors
// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2026 Kubvernor authors.
//         This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, version 3.
//         This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//         You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
//
//

//! Interpretation of configuration push results for the Kong admin API: per-object diagnostics from
//! rejected configuration bodies and retry relevant classification of push errors.

pub mod configuration;
pub mod diagnostics;
pub mod entity_errors;
pub mod failure;
pub mod owner;
pub mod resource_error;

pub use diagnostics::{DiagnosticsRecorder, FailureReport};
pub use entity_errors::{parse_flat_entity_errors, EntityErrorsParseError};
pub use failure::{classify_error, classify_push_failure, ApiError, FailureReason, NetworkError, NetworkErrorKind, PushError};
pub use owner::{ConfigurationSnapshot, EntityKey, OwnerResolver, SnapshotStore};
pub use resource_error::{OwnerReference, Problems, ResourceError};

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;
