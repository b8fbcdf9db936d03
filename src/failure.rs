// SPDX-FileCopyrightText: © 2026 Kubvernor authors
// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2026 Kubvernor authors.
//         This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, version 3.
//         This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//         You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
//
//

//! Reduces the error of a failed push attempt to a retry relevant [`FailureReason`].
//!
//! The error of a push is a tree: generic wrappers and conflict wrappers have one child, aggregates have many.
//! Every reachable node is visited. A network error anywhere wins, then a conflict anywhere, otherwise `Other`.

use std::{error::Error, fmt::Display, io};

use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;

pub const HTTP_STATUS_CONFLICT: u16 = 409;

/// Upper bound on visited nodes when walking foreign `source()` chains.
const MAX_VISITED_ERRORS: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureReason {
    Conflict,
    Network,
    Other,
}

impl FailureReason {
    /// Metrics label value.
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::Conflict => "conflict",
            FailureReason::Network => "network",
            FailureReason::Other => "other",
        }
    }

    /// Conflicts and transport failures are expected to go away on a later attempt.
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureReason::Conflict | FailureReason::Network)
    }
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The admin API answered with a non success status.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("HTTP status {status} (message: {message:?})")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub raw: Vec<u8>,
}

impl ApiError {
    pub fn new(status: u16, message: &str) -> Self {
        Self { status, message: message.to_owned(), raw: vec![] }
    }

    pub fn with_raw(status: u16, message: &str, raw: Vec<u8>) -> Self {
        Self { status, message: message.to_owned(), raw }
    }

    pub fn is_conflict(&self) -> bool {
        self.status == HTTP_STATUS_CONFLICT
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NetworkErrorKind {
    Dns,
    ConnectionRefused,
    ConnectionReset,
    Timeout,
    Unknown,
}

/// The admin API could not be reached or the connection broke.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("network error ({kind:?}) {message}")]
pub struct NetworkError {
    pub kind: NetworkErrorKind,
    pub message: String,
}

impl NetworkError {
    pub fn new(kind: NetworkErrorKind, message: &str) -> Self {
        Self { kind, message: message.to_owned() }
    }
}

#[derive(Clone, Debug, Error)]
pub enum PushError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("configuration conflict")]
    ConfigConflict(#[source] Option<Box<PushError>>),
    #[error("{} errors occurred: [{}]", .0.len(), .0.iter().join("; "))]
    Aggregate(Vec<PushError>),
    #[error("{context}: {source}")]
    Wrapped {
        context: String,
        #[source]
        source: Box<PushError>,
    },
    #[error("{0}")]
    Other(String),
}

impl PushError {
    pub fn wrap(context: &str, source: PushError) -> Self {
        PushError::Wrapped { context: context.to_owned(), source: Box::new(source) }
    }

    pub fn conflict(source: Option<PushError>) -> Self {
        PushError::ConfigConflict(source.map(Box::new))
    }

    pub fn other(message: &str) -> Self {
        PushError::Other(message.to_owned())
    }
}

impl FromIterator<PushError> for PushError {
    fn from_iter<T: IntoIterator<Item = PushError>>(iter: T) -> Self {
        PushError::Aggregate(iter.into_iter().collect())
    }
}

impl From<io::Error> for PushError {
    fn from(error: io::Error) -> Self {
        match network_error_kind(error.kind()) {
            Some(kind) => PushError::Network(NetworkError { kind, message: error.to_string() }),
            None => PushError::Other(error.to_string()),
        }
    }
}

fn network_error_kind(kind: io::ErrorKind) -> Option<NetworkErrorKind> {
    match kind {
        io::ErrorKind::ConnectionRefused => Some(NetworkErrorKind::ConnectionRefused),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted | io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected => Some(NetworkErrorKind::ConnectionReset),
        io::ErrorKind::TimedOut => Some(NetworkErrorKind::Timeout),
        io::ErrorKind::AddrNotAvailable | io::ErrorKind::AddrInUse => Some(NetworkErrorKind::Unknown),
        _ => None,
    }
}

/// Classifies the error of a push attempt. Never fails, unknown errors are `Other`.
pub fn classify_push_failure(err: &PushError) -> FailureReason {
    let mut conflict = false;
    let mut pending = vec![err];
    while let Some(node) = pending.pop() {
        match node {
            PushError::Network(_) => return FailureReason::Network,
            PushError::Api(api_error) => conflict |= api_error.is_conflict(),
            PushError::ConfigConflict(source) => {
                conflict = true;
                if let Some(source) = source {
                    pending.push(source);
                }
            },
            PushError::Aggregate(errors) => pending.extend(errors),
            PushError::Wrapped { source, .. } => pending.push(source),
            PushError::Other(_) => {},
        }
    }

    if conflict {
        FailureReason::Conflict
    } else {
        FailureReason::Other
    }
}

/// Classifies an arbitrary error by walking its `source()` chain and recognising the push error types on the way.
/// I/O errors of a network nature count as network errors.
pub fn classify_error(err: &(dyn Error + 'static)) -> FailureReason {
    let mut conflict = false;
    let mut pending = vec![err];
    let mut visited = 0;
    while let Some(node) = pending.pop() {
        visited += 1;
        if visited > MAX_VISITED_ERRORS {
            break;
        }

        if let Some(push_error) = node.downcast_ref::<PushError>() {
            match classify_push_failure(push_error) {
                FailureReason::Network => return FailureReason::Network,
                FailureReason::Conflict => conflict = true,
                FailureReason::Other => {},
            }
            continue;
        }
        if node.is::<NetworkError>() {
            return FailureReason::Network;
        }
        if let Some(api_error) = node.downcast_ref::<ApiError>() {
            conflict |= api_error.is_conflict();
        }
        if let Some(io_error) = node.downcast_ref::<io::Error>() {
            if network_error_kind(io_error.kind()).is_some() {
                return FailureReason::Network;
            }
            if let Some(inner) = io_error.get_ref() {
                pending.push(inner);
                continue;
            }
        }
        if let Some(source) = node.source() {
            pending.push(source);
        }
    }

    if conflict {
        FailureReason::Conflict
    } else {
        FailureReason::Other
    }
}
