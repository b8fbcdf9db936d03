// SPDX-FileCopyrightText: © 2026 Kubvernor authors
// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2026 Kubvernor authors.
//         This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, version 3.
//         This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//         You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
//
//

use k8s_openapi::{
    api::core::v1::{Event, EventSource, ObjectReference},
    apimachinery::pkg::apis::meta::v1::{MicroTime, Time},
    chrono::Utc,
};
use kube_core::ObjectMeta;
use serde::Serialize;
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::{failure::FailureReason, resource_error::ResourceError};

pub const APPLY_FAILED_EVENT_REASON: &str = "KongConfigurationApplyFailed";
pub const EVENT_TYPE_WARNING: &str = "Warning";
const EVENT_ACTION: &str = "ApplyConfiguration";
const DEFAULT_EVENT_NAMESPACE: &str = "default";

/// What the controller publishes about one failed push.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    pub reason: Option<FailureReason>,
    pub affected_objects: usize,
    pub resource_errors: Vec<ResourceError>,
    pub events: Vec<Event>,
}

/// Renders resource errors into Kubernetes events. Building only, publishing is left to the status writer.
#[derive(Debug, Clone, TypedBuilder)]
pub struct DiagnosticsRecorder {
    #[builder(setter(into))]
    controller_name: String,
    #[builder(default, setter(strip_option, into))]
    reporting_instance: Option<String>,
}

impl DiagnosticsRecorder {
    /// One warning event per problem, attached to the owning object.
    pub fn events(&self, resource_errors: &[ResourceError]) -> Vec<Event> {
        resource_errors
            .iter()
            .flat_map(|resource_error| resource_error.problems.iter().map(move |(field, message)| self.event(resource_error, field, message)))
            .collect()
    }

    pub fn report(&self, reason: Option<FailureReason>, resource_errors: Vec<ResourceError>) -> FailureReport {
        let events = self.events(&resource_errors);
        FailureReport { reason, affected_objects: resource_errors.len(), resource_errors, events }
    }

    fn event(&self, resource_error: &ResourceError, field: &str, message: &str) -> Event {
        let now = Utc::now();
        // eventTime, action and the reporting fields are only accepted together with a reporting instance
        let reporting_instance = self.reporting_instance.as_ref();
        let namespace = if resource_error.namespace.is_empty() { DEFAULT_EVENT_NAMESPACE.to_owned() } else { resource_error.namespace.clone() };

        Event {
            metadata: ObjectMeta {
                name: Some(format!("{}.{}", resource_error.name, Uuid::new_v4().simple())),
                namespace: Some(namespace),
                ..Default::default()
            },
            involved_object: ObjectReference {
                api_version: Some(resource_error.api_version.clone()),
                kind: Some(resource_error.kind.clone()),
                name: Some(resource_error.name.clone()),
                namespace: (!resource_error.namespace.is_empty()).then(|| resource_error.namespace.clone()),
                uid: Some(resource_error.uid.clone()),
                ..Default::default()
            },
            type_: Some(EVENT_TYPE_WARNING.to_owned()),
            reason: Some(APPLY_FAILED_EVENT_REASON.to_owned()),
            message: Some(format!("invalid {field}: {message}")),
            action: reporting_instance.map(|_| EVENT_ACTION.to_owned()),
            count: Some(1),
            first_timestamp: Some(Time(now)),
            last_timestamp: Some(Time(now)),
            event_time: reporting_instance.map(|_| MicroTime(now)),
            reporting_component: reporting_instance.map(|_| self.controller_name.clone()),
            reporting_instance: reporting_instance.cloned(),
            source: Some(EventSource { component: Some(self.controller_name.clone()), host: self.reporting_instance.clone() }),
            ..Default::default()
        }
    }
}
