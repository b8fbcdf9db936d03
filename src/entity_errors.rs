// SPDX-FileCopyrightText: © 2026 Kubvernor authors
// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2026 Kubvernor authors.
//         This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, version 3.
//         This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//         You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
//
//

//! Turns the body of a rejected declarative configuration push into per-object diagnostics.
//!
//! The admin API reports entity validation errors in two shapes which may both be present:
//! the legacy `fields` object, correlated with the submitted configuration by position, and
//! the `flattened_errors` list, correlated by entity name. Both are folded into one list of
//! [`ResourceError`], grouped by owning object.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    owner::{canonical_entity_type, owner_from_tags, EntityKey, OwnerResolver},
    resource_error::{OwnerReference, ResourceError, ResourceErrorsBuilder},
};

const LEGACY_ERRORS_KEY: &str = "fields";
const FLATTENED_ERRORS_KEY: &str = "flattened_errors";
const ENTITY_ERROR_FIELD: &str = "@entity";

#[derive(Error, Debug)]
pub enum EntityErrorsParseError {
    #[error("response body is not valid JSON {0}")]
    Json(#[from] serde_json::Error),
    #[error("response body is not a JSON object")]
    NotAnObject,
    #[error("unexpected shape of '{0}' in response body")]
    UnexpectedShape(&'static str),
}

#[derive(Debug, Deserialize)]
struct FlatEntityError {
    entity_type: String,
    #[serde(default)]
    entity_name: Option<String>,
    #[serde(default)]
    entity_id: Option<String>,
    #[serde(default)]
    entity_tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    errors: Vec<FlatFieldError>,
}

#[derive(Debug, Deserialize)]
struct FlatFieldError {
    #[serde(default)]
    field: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    messages: Vec<String>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl FlatFieldError {
    fn field(&self) -> &str {
        self.field.as_deref().unwrap_or(ENTITY_ERROR_FIELD)
    }

    fn messages(self) -> impl Iterator<Item = String> {
        self.message.into_iter().chain(self.messages)
    }
}

/// Parses an admin API error body into resource errors.
///
/// Fails only when the body isn't JSON or its error containers have an unexpected type. A body without
/// any error container yields no resource errors. Entities whose owner can't be resolved are logged and skipped.
pub fn parse_flat_entity_errors<R>(body: &[u8], resolver: &R) -> Result<Vec<ResourceError>, EntityErrorsParseError>
where
    R: OwnerResolver + ?Sized,
{
    let Value::Object(mut root) = serde_json::from_slice::<Value>(body)? else {
        return Err(EntityErrorsParseError::NotAnObject);
    };

    let legacy_errors = match root.remove(LEGACY_ERRORS_KEY) {
        None | Some(Value::Null) => None,
        Some(Value::Object(fields)) => Some(fields),
        Some(_) => return Err(EntityErrorsParseError::UnexpectedShape(LEGACY_ERRORS_KEY)),
    };
    let flattened_errors = match root.remove(FLATTENED_ERRORS_KEY) {
        None | Some(Value::Null) => None,
        Some(Value::Array(errors)) => Some(errors),
        Some(_) => return Err(EntityErrorsParseError::UnexpectedShape(FLATTENED_ERRORS_KEY)),
    };

    let mut builder = ResourceErrorsBuilder::default();
    if let Some(legacy_errors) = legacy_errors {
        collect_legacy_errors(&legacy_errors, resolver, &mut builder);
    }
    if let Some(flattened_errors) = flattened_errors {
        collect_flattened_errors(flattened_errors, resolver, &mut builder);
    }
    Ok(builder.build())
}

fn collect_legacy_errors<R>(fields: &Map<String, Value>, resolver: &R, builder: &mut ResourceErrorsBuilder)
where
    R: OwnerResolver + ?Sized,
{
    for (entity_type, entities) in fields {
        let Value::Array(entities) = entities else {
            warn!("Ignoring {LEGACY_ERRORS_KEY} entry {entity_type}, expected a list of entity errors");
            continue;
        };
        let entity_type = canonical_entity_type(entity_type);

        for (position, entity_errors) in entities.iter().enumerate() {
            let entity_errors = match entity_errors {
                Value::Null => continue,
                Value::Object(entity_errors) => entity_errors,
                _ => {
                    warn!("Ignoring malformed error for {entity_type} [{position}]");
                    continue;
                }
            };

            let key = EntityKey::Position(position);
            let Some(owner) = resolver.lookup(entity_type, &key) else {
                warn!("Can't resolve owner of {entity_type} {key}, dropping {} errors", entity_errors.len());
                continue;
            };

            let mut problems = Vec::new();
            for (field, message) in entity_errors {
                flatten_message(field.clone(), message, &mut problems);
            }
            push_problems(builder, &owner, problems);
        }
    }
}

fn collect_flattened_errors<R>(flattened_errors: Vec<Value>, resolver: &R, builder: &mut ResourceErrorsBuilder)
where
    R: OwnerResolver + ?Sized,
{
    for (index, entity_error) in flattened_errors.into_iter().enumerate() {
        let entity_error: FlatEntityError = match serde_json::from_value(entity_error) {
            Ok(entity_error) => entity_error,
            Err(e) => {
                warn!("Ignoring malformed {FLATTENED_ERRORS_KEY} [{index}] {e}");
                continue;
            }
        };

        let Some(owner) = resolve_flattened_owner(&entity_error, resolver) else {
            continue;
        };

        let problems = entity_error
            .errors
            .into_iter()
            .flat_map(|field_error| {
                let field = field_error.field().to_owned();
                field_error.messages().map(move |message| (field.clone(), message))
            })
            .collect();
        push_problems(builder, &owner, problems);
    }
}

fn resolve_flattened_owner<R>(entity_error: &FlatEntityError, resolver: &R) -> Option<OwnerReference>
where
    R: OwnerResolver + ?Sized,
{
    let entity_type = canonical_entity_type(&entity_error.entity_type);
    let Some(name) = entity_error.entity_name.as_deref().or(entity_error.entity_id.as_deref()) else {
        warn!("Can't resolve owner of unnamed {entity_type}, dropping {} errors", entity_error.errors.len());
        return None;
    };

    let key = EntityKey::Name(name);
    let owner = resolver.lookup(entity_type, &key).or_else(|| {
        let tags = entity_error.entity_tags.as_ref()?;
        debug!("Resolving owner of {entity_type} {key} from reported tags");
        owner_from_tags(tags.iter().map(String::as_str))
    });
    if owner.is_none() {
        warn!("Can't resolve owner of {entity_type} {key}, dropping {} errors", entity_error.errors.len());
    }
    owner
}

fn push_problems(builder: &mut ResourceErrorsBuilder, owner: &OwnerReference, problems: Vec<(String, String)>) {
    for (field, message) in problems {
        builder.push(owner, &field, message);
    }
}

/// Nested messages are spread over `field[i]` and `field.child` keys.
fn flatten_message(field: String, message: &Value, problems: &mut Vec<(String, String)>) {
    match message {
        Value::Null => {}
        Value::String(message) => problems.push((field, message.clone())),
        Value::Array(messages) => {
            for (i, message) in messages.iter().enumerate() {
                flatten_message(format!("{field}[{i}]"), message, problems);
            }
        }
        Value::Object(messages) => {
            for (child, message) in messages {
                flatten_message(format!("{field}.{child}"), message, problems);
            }
        }
        Value::Bool(_) | Value::Number(_) => problems.push((field, message.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::owner::ConfigurationSnapshot;

    #[derive(Default)]
    struct StaticResolver {
        by_position: HashMap<(String, usize), OwnerReference>,
        by_name: HashMap<(String, String), OwnerReference>,
    }

    impl StaticResolver {
        fn with_position(mut self, entity_type: &str, position: usize, owner: &OwnerReference) -> Self {
            self.by_position.insert((entity_type.to_owned(), position), owner.clone());
            self
        }

        fn with_name(mut self, entity_type: &str, name: &str, owner: &OwnerReference) -> Self {
            self.by_name.insert((entity_type.to_owned(), name.to_owned()), owner.clone());
            self
        }
    }

    impl OwnerResolver for StaticResolver {
        fn lookup(&self, entity_type: &str, key: &EntityKey<'_>) -> Option<OwnerReference> {
            match key {
                EntityKey::Position(position) => self.by_position.get(&(entity_type.to_owned(), *position)).cloned(),
                EntityKey::Name(name) => self.by_name.get(&(entity_type.to_owned(), (*name).to_owned())).cloned(),
            }
        }
    }

    fn ingress(name: &str, uid: &str) -> OwnerReference {
        OwnerReference {
            kind: "Ingress".to_owned(),
            namespace: "default".to_owned(),
            name: name.to_owned(),
            api_version: "networking.k8s.io/v1".to_owned(),
            uid: uid.to_owned(),
        }
    }

    fn service(name: &str, uid: &str) -> OwnerReference {
        OwnerReference {
            kind: "Service".to_owned(),
            namespace: "default".to_owned(),
            name: name.to_owned(),
            api_version: "v1".to_owned(),
            uid: uid.to_owned(),
        }
    }

    const FLATTENED_BODY: &str = r#"{
    "code": 14,
    "flattened_errors": [
        {
            "entity": {"name": "default.echo.pnum-80", "read_timeout": true, "tags": null},
            "entity_name": "default.echo.pnum-80",
            "entity_type": "service",
            "errors": [{"field": "read_timeout", "message": "expected an integer", "type": "field"}]
        },
        {
            "entity": {"name": "default.demo.00", "methods": ["GET"], "protocols": ["grpc"]},
            "entity_name": "default.demo.00",
            "entity_type": "route",
            "errors": [{"field": "methods", "message": "cannot set 'methods' when 'protocols' is 'grpc' or 'grpcs'", "type": "field"}]
        },
        {
            "entity": {"name": "default.demo.01", "strip_path": true, "protocols": ["grpc"]},
            "entity_name": "default.demo.01",
            "entity_type": "route",
            "errors": [{"field": "strip_path", "message": "cannot set 'strip_path' when 'protocols' is 'grpc' or 'grpcs'", "type": "field"}]
        }
    ],
    "message": "declarative config is invalid",
    "name": "invalid declarative configuration"
}"#;

    #[test]
    fn test_flattened_errors_one_record_per_owner() {
        let resolver = StaticResolver::default()
            .with_name("service", "default.echo.pnum-80", &service("radish", "b8aa692c-6d8d-580e-a767-a7dbc1f58344"))
            .with_name("route", "default.demo.00", &ingress("scallion", "d7300db1-14eb-5a09-b594-2db904ed8eca"))
            .with_name("route", "default.demo.01", &ingress("turnip", "0b1b7d2c-1d4c-4b8e-9b0e-7e2c8f4a1c55"));

        let errors = parse_flat_entity_errors(FLATTENED_BODY.as_bytes(), &resolver).unwrap();
        assert_eq!(errors.len(), 3);

        assert_eq!(errors[0].name, "radish");
        assert_eq!(errors[0].kind, "Service");
        assert_eq!(errors[0].api_version, "v1");
        assert_eq!(errors[0].problems.len(), 1);
        assert_eq!(errors[0].problems.get("read_timeout"), Some("expected an integer"));

        assert_eq!(errors[1].name, "scallion");
        assert_eq!(errors[1].problems.len(), 1);
        assert_eq!(errors[1].problems.get("methods"), Some("cannot set 'methods' when 'protocols' is 'grpc' or 'grpcs'"));

        assert_eq!(errors[2].name, "turnip");
        assert_eq!(errors[2].problems.len(), 1);
        assert_eq!(errors[2].problems.get("strip_path"), Some("cannot set 'strip_path' when 'protocols' is 'grpc' or 'grpcs'"));
    }

    #[test]
    fn test_flattened_errors_shared_owner_are_merged() {
        let scallion = ingress("scallion", "d7300db1-14eb-5a09-b594-2db904ed8eca");
        let resolver = StaticResolver::default()
            .with_name("service", "default.echo.pnum-80", &service("radish", "b8aa692c-6d8d-580e-a767-a7dbc1f58344"))
            .with_name("route", "default.demo.00", &scallion)
            .with_name("route", "default.demo.01", &scallion);

        let errors = parse_flat_entity_errors(FLATTENED_BODY.as_bytes(), &resolver).unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1].name, "scallion");
        assert_eq!(errors[1].problems.keys().collect::<Vec<_>>(), vec!["methods", "strip_path"]);
    }

    #[test]
    fn test_flattened_errors_resolved_through_snapshot() {
        let snapshot = ConfigurationSnapshot::from_slice(
            br#"{
                "services": [{
                    "name": "default.echo.pnum-80",
                    "tags": ["k8s-name:radish", "k8s-namespace:default", "k8s-kind:Service", "k8s-uid:b8aa692c", "k8s-version:v1"],
                    "routes": [
                        {"name": "default.demo.00", "tags": ["k8s-name:scallion", "k8s-namespace:default", "k8s-kind:Ingress", "k8s-uid:d7300db1", "k8s-group:networking.k8s.io", "k8s-version:v1"]}
                    ]
                }]
            }"#,
        )
        .unwrap();

        let errors = parse_flat_entity_errors(FLATTENED_BODY.as_bytes(), &snapshot).unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].owner(), service("radish", "b8aa692c"));
        assert_eq!(errors[1].owner(), ingress("scallion", "d7300db1"));
    }

    #[test]
    fn test_legacy_errors_skip_null_positions() {
        let body = br#"{
            "fields": {
                "routes": [
                    null,
                    {"methods": "cannot set 'methods' when 'protocols' is 'grpc' or 'grpcs'"},
                    {"strip_path": "cannot set 'strip_path' when 'protocols' is 'grpc' or 'grpcs'"}
                ],
                "services": [{"read_timeout": "expected an integer"}]
            }
        }"#;
        let scallion = ingress("scallion", "uid-scallion");
        let resolver = StaticResolver::default()
            .with_position("route", 0, &ingress("unused", "uid-unused"))
            .with_position("route", 1, &scallion)
            .with_position("route", 2, &ingress("turnip", "uid-turnip"))
            .with_position("service", 0, &service("radish", "uid-radish"));

        let errors = parse_flat_entity_errors(body, &resolver).unwrap();
        let names: Vec<_> = errors.iter().map(|error| error.name.as_str()).collect();
        assert_eq!(names, vec!["scallion", "turnip", "radish"]);
        assert!(errors.iter().all(|error| error.uid != "uid-unused"));
        assert_eq!(errors[2].problems.get("read_timeout"), Some("expected an integer"));
    }

    #[test]
    fn test_legacy_nested_messages_are_flattened() {
        let body = br#"{"fields": {"routes": [{"methods": ["expected a string", null, "expected a string"], "headers": {"x-foo": "bad header"}, "regex_priority": 5}]}}"#;
        let resolver = StaticResolver::default().with_position("route", 0, &ingress("turnip", "uid-turnip"));

        let errors = parse_flat_entity_errors(body, &resolver).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].problems.keys().collect::<Vec<_>>(), vec!["methods[0]", "methods[2]", "headers.x-foo", "regex_priority"]);
        assert_eq!(errors[0].problems.get("regex_priority"), Some("5"));
    }

    #[test]
    fn test_both_shapes_are_merged_per_owner() {
        let body = br#"{
            "fields": {"routes": [{"methods": "legacy methods error"}]},
            "flattened_errors": [
                {"entity_name": "default.demo.00", "entity_type": "route", "errors": [
                    {"field": "methods", "message": "flattened methods error", "type": "field"},
                    {"message": "at least one of 'hosts', 'paths' must be set", "type": "entity"}
                ]},
                {"entity_name": "default.echo.pnum-80", "entity_type": "service", "errors": [
                    {"field": "read_timeout", "message": "expected an integer", "type": "field"}
                ]}
            ]
        }"#;
        let scallion = ingress("scallion", "uid-scallion");
        let resolver = StaticResolver::default()
            .with_position("route", 0, &scallion)
            .with_name("route", "default.demo.00", &scallion)
            .with_name("service", "default.echo.pnum-80", &service("radish", "uid-radish"));

        let errors = parse_flat_entity_errors(body, &resolver).unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].name, "scallion");
        assert_eq!(errors[0].problems.keys().collect::<Vec<_>>(), vec!["methods", "methods[0]", "@entity"]);
        assert_eq!(errors[0].problems.get("methods"), Some("legacy methods error"));
        assert_eq!(errors[0].problems.get("methods[0]"), Some("flattened methods error"));
        assert_eq!(errors[1].name, "radish");
    }

    #[test]
    fn test_unresolvable_owners_are_dropped() {
        let body = br#"{
            "fields": {"routes": [{"methods": "bad"}]},
            "flattened_errors": [
                {"entity_name": "ghost", "entity_type": "route", "errors": [{"field": "paths", "message": "bad"}]},
                {"entity_type": "route", "errors": [{"field": "paths", "message": "bad"}]},
                {"entity_name": "default.echo.pnum-80", "entity_type": "service", "errors": [{"field": "read_timeout", "message": "expected an integer"}]}
            ]
        }"#;
        let resolver = StaticResolver::default().with_name("service", "default.echo.pnum-80", &service("radish", "uid-radish"));

        let errors = parse_flat_entity_errors(body, &resolver).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].name, "radish");
    }

    #[test]
    fn test_reported_tags_are_used_as_fallback() {
        let body = br#"{"flattened_errors": [{
            "entity_name": "default.demo.00",
            "entity_type": "route",
            "entity_tags": ["k8s-name:scallion", "k8s-namespace:default", "k8s-kind:Ingress", "k8s-uid:uid-scallion", "k8s-group:networking.k8s.io", "k8s-version:v1"],
            "errors": [{"field": "methods", "message": "bad"}]
        }]}"#;

        let errors = parse_flat_entity_errors(body, &StaticResolver::default()).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].owner(), ingress("scallion", "uid-scallion"));
    }

    #[test]
    fn test_entities_without_errors_produce_nothing() {
        let body = br#"{
            "fields": {"routes": [{}]},
            "flattened_errors": [{"entity_name": "default.demo.00", "entity_type": "route", "errors": []}]
        }"#;
        let scallion = ingress("scallion", "uid-scallion");
        let resolver = StaticResolver::default().with_position("route", 0, &scallion).with_name("route", "default.demo.00", &scallion);

        let errors = parse_flat_entity_errors(body, &resolver).unwrap();
        assert!(errors.is_empty());
    }

    #[test]
    fn test_resolver_sees_singular_entity_types() {
        let body = br#"{
            "fields": {"services": [{"read_timeout": "expected an integer"}]},
            "flattened_errors": [{"entity_name": "default.demo.00", "entity_type": "route", "errors": [{"field": "paths", "message": "bad"}]}]
        }"#;
        let resolver = StaticResolver::default()
            .with_position("service", 0, &service("radish", "uid-radish"))
            .with_name("route", "default.demo.00", &ingress("scallion", "uid-scallion"));

        let errors = parse_flat_entity_errors(body, &resolver).unwrap();
        let names: Vec<_> = errors.iter().map(|error| error.name.as_str()).collect();
        assert_eq!(names, vec!["radish", "scallion"]);
    }

    #[test]
    fn test_malformed_elements_do_not_drop_siblings() {
        let body = br#"{
            "fields": {
                "routes": ["oops", {"paths": "bad"}],
                "services": 7
            },
            "flattened_errors": [
                42,
                {"entity_type": "route"},
                {"entity_name": "default.demo.01", "entity_type": "route", "errors": [{"field": "methods", "message": "bad methods"}]}
            ]
        }"#;
        let resolver = StaticResolver::default()
            .with_position("route", 0, &ingress("a", "uid-a"))
            .with_position("route", 1, &ingress("b", "uid-b"))
            .with_position("service", 0, &service("radish", "uid-radish"))
            .with_name("route", "default.demo.01", &ingress("c", "uid-c"));

        let errors = parse_flat_entity_errors(body, &resolver).unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].name, "b");
        assert_eq!(errors[0].problems.keys().collect::<Vec<_>>(), vec!["paths"]);
        assert_eq!(errors[1].name, "c");
        assert_eq!(errors[1].problems.get("methods"), Some("bad methods"));
    }

    #[test]
    fn test_null_message_lists_are_empty() {
        let body = br#"{"flattened_errors": [
            {"entity_name": "default.demo.00", "entity_type": "route", "errors": [{"field": "paths", "message": "m", "messages": null}]},
            {"entity_name": "default.demo.01", "entity_type": "route", "errors": null}
        ]}"#;
        let resolver = StaticResolver::default()
            .with_name("route", "default.demo.00", &ingress("scallion", "uid-scallion"))
            .with_name("route", "default.demo.01", &ingress("turnip", "uid-turnip"));

        let errors = parse_flat_entity_errors(body, &resolver).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].name, "scallion");
        assert_eq!(errors[0].problems.get("paths"), Some("m"));
        assert_eq!(errors[0].problems.len(), 1);
    }

    #[test]
    fn test_body_without_error_containers() {
        let errors = parse_flat_entity_errors(br#"{"message": "something else", "fields": null}"#, &StaticResolver::default()).unwrap();
        assert!(errors.is_empty());
    }

    #[test]
    fn test_invalid_bodies() {
        let resolver = StaticResolver::default();
        assert!(matches!(parse_flat_entity_errors(br#"{"fields": {"routes": ["#, &resolver), Err(EntityErrorsParseError::Json(_))));
        assert!(matches!(parse_flat_entity_errors(b"not json", &resolver), Err(EntityErrorsParseError::Json(_))));
        assert!(matches!(parse_flat_entity_errors(b"[]", &resolver), Err(EntityErrorsParseError::NotAnObject)));
        assert!(matches!(
            parse_flat_entity_errors(br#"{"flattened_errors": {"route": 1}}"#, &resolver),
            Err(EntityErrorsParseError::UnexpectedShape(FLATTENED_ERRORS_KEY))
        ));
        assert!(matches!(parse_flat_entity_errors(br#"{"fields": []}"#, &resolver), Err(EntityErrorsParseError::UnexpectedShape(LEGACY_ERRORS_KEY))));
    }
}
