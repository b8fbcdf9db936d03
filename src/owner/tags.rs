// SPDX-FileCopyrightText: © 2026 Kubvernor authors
// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2026 Kubvernor authors.
//         This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, version 3.
//         This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//         You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
//
//

use crate::resource_error::OwnerReference;

const NAME_TAG_PREFIX: &str = "k8s-name:";
const NAMESPACE_TAG_PREFIX: &str = "k8s-namespace:";
const KIND_TAG_PREFIX: &str = "k8s-kind:";
const UID_TAG_PREFIX: &str = "k8s-uid:";
const GROUP_TAG_PREFIX: &str = "k8s-group:";
const VERSION_TAG_PREFIX: &str = "k8s-version:";

#[derive(Default)]
struct OwnerTags<'a> {
    name: Option<&'a str>,
    namespace: Option<&'a str>,
    kind: Option<&'a str>,
    uid: Option<&'a str>,
    group: Option<&'a str>,
    version: Option<&'a str>,
}

/// Reads the owning object from the `k8s-*` tags the translator puts on every generated entity.
/// Name, kind and uid are mandatory, the rest defaults to empty.
pub fn owner_from_tags<'a, I>(tags: I) -> Option<OwnerReference>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut owner_tags = OwnerTags::default();
    for tag in tags {
        if let Some(value) = tag.strip_prefix(NAME_TAG_PREFIX) {
            owner_tags.name = Some(value);
        } else if let Some(value) = tag.strip_prefix(NAMESPACE_TAG_PREFIX) {
            owner_tags.namespace = Some(value);
        } else if let Some(value) = tag.strip_prefix(KIND_TAG_PREFIX) {
            owner_tags.kind = Some(value);
        } else if let Some(value) = tag.strip_prefix(UID_TAG_PREFIX) {
            owner_tags.uid = Some(value);
        } else if let Some(value) = tag.strip_prefix(GROUP_TAG_PREFIX) {
            owner_tags.group = Some(value);
        } else if let Some(value) = tag.strip_prefix(VERSION_TAG_PREFIX) {
            owner_tags.version = Some(value);
        }
    }

    let OwnerTags { name: Some(name), namespace, kind: Some(kind), uid: Some(uid), group, version } = owner_tags else {
        return None;
    };

    let api_version = match (group.filter(|group| !group.is_empty()), version) {
        (Some(group), Some(version)) => format!("{group}/{version}"),
        (Some(group), None) => group.to_owned(),
        (None, Some(version)) => version.to_owned(),
        (None, None) => String::new(),
    };

    Some(OwnerReference {
        kind: kind.to_owned(),
        namespace: namespace.unwrap_or_default().to_owned(),
        name: name.to_owned(),
        api_version,
        uid: uid.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_from_tags() {
        let tags = [
            "k8s-name:scallion",
            "k8s-namespace:default",
            "k8s-kind:Ingress",
            "k8s-uid:d7300db1-14eb-5a09-b594-2db904ed8eca",
            "k8s-group:networking.k8s.io",
            "k8s-version:v1",
            "managed-by-ingress-controller",
        ];
        let owner = owner_from_tags(tags).unwrap();
        assert_eq!(
            owner,
            OwnerReference {
                kind: "Ingress".to_owned(),
                namespace: "default".to_owned(),
                name: "scallion".to_owned(),
                api_version: "networking.k8s.io/v1".to_owned(),
                uid: "d7300db1-14eb-5a09-b594-2db904ed8eca".to_owned(),
            }
        );
    }

    #[test]
    fn test_core_group_owner() {
        let tags = ["k8s-name:radish", "k8s-namespace:default", "k8s-kind:Service", "k8s-uid:b8aa692c", "k8s-group:", "k8s-version:v1"];
        let owner = owner_from_tags(tags).unwrap();
        assert_eq!(owner.api_version, "v1");
    }

    #[test]
    fn test_incomplete_tags() {
        assert!(owner_from_tags(["k8s-name:radish", "k8s-kind:Service"]).is_none());
        assert!(owner_from_tags(Vec::<&str>::new()).is_none());
    }
}
