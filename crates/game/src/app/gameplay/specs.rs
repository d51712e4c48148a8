use std::collections::BTreeMap;

use serde::Deserialize;
use simcore::WorldObjectKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum WorldObjectType {
    Resource,
    Building,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ResourceKind {
    Wood,
    Gold,
}

/// Static per-kind behaviour of a placed world object.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct WorldObjectSpec {
    #[serde(rename = "type")]
    pub(crate) object_type: WorldObjectType,
    #[serde(default)]
    pub(crate) resource_kind: Option<ResourceKind>,
    #[serde(default)]
    pub(crate) default_resource_interactions: u32,
    #[serde(default)]
    pub(crate) resource_gain: u32,
    #[serde(default)]
    pub(crate) interaction_time_seconds: f32,
}

impl WorldObjectSpec {
    fn tree(default_resource_interactions: u32) -> Self {
        Self {
            object_type: WorldObjectType::Resource,
            resource_kind: Some(ResourceKind::Wood),
            default_resource_interactions,
            resource_gain: 10,
            interaction_time_seconds: 1.0,
        }
    }

    fn gold_deposit() -> Self {
        Self {
            object_type: WorldObjectType::Resource,
            resource_kind: Some(ResourceKind::Gold),
            default_resource_interactions: 3,
            resource_gain: 5,
            interaction_time_seconds: 2.0,
        }
    }

    fn building() -> Self {
        Self {
            object_type: WorldObjectType::Building,
            resource_kind: None,
            default_resource_interactions: 0,
            resource_gain: 0,
            interaction_time_seconds: 0.0,
        }
    }

    pub(crate) fn is_resource(&self) -> bool {
        self.object_type == WorldObjectType::Resource
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.object_type == WorldObjectType::Building {
            return Ok(());
        }
        if self.resource_kind.is_none() {
            return Err("resource objects need a resource_kind".to_string());
        }
        if self.default_resource_interactions == 0 {
            return Err("default_resource_interactions must be greater than zero".to_string());
        }
        if !(self.interaction_time_seconds.is_finite() && self.interaction_time_seconds > 0.0) {
            return Err(format!(
                "interaction_time_seconds must be positive, got {}",
                self.interaction_time_seconds
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WorldObjectSpecs {
    specs: BTreeMap<WorldObjectKind, WorldObjectSpec>,
}

impl Default for WorldObjectSpecs {
    fn default() -> Self {
        let specs = WorldObjectKind::ALL
            .into_iter()
            .map(|kind| (kind, builtin_spec(kind)))
            .collect();
        Self { specs }
    }
}

fn builtin_spec(kind: WorldObjectKind) -> WorldObjectSpec {
    match kind {
        WorldObjectKind::TreeForest => WorldObjectSpec::tree(4),
        WorldObjectKind::TreeJungle => WorldObjectSpec::tree(2),
        WorldObjectKind::TreeDesert => WorldObjectSpec::tree(1),
        WorldObjectKind::GoldDeposit => WorldObjectSpec::gold_deposit(),
        WorldObjectKind::Building1 | WorldObjectKind::Building2 => WorldObjectSpec::building(),
    }
}

impl WorldObjectSpecs {
    pub(crate) fn with_overrides(overrides: &BTreeMap<WorldObjectKind, WorldObjectSpec>) -> Self {
        let mut specs = Self::default();
        specs
            .specs
            .extend(overrides.iter().map(|(kind, spec)| (*kind, *spec)));
        specs
    }

    pub(crate) fn get(&self, kind: WorldObjectKind) -> &WorldObjectSpec {
        self.specs
            .get(&kind)
            .unwrap_or_else(|| panic!("no world object spec for {}", kind.as_token()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_covers_every_kind() {
        let specs = WorldObjectSpecs::default();
        for kind in WorldObjectKind::ALL {
            specs.get(kind).validate().expect("builtin spec should validate");
        }
        assert_eq!(
            specs.get(WorldObjectKind::TreeForest).default_resource_interactions,
            4
        );
        assert_eq!(
            specs.get(WorldObjectKind::TreeJungle).default_resource_interactions,
            2
        );
        assert_eq!(
            specs.get(WorldObjectKind::TreeDesert).default_resource_interactions,
            1
        );
        assert_eq!(specs.get(WorldObjectKind::TreeDesert).resource_gain, 10);
        assert!(!specs.get(WorldObjectKind::Building1).is_resource());
    }

    #[test]
    fn overrides_replace_only_named_kinds() {
        let mut overrides = BTreeMap::new();
        overrides.insert(WorldObjectKind::TreeForest, WorldObjectSpec::tree(9));
        let specs = WorldObjectSpecs::with_overrides(&overrides);
        assert_eq!(
            specs.get(WorldObjectKind::TreeForest).default_resource_interactions,
            9
        );
        assert_eq!(
            specs.get(WorldObjectKind::TreeJungle).default_resource_interactions,
            2
        );
    }

    #[test]
    fn resource_without_interactions_is_invalid() {
        let spec = WorldObjectSpec {
            default_resource_interactions: 0,
            ..WorldObjectSpec::gold_deposit()
        };
        assert!(spec.validate().is_err());
    }
}
