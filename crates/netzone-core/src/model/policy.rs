// ── Netify admission policy ──
//
// Four independent switches. `auto_create_*` only matters when the
// matching `allow_unknown_*` is on; `effective_policy` is the single
// place that relation is encoded.

use serde::{Deserialize, Serialize};

/// Admission policy for telemetry that references unknown zones/devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetifySettings {
    #[serde(default)]
    pub allow_unknown_devices: bool,
    #[serde(default)]
    pub auto_create_devices: bool,
    #[serde(default)]
    pub allow_unknown_zones: bool,
    #[serde(default)]
    pub auto_create_zones: bool,
}

impl NetifySettings {
    /// What happens to telemetry whose router zone is not known.
    pub fn zone_policy(&self) -> PolicyOutcome {
        effective_policy(self.allow_unknown_zones, self.auto_create_zones)
    }

    /// What happens to telemetry from a device that is not known.
    pub fn device_policy(&self) -> PolicyOutcome {
        effective_policy(self.allow_unknown_devices, self.auto_create_devices)
    }

    /// Merge a partial update; unspecified fields keep their value.
    pub fn apply(&mut self, patch: &PolicyPatch) {
        if let Some(v) = patch.allow_unknown_devices {
            self.allow_unknown_devices = v;
        }
        if let Some(v) = patch.auto_create_devices {
            self.auto_create_devices = v;
        }
        if let Some(v) = patch.allow_unknown_zones {
            self.allow_unknown_zones = v;
        }
        if let Some(v) = patch.auto_create_zones {
            self.auto_create_zones = v;
        }
    }
}

/// Partial policy update, as sent by `PUT /router-mapping`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_unknown_devices: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_create_devices: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_unknown_zones: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_create_zones: Option<bool>,
}

impl PolicyPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Outcome for an entity the inventory has never seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyOutcome {
    /// Drop the record.
    Reject,
    /// Accept the record without creating the entity (default zone for
    /// zones, unassigned for devices).
    FallbackToDefault,
    /// Create the entity and attach the record to it.
    AutoCreate,
}

/// Collapse an `(allow, auto_create)` pair into its outcome.
pub fn effective_policy(allow_unknown: bool, auto_create: bool) -> PolicyOutcome {
    match (allow_unknown, auto_create) {
        (false, _) => PolicyOutcome::Reject,
        (true, false) => PolicyOutcome::FallbackToDefault,
        (true, true) => PolicyOutcome::AutoCreate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_create_without_allow_still_rejects() {
        assert_eq!(effective_policy(false, true), PolicyOutcome::Reject);
        assert_eq!(effective_policy(false, false), PolicyOutcome::Reject);
        assert_eq!(
            effective_policy(true, false),
            PolicyOutcome::FallbackToDefault
        );
        assert_eq!(effective_policy(true, true), PolicyOutcome::AutoCreate);
    }

    #[test]
    fn patch_leaves_unspecified_fields_untouched() {
        let mut settings = NetifySettings {
            allow_unknown_devices: true,
            auto_create_devices: true,
            allow_unknown_zones: false,
            auto_create_zones: false,
        };
        settings.apply(&PolicyPatch {
            allow_unknown_zones: Some(true),
            auto_create_devices: Some(false),
            ..PolicyPatch::default()
        });

        assert!(settings.allow_unknown_devices);
        assert!(!settings.auto_create_devices);
        assert!(settings.allow_unknown_zones);
        assert!(!settings.auto_create_zones);
        assert_eq!(settings.zone_policy(), PolicyOutcome::FallbackToDefault);
        assert_eq!(settings.device_policy(), PolicyOutcome::FallbackToDefault);
    }

    #[test]
    fn partial_body_deserializes_to_patch() {
        let patch: PolicyPatch =
            serde_json::from_str(r#"{"auto_create_zones": true}"#).expect("valid patch");
        assert_eq!(patch.auto_create_zones, Some(true));
        assert_eq!(patch.allow_unknown_zones, None);
        assert!(!patch.is_empty());
        assert!(PolicyPatch::default().is_empty());
    }
}
