//! Meter discovery and display names
//!
//! Meters publish one sensor per measurement, named
//! `sensor.<base>_<kind>` (for example `sensor.unit_4_phase_a_current` and
//! `sensor.unit_4_total_energy`). Sensors sharing a base are grouped into a
//! [`Meter`]; a group counts as a meter only when it has both a current and
//! a total energy sensor.

use novu_core::State;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Sensor kinds a meter can publish, as entity id suffixes
pub const METER_KINDS: [&str; 5] = [
    "phase_a_current",
    "phase_a_power",
    "phase_a_voltage",
    "temperature",
    "total_energy",
];

const REQUIRED_KINDS: [&str; 2] = ["phase_a_current", "total_energy"];

static TRAILING_KIND: OnceLock<Regex> = OnceLock::new();
static WHITESPACE: OnceLock<Regex> = OnceLock::new();

fn trailing_kind() -> &'static Regex {
    TRAILING_KIND.get_or_init(|| {
        Regex::new(
            r"(?i)\s*\b(phase\s+a\s+current|phase\s+a\s+power|phase\s+a\s+voltage|temperature|total\s+energy|switch)\s*$",
        )
        .expect("static regex is valid")
    })
}

fn whitespace() -> &'static Regex {
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static regex is valid"))
}

/// A group of sensors belonging to one physical meter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meter {
    /// Shared object id prefix (e.g., "unit_4")
    pub base: String,
    pub display_name: String,
    /// Entity id per kind
    pub entities: BTreeMap<String, String>,
}

impl Meter {
    pub fn total_energy_entity(&self) -> Option<&str> {
        self.entities.get("total_energy").map(String::as_str)
    }

    pub fn current_entity(&self) -> Option<&str> {
        self.entities.get("phase_a_current").map(String::as_str)
    }
}

/// Strip trailing measurement words from a friendly name
///
/// "Unit 4 Phase A Current" and "Unit 4 Total Energy" both become "Unit 4".
/// Returns an empty string when nothing else is left.
pub fn clean_display_name(name: &str) -> String {
    let mut current = name.trim().to_string();
    loop {
        let stripped = trailing_kind().replace(&current, "").trim().to_string();
        if stripped == current {
            break;
        }
        current = stripped;
    }
    whitespace().replace_all(&current, " ").into_owned()
}

/// Human label for an entity: its cleaned friendly name, else the entity id
pub fn entity_label(entity_id: &str, state: Option<&State>) -> String {
    state
        .and_then(State::friendly_name)
        .map(clean_display_name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| entity_id.to_string())
}

/// Split a sensor object id into its base and kind
fn split_kind(object_id: &str) -> Option<(&str, &'static str)> {
    METER_KINDS.iter().find_map(|kind| {
        object_id
            .strip_suffix(kind)
            .and_then(|rest| rest.strip_suffix('_'))
            .filter(|base| !base.is_empty())
            .map(|base| (base, *kind))
    })
}

/// Group sensor states into meters, sorted by base
pub fn discover_meters(states: &[State]) -> Vec<Meter> {
    let mut groups: BTreeMap<String, BTreeMap<&'static str, &State>> = BTreeMap::new();

    for state in states {
        if state.entity_id.domain() != Some("sensor") {
            continue;
        }
        if let Some((base, kind)) = split_kind(state.entity_id.object_id()) {
            groups.entry(base.to_string()).or_default().insert(kind, state);
        }
    }

    groups
        .into_iter()
        .filter(|(_, sensors)| REQUIRED_KINDS.iter().all(|k| sensors.contains_key(k)))
        .map(|(base, sensors)| {
            let display_name = meter_display_name(&base, &sensors);
            let entities = sensors
                .iter()
                .map(|(kind, state)| (kind.to_string(), state.entity_id.to_string()))
                .collect();
            Meter {
                base,
                display_name,
                entities,
            }
        })
        .collect()
}

/// Prefer the total energy sensor's name, then any other sensor's, then the base
fn meter_display_name(base: &str, sensors: &BTreeMap<&'static str, &State>) -> String {
    let preferred = sensors.get("total_energy").into_iter();
    let others = sensors
        .iter()
        .filter(|(kind, _)| **kind != "total_energy")
        .map(|(_, state)| state);

    preferred
        .chain(others)
        .filter_map(|state| state.friendly_name())
        .map(clean_display_name)
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use novu_core::{Context, EntityId, ATTR_FRIENDLY_NAME};
    use serde_json::json;
    use std::collections::HashMap;

    fn sensor(id: &str, name: Option<&str>) -> State {
        let mut attributes = HashMap::new();
        if let Some(name) = name {
            attributes.insert(ATTR_FRIENDLY_NAME.to_string(), json!(name));
        }
        State::new(EntityId::new(id).unwrap(), "1", attributes, Context::new())
    }

    #[test]
    fn test_clean_display_name() {
        assert_eq!(clean_display_name("Unit 4 Phase A Current"), "Unit 4");
        assert_eq!(clean_display_name("Unit 4 total energy"), "Unit 4");
        assert_eq!(clean_display_name("Shop   2 Temperature"), "Shop 2");
        assert_eq!(clean_display_name("Pump Switch Phase A Power"), "Pump");
        assert_eq!(clean_display_name("Switchboard"), "Switchboard");
        assert_eq!(clean_display_name("Total Energy"), "");
    }

    #[test]
    fn test_entity_label() {
        let named = sensor("sensor.unit_4_total_energy", Some("Unit 4 Total Energy"));
        assert_eq!(entity_label("sensor.unit_4_total_energy", Some(&named)), "Unit 4");

        let unnamed = sensor("sensor.unit_5_total_energy", None);
        assert_eq!(
            entity_label("sensor.unit_5_total_energy", Some(&unnamed)),
            "sensor.unit_5_total_energy"
        );
        assert_eq!(entity_label("sensor.gone", None), "sensor.gone");
    }

    #[test]
    fn test_discover_meters() {
        let states = vec![
            sensor("sensor.unit_4_phase_a_current", Some("Unit 4 Phase A Current")),
            sensor("sensor.unit_4_total_energy", Some("Flat 4 Total Energy")),
            sensor("sensor.unit_4_temperature", None),
            sensor("sensor.unit_1_phase_a_current", None),
            sensor("sensor.unit_1_total_energy", None),
            // Missing total energy, not a meter
            sensor("sensor.unit_9_phase_a_current", Some("Unit 9 Phase A Current")),
            // Wrong domain
            sensor("switch.unit_7_total_energy", None),
            sensor("sensor.outdoor_humidity", None),
        ];

        let meters = discover_meters(&states);
        assert_eq!(meters.len(), 2);

        assert_eq!(meters[0].base, "unit_1");
        assert_eq!(meters[0].display_name, "unit_1");

        assert_eq!(meters[1].base, "unit_4");
        assert_eq!(meters[1].display_name, "Flat 4");
        assert_eq!(meters[1].entities.len(), 3);
        assert_eq!(
            meters[1].total_energy_entity(),
            Some("sensor.unit_4_total_energy")
        );
        assert_eq!(
            meters[1].current_entity(),
            Some("sensor.unit_4_phase_a_current")
        );
    }

    #[test]
    fn test_display_name_falls_back_to_other_sensors() {
        let states = vec![
            sensor("sensor.shop_phase_a_current", Some("Corner Shop Phase A Current")),
            sensor("sensor.shop_total_energy", None),
        ];
        assert_eq!(discover_meters(&states)[0].display_name, "Corner Shop");
    }
}
