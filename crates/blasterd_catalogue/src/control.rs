use serde::Deserialize;
use serde::Serialize;
use strum::Display;

pub const STATE_ON: &str = "on";
pub const STATE_OFF: &str = "off";
/// Stateless entity (e.g. a "volume up" button).
pub const STATE_NA: &str = "n/a";

/// A group of control items shown together, e.g. "TV" or "Living room light".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Control {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub items: Vec<ControlItem>,
}

impl Control {
    pub fn item(&self, item_id: &str) -> Option<&ControlItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn item_mut(&mut self, item_id: &str) -> Option<&mut ControlItem> {
        self.items.iter_mut().find(|i| i.id == item_id)
    }
}

/// A stateful button cycling through an ordered list of entities.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ControlItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub entities: Vec<Entity>,
    /// State of the entity executed last.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_state: Option<String>,
}

impl ControlItem {
    /// First entity carrying `state`.
    pub fn entity_by_state(&self, state: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.state == state)
    }

    /// Entity following the active one, wrapping around after the last.
    ///
    /// Falls back to the first entity when nothing is active yet or the
    /// active state no longer exists.
    pub fn next_state_entity(&self) -> Option<&Entity> {
        let position = self
            .active_state
            .as_deref()
            .and_then(|active| self.entities.iter().position(|e| e.state == active));

        match position {
            Some(idx) => self.entities.get((idx + 1) % self.entities.len()),
            None => self.entities.first(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
    Command,
    Scenario,
}

/// Target executed when a control item enters `state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// Command or scenario id.
    pub target: String,
    #[serde(default)]
    pub state: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(target: &str, state: &str) -> Entity {
        Entity {
            kind: EntityKind::Command,
            target: target.to_string(),
            state: state.to_string(),
        }
    }

    fn on_off_item() -> ControlItem {
        ControlItem {
            id: "lamp".to_string(),
            name: "Lamp".to_string(),
            entities: vec![entity("lamp-on", STATE_ON), entity("lamp-off", STATE_OFF)],
            ..Default::default()
        }
    }

    #[test]
    fn test_next_state_cycles_and_wraps() {
        let mut item = on_off_item();

        let next = item.next_state_entity().unwrap();
        assert_eq!(next.state, STATE_ON);

        item.active_state = Some(STATE_ON.to_string());
        assert_eq!(item.next_state_entity().unwrap().state, STATE_OFF);

        item.active_state = Some(STATE_OFF.to_string());
        assert_eq!(item.next_state_entity().unwrap().state, STATE_ON);
    }

    #[test]
    fn test_next_state_unknown_active_falls_back_to_first() {
        let mut item = on_off_item();
        item.active_state = Some("dimmed".to_string());

        assert_eq!(item.next_state_entity().unwrap().target, "lamp-on");
    }

    #[test]
    fn test_next_state_empty_item() {
        let item = ControlItem::default();
        assert!(item.next_state_entity().is_none());
    }

    #[test]
    fn test_entity_by_state() {
        let item = on_off_item();
        assert_eq!(item.entity_by_state(STATE_OFF).unwrap().target, "lamp-off");
        assert!(item.entity_by_state(STATE_NA).is_none());
    }

    #[test]
    fn test_entity_kind_serialization() {
        let json = serde_json::to_string(&entity("x", STATE_ON)).unwrap();
        assert_eq!(json, r#"{"type":"command","target":"x","state":"on"}"#);
        assert_eq!(EntityKind::Scenario.to_string(), "scenario");
    }
}
