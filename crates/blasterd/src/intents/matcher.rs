use std::collections::BTreeMap;

use blasterd_catalogue::eq_fold;
use blasterd_catalogue::Catalogue;
use blasterd_catalogue::CommandIntent;
use tracing::debug;

use super::request::VoiceRequest;
use super::IntentError;

/// Intent with every slot value replaced by its canonical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleIntent {
    pub name: String,
    /// Slot name to canonical value.
    pub slots: BTreeMap<String, String>,
}

/// What an intent resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Scenario(String),
    Command(String),
}

/// Check a request against the declared intents and canonicalize its slot
/// values.
pub fn simplify(request: &VoiceRequest, catalogue: &Catalogue) -> Result<SimpleIntent, IntentError> {
    let intent = request.intent();

    if intent.slots.is_empty() {
        return Err(IntentError::NoSlots(intent.name.clone()));
    }

    let declared = catalogue
        .intents
        .get(&intent.name)
        .ok_or_else(|| IntentError::UnsupportedIntent(intent.name.clone()))?;

    let mut slots = BTreeMap::new();
    for (slot_name, slot) in &intent.slots {
        let raw = match slot.value.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw,
            _ => continue,
        };

        let value = declared
            .slots
            .get(slot_name)
            .and_then(|s| s.values.values().find(|v| v.matches(raw)))
            .ok_or_else(|| IntentError::UnsupportedSlotValue {
                slot: slot_name.clone(),
                value: raw.to_string(),
            })?;

        slots.insert(slot_name.clone(), value.name.clone());
    }

    Ok(SimpleIntent {
        name: intent.name.clone(),
        slots,
    })
}

fn matches(intent: &SimpleIntent, candidates: &[CommandIntent]) -> bool {
    candidates.iter().any(|candidate| {
        candidate.name == intent.name
            && candidate.slots.iter().all(|(name, slot)| {
                intent
                    .slots
                    .get(name)
                    .is_some_and(|value| eq_fold(value, &slot.value))
            })
    })
}

/// First scenario, then first command, whose intents match.
pub fn resolve(intent: &SimpleIntent, catalogue: &Catalogue) -> Result<Target, IntentError> {
    if let Some(scenario) = catalogue
        .scenarios
        .values()
        .find(|s| matches(intent, &s.intents))
    {
        debug!("Intent {} matched scenario {}", intent.name, scenario.id);
        return Ok(Target::Scenario(scenario.id.clone()));
    }

    if let Some(command) = catalogue
        .commands
        .values()
        .find(|c| matches(intent, &c.intents))
    {
        debug!("Intent {} matched command {}", intent.name, command.id);
        return Ok(Target::Command(command.id.clone()));
    }

    Err(IntentError::NotFound(intent.name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalogue() -> Catalogue {
        serde_json::from_value(serde_json::json!({
            "intents": {
                "TurnOnIntent": {
                    "name": "TurnOnIntent",
                    "slots": {
                        "action": {
                            "name": "action",
                            "values": {
                                "on": { "name": "on", "synonyms": ["turn on", "switch on"] },
                                "off": { "name": "off", "synonyms": ["turn off"] }
                            }
                        },
                        "item": {
                            "name": "item",
                            "values": {
                                "light": { "name": "light", "synonyms": ["lamp"] },
                                "movie": { "name": "movie", "synonyms": ["film"] },
                                "küche": { "name": "küche", "synonyms": ["kitchen"] }
                            }
                        }
                    }
                }
            },
            "commands": {
                "light-on": {
                    "id": "light-on",
                    "device_id": "aa",
                    "name": "Light on",
                    "code": "01",
                    "intents": [{
                        "name": "TurnOnIntent",
                        "slots": {
                            "action": { "name": "action", "value": "on" },
                            "item": { "name": "item", "value": "light" }
                        }
                    }]
                },
                "light-off": {
                    "id": "light-off",
                    "device_id": "aa",
                    "name": "Light off",
                    "code": "02",
                    "intents": [{
                        "name": "TurnOnIntent",
                        "slots": {
                            "action": { "name": "action", "value": "off" },
                            "item": { "name": "item", "value": "light" }
                        }
                    }]
                },
                "kitchen-on": {
                    "id": "kitchen-on",
                    "device_id": "aa",
                    "name": "Kitchen on",
                    "code": "03",
                    "intents": [{
                        "name": "TurnOnIntent",
                        "slots": {
                            "action": { "name": "action", "value": "on" },
                            "item": { "name": "item", "value": "Küche" }
                        }
                    }]
                }
            },
            "scenarios": {
                "movie": {
                    "id": "movie",
                    "name": "Movie",
                    "sequence": [{ "command_id": "light-off" }],
                    "intents": [{
                        "name": "TurnOnIntent",
                        "slots": {
                            "action": { "name": "action", "value": "on" },
                            "item": { "name": "item", "value": "movie" }
                        }
                    }]
                }
            }
        }))
        .unwrap()
    }

    fn request(name: &str, slots: &[(&str, Option<&str>)]) -> VoiceRequest {
        let slots: serde_json::Map<String, serde_json::Value> = slots
            .iter()
            .map(|(slot, value)| {
                (
                    slot.to_string(),
                    serde_json::json!({ "name": slot, "value": value }),
                )
            })
            .collect();

        serde_json::from_value(serde_json::json!({
            "version": "1.0",
            "request": {
                "type": "IntentRequest",
                "requestId": "amzn1.echo-api.request.1",
                "timestamp": "2026-01-01T00:00:00Z",
                "locale": "en-US",
                "intent": { "name": name, "confirmationStatus": "NONE", "slots": slots }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_synonyms_resolve_to_command() {
        let catalogue = catalogue();
        let request = request(
            "TurnOnIntent",
            &[("action", Some("turn on")), ("item", Some("Lamp"))],
        );

        let intent = simplify(&request, &catalogue).unwrap();
        assert_eq!(intent.slots["action"], "on");
        assert_eq!(intent.slots["item"], "light");

        assert_eq!(
            resolve(&intent, &catalogue).unwrap(),
            Target::Command("light-on".to_string())
        );
    }

    #[test]
    fn test_scenarios_win_over_commands() {
        let catalogue = catalogue();
        let request = request(
            "TurnOnIntent",
            &[("action", Some("switch on")), ("item", Some("film"))],
        );

        let intent = simplify(&request, &catalogue).unwrap();
        assert_eq!(
            resolve(&intent, &catalogue).unwrap(),
            Target::Scenario("movie".to_string())
        );
    }

    #[test]
    fn test_non_ascii_values_ignore_case() {
        let catalogue = catalogue();
        let request = request(
            "TurnOnIntent",
            &[("action", Some("on")), ("item", Some("KÜCHE"))],
        );

        let intent = simplify(&request, &catalogue).unwrap();
        assert_eq!(intent.slots["item"], "küche");

        assert_eq!(
            resolve(&intent, &catalogue).unwrap(),
            Target::Command("kitchen-on".to_string())
        );
    }

    #[test]
    fn test_empty_slots_are_dropped() {
        let catalogue = catalogue();
        let request = request(
            "TurnOnIntent",
            &[("action", Some("turn off")), ("item", None)],
        );

        let intent = simplify(&request, &catalogue).unwrap();
        assert_eq!(intent.slots.len(), 1);

        // Every stored intent needs an item, so nothing matches.
        assert!(matches!(
            resolve(&intent, &catalogue),
            Err(IntentError::NotFound(_))
        ));
    }

    #[test]
    fn test_validation_failures() {
        let catalogue = catalogue();

        let err = simplify(&request("TurnOnIntent", &[]), &catalogue).unwrap_err();
        assert!(matches!(err, IntentError::NoSlots(_)));

        let err = simplify(&request("DanceIntent", &[("item", Some("lamp"))]), &catalogue)
            .unwrap_err();
        assert!(matches!(err, IntentError::UnsupportedIntent(_)));

        let err = simplify(
            &request("TurnOnIntent", &[("item", Some("toaster"))]),
            &catalogue,
        )
        .unwrap_err();
        assert!(matches!(err, IntentError::UnsupportedSlotValue { .. }));
    }
}
