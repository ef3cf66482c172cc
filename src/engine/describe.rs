//! Serialisable description of a built machine, for tooling.

use super::machine::StateMachine;
use super::transition::TransitionKind;
use crate::core::{Event, StateId, Trigger};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDescription<U> {
    pub id: U,
    /// `None` for top-level states
    pub superstate: Option<U>,
    pub composite: bool,
    pub is_final: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDescription<U> {
    /// `None` for the top-level initial transition
    pub source: Option<U>,
    pub target: U,
    pub kind: TransitionKind,
    /// Debug rendering of the trigger, `None` for triggerless transitions
    pub trigger: Option<String>,
    pub guarded: bool,
    pub has_action: bool,
}

/// Structure of a machine: states, nesting and transitions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineDescription<U> {
    pub initial: Option<U>,
    pub max_transitions_per_event: usize,
    pub states: Vec<StateDescription<U>>,
    pub transitions: Vec<TransitionDescription<U>>,
}

impl<U: Serialize> MachineDescription<U> {
    /// Render as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl<U: StateId, C, E: Event> StateMachine<U, C, E> {
    /// Describe the machine's structure.
    pub fn describe(&self) -> MachineDescription<U> {
        let states = self
            .states()
            .map(|id| StateDescription {
                id: id.clone(),
                superstate: self.superstate(id).cloned(),
                composite: self.is_composite(id),
                is_final: self.is_final(id),
            })
            .collect();

        let transitions = self
            .transitions()
            .iter()
            .map(|transition| TransitionDescription {
                source: transition.source().cloned(),
                target: transition.target().clone(),
                kind: transition.kind(),
                trigger: transition.trigger().map(|trigger| match trigger {
                    Trigger::Event(kind) => format!("{kind:?}"),
                    Trigger::CompositeStateCompleted => "CompositeStateCompleted".to_string(),
                }),
                guarded: transition.is_guarded(),
                has_action: transition.has_action(),
            })
            .collect();

        MachineDescription {
            initial: self.initial_state().cloned(),
            max_transitions_per_event: self.max_transitions_per_event(),
            states,
            transitions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{StateMachineBuilder, TransitionBuilder};
    use crate::event_enum;

    event_enum! {
        enum Media {
            Play,
            Stop,
        }
    }

    fn player() -> StateMachine<&'static str, (), Media> {
        StateMachineBuilder::new()
            .with_initial_transition("stopped")
            .with_composite_state("playing", "normal", [])
            .with_transition_on("stopped", "playing", Media::Play)
            .transition(
                TransitionBuilder::new()
                    .from("playing")
                    .to("stopped")
                    .on(Media::Stop)
                    .when(|_, _| true),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn description_lists_states_and_nesting() {
        let description = player().describe();

        assert_eq!(description.initial, Some("stopped"));
        assert_eq!(description.states.len(), 3);
        let normal = description.states.iter().find(|s| s.id == "normal").unwrap();
        assert_eq!(normal.superstate, Some("playing"));
        let playing = description.states.iter().find(|s| s.id == "playing").unwrap();
        assert!(playing.composite);
    }

    #[test]
    fn description_lists_transitions() {
        let description = player().describe();

        let stop = description
            .transitions
            .iter()
            .find(|t| t.source == Some("playing") && t.kind == TransitionKind::External)
            .unwrap();
        assert_eq!(stop.trigger.as_deref(), Some("Stop"));
        assert!(stop.guarded);
        assert!(!stop.has_action);

        let top = description.transitions.iter().find(|t| t.source.is_none()).unwrap();
        assert_eq!(top.kind, TransitionKind::Initial);
        assert_eq!(top.target, "stopped");
    }

    #[test]
    fn description_renders_json() {
        let json = player().describe().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["initial"], "stopped");
        assert_eq!(value["max_transitions_per_event"], 50);
        assert_eq!(value["transitions"].as_array().map(Vec::len), Some(4));
    }
}
