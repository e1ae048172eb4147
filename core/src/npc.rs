//! Non-player characters that can be talked to.

use crate::{
    config::NpcConfig,
    error::GameResult,
    event::GameEvent,
    interaction::{InteractionPrompt, PromptEdge},
    state_machine::{StateLabel, StateMachine, Transitioned},
    time_affected::{EntityContext, EventBuffer, TimeAffected, TimeTracker},
    types::{EntityId, Position},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NpcState {
    Idle,
    Moving,
    Talking,
}

impl StateLabel for NpcState {
    fn label(&self) -> &'static str {
        match self {
            Self::Idle    => "idle",
            Self::Moving  => "moving",
            Self::Talking => "talking",
        }
    }
}

pub struct Npc {
    tracker:       TimeTracker,
    config:        NpcConfig,
    state:         StateMachine<NpcState>,
    /// State to return to once a conversation ends.
    resume_state:  NpcState,
    conversations: BTreeMap<String, Vec<String>>,
    prompt:        InteractionPrompt,
    events:        EventBuffer,
}

impl Npc {
    pub fn new(unique_id: impl Into<EntityId>, position: Position, config: &NpcConfig) -> Self {
        Self {
            tracker:       TimeTracker::new(unique_id).with_position(position),
            config:        config.clone(),
            state:         StateMachine::new(NpcState::Idle),
            resume_state:  NpcState::Idle,
            conversations: BTreeMap::new(),
            prompt:        InteractionPrompt::new(),
            events:        EventBuffer::default(),
        }
    }

    pub fn state(&self) -> NpcState { self.state.current() }
    pub fn is_talking(&self) -> bool { self.state.current() == NpcState::Talking }
    pub fn position(&self) -> Position { self.tracker.position }

    pub fn add_conversation(&mut self, name: impl Into<String>, lines: Vec<String>) {
        self.conversations.insert(name.into(), lines);
    }

    /// Lines of a named conversation. Unknown names are logged and yield None.
    pub fn conversation(&self, name: &str) -> Option<&[String]> {
        let lines = self.conversations.get(name).map(Vec::as_slice);
        if lines.is_none() {
            log::warn!("'{}' has no conversation named '{name}'", self.tracker.unique_id);
        }
        lines
    }

    pub fn set_moving(&mut self, moving: bool) {
        let target = if moving { NpcState::Moving } else { NpcState::Idle };
        if self.is_talking() || self.state.current() == target {
            return;
        }
        let t = self.state.transition(target);
        self.record(t);
    }

    /// Returns false if already talking.
    pub fn start_talk(&mut self) -> bool {
        if self.is_talking() {
            return false;
        }
        self.resume_state = self.state.current();
        let t = self.state.transition(NpcState::Talking);
        self.record(t);
        true
    }

    /// Return to whatever the NPC was doing, after a short delay.
    pub fn end_talk(&mut self) {
        if !self.is_talking() {
            return;
        }
        if let Some(t) = self.state.transition_after(self.resume_state, self.config.talk_exit_delay) {
            self.record(t);
        }
    }

    /// Sample the interaction prompt. Returns true when the player asked to talk.
    pub fn observe(&mut self, facing: bool, interact_pressed: bool, player_busy: bool) -> bool {
        let available = self.state.current() == NpcState::Idle;
        let outcome = self.prompt.observe(facing, interact_pressed, available, player_busy);
        self.record_prompt(outcome.edge);
        outcome.interact
    }

    pub fn leave_range(&mut self) {
        if self.prompt.leave_range() {
            self.record_prompt(Some(PromptEdge::Hidden));
        }
    }

    fn record_prompt(&mut self, edge: Option<PromptEdge>) {
        let entity = self.tracker.unique_id.clone();
        match edge {
            Some(PromptEdge::Shown) => self.events.push(GameEvent::PromptShown { entity }),
            Some(PromptEdge::Hidden) => self.events.push(GameEvent::PromptHidden { entity }),
            None => {}
        }
    }

    fn record(&mut self, t: Transitioned<NpcState>) {
        let id = self.tracker.unique_id.clone();
        self.events.record_transition(&id, "state", t);
    }
}

impl TimeAffected for Npc {
    fn tracker(&self) -> &TimeTracker { &self.tracker }
    fn tracker_mut(&mut self) -> &mut TimeTracker { &mut self.tracker }

    fn update(&mut self, ctx: &mut EntityContext<'_>) -> GameResult<()> {
        if let Some(t) = self.state.tick() {
            self.record(t);
        }
        self.events.flush(ctx);
        Ok(())
    }
}
