//! Player controller: movement, jumping, talking and item pickup gating.
//!
//! Two machines run side by side. `state` gates what the player may do
//! (locked, talking, in jump lag). `action` tracks the jump itself.
//! Every committed transition picks the next animation key.

use crate::{
    config::PlayerConfig,
    error::GameResult,
    save::SaveData,
    state_machine::{StateLabel, StateMachine, Transitioned},
    time_affected::{EntityContext, EventBuffer, TimeAffected, TimeTracker},
    types::EntityId,
};
use serde::{Deserialize, Serialize};

/// Stick deadzone bias towards picking a horizontal facing.
const HORIZONTAL_MOVE_PADDING: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    Idle,
    Moving,
    Aerial,
    Lag,
    Talking,
    Locked,
    Loading,
}

impl StateLabel for PlayerState {
    fn label(&self) -> &'static str {
        match self {
            Self::Idle    => "idle",
            Self::Moving  => "moving",
            Self::Aerial  => "aerial",
            Self::Lag     => "lag",
            Self::Talking => "talking",
            Self::Locked  => "locked",
            Self::Loading => "loading",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    Idle,
    Aerial,
    Jumping,
}

impl StateLabel for PlayerAction {
    fn label(&self) -> &'static str {
        match self {
            Self::Idle    => "idle",
            Self::Aerial  => "aerial",
            Self::Jumping => "jumping",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Forward,
    Back,
}

impl Direction {
    fn suffix(&self) -> &'static str {
        match self {
            Self::Left    => "l",
            Self::Right   => "r",
            Self::Forward => "d",
            Self::Back    => "u",
        }
    }

    /// Facing for a stick input, or None when the stick is centred.
    pub fn from_movement(movement: [f32; 2]) -> Option<Self> {
        let [x, y] = movement;
        if x == 0.0 && y == 0.0 {
            return None;
        }
        Some(if x.abs() > y.abs() - HORIZONTAL_MOVE_PADDING {
            if x < 0.0 { Self::Left } else { Self::Right }
        } else if y > 0.0 {
            Self::Back
        } else {
            Self::Forward
        })
    }
}

/// One frame of controller input. Consumed by the next update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerInput {
    pub movement:         [f32; 2],
    pub jump_pressed:     bool,
    pub interact_pressed: bool,
}

impl PlayerInput {
    fn is_moving(&self) -> bool {
        self.movement != [0.0, 0.0]
    }
}

pub struct PlayerController {
    tracker:   TimeTracker,
    config:    PlayerConfig,
    state:     StateMachine<PlayerState>,
    action:    StateMachine<PlayerAction>,
    direction: Direction,
    grounded:  bool,
    rising:    bool,
    input:     PlayerInput,
    held_item: Option<EntityId>,
    animation: String,
    events:    EventBuffer,
}

impl PlayerController {
    pub fn new(unique_id: impl Into<EntityId>, config: &PlayerConfig) -> Self {
        Self {
            tracker:   TimeTracker::new(unique_id),
            config:    config.clone(),
            state:     StateMachine::new(PlayerState::Idle),
            action:    StateMachine::new(PlayerAction::Idle),
            direction: Direction::Forward,
            grounded:  true,
            rising:    false,
            input:     PlayerInput::default(),
            held_item: None,
            animation: "idle_d".into(),
            events:    EventBuffer::default(),
        }
    }

    pub fn state(&self) -> PlayerState { self.state.current() }
    pub fn action(&self) -> PlayerAction { self.action.current() }
    pub fn direction(&self) -> Direction { self.direction }
    pub fn animation(&self) -> &str { &self.animation }
    pub fn held_item(&self) -> Option<&str> { self.held_item.as_deref() }
    pub fn is_grounded(&self) -> bool { self.grounded }

    /// Frames spent in the current state.
    pub fn ticks_in_state(&self) -> u32 { self.state.ticks_in_state() }

    /// Talking or locked: no movement, no new interactions.
    pub fn is_busy(&self) -> bool {
        matches!(self.state.current(), PlayerState::Talking | PlayerState::Locked)
    }

    /// Latch this frame's input for the next update.
    pub fn set_input(&mut self, input: PlayerInput) {
        self.input = input;
    }

    /// Feed the ground check. Landing and take-off fire on the edges.
    pub fn set_physics(&mut self, grounded: bool, rising: bool) {
        let was_grounded = self.grounded;
        self.grounded = grounded;
        self.rising = rising;

        if !was_grounded && grounded {
            self.on_landing();
        } else if was_grounded && !grounded {
            let t = self.state.transition(PlayerState::Aerial);
            self.after_state(t);
        }
    }

    /// A conversation started.
    pub fn on_talk(&mut self) {
        let t = self.state.transition(PlayerState::Talking);
        self.after_state(t);
    }

    /// A conversation ended. Movement returns after a short delay.
    pub fn end_talk(&mut self) {
        if let Some(t) = self.state.transition_after(PlayerState::Idle, self.config.talk_exit_delay) {
            self.after_state(t);
        }
    }

    /// Pick up an object. The player is locked for `pickup_delay` frames,
    /// then returns to whatever it was doing. Refused while already holding
    /// something, talking or locked.
    pub fn pick_up(&mut self, item: impl Into<EntityId>) -> bool {
        if self.held_item.is_some() || self.is_busy() {
            return false;
        }
        self.lock_briefly();
        self.held_item = Some(item.into());
        true
    }

    /// Put the held object down. Returns it, if there was one.
    pub fn put_down(&mut self) -> Option<EntityId> {
        let item = self.held_item.take()?;
        self.lock_briefly();
        Some(item)
    }

    pub fn set_loading(&mut self) {
        let t = self.state.transition(PlayerState::Loading);
        self.after_state(t);
    }

    pub fn set_done_loading(&mut self) {
        let t = self.state.transition(PlayerState::Idle);
        self.after_state(t);
    }

    fn lock_briefly(&mut self) {
        let resume = self.state.current();
        let t = self.state.transition(PlayerState::Locked);
        self.after_state(t);
        if let Some(t) = self.state.transition_after(resume, self.config.pickup_delay) {
            self.after_state(t);
        }
    }

    fn on_landing(&mut self) {
        let moving = self.input.is_moving();
        self.set_animation(if moving { "walk" } else { "idle" });

        if self.state.current() == PlayerState::Aerial {
            let t = self.state.transition(PlayerState::Idle);
            self.after_state(t);
        }
        if let Some(t) = self.action.transition_after(PlayerAction::Idle, 1) {
            self.after_action(t);
        }
    }

    fn handle_movement(&mut self, input: PlayerInput) {
        if self.state.current() == PlayerState::Lag {
            return;
        }

        if self.grounded && input.jump_pressed {
            let t = self.action.transition(PlayerAction::Jumping);
            self.after_action(t);
            let t = self.state.transition(PlayerState::Lag);
            self.after_state(t);
            return;
        }

        match Direction::from_movement(input.movement) {
            Some(direction) => {
                if direction != self.direction {
                    self.direction = direction;
                    self.set_animation(if self.grounded { "walk" } else { "air" });
                }
                if self.state.current() == PlayerState::Idle {
                    let t = self.state.transition(PlayerState::Moving);
                    self.after_state(t);
                }
            }
            None if self.state.current() == PlayerState::Moving => {
                let t = self.state.transition(PlayerState::Idle);
                self.after_state(t);
            }
            None => {}
        }
    }

    fn handle_actions(&mut self) {
        if self.action.current() == PlayerAction::Jumping
            && self.action.ticks_in_state() >= self.config.jump_squat_ticks
        {
            let t = self.action.transition(PlayerAction::Aerial);
            self.after_action(t);
            // Leave jump lag on the next frame.
            if let Some(t) = self.state.transition_after(PlayerState::Idle, 1) {
                self.after_state(t);
            }
        }
    }

    fn after_state(&mut self, t: Transitioned<PlayerState>) {
        match t.to {
            PlayerState::Idle if t.from == PlayerState::Moving && self.grounded => {
                self.set_animation("idle");
            }
            PlayerState::Moving => {
                let key = self.airborne_key("walk");
                self.set_animation(key);
            }
            _ => {}
        }
        let id = self.tracker.unique_id.clone();
        self.events.record_transition(&id, "state", t);
    }

    fn after_action(&mut self, t: Transitioned<PlayerAction>) {
        match t.to {
            PlayerAction::Jumping => self.set_animation("jump"),
            PlayerAction::Aerial => {
                let key = if self.rising { "air" } else { "fall" };
                self.set_animation(key);
            }
            PlayerAction::Idle => {}
        }
        let id = self.tracker.unique_id.clone();
        self.events.record_transition(&id, "action", t);
    }

    fn airborne_key(&self, grounded_key: &'static str) -> &'static str {
        match (self.grounded, self.rising) {
            (true, _) => grounded_key,
            (false, true) => "air",
            (false, false) => "fall",
        }
    }

    fn set_animation(&mut self, base: &str) {
        self.animation = format!("{base}_{}", self.direction.suffix());
    }
}

impl TimeAffected for PlayerController {
    fn tracker(&self) -> &TimeTracker { &self.tracker }
    fn tracker_mut(&mut self) -> &mut TimeTracker { &mut self.tracker }

    fn update(&mut self, ctx: &mut EntityContext<'_>) -> GameResult<()> {
        let input = std::mem::take(&mut self.input);

        if let Some(t) = self.state.tick() {
            self.after_state(t);
        }

        let putting_down = !self.is_busy() && input.interact_pressed && self.held_item.is_some();
        if putting_down {
            self.put_down();
        } else if !self.is_busy() {
            if let Some(t) = self.action.tick() {
                self.after_action(t);
            }
            self.handle_movement(input);
            self.handle_actions();
        }

        self.events.flush(ctx);
        Ok(())
    }

    /// The player's position comes from the scene spawn point, never the
    /// save; only the timestamp is restored.
    fn load_from_save(&mut self, save: &SaveData) -> GameResult<bool> {
        Ok(self.tracker.load_record(save, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stick_direction_prefers_horizontal_near_diagonals() {
        assert_eq!(Direction::from_movement([0.0, 0.0]), None);
        assert_eq!(Direction::from_movement([-1.0, 0.0]), Some(Direction::Left));
        assert_eq!(Direction::from_movement([0.6, 1.0]), Some(Direction::Right));
        assert_eq!(Direction::from_movement([0.2, 1.0]), Some(Direction::Back));
        assert_eq!(Direction::from_movement([0.0, -1.0]), Some(Direction::Forward));
    }
}
