//! Player controller: movement, jump squat, landing, talking and pickup
//! locks, driven one frame at a time.

use boogaloo_core::{
    config::PlayerConfig,
    event::GameEvent,
    player::{Direction, PlayerAction, PlayerController, PlayerInput, PlayerState},
    rng::RngBank,
    save::{ObjectRecord, SaveData},
    time_affected::{EntityContext, TimeAffected},
    time_data::TimeData,
};

fn player() -> PlayerController {
    PlayerController::new("Player", &PlayerConfig::default())
}

/// Run one frame with `input`, returning the events it produced.
fn frame(player: &mut PlayerController, input: PlayerInput) -> Vec<GameEvent> {
    let bank = RngBank::new(0);
    let mut events = Vec::new();
    let mut ctx = EntityContext::new(TimeData::default(), 0, &bank, &mut events);
    player.set_input(input);
    player.update(&mut ctx).unwrap();
    events
}

fn idle_frames(player: &mut PlayerController, n: usize) {
    for _ in 0..n {
        frame(player, PlayerInput::default());
    }
}

fn stick(x: f32, y: f32) -> PlayerInput {
    PlayerInput { movement: [x, y], ..PlayerInput::default() }
}

fn jump() -> PlayerInput {
    PlayerInput { jump_pressed: true, ..PlayerInput::default() }
}

fn interact() -> PlayerInput {
    PlayerInput { interact_pressed: true, ..PlayerInput::default() }
}

#[test]
fn stick_input_starts_and_stops_movement() {
    let mut p = player();
    frame(&mut p, stick(1.0, 0.0));
    assert_eq!(p.state(), PlayerState::Moving);
    assert_eq!(p.direction(), Direction::Right);
    assert_eq!(p.animation(), "walk_r");

    frame(&mut p, PlayerInput::default());
    assert_eq!(p.state(), PlayerState::Idle);
    assert_eq!(p.animation(), "idle_r");
}

#[test]
fn input_is_consumed_by_one_frame() {
    let mut p = player();
    p.set_input(stick(0.0, 1.0));
    let bank = RngBank::new(0);
    let mut events = Vec::new();
    let mut ctx = EntityContext::new(TimeData::default(), 0, &bank, &mut events);
    p.update(&mut ctx).unwrap();
    assert_eq!(p.state(), PlayerState::Moving);
    p.update(&mut ctx).unwrap();
    assert_eq!(p.state(), PlayerState::Idle);
}

#[test]
fn jump_squat_then_lag_then_idle() {
    let mut p = player();
    frame(&mut p, jump());
    assert_eq!(p.action(), PlayerAction::Jumping);
    assert_eq!(p.state(), PlayerState::Lag);
    assert_eq!(p.animation(), "jump_d");

    // Movement is ignored during jump lag.
    frame(&mut p, stick(-1.0, 0.0));
    assert_eq!(p.direction(), Direction::Forward);

    frame(&mut p, PlayerInput::default());
    assert_eq!(p.action(), PlayerAction::Jumping);
    frame(&mut p, PlayerInput::default());
    assert_eq!(p.action(), PlayerAction::Aerial);
    assert_eq!(p.state(), PlayerState::Lag);

    frame(&mut p, PlayerInput::default());
    assert_eq!(p.state(), PlayerState::Idle);
}

#[test]
fn leaving_the_ground_and_landing() {
    let mut p = player();
    p.set_physics(false, true);
    assert_eq!(p.state(), PlayerState::Aerial);
    assert!(!p.is_grounded());

    // No jumping in mid-air.
    frame(&mut p, jump());
    assert_eq!(p.action(), PlayerAction::Idle);

    p.set_physics(true, false);
    assert_eq!(p.state(), PlayerState::Idle);
    assert_eq!(p.animation(), "idle_d");
}

#[test]
fn landing_returns_action_to_idle_after_one_frame() {
    let mut p = player();
    frame(&mut p, jump());
    idle_frames(&mut p, 3);
    assert_eq!(p.action(), PlayerAction::Aerial);

    p.set_physics(false, false);
    p.set_physics(true, false);
    assert_eq!(p.action(), PlayerAction::Aerial);
    frame(&mut p, PlayerInput::default());
    assert_eq!(p.action(), PlayerAction::Idle);
}

#[test]
fn talking_blocks_movement_until_released() {
    let mut p = player();
    p.on_talk();
    assert!(p.is_busy());
    frame(&mut p, stick(1.0, 0.0));
    assert_eq!(p.state(), PlayerState::Talking);

    p.end_talk();
    idle_frames(&mut p, 3);
    assert_eq!(p.state(), PlayerState::Talking);
    idle_frames(&mut p, 1);
    assert_eq!(p.state(), PlayerState::Idle);
}

#[test]
fn pick_up_locks_briefly_then_resumes() {
    let mut p = player();
    assert!(p.pick_up("bucket"));
    assert_eq!(p.state(), PlayerState::Locked);
    assert_eq!(p.held_item(), Some("bucket"));

    idle_frames(&mut p, 5);
    assert_eq!(p.state(), PlayerState::Locked);
    idle_frames(&mut p, 1);
    assert_eq!(p.state(), PlayerState::Idle);

    frame(&mut p, interact());
    assert_eq!(p.held_item(), None);
    assert_eq!(p.state(), PlayerState::Locked);
}

#[test]
fn second_pick_up_keeps_the_first_item() {
    let mut p = player();
    assert!(p.pick_up("bucket"));
    idle_frames(&mut p, 6);
    assert_eq!(p.state(), PlayerState::Idle);

    assert!(!p.pick_up("lantern"));
    assert_eq!(p.held_item(), Some("bucket"));
    assert_eq!(p.state(), PlayerState::Idle);
}

#[test]
fn cannot_pick_up_while_talking() {
    let mut p = player();
    p.on_talk();
    assert!(!p.pick_up("bucket"));
    assert_eq!(p.held_item(), None);
    assert_eq!(p.state(), PlayerState::Talking);
}

#[test]
fn cannot_pick_up_while_locked() {
    let mut p = player();
    assert!(p.pick_up("bucket"));
    idle_frames(&mut p, 6);
    frame(&mut p, interact());
    assert_eq!(p.held_item(), None);
    assert_eq!(p.state(), PlayerState::Locked);

    assert!(!p.pick_up("lantern"));
    assert_eq!(p.held_item(), None);
}

#[test]
fn loading_state_round_trip() {
    let mut p = player();
    p.set_loading();
    assert_eq!(p.state(), PlayerState::Loading);
    p.set_done_loading();
    assert_eq!(p.state(), PlayerState::Idle);
}

#[test]
fn transitions_are_reported_as_events() {
    let mut p = player();
    let events = frame(&mut p, stick(0.0, -1.0));
    assert_eq!(
        events,
        vec![GameEvent::StateTransitioned {
            entity:  "Player".into(),
            machine: "state".into(),
            from:    "idle".into(),
            to:      "moving".into(),
        }]
    );
}

#[test]
fn save_restores_timestamp_but_not_position() {
    let mut p = player();
    let mut save = SaveData::default();
    save.write_entity(
        "Player",
        ObjectRecord {
            last_update_time: TimeData::new(2, 9, 0).unwrap(),
            position:         [5.0, 5.0, 5.0],
            scene:            "village".into(),
        },
    );
    assert!(p.load_from_save(&save).unwrap());
    assert_eq!(p.tracker().last_update_time(), Some(TimeData::new(2, 9, 0).unwrap()));
    assert_eq!(p.tracker().position, [0.0; 3]);
}
