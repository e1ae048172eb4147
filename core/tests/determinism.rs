//! Two sessions with the same seed and the same inputs must write the same
//! event log, payload for payload.

use boogaloo_core::{
    command::SessionCommand,
    scene::Scene,
    session::GameSession,
    shop::Shop,
    store::GameStore,
};

fn play(seed: u64) -> GameStore {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut session = GameSession::build_test(seed).unwrap();
    session.add_money(1_000);
    let mut scene = Scene::new("market");
    let config = session.config().shop.clone();
    let shop = session.spawn(&mut scene, Shop::new("General Store", [0.0; 3], &config)).unwrap();

    session.run_ticks(5 * 24 * 60).unwrap();
    shop.borrow_mut().open();
    session.run_ticks(5).unwrap();
    let _ = session.purchase(&shop);
    session.apply(SessionCommand::Sleep { hour: 6, minute: 0 }).unwrap();
    session.run_ticks(90).unwrap();
    session.save_game().unwrap();

    drop(scene);
    session.into_store()
}

fn payloads(store: &GameStore) -> Vec<(u64, String, String)> {
    store
        .all_events("test")
        .unwrap()
        .into_iter()
        .map(|e| (e.tick, e.source, e.payload))
        .collect()
}

#[test]
fn same_seed_same_event_log() {
    let a = payloads(&play(7));
    let b = payloads(&play(7));
    assert!(!a.is_empty());
    assert_eq!(a, b);
}

#[test]
fn restocks_follow_the_seed() {
    let restocks = |store: &GameStore| -> Vec<String> {
        store
            .events_of_type("test", "shop_restocked")
            .unwrap()
            .into_iter()
            .map(|e| e.payload)
            .collect()
    };
    let a = restocks(&play(11));
    let b = restocks(&play(11));
    assert_eq!(a.len(), 7, "first load plus six new days");
    assert_eq!(a, b);
}
