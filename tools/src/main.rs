//! day-runner: headless gameplay runner for Boogaloo.
//!
//! Usage:
//!   day-runner --seed 12345 --ticks 5000 --db save.db --slot main
//!   day-runner --config game.json --speed 10 --ipc-mode

use anyhow::Result;
use boogaloo_core::{
    command::SessionCommand,
    config::GameConfig,
    npc::{Npc, NpcState},
    player::{PlayerController, PlayerState},
    scene::Scene,
    session::GameSession,
    shop::{PurchaseOutcome, Shop, StockSlot},
    sleeping_cot::SleepingCot,
    store::GameStore,
    types::Tick,
};
use std::cell::RefCell;
use std::env;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

/// Money handed to a brand-new save so the shop is usable.
const STARTING_MONEY: i64 = 500;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Tick {
        count: u64,
    },
    Command {
        cmd: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
    Quit,
}

#[derive(serde::Serialize)]
struct UiState {
    slot:         String,
    time:         String,
    time_of_day:  String,
    tick:         Tick,
    frozen:       bool,
    speed:        u32,
    money:        i64,
    player_state: PlayerState,
    npc_state:    NpcState,
    shop_open:    bool,
    shop_stock:   Vec<StockSlot>,
    events:       i64,
}

/// The demo village: one of each entity kind.
struct Village {
    scene:  Scene,
    player: Rc<RefCell<PlayerController>>,
    npc:    Rc<RefCell<Npc>>,
    shop:   Rc<RefCell<Shop>>,
}

impl Village {
    fn spawn(session: &mut GameSession) -> Result<Self> {
        let config = session.config().clone();
        let mut scene = Scene::new("village");

        let player = session.spawn(&mut scene, PlayerController::new("Player", &config.player))?;
        let mut mabel = Npc::new("Mabel", [4.0, 0.0, 2.0], &config.npc);
        mabel.add_conversation(
            "greeting",
            vec!["Morning! The stall restocks at dawn.".into()],
        );
        let npc = session.spawn(&mut scene, mabel)?;
        let shop = session.spawn(&mut scene, Shop::new("General Store", [8.0, 0.0, 0.0], &config.shop))?;
        session.spawn(&mut scene, SleepingCot::new("Cot", [-3.0, 0.0, 1.0], &config.sleep))?;

        Ok(Self { scene, player, npc, shop })
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = string_arg(&args, "--db").unwrap_or(":memory:");
    let slot = string_arg(&args, "--slot")
        .map(str::to_string)
        .unwrap_or_else(|| format!("slot-{}", uuid::Uuid::new_v4()));

    let mut config = match string_arg(&args, "--config") {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    config.seed = parse_arg(&args, "--seed", config.seed);
    let ticks = parse_arg(&args, "--ticks", 3_600u64);
    let speed = parse_arg(&args, "--speed", config.clock.ticks_per_update);

    if !ipc_mode {
        println!("Boogaloo: day-runner");
        println!("  seed:   {}", config.seed);
        println!("  ticks:  {ticks}");
        println!("  speed:  {speed}");
        println!("  db:     {db}");
        println!("  slot:   {slot}");
        println!();
    }

    let store = GameStore::open(db)?;
    store.migrate()?;

    let mut session = GameSession::new(slot, config, store)?;
    if !session.load_game()? {
        session.add_money(STARTING_MONEY);
    }
    session.set_speed(speed);

    let village = Village::spawn(&mut session)?;

    if ipc_mode {
        run_ipc_loop(&mut session, &village)?;
    } else {
        session.run_ticks(ticks)?;
        print_summary(&session, &village)?;
    }

    session.leave_scene(village.scene)?;
    session.save_game()?;
    Ok(())
}

fn run_ipc_loop(session: &mut GameSession, village: &Village) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{err_json}")?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Tick { count } => {
                session.run_ticks(count)?;
            }
            IpcCommand::GetState => {}
            IpcCommand::Command { cmd, payload } => {
                if let Err(e) = handle_command(session, village, &cmd, payload) {
                    log::warn!("command '{cmd}' failed: {e}");
                    let err_json = serde_json::json!({ "error": e.to_string() });
                    writeln!(stdout, "{err_json}")?;
                    stdout.flush()?;
                    continue;
                }
            }
        }
        let state = build_ui_state(session, village)?;
        writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(
    session: &mut GameSession,
    village: &Village,
    cmd: &str,
    payload: serde_json::Value,
) -> Result<()> {
    match cmd {
        "talk" => {
            let started = session.begin_conversation(&village.player, &village.npc)?;
            if started {
                if let Some(lines) = village.npc.borrow().conversation("greeting") {
                    for line in lines {
                        log::info!("Mabel: {line}");
                    }
                }
            }
        }
        "end_talk" => session.end_conversation(&village.player, &village.npc)?,
        "open_shop" => {
            if !session.open_shop(&village.player, &village.shop) {
                log::info!("shop did not open");
            }
        }
        "close_shop" => {
            if !session.close_shop(&village.player, &village.shop) {
                log::info!("shop did not close");
            }
        }
        "browse_left" => {
            village.shop.borrow_mut().browse_left();
        }
        "browse_right" => {
            village.shop.borrow_mut().browse_right();
        }
        "buy" => match session.purchase(&village.shop) {
            PurchaseOutcome::Bought { item_id, price } => {
                log::info!("bought item {item_id} for {price}");
            }
            other => log::info!("purchase refused: {other:?}"),
        },
        _ => {
            // Anything else must be a session command, e.g.
            // {"cmd": "sleep", "payload": {"hour": 6, "minute": 0}}
            let mut body = match payload {
                serde_json::Value::Object(map) => map,
                _ => serde_json::Map::new(),
            };
            body.insert("cmd".into(), serde_json::Value::String(cmd.to_string()));
            let command: SessionCommand = serde_json::from_value(serde_json::Value::Object(body))?;
            session.apply(command)?;
        }
    }
    Ok(())
}

fn build_ui_state(session: &GameSession, village: &Village) -> Result<UiState> {
    let clock = session.clock();
    let shop = village.shop.borrow();
    Ok(UiState {
        slot:         session.slot().to_string(),
        time:         clock.time().to_string(),
        time_of_day:  format!("{:?}", clock.time_of_day()),
        tick:         clock.current_tick(),
        frozen:       clock.is_frozen(),
        speed:        clock.speed(),
        money:        session.money(),
        player_state: village.player.borrow().state(),
        npc_state:    village.npc.borrow().state(),
        shop_open:    shop.is_open(),
        shop_stock:   shop.stock().to_vec(),
        events:       session.store().event_count(session.slot())?,
    })
}

fn print_summary(session: &GameSession, village: &Village) -> Result<()> {
    let store = session.store();
    let slot = session.slot();
    let clock = session.clock();

    println!("=== DAY SUMMARY ===");
    println!("  slot:           {slot}");
    println!("  final tick:     {}", clock.current_tick());
    println!("  clock:          {} ({:?})", clock.time(), clock.time_of_day());
    println!("  money:          {}", session.money());
    println!("  live entities:  {}", session.registry().len());
    println!("  hours passed:   {}", store.events_of_type(slot, "hour_changed")?.len());
    println!("  days started:   {}", store.events_of_type(slot, "new_day_started")?.len());
    println!("  autosaves:      {}", store.events_of_type(slot, "game_saved")?.len());
    println!("  events logged:  {}", store.event_count(slot)?);

    println!();
    println!("=== GENERAL STORE ===");
    let shop = village.shop.borrow();
    for entry in shop.stock() {
        match entry {
            StockSlot::Available(id) => match shop.item(*id) {
                Some(item) => println!("  {:<14} {:>5}", item.name, item.buy_price),
                None => println!("  item #{id}"),
            },
            StockSlot::SoldOut => println!("  (sold out)"),
        }
    }
    Ok(())
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
