//! Headless play against the live services.
//!
//! Reads one line per turn from stdin:
//! - a number picks one of the offered choices
//! - any other text is sent as a free-form action
//! - `#reset`, `#status`, `#layout` and `#quit` are commands
//!
//! Run with: `cargo run -p habitat-core --example headless_turns`

use habitat_core::{GameHandle, GameState, ScenePipeline, Session, SessionConfig};
use std::io::{self, BufRead};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(true)
        .init();

    let config = SessionConfig::from_env()?;
    let game = GameHandle::new(ScenePipeline::from_env(&config)?);

    println!("=== Mars Habitat ({}) ===", config.profile);
    println!("Commands: #reset  #status  #layout  #quit");
    println!();

    if let Some(turn) = game.start() {
        turn.await?;
    }
    print_turn(&game.snapshot());

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "#quit" | "#exit" => break,
            "#status" => {
                print_status(&game.snapshot());
                continue;
            }
            "#layout" => {
                for placement in game.layout().placements() {
                    let p = placement.position;
                    println!("  {:<12} {:<8} ({:6.2}, {:6.2}, {:6.2})", placement.id, placement.kind.name(), p.x, p.y, p.z);
                }
                continue;
            }
            "#reset" => {
                game.reset();
                if let Some(turn) = game.start() {
                    turn.await?;
                }
                print_turn(&game.snapshot());
                continue;
            }
            _ => {}
        }

        let session = game.snapshot();
        if session.state().is_terminal() {
            println!("[{:?}] Use #reset to play again.", session.state());
            continue;
        }

        let action = match (line.parse::<usize>(), session.current_scene()) {
            (Ok(n), Some(scene)) if (1..=scene.choices().len()).contains(&n) => scene.choices()[n - 1].clone(),
            _ => line.to_string(),
        };

        match game.choose(&action) {
            Some(turn) => {
                println!("> {action}");
                turn.await?;
                print_turn(&game.snapshot());
            }
            None => println!("[BUSY] A turn is still being generated."),
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn print_turn(session: &Session) {
    match session.state() {
        GameState::Error => {
            println!("[ERROR] {}", session.last_error().unwrap_or("unknown failure"));
            println!("Use #reset to start over.");
            return;
        }
        GameState::Start | GameState::Loading => return,
        GameState::Playing | GameState::GameOver => {}
    }

    let Some(scene) = session.current_scene() else {
        return;
    };
    println!();
    println!("{}", scene.story());
    println!();
    if let Some(item) = session.inventory().last_added() {
        println!("[ITEM] You found: {item}");
    }
    if scene.is_game_over() {
        println!("[GAME OVER]");
        return;
    }
    for (i, choice) in scene.choices().iter().enumerate() {
        println!("  {}. {choice}", i + 1);
    }
}

fn print_status(session: &Session) {
    println!("[STATUS] {:?}, {} turns logged", session.state(), session.story_log().len());
    println!("Inventory: {}", session.inventory().items().join(", "));
    let modules: Vec<String> = session
        .habitat()
        .modules()
        .iter()
        .map(|m| format!("{} ({})", m.id, m.kind))
        .collect();
    println!("Habitat: {}", modules.join(", "));
}
