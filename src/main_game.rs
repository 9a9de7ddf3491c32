use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use railmapper::{ConnectOutcome, GameState, MapConfig, World};

#[derive(Parser, Clone)]
#[command(name = "railmapper-play")]
#[command(about = "Build a rail network one link at a time")]
struct Args {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for reproducible generation
    #[arg(long)]
    seed: Option<u32>,

    /// Number of settlements to place
    #[arg(long)]
    cities: Option<usize>,
}

fn parse_pair(input: &str) -> Option<(usize, usize)> {
    let mut parts = input.split(|c: char| c.is_whitespace() || c == ',').filter(|s| !s.is_empty());
    let from = parts.next()?.parse().ok()?;
    let to = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((from, to))
}

fn describe(outcome: &ConnectOutcome) -> String {
    let cost = outcome.cost.map(|c| format!("{:.0}", c)).unwrap_or_else(|| "-".to_string());
    match (outcome.success, outcome.reason) {
        (true, _) => format!(
            "\x1b[92mConnected\x1b[0m for {}. Budget now {:.0}",
            cost, outcome.new_budget
        ),
        (false, Some(reason)) => format!(
            "\x1b[91mRejected: {}\x1b[0m (cost {}). Budget {:.0}",
            reason, cost, outcome.new_budget
        ),
        (false, None) => format!("\x1b[91mRejected\x1b[0m. Budget {:.0}", outcome.new_budget),
    }
}

fn print_network(world: &World, game: &GameState) {
    println!("\n\x1b[1mYour Network:\x1b[0m");
    println!(
        "  Budget: {:.0} of {:.0}",
        game.budget(),
        game.economy().initial_budget
    );
    println!("  Cities connected: {}", game.connected_count());
    for &(from, to) in game.connections() {
        println!("  • #{} {} → #{} {}", from, world.names()[from], to, world.names()[to]);
    }
}

fn print_target(world: &World) {
    let route = world.best_route();
    println!("\n\x1b[1mTarget Route:\x1b[0m");
    let Some(start) = route.start else {
        println!("  No cities on this map");
        return;
    };
    println!(
        "  Start at #{} {}; {} cities for {:.0}",
        start,
        world.names()[start],
        route.node_count(),
        route.spent
    );
    for &(from, to) in &route.edges {
        println!("  • #{} → #{}", from, to);
    }
}

fn prompt(stdin: &mut impl BufRead, text: &str) -> Result<Option<String>> {
    print!("{}", text);
    io::stdout().flush()?;
    let mut input = String::new();
    if stdin.read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => MapConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => MapConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(count) = args.cities {
        config.city_count = count;
    }

    println!("=== Rail Mapper ===");
    println!("Generating map (seed {})...", config.seed);
    let world = World::generate(&config)?;
    let mut game = world.new_game();
    println!("{} cities placed. Budget: {:.0}", world.cities().len(), game.budget());

    let stdin = io::stdin();
    let mut stdin = stdin.lock();

    loop {
        println!("\n\x1b[1mMenu:\x1b[0m");
        println!("1. Connect two cities");
        println!("2. Show network and budget");
        println!("3. Show target route");
        println!("4. Exit");

        let Some(choice) = prompt(&mut stdin, "\nSelect option (1-4): ")? else {
            break;
        };

        match choice.as_str() {
            "1" => {
                let Some(line) = prompt(&mut stdin, "Enter city indices (from to): ")? else {
                    break;
                };
                match parse_pair(&line) {
                    Some((from, to)) => {
                        let result = game.try_connect(from, to);
                        println!("{}", describe(&ConnectOutcome::new(&result, game.budget())));
                    }
                    None => println!("\x1b[91mExpected two city indices, e.g. 3 17\x1b[0m"),
                }
            }
            "2" => print_network(&world, &game),
            "3" => print_target(&world),
            "4" => {
                println!("\nExiting...");
                break;
            }
            _ => println!("\x1b[91mInvalid option. Please select 1-4.\x1b[0m"),
        }
    }
    Ok(())
}
