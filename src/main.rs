use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ghost_protocol::core::config::{GameConfig, DEFAULT_CONFIG_PATH};
use ghost_protocol::data::ForumSection;
use ghost_protocol::simulation::missions::{MissionOutcome, MissionStatus, StageResult};
use ghost_protocol::simulation::progression::Milestone;
use ghost_protocol::world::{SaveDb, SaveRepository};
use ghost_protocol::{CatalogKind, Game, GameError, TickReport};

/// Terminal hacking RPG.
#[derive(Parser, Debug)]
#[command(name = "ghost-protocol")]
#[command(about = "Climb the underground ladder one job at a time")]
struct Args {
    /// Config file; defaults apply when it does not exist
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the config's random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the content data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the save database path
    #[arg(long)]
    save_db: Option<PathBuf>,

    /// Load this save slot on start
    #[arg(long)]
    load: Option<String>,
}

const HELP: &str = "Commands: status | missions [all] | mission <id> | attempt <id> | choose <mission> <stage> <key> | abort <id> | factions | join <id> | market | buy <id> | contacts | talk <id> | forum [public|private] | read <id> | events | list <kind> | wait [n] | save <slot> | load <slot> | slots | delete <slot> | quit";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ghost_protocol=warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut config = GameConfig::load_or_default(&args.config)?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(path) = args.save_db {
        config.save_db = path;
    }

    let mut saves = SaveDb::open(&config.save_db)?;
    let mut game = Game::from_config(config)?;
    tracing::info!(seed = game.seed(), "game started");

    if let Some(slot) = args.load {
        game.load_state(saves.load_slot(&slot)?)?;
        println!("Loaded slot {}.", slot);
    }

    println!("GHOST PROTOCOL :: {}", game.time());
    print_milestones(&game.drain_notices());
    println!("{}", HELP);

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();
        let arg = parts.get(1).copied();

        let result = match cmd.as_str() {
            "quit" | "exit" => break,
            "help" => {
                println!("{}", HELP);
                Ok(())
            }
            "status" => {
                print_status(&game);
                Ok(())
            }
            "missions" => {
                print_listing(&game, CatalogKind::Mission, arg == Some("all"));
                Ok(())
            }
            "mission" => with_arg(arg, "mission <id>", |id| print_mission(&game, id)),
            "attempt" => with_arg(arg, "attempt <id>", |id| {
                game.attempt_mission(id).map(|outcome| print_outcome(&outcome))
            }),
            "choose" => match (arg, parts.get(2).and_then(|s| s.parse::<usize>().ok()), parts.get(3)) {
                (Some(mission), Some(stage), Some(key)) => game
                    .select_moral_choice(mission, stage, key)
                    .map(|result| {
                        print_stage(&result.stage);
                        print_outcome(&result.outcome);
                    }),
                _ => {
                    println!("Usage: choose <mission> <stage> <key>");
                    Ok(())
                }
            },
            "abort" => with_arg(arg, "abort <id>", |id| {
                game.abort_mission(id).map(|outcome| print_outcome(&outcome))
            }),
            "factions" => {
                for faction in &game.catalog().factions {
                    let marker = if game.player().faction.as_deref() == Some(faction.id.as_str()) {
                        "*"
                    } else {
                        " "
                    };
                    println!("{} {:<12} {} ({})", marker, faction.id, faction.name, faction.philosophy);
                    for bonus in &faction.bonuses {
                        println!("      {}", bonus.describe());
                    }
                }
                Ok(())
            }
            "join" => with_arg(arg, "join <faction>", |id| {
                game.switch_faction(id).map(|switch| {
                    println!("You are now with {}.", switch.to);
                    if switch.defection_penalty > 0 {
                        if let Some(from) = &switch.from {
                            println!("{} will remember this (-{} standing).", from, switch.defection_penalty);
                        }
                    }
                })
            }),
            "market" => {
                for offer in game.market() {
                    let status = if offer.owned {
                        "owned".to_string()
                    } else if offer.is_unlocked() {
                        offer.price.to_string()
                    } else {
                        format!("locked: {}", join(&offer.unmet))
                    };
                    println!("  {:<18} {:<28} {:?} [{}]", offer.item_id, offer.name, offer.category, status);
                }
                Ok(())
            }
            "buy" => with_arg(arg, "buy <item>", |id| {
                game.purchase_item(id).map(|purchase| {
                    println!("Bought {} for {}.", purchase.item_id, purchase.price);
                    if let Some(turn) = purchase.expires_turn {
                        println!("It stops working at turn {}.", turn);
                    }
                })
            }),
            "contacts" => {
                print_listing(&game, CatalogKind::Contact, false);
                Ok(())
            }
            "talk" => with_arg(arg, "talk <contact>", |id| {
                game.talk_to(id).map(|conversation| {
                    println!("<{}> {}", conversation.handle, conversation.line);
                    for flag in conversation.flags_set {
                        println!("  [new lead: {}]", flag);
                    }
                })
            }),
            "forum" => {
                let section = match arg {
                    Some("public") => Some(ForumSection::Public),
                    Some("private") => Some(ForumSection::Private),
                    _ => None,
                };
                for post in game.forum(section) {
                    println!("  {:<16} [{:?}] {} by {}", post.id, post.section, post.title, post.author);
                }
                Ok(())
            }
            "read" => with_arg(arg, "read <post>", |id| {
                game.read_post(id).map(|post| {
                    println!("{} by {}\n\n{}", post.title, post.author, post.content);
                })
            }),
            "events" => {
                let player = game.player();
                if player.active_events.is_empty() {
                    println!("The net is quiet.");
                }
                for (id, remaining) in &player.active_events {
                    if let Ok(event) = game.catalog().event(id) {
                        println!("  {} ({} turns left): {}", event.name, remaining, event.description);
                    }
                }
                Ok(())
            }
            "list" => match arg.and_then(CatalogKind::parse) {
                Some(kind) => {
                    print_listing(&game, kind, true);
                    Ok(())
                }
                None => {
                    println!("Usage: list <missions|items|events|achievements|endings|contacts|forum|story|factions>");
                    Ok(())
                }
            },
            "wait" | "advance" => {
                let turns = arg.and_then(|n| n.parse::<u32>().ok()).unwrap_or(1);
                for _ in 0..turns {
                    let report = game.advance_turn();
                    print_report(&report);
                    if game.is_over() {
                        break;
                    }
                }
                println!("{}", game.time());
                Ok(())
            }
            "save" => {
                let slot = arg.unwrap_or("quicksave");
                match saves.save_slot(slot, &game.save_state()) {
                    Ok(()) => println!("Saved to slot {}.", slot),
                    Err(err) => println!("Save failed: {}", err),
                }
                Ok(())
            }
            "load" => {
                let slot = arg.unwrap_or("quicksave");
                match saves.load_slot(slot) {
                    Ok(state) => game
                        .load_state(state)
                        .map(|()| println!("Loaded slot {}. {}", slot, game.time())),
                    Err(err) => {
                        println!("Load failed: {}", err);
                        Ok(())
                    }
                }
            }
            "slots" => {
                match saves.list_slots() {
                    Ok(slots) if slots.is_empty() => println!("No saves yet."),
                    Ok(slots) => {
                        for slot in slots {
                            println!(
                                "  {:<12} {} turn {} stage {} rep {}{}",
                                slot.slot,
                                slot.handle,
                                slot.turn,
                                slot.story_stage,
                                slot.reputation,
                                slot.ending.map(|e| format!(" [{}]", e)).unwrap_or_default()
                            );
                        }
                    }
                    Err(err) => println!("Could not list saves: {}", err),
                }
                Ok(())
            }
            "delete" => {
                if let Some(slot) = arg {
                    match saves.delete_slot(slot) {
                        Ok(true) => println!("Deleted slot {}.", slot),
                        Ok(false) => println!("No slot named {}.", slot),
                        Err(err) => println!("Delete failed: {}", err),
                    }
                } else {
                    println!("Usage: delete <slot>");
                }
                Ok(())
            }
            _ => {
                println!("Unknown command. Type `help`.");
                Ok(())
            }
        };

        if let Err(err) = result {
            report_error(&err);
        }
        print_milestones(&game.drain_notices());
    }

    Ok(())
}

fn with_arg(
    arg: Option<&str>,
    usage: &str,
    action: impl FnOnce(&str) -> Result<(), GameError>,
) -> Result<(), GameError> {
    match arg {
        Some(value) => action(value),
        None => {
            println!("Usage: {}", usage);
            Ok(())
        }
    }
}

fn report_error(err: &GameError) {
    if err.is_recoverable() {
        println!("! {}", err);
    } else {
        tracing::error!(error = %err, "command referenced missing content");
        println!("!! {}", err);
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn print_status(game: &Game) {
    let player = game.player();
    println!("{} :: {}", player.handle, game.time());
    println!(
        "  reputation {} | {} | {} | heat {}/100 | warnings {}",
        player.reputation,
        ghost_protocol::rules::money::format_usd(player.usd),
        player.btc,
        player.heat(),
        player.warnings
    );
    println!(
        "  faction {} | story stage {} | missions done {}",
        player.faction.as_deref().unwrap_or("none"),
        player.story_stage(),
        player.completed_missions.len()
    );
    let skills: Vec<String> = player
        .skills
        .iter()
        .map(|(skill, level)| format!("{} {}", skill, level))
        .collect();
    println!("  skills: {}", skills.join(", "));
    if !player.items.is_empty() {
        let items: Vec<&str> = player.items.keys().map(String::as_str).collect();
        println!("  kit: {}", items.join(", "));
    }
    for (id, attempt) in &game.missions().active {
        println!(
            "  underway: {} (stage {}, {} turns in)",
            id,
            attempt.next_stage + 1,
            attempt.elapsed()
        );
    }
    if let Some(ending) = &player.ending {
        println!("  RUN OVER: {}", ending);
    }
}

fn print_listing(game: &Game, kind: CatalogKind, include_locked: bool) {
    for listing in game.listing(kind) {
        if listing.is_unlocked() {
            println!("  {:<20} {}", listing.entry.id, listing.entry.name);
        } else if include_locked {
            println!(
                "  {:<20} {} (locked: {})",
                listing.entry.id,
                listing.entry.name,
                join(&listing.unmet)
            );
        }
    }
}

fn print_mission(game: &Game, id: &str) -> Result<(), GameError> {
    let mission = game.catalog().mission(id)?;
    let risk = game.mission_risk(id)?;
    println!("{}: {}", mission.name, mission.description);
    println!("  risk {}", risk);
    if !mission.rewards.is_empty() {
        println!("  rewards: {}", join(&mission.rewards));
    }
    for (index, stage) in mission.stages.iter().enumerate() {
        println!(
            "  stage {} {} (risk {}, {} turns){}",
            index,
            stage.name,
            stage.risk,
            stage.duration,
            if stage.moral_choice.is_some() { " [decision]" } else { "" }
        );
    }
    if let Some(limit) = mission.time_limit {
        println!("  time limit: {} turns", limit);
    }
    Ok(())
}

fn print_stage(stage: &StageResult) {
    let verdict = if stage.success { "clean" } else { "failed" };
    let roll = stage
        .roll
        .as_ref()
        .and_then(|roll| roll.roll.map(|r| format!(" rolled {:.1} vs {:.1}", r, roll.risk)))
        .unwrap_or_default();
    println!("  [{}] {}: {}{}", stage.index, stage.name, verdict, roll);
    if !stage.unmet_skills.is_empty() {
        println!("      missing: {}", join(&stage.unmet_skills));
    }
    if let Some(choice) = &stage.choice {
        println!("      you chose {}: {}", choice, join(&stage.consequences));
    }
}

fn print_outcome(outcome: &MissionOutcome) {
    if let Some(roll) = &outcome.roll {
        match roll.roll {
            Some(value) => println!("  rolled {:.1} against risk {:.1}", value, roll.risk),
            None => println!("  outcome was never in doubt (risk {:.0})", roll.risk),
        }
    }
    for stage in &outcome.stages {
        print_stage(stage);
    }
    match &outcome.status {
        MissionStatus::Success => println!("{}: success.", outcome.mission_id),
        MissionStatus::Compromised => {
            println!("{}: done, but sloppy. No payout.", outcome.mission_id)
        }
        MissionStatus::Failure(reason) => println!("{}: failed ({:?}).", outcome.mission_id, reason),
        MissionStatus::Aborted => println!("{}: aborted.", outcome.mission_id),
        MissionStatus::AwaitingChoice(pending) => {
            println!("Decision at stage {}: {}", pending.stage, pending.question);
            for (key, text) in &pending.options {
                println!("  {} - {}", key, text);
            }
            println!("Use: choose {} {} <key>", outcome.mission_id, pending.stage);
        }
    }
    if !outcome.rewards.is_empty() {
        println!("  gained: {}", join(&outcome.rewards));
    }
    if let Some(bonus) = &outcome.time_bonus {
        println!("  time bonus: {}", bonus);
    }
    if outcome.heat_change != 0 {
        println!("  heat {:+}", outcome.heat_change);
    }
}

fn print_report(report: &TickReport) {
    for id in &report.started_events {
        println!("  [event] {} begins", id);
    }
    for id in &report.expired_events {
        println!("  [event] {} is over", id);
    }
    for id in &report.expired_items {
        println!("  [kit] {} stopped working", id);
    }
    for outcome in &report.timed_out {
        print_outcome(outcome);
    }
    print_milestones(&report.milestones);
}

fn print_milestones(milestones: &[Milestone]) {
    for milestone in milestones {
        match milestone {
            Milestone::Achievement { name, rewards, .. } => {
                println!("  ** Achievement: {} **", name);
                if !rewards.is_empty() {
                    println!("     {}", join(rewards));
                }
            }
            Milestone::StoryBeat { title, text, .. } => println!("\n== {} ==\n{}\n", title, text),
            Milestone::Ending { title, text, .. } => {
                println!("\n#### {} ####\n{}\n", title, text);
            }
        }
    }
}
