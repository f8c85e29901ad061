use std::path::Path;

use bevy_ecs::prelude::*;
use bevy_ecs::system::SystemState;

use crate::core::config::GameConfig;
use crate::core::ecs::{create_schedule, create_world};
use crate::core::error::GameError;
use crate::core::rng::{GameRng, RandomSource};
use crate::core::serialization::{
    apply_state_to_world, check_state_against_catalog, extract_state_from_world,
    load_state_from_path, save_state_to_path, SaveError, SaveState,
};
use crate::data::{CatalogEntry, CatalogKind, ContentCatalog, DataError, ForumPost, ForumSection};
use crate::rules::risk::{effective_risk, RiskBreakdown};
use crate::simulation::dialogue::{self, Conversation};
use crate::simulation::events::activate_event;
use crate::simulation::faction::{self, FactionSwitch};
use crate::simulation::market::{self, Offer, Purchase};
use crate::simulation::missions::{self, ChoiceResult, MissionBoard, MissionContext, MissionOutcome};
use crate::simulation::player::PlayerState;
use crate::simulation::progression::{evaluate_progression, Milestone, ProgressionLog};
use crate::simulation::queries::{self, Listing};
use crate::simulation::story::StoryState;
use crate::simulation::time::GameTime;
use crate::systems::TickReport;

/// Wrapper around the ECS world and schedule. Every player action goes through here.
pub struct Game {
    world: World,
    schedule: Schedule,
    seed: u64,
}

impl Game {
    /// Create a new game seeded from the config.
    pub fn new(config: GameConfig, catalog: ContentCatalog) -> Self {
        let seed = config.seed;
        Self::build(config, catalog, GameRng::seeded(seed))
    }

    /// Create a game drawing from a caller-supplied random source.
    pub fn with_rng(
        config: GameConfig,
        catalog: ContentCatalog,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        Self::build(config, catalog, GameRng(rng))
    }

    /// Load content from `config.data_dir`, falling back to the bundled catalog when the
    /// directory does not exist.
    pub fn from_config(config: GameConfig) -> Result<Self, DataError> {
        let catalog = if config.data_dir.is_dir() {
            ContentCatalog::load_from_dir(&config.data_dir)?
        } else {
            tracing::warn!(
                dir = %config.data_dir.display(),
                "data directory missing, using bundled content"
            );
            ContentCatalog::builtin()?
        };
        Ok(Self::new(config, catalog))
    }

    fn build(config: GameConfig, catalog: ContentCatalog, rng: GameRng) -> Self {
        let seed = config.seed;
        let mut game = Self {
            world: create_world(config, catalog, rng),
            schedule: create_schedule(),
            seed,
        };
        game.settle();
        game
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn player(&self) -> &PlayerState {
        self.world.resource::<PlayerState>()
    }

    pub fn catalog(&self) -> &ContentCatalog {
        self.world.resource::<ContentCatalog>()
    }

    pub fn config(&self) -> &GameConfig {
        self.world.resource::<GameConfig>()
    }

    pub fn time(&self) -> &GameTime {
        self.world.resource::<GameTime>()
    }

    pub fn missions(&self) -> &MissionBoard {
        self.world.resource::<MissionBoard>()
    }

    pub fn is_over(&self) -> bool {
        self.player().ending.is_some()
    }

    fn ensure_running(&self) -> Result<(), GameError> {
        match &self.player().ending {
            Some(ending) => Err(GameError::GameOver {
                ending: ending.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Runs achievements, story beats and endings after an action and queues what fired.
    fn settle(&mut self) {
        let mut state: SystemState<(
            Res<ContentCatalog>,
            Res<GameConfig>,
            Res<GameTime>,
            ResMut<PlayerState>,
            ResMut<StoryState>,
            ResMut<ProgressionLog>,
        )> = SystemState::new(&mut self.world);
        let (catalog, config, time, mut player, mut story, mut log) =
            state.get_mut(&mut self.world);
        let milestones =
            evaluate_progression(&catalog, &config.rules, time.turn, &mut player, &mut story);
        log.0.extend(milestones);
    }

    fn with_mission_state<T>(
        &mut self,
        action: impl FnOnce(
            &MissionContext<'_>,
            &mut MissionBoard,
            &mut PlayerState,
            &mut dyn RandomSource,
        ) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        self.ensure_running()?;
        let result = {
            let mut state: SystemState<(
                Res<ContentCatalog>,
                Res<GameConfig>,
                Res<GameTime>,
                ResMut<MissionBoard>,
                ResMut<PlayerState>,
                ResMut<GameRng>,
            )> = SystemState::new(&mut self.world);
            let (catalog, config, time, mut board, mut player, mut rng) =
                state.get_mut(&mut self.world);
            let ctx = MissionContext {
                catalog: &catalog,
                rules: &config.rules,
                turn: time.turn,
            };
            action(&ctx, &mut board, &mut player, rng.0.as_mut())
        };
        if result.is_ok() {
            self.settle();
        }
        result
    }

    /// Start a mission. Single-roll missions resolve immediately; staged missions run until
    /// they finish or stop at a moral choice.
    pub fn attempt_mission(&mut self, mission_id: &str) -> Result<MissionOutcome, GameError> {
        self.with_mission_state(|ctx, board, player, rng| {
            missions::attempt_mission(ctx, board, player, rng, mission_id)
        })
    }

    pub fn select_moral_choice(
        &mut self,
        mission_id: &str,
        stage: usize,
        choice: &str,
    ) -> Result<ChoiceResult, GameError> {
        self.with_mission_state(|ctx, board, player, rng| {
            missions::select_moral_choice(ctx, board, player, rng, mission_id, stage, choice)
        })
    }

    pub fn abort_mission(&mut self, mission_id: &str) -> Result<MissionOutcome, GameError> {
        self.with_mission_state(|ctx, board, player, _| {
            missions::abort_mission(ctx, board, player, mission_id)
        })
    }

    /// Risk the player would face on a mission right now, with every modifier listed.
    pub fn mission_risk(&self, mission_id: &str) -> Result<RiskBreakdown, GameError> {
        let catalog = self.catalog();
        let mission = catalog.mission(mission_id)?;
        Ok(effective_risk(
            mission.risk,
            catalog,
            self.player(),
            &self.config().rules,
        ))
    }

    pub fn switch_faction(&mut self, faction_id: &str) -> Result<FactionSwitch, GameError> {
        self.ensure_running()?;
        let switch = {
            let mut state: SystemState<(
                Res<ContentCatalog>,
                Res<GameConfig>,
                Res<GameTime>,
                ResMut<PlayerState>,
            )> = SystemState::new(&mut self.world);
            let (catalog, config, time, mut player) = state.get_mut(&mut self.world);
            faction::switch_faction(&catalog, &config.rules, time.turn, &mut player, faction_id)?
        };
        self.settle();
        Ok(switch)
    }

    pub fn market(&self) -> Vec<Offer> {
        market::offers(self.catalog(), self.player())
    }

    pub fn purchase_item(&mut self, item_id: &str) -> Result<Purchase, GameError> {
        self.ensure_running()?;
        let purchase = {
            let mut state: SystemState<(Res<ContentCatalog>, Res<GameTime>, ResMut<PlayerState>)> =
                SystemState::new(&mut self.world);
            let (catalog, time, mut player) = state.get_mut(&mut self.world);
            market::purchase(&catalog, time.turn, &mut player, item_id)?
        };
        self.settle();
        Ok(purchase)
    }

    pub fn talk_to(&mut self, contact_id: &str) -> Result<Conversation, GameError> {
        self.ensure_running()?;
        let conversation = {
            let mut state: SystemState<(
                Res<ContentCatalog>,
                ResMut<PlayerState>,
                ResMut<GameRng>,
            )> = SystemState::new(&mut self.world);
            let (catalog, mut player, mut rng) = state.get_mut(&mut self.world);
            dialogue::talk_to(&catalog, &mut player, rng.0.as_mut(), contact_id)?
        };
        self.settle();
        Ok(conversation)
    }

    pub fn forum(&self, section: Option<ForumSection>) -> Vec<&ForumPost> {
        dialogue::visible_posts(self.catalog(), self.player(), section)
    }

    pub fn read_post(&self, post_id: &str) -> Result<&ForumPost, GameError> {
        dialogue::read_post(self.catalog(), self.player(), post_id)
    }

    /// Activate a world event right away, regardless of its probability.
    pub fn force_event(&mut self, event_id: &str) -> Result<u32, GameError> {
        let duration = self.world.resource_scope(|world, catalog: Mut<ContentCatalog>| {
            let mut player = world.resource_mut::<PlayerState>();
            activate_event(&catalog, &mut player, event_id)
        })?;
        tracing::info!(event = %event_id, duration, "event forced");
        Ok(duration)
    }

    pub fn query_unlocked(&self, kind: CatalogKind) -> Vec<CatalogEntry> {
        queries::query_unlocked(self.catalog(), self.player(), kind)
    }

    pub fn listing(&self, kind: CatalogKind) -> Vec<Listing> {
        queries::listing(self.catalog(), self.player(), kind)
    }

    /// Run one turn of the schedule. Once an ending is reached the clock stops.
    pub fn advance_turn(&mut self) -> TickReport {
        if self.is_over() {
            let mut report = TickReport {
                turn: self.time().turn,
                ..TickReport::default()
            };
            report.milestones = self.drain_notices();
            return report;
        }
        self.schedule.run(&mut self.world);
        self.world.resource::<TickReport>().clone()
    }

    /// Milestones from player actions that no turn has reported yet.
    pub fn drain_notices(&mut self) -> Vec<Milestone> {
        self.world.resource_mut::<ProgressionLog>().drain()
    }

    /// Extract a serializable save state from the current world.
    pub fn save_state(&self) -> SaveState {
        extract_state_from_world(&self.world, self.seed)
    }

    /// Apply a saved state back into the live world. The random source is reseeded from the
    /// saved seed and turn so a loaded game replays the same way every time. A save naming
    /// content this catalog lacks is refused and the world is left as it was.
    pub fn load_state(&mut self, state: SaveState) -> Result<(), GameError> {
        check_state_against_catalog(&state, self.catalog())?;
        self.seed = state.seed;
        let reseed = state.seed ^ state.time.turn;
        apply_state_to_world(state, &mut self.world);
        self.world.insert_resource(GameRng::seeded(reseed));
        self.world.insert_resource(ProgressionLog::default());
        self.world.insert_resource(TickReport::default());
        Ok(())
    }

    /// Save state directly to a file path.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), SaveError> {
        save_state_to_path(&self.save_state(), path)
    }

    /// Load state directly from a file path.
    pub fn load_from_path<P: AsRef<Path>>(&mut self, path: P) -> Result<(), SaveError> {
        let state = load_state_from_path(path)?;
        self.load_state(state)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::ScriptedRolls;
    use crate::rules::money::Btc;
    use crate::rules::risk::reward_multipliers;
    use crate::simulation::missions::{FailureReason, MissionAttempt, MissionStatus};

    fn quiet_catalog() -> ContentCatalog {
        let mut catalog = ContentCatalog::builtin().unwrap();
        for event in &mut catalog.events {
            event.probability = 0.0;
        }
        catalog
    }

    fn scripted(rolls: impl IntoIterator<Item = f64>) -> Game {
        Game::with_rng(
            GameConfig::default(),
            quiet_catalog(),
            Box::new(ScriptedRolls::new(rolls)),
        )
    }

    #[test]
    fn new_game_fires_opening_beat() {
        let mut game = scripted([]);
        let notices = game.drain_notices();
        assert!(notices
            .iter()
            .any(|m| matches!(m, Milestone::StoryBeat { .. })));
        assert!(game.drain_notices().is_empty());
    }

    #[test]
    fn port_scan_success_pays_out() {
        let mut game = scripted([50.0]);
        let before = game.player().clone();
        let outcome = game.attempt_mission("port_scan").unwrap();
        assert_eq!(outcome.status, MissionStatus::Success);
        let player = game.player();
        assert_eq!(player.reputation, before.reputation + 3);
        assert_eq!(player.usd, before.usd + 30);
        assert!(player.completed_missions.contains("port_scan"));
    }

    #[test]
    fn port_scan_failure_only_adds_heat_and_a_warning() {
        let mut game = scripted([5.0]);
        let before = game.player().clone();
        let outcome = game.attempt_mission("port_scan").unwrap();
        assert_eq!(outcome.status, MissionStatus::Failure(FailureReason::RiskRoll));
        let player = game.player();
        assert_eq!(player.reputation, before.reputation);
        assert_eq!(player.usd, before.usd);
        assert_eq!(player.warnings, before.warnings + 1);
        assert!(player.heat() > 0);
    }

    #[test]
    fn web_vuln_is_locked_for_a_new_player() {
        let mut game = scripted([]);
        let before = game.player().clone();
        let err = game.attempt_mission("web_vuln").unwrap_err();
        assert!(matches!(err, GameError::Ineligible { .. }));
        assert_eq!(game.player(), &before);
    }

    #[test]
    fn crackdown_raises_risk_until_it_expires() {
        let mut game = scripted([]);
        let mission = game
            .catalog()
            .missions
            .iter()
            .find(|m| m.risk == 40)
            .unwrap()
            .id
            .clone();
        assert_eq!(game.mission_risk(&mission).unwrap().effective(), 40.0);

        let duration = game.force_event("government_crackdown").unwrap();
        assert_eq!(game.mission_risk(&mission).unwrap().effective(), 60.0);

        let mut expired = false;
        for _ in 0..duration {
            let report = game.advance_turn();
            expired |= report
                .expired_events
                .contains(&"government_crackdown".to_string());
        }
        assert!(expired);
        assert_eq!(game.mission_risk(&mission).unwrap().effective(), 40.0);
    }

    #[test]
    fn advancing_turns_moves_the_clock() {
        let mut game = scripted([]);
        let report = game.advance_turn();
        assert_eq!(report.turn, 1);
        assert_eq!(game.time().turn, 1);
        assert_eq!(game.time().hour, 12);
    }

    #[test]
    fn faction_switch_respects_cooldown() {
        let mut game = scripted([]);
        let ids: Vec<String> = game
            .catalog()
            .factions
            .iter()
            .map(|f| f.id.clone())
            .collect();
        game.switch_faction(&ids[0]).unwrap();
        let err = game.switch_faction(&ids[1]).unwrap_err();
        assert!(matches!(err, GameError::Cooldown { .. }));

        let cooldown = game.config().rules.faction_switch_cooldown;
        for _ in 0..cooldown {
            game.advance_turn();
        }
        let switch = game.switch_faction(&ids[1]).unwrap();
        assert_eq!(switch.faction_changes, 2);
        assert!(game.player().achievements.contains("faction_traitor"));
    }

    #[test]
    fn burned_player_cannot_act() {
        let mut game = scripted([]);
        game.world.resource_mut::<PlayerState>().adjust_heat(100);
        game.settle();
        assert_eq!(game.player().ending.as_deref(), Some("burned"));
        let err = game.attempt_mission("port_scan").unwrap_err();
        assert_eq!(
            err,
            GameError::GameOver {
                ending: "burned".to_string()
            }
        );
        let turn = game.time().turn;
        game.advance_turn();
        assert_eq!(game.time().turn, turn);
    }

    #[test]
    fn leaving_a_faction_silences_its_gear() {
        let mut game = scripted([]);
        game.switch_faction("grey_hat").unwrap();
        {
            let mut player = game.world.resource_mut::<PlayerState>();
            player.reputation = 100;
            player.btc = Btc::from_btc(1.0);
        }
        game.purchase_item("insider_intel").unwrap();
        let in_grey_hat = reward_multipliers(game.catalog(), game.player()).currency;
        assert!((in_grey_hat - 1.2).abs() < 1e-9);

        let cooldown = game.config().rules.faction_switch_cooldown;
        for _ in 0..cooldown {
            game.advance_turn();
        }
        game.switch_faction("black_hat").unwrap();
        assert!(game.player().owns_item("insider_intel"));
        let in_black_hat = reward_multipliers(game.catalog(), game.player()).currency;
        assert!((in_black_hat - 1.5).abs() < 1e-9);
    }

    #[test]
    fn load_refuses_saves_naming_missing_content() {
        let mut game = scripted([]);
        let before = game.save_state();

        let mut orphaned = before.clone();
        orphaned.missions.active.insert(
            "ghost_op".to_string(),
            MissionAttempt {
                mission_id: "ghost_op".to_string(),
                started_turn: 0,
                next_stage: 1,
                turns_waited: 0,
                stage_turns: 0,
                stage_failed: false,
                awaiting_choice: None,
            },
        );
        let err = game.load_state(orphaned).unwrap_err();
        assert_eq!(err, GameError::unknown(CatalogKind::Mission, "ghost_op"));
        assert!(!err.is_recoverable());
        assert_eq!(game.save_state(), before);

        let mut renegade = before.clone();
        renegade.player.faction = Some("red_hat".to_string());
        assert_eq!(
            game.load_state(renegade.clone()).unwrap_err(),
            GameError::unknown(CatalogKind::Faction, "red_hat")
        );
        assert_eq!(game.player().faction, None);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renegade.json");
        save_state_to_path(&renegade, &path).unwrap();
        assert!(matches!(
            game.load_from_path(&path),
            Err(SaveError::Content(GameError::UnknownId { .. }))
        ));
    }

    #[test]
    fn same_seed_replays_identically() {
        let play = || {
            let mut game = Game::new(GameConfig::default(), ContentCatalog::builtin().unwrap());
            let _ = game.attempt_mission("port_scan");
            for _ in 0..20 {
                game.advance_turn();
            }
            let _ = game.attempt_mission("port_scan");
            game.save_state()
        };
        assert_eq!(play(), play());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");

        let mut game = scripted([50.0]);
        game.attempt_mission("port_scan").unwrap();
        game.advance_turn();
        game.save_to_path(&path).unwrap();
        let saved = game.save_state();

        let mut restored = scripted([]);
        restored.load_from_path(&path).unwrap();
        assert_eq!(restored.save_state(), saved);
        assert_eq!(restored.player().reputation, game.player().reputation);
        assert_eq!(restored.time(), game.time());
    }
}
