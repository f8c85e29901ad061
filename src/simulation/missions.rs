use std::collections::BTreeMap;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::config::RulesConfig;
use crate::core::error::GameError;
use crate::core::rng::RandomSource;
use crate::data::{ContentCatalog, Mission, MissionStage};
use crate::rules::effects::{apply_effects, Effect, EffectContext};
use crate::rules::requirement::{ensure_unlocked, unmet_clauses, unmet_skills, UnmetClause};
use crate::rules::risk::{effective_risk, reward_multipliers, roll_against, scaled_heat_gain, RiskBreakdown, RiskRoll};
use crate::simulation::player::PlayerState;

/// Multi-stage attempts that are waiting on the player, keyed by mission id.
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionBoard {
    #[serde(default)]
    pub active: BTreeMap<String, MissionAttempt>,
    /// Attempts the clock ended, with their limit, until the mission is tried again.
    #[serde(default)]
    pub timed_out: BTreeMap<String, u32>,
}

impl MissionBoard {
    pub fn attempt(&self, mission_id: &str) -> Option<&MissionAttempt> {
        self.active.get(mission_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionAttempt {
    pub mission_id: String,
    pub started_turn: u64,
    pub next_stage: usize,
    /// Turns advanced while the attempt was open.
    pub turns_waited: u32,
    /// Summed durations of resolved stages.
    pub stage_turns: u32,
    /// A non-blocking stage failed; final rewards are forfeit.
    pub stage_failed: bool,
    pub awaiting_choice: Option<usize>,
}

impl MissionAttempt {
    fn new(mission: &Mission, turn: u64) -> Self {
        Self {
            mission_id: mission.id.clone(),
            started_turn: turn,
            next_stage: 0,
            turns_waited: 0,
            stage_turns: 0,
            stage_failed: false,
            awaiting_choice: None,
        }
    }

    pub fn elapsed(&self) -> u32 {
        self.turns_waited + self.stage_turns
    }
}

/// Read-only inputs shared by every mission operation.
#[derive(Debug, Clone, Copy)]
pub struct MissionContext<'a> {
    pub catalog: &'a ContentCatalog,
    pub rules: &'a RulesConfig,
    pub turn: u64,
}

impl MissionContext<'_> {
    fn effect_context(&self, player: &PlayerState) -> EffectContext {
        EffectContext {
            turn: self.turn,
            faction_reputation_cap: self.rules.faction_reputation_cap,
            multipliers: reward_multipliers(self.catalog, player),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MissionStatus {
    Success,
    /// Finished, but a non-blocking stage failed so final rewards were withheld.
    Compromised,
    Failure(FailureReason),
    Aborted,
    AwaitingChoice(PendingChoice),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    RiskRoll,
    StageFailed { stage: usize },
    MissingSkills { stage: usize, unmet: Vec<UnmetClause> },
    TimedOut { limit: u32, elapsed: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingChoice {
    pub stage: usize,
    pub question: String,
    /// `(key, text)` pairs in catalog order.
    pub options: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageResult {
    pub index: usize,
    pub name: String,
    pub risk: Option<RiskBreakdown>,
    pub roll: Option<RiskRoll>,
    pub success: bool,
    pub unmet_skills: Vec<UnmetClause>,
    pub heat_change: i32,
    pub choice: Option<String>,
    pub consequences: Vec<Effect>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissionOutcome {
    pub mission_id: String,
    pub status: MissionStatus,
    /// Single-roll missions only.
    pub risk: Option<RiskBreakdown>,
    pub roll: Option<RiskRoll>,
    /// Stages resolved during this call.
    pub stages: Vec<StageResult>,
    pub rewards: Vec<Effect>,
    pub heat_change: i32,
    pub elapsed: Option<u32>,
    pub time_bonus: Option<String>,
}

impl MissionOutcome {
    fn new(mission_id: &str) -> Self {
        Self {
            mission_id: mission_id.to_string(),
            status: MissionStatus::Success,
            risk: None,
            roll: None,
            stages: Vec::new(),
            rewards: Vec::new(),
            heat_change: 0,
            elapsed: None,
            time_bonus: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self.status, MissionStatus::AwaitingChoice(_))
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.status, MissionStatus::Success)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceResult {
    pub stage: StageResult,
    pub outcome: MissionOutcome,
}

/// Requirement clauses plus the team-role check against the player's known contacts.
pub fn mission_unmet(
    catalog: &ContentCatalog,
    player: &PlayerState,
    mission: &Mission,
) -> Vec<UnmetClause> {
    let mut unmet = unmet_clauses(&mission.requirement, player);
    if let Some(role) = &mission.team_role {
        let staffed = player
            .contacts
            .iter()
            .filter_map(|id| catalog.contact(id).ok())
            .any(|contact| contact.offers_role(role));
        if !staffed {
            unmet.push(UnmetClause::TeamRole { role: role.clone() });
        }
    }
    unmet
}

pub fn attempt_mission(
    ctx: &MissionContext<'_>,
    board: &mut MissionBoard,
    player: &mut PlayerState,
    rng: &mut dyn RandomSource,
    mission_id: &str,
) -> Result<MissionOutcome, GameError> {
    let mission = ctx.catalog.mission(mission_id)?;
    if board.active.contains_key(&mission.id) {
        return Err(GameError::MissionInProgress {
            mission: mission.id.clone(),
        });
    }
    ensure_unlocked(&mission.id, mission_unmet(ctx.catalog, player, mission))?;
    tracing::info!(mission = %mission.id, turn = ctx.turn, "mission attempt started");

    if !mission.is_multi_stage() {
        return Ok(resolve_single(ctx, player, rng, mission));
    }

    board.timed_out.remove(&mission.id);
    let mut attempt = MissionAttempt::new(mission, ctx.turn);
    let mut outcome = MissionOutcome::new(&mission.id);
    advance_stages(ctx, player, rng, mission, &mut attempt, &mut outcome);
    if !outcome.is_finished() {
        board.active.insert(mission.id.clone(), attempt);
    }
    Ok(outcome)
}

pub fn select_moral_choice(
    ctx: &MissionContext<'_>,
    board: &mut MissionBoard,
    player: &mut PlayerState,
    rng: &mut dyn RandomSource,
    mission_id: &str,
    stage_index: usize,
    choice_key: &str,
) -> Result<ChoiceResult, GameError> {
    let mission = ctx.catalog.mission(mission_id)?;
    if let Some(limit) = board.timed_out.get(&mission.id) {
        return Err(GameError::TimedOut {
            mission: mission.id.clone(),
            limit: *limit,
        });
    }
    let no_pending = || GameError::NoPendingChoice {
        mission: mission.id.clone(),
        stage: stage_index,
    };
    let attempt = board.active.get(&mission.id).ok_or_else(no_pending)?;
    if attempt.awaiting_choice != Some(stage_index) {
        return Err(no_pending());
    }
    let stage = mission.stage(stage_index).ok_or_else(no_pending)?;
    let choice = stage.moral_choice.as_ref().ok_or_else(no_pending)?;
    let option = choice
        .option(choice_key)
        .ok_or_else(|| GameError::InvalidChoice {
            mission: mission.id.clone(),
            choice: choice_key.to_string(),
        })?;

    let Some(mut attempt) = board.active.remove(&mission.id) else {
        return Err(no_pending());
    };
    attempt.awaiting_choice = None;
    tracing::info!(mission = %mission.id, stage = stage_index, choice = %option.key, "moral choice made");

    let effect_ctx = ctx.effect_context(player);
    let consequences = apply_effects(player, &option.consequences, &effect_ctx);
    let mut result = resolve_stage(ctx, player, rng, stage, stage_index, &mut attempt);
    result.choice = Some(option.key.clone());
    result.consequences = consequences;

    let mut outcome = MissionOutcome::new(&mission.id);
    outcome.heat_change += result.heat_change;
    outcome.stages.push(result.clone());
    if result.success || stage.non_blocking {
        attempt.stage_failed |= !result.success;
        advance_stages(ctx, player, rng, mission, &mut attempt, &mut outcome);
    } else {
        let status = MissionStatus::Failure(FailureReason::StageFailed { stage: stage_index });
        finish(ctx, player, mission, &attempt, &mut outcome, status);
    }
    if !outcome.is_finished() {
        board.active.insert(mission.id.clone(), attempt);
    }
    Ok(ChoiceResult {
        stage: result,
        outcome,
    })
}

/// Ends an open attempt. The mission's heat gain still lands; no warning, no rewards.
pub fn abort_mission(
    ctx: &MissionContext<'_>,
    board: &mut MissionBoard,
    player: &mut PlayerState,
    mission_id: &str,
) -> Result<MissionOutcome, GameError> {
    let mission = ctx.catalog.mission(mission_id)?;
    let attempt = board
        .active
        .remove(&mission.id)
        .ok_or_else(|| GameError::MissionNotStarted {
            mission: mission.id.clone(),
        })?;
    let mut outcome = MissionOutcome::new(&mission.id);
    finish(ctx, player, mission, &attempt, &mut outcome, MissionStatus::Aborted);
    Ok(outcome)
}

/// Counts one turn against every open attempt and fails those past their time limit.
pub fn tick_mission_timers(
    ctx: &MissionContext<'_>,
    board: &mut MissionBoard,
    player: &mut PlayerState,
) -> Vec<MissionOutcome> {
    for attempt in board.active.values_mut() {
        attempt.turns_waited += 1;
    }

    let mut expired = Vec::new();
    let mut orphaned = Vec::new();
    for (id, attempt) in &board.active {
        match ctx.catalog.mission(id) {
            Ok(mission) => {
                if let Some(limit) = mission.time_limit {
                    if attempt.elapsed() > limit {
                        expired.push(id.clone());
                    }
                }
            }
            Err(_) => orphaned.push(id.clone()),
        }
    }
    for id in orphaned {
        tracing::error!(mission = %id, "dropping attempt for mission missing from catalog");
        board.active.remove(&id);
    }

    let mut outcomes = Vec::new();
    for id in expired {
        let (Some(attempt), Ok(mission)) = (board.active.remove(&id), ctx.catalog.mission(&id)) else {
            continue;
        };
        let Some(limit) = mission.time_limit else {
            continue;
        };
        let mut outcome = MissionOutcome::new(&id);
        let status = MissionStatus::Failure(FailureReason::TimedOut {
            limit,
            elapsed: attempt.elapsed(),
        });
        finish(ctx, player, mission, &attempt, &mut outcome, status);
        board.timed_out.insert(id, limit);
        outcomes.push(outcome);
    }
    outcomes
}

fn resolve_single(
    ctx: &MissionContext<'_>,
    player: &mut PlayerState,
    rng: &mut dyn RandomSource,
    mission: &Mission,
) -> MissionOutcome {
    let risk = effective_risk(mission.risk, ctx.catalog, player, ctx.rules);
    let roll = roll_against(risk.effective(), rng);
    let effect_ctx = ctx.effect_context(player);

    let mut outcome = MissionOutcome::new(&mission.id);
    outcome.risk = Some(risk);
    outcome.roll = Some(roll);
    if roll.success {
        outcome.rewards = apply_effects(player, &mission.rewards, &effect_ctx);
        player.completed_missions.insert(mission.id.clone());
    } else {
        player.warnings += 1;
        outcome.status = MissionStatus::Failure(FailureReason::RiskRoll);
    }
    outcome.heat_change = player.adjust_heat(scaled_heat_gain(mission.heat_gain, &effect_ctx.multipliers));
    tracing::info!(
        mission = %mission.id,
        risk = risk.effective(),
        roll = ?roll.roll,
        success = roll.success,
        "mission resolved"
    );
    outcome
}

/// Runs stages from `attempt.next_stage` until the mission finishes or a moral choice
/// suspends it. The time limit is checked before every stage and at the end.
fn advance_stages(
    ctx: &MissionContext<'_>,
    player: &mut PlayerState,
    rng: &mut dyn RandomSource,
    mission: &Mission,
    attempt: &mut MissionAttempt,
    outcome: &mut MissionOutcome,
) {
    loop {
        if let Some(limit) = mission.time_limit {
            let elapsed = attempt.elapsed();
            if elapsed > limit {
                let status = MissionStatus::Failure(FailureReason::TimedOut { limit, elapsed });
                finish(ctx, player, mission, attempt, outcome, status);
                return;
            }
        }

        let index = attempt.next_stage;
        let Some(stage) = mission.stage(index) else {
            let status = if attempt.stage_failed {
                MissionStatus::Compromised
            } else {
                MissionStatus::Success
            };
            finish(ctx, player, mission, attempt, outcome, status);
            return;
        };

        let unmet = unmet_skills(&stage.required_skills, player);
        if !unmet.is_empty() {
            attempt.stage_turns += stage.duration;
            attempt.next_stage += 1;
            outcome.stages.push(StageResult {
                index,
                name: stage.name.clone(),
                risk: None,
                roll: None,
                success: false,
                unmet_skills: unmet.clone(),
                heat_change: 0,
                choice: None,
                consequences: Vec::new(),
            });
            if stage.non_blocking {
                attempt.stage_failed = true;
                continue;
            }
            let status = MissionStatus::Failure(FailureReason::MissingSkills { stage: index, unmet });
            finish(ctx, player, mission, attempt, outcome, status);
            return;
        }

        if let Some(choice) = &stage.moral_choice {
            attempt.awaiting_choice = Some(index);
            outcome.status = MissionStatus::AwaitingChoice(PendingChoice {
                stage: index,
                question: choice.question.clone(),
                options: choice
                    .options
                    .iter()
                    .map(|option| (option.key.clone(), option.text.clone()))
                    .collect(),
            });
            tracing::debug!(mission = %mission.id, stage = index, "mission waiting on a choice");
            return;
        }

        let result = resolve_stage(ctx, player, rng, stage, index, attempt);
        outcome.heat_change += result.heat_change;
        let success = result.success;
        outcome.stages.push(result);
        if !success {
            if stage.non_blocking {
                attempt.stage_failed = true;
                continue;
            }
            let status = MissionStatus::Failure(FailureReason::StageFailed { stage: index });
            finish(ctx, player, mission, attempt, outcome, status);
            return;
        }
    }
}

fn resolve_stage(
    ctx: &MissionContext<'_>,
    player: &mut PlayerState,
    rng: &mut dyn RandomSource,
    stage: &MissionStage,
    index: usize,
    attempt: &mut MissionAttempt,
) -> StageResult {
    let risk = effective_risk(stage.risk, ctx.catalog, player, ctx.rules);
    let roll = roll_against(risk.effective(), rng);
    let multipliers = reward_multipliers(ctx.catalog, player);
    let heat_change = player.adjust_heat(scaled_heat_gain(stage.heat_gain, &multipliers));
    attempt.stage_turns += stage.duration;
    attempt.next_stage += 1;
    tracing::debug!(
        mission = %attempt.mission_id,
        stage = index,
        risk = risk.effective(),
        success = roll.success,
        "stage resolved"
    );
    StageResult {
        index,
        name: stage.name.clone(),
        risk: Some(risk),
        roll: Some(roll),
        success: roll.success,
        unmet_skills: Vec::new(),
        heat_change,
        choice: None,
        consequences: Vec::new(),
    }
}

fn finish(
    ctx: &MissionContext<'_>,
    player: &mut PlayerState,
    mission: &Mission,
    attempt: &MissionAttempt,
    outcome: &mut MissionOutcome,
    status: MissionStatus,
) {
    let effect_ctx = ctx.effect_context(player);
    let elapsed = attempt.elapsed();
    outcome.elapsed = Some(elapsed);

    match &status {
        MissionStatus::Success => {
            let mut rewards = mission.final_rewards.clone();
            if let Some(tier) = mission.time_bonus_for(elapsed) {
                rewards.extend(tier.rewards.iter().cloned());
                outcome.time_bonus = Some(tier.label.clone());
            }
            outcome.rewards = apply_effects(player, &rewards, &effect_ctx);
            player.completed_missions.insert(mission.id.clone());
        }
        MissionStatus::Compromised => {
            player.completed_missions.insert(mission.id.clone());
        }
        MissionStatus::Failure(_) => player.warnings += 1,
        MissionStatus::Aborted | MissionStatus::AwaitingChoice(_) => {}
    }
    outcome.heat_change += player.adjust_heat(scaled_heat_gain(mission.heat_gain, &effect_ctx.multipliers));
    tracing::info!(mission = %mission.id, status = ?status, elapsed, "mission finished");
    outcome.status = status;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::ScriptedRolls;
    use crate::rules::money::Btc;

    const HEIST: &str = r#"{
        "id": "test_heist",
        "name": "Test Heist",
        "description": "Three stages against the clock.",
        "risk": 30,
        "heat_gain": 4,
        "stages": [
            {"name": "recon", "risk": 10, "duration": 3},
            {
                "name": "breach",
                "risk": 20,
                "duration": 2,
                "moral_choice": {
                    "question": "A guard sees you.",
                    "options": [
                        {"key": "bribe", "text": "Pay him off", "consequences": [{"kind": "usd", "amount": -50}]},
                        {"key": "leak", "text": "Leak his secrets", "consequences": [{"kind": "heat", "amount": 10}]}
                    ]
                }
            },
            {"name": "exfil", "risk": 20, "duration": 1}
        ],
        "final_rewards": [{"kind": "btc", "amount": 0.01}],
        "time_limit": 6,
        "time_bonus": [{"fraction": 1.0, "label": "on time", "rewards": [{"kind": "reputation", "amount": 2}]}]
    }"#;

    struct Fixture {
        catalog: ContentCatalog,
        rules: RulesConfig,
        board: MissionBoard,
        player: PlayerState,
    }

    impl Fixture {
        fn new() -> Self {
            let mut catalog = ContentCatalog::builtin().unwrap();
            catalog.missions.push(serde_json::from_str(HEIST).unwrap());
            Self {
                catalog,
                rules: RulesConfig::default(),
                board: MissionBoard::default(),
                player: PlayerState::default(),
            }
        }

        fn ctx(&self) -> MissionContext<'_> {
            MissionContext {
                catalog: &self.catalog,
                rules: &self.rules,
                turn: 0,
            }
        }

        fn mission_mut(&mut self, id: &str) -> &mut Mission {
            self.catalog.missions.iter_mut().find(|m| m.id == id).unwrap()
        }

        fn attempt(&mut self, id: &str, rng: &mut ScriptedRolls) -> Result<MissionOutcome, GameError> {
            let ctx = MissionContext {
                catalog: &self.catalog,
                rules: &self.rules,
                turn: 0,
            };
            attempt_mission(&ctx, &mut self.board, &mut self.player, rng, id)
        }

        fn choose(
            &mut self,
            id: &str,
            stage: usize,
            key: &str,
            rng: &mut ScriptedRolls,
        ) -> Result<ChoiceResult, GameError> {
            let ctx = MissionContext {
                catalog: &self.catalog,
                rules: &self.rules,
                turn: 0,
            };
            select_moral_choice(&ctx, &mut self.board, &mut self.player, rng, id, stage, key)
        }

        fn tick(&mut self) -> Vec<MissionOutcome> {
            let ctx = MissionContext {
                catalog: &self.catalog,
                rules: &self.rules,
                turn: 0,
            };
            tick_mission_timers(&ctx, &mut self.board, &mut self.player)
        }
    }

    #[test]
    fn port_scan_success_pays_out() {
        let mut fx = Fixture::new();
        let heat_gain = fx.catalog.mission("port_scan").unwrap().heat_gain;
        let mut rng = ScriptedRolls::new([50.0]);
        let outcome = fx.attempt("port_scan", &mut rng).unwrap();
        assert!(outcome.succeeded());
        assert_eq!(fx.player.reputation, 13);
        assert_eq!(fx.player.usd, 130);
        assert!(fx.player.completed_missions.contains("port_scan"));
        assert_eq!(fx.player.heat() as i32, heat_gain.max(0));
    }

    #[test]
    fn failed_roll_costs_heat_and_a_warning() {
        let mut fx = Fixture::new();
        fx.mission_mut("port_scan").heat_gain = 5;
        let mut rng = ScriptedRolls::new([3.0]);
        let outcome = fx.attempt("port_scan", &mut rng).unwrap();
        assert_eq!(outcome.status, MissionStatus::Failure(FailureReason::RiskRoll));
        assert_eq!(fx.player.reputation, 10);
        assert_eq!(fx.player.usd, 100);
        assert_eq!(fx.player.heat(), 5);
        assert_eq!(fx.player.warnings, 1);
        assert!(outcome.rewards.is_empty());
    }

    #[test]
    fn web_vuln_is_ineligible_without_side_effects() {
        let mut fx = Fixture::new();
        let before = fx.player.clone();
        let mut rng = ScriptedRolls::new([]);
        let err = fx.attempt("web_vuln", &mut rng).unwrap_err();
        match err {
            GameError::Ineligible { subject, unmet } => {
                assert_eq!(subject, "web_vuln");
                assert!(unmet.contains(&UnmetClause::Reputation {
                    required: 25,
                    actual: 10
                }));
                let deficit = unmet.iter().find_map(|clause| match clause {
                    UnmetClause::Reputation { .. } => clause.deficit(),
                    _ => None,
                });
                assert_eq!(deficit, Some(15));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(fx.player, before);
        assert_eq!(rng.consumed(), 0);
    }

    #[test]
    fn exclusive_mission_reports_faction_lock() {
        let mut fx = Fixture::new();
        let (mission_id, faction_id) = fx
            .catalog
            .factions
            .iter()
            .find_map(|f| f.exclusive_missions.first().map(|m| (m.clone(), f.id.clone())))
            .unwrap();
        fx.player.reputation = 1_000;
        for level in fx.player.skills.values_mut() {
            *level = 10;
        }
        fx.player.advance_story_to(10);
        let before = fx.player.clone();
        let err = fx.attempt(&mission_id, &mut ScriptedRolls::new([])).unwrap_err();
        assert_eq!(
            err,
            GameError::FactionLocked {
                subject: mission_id,
                faction: faction_id
            }
        );
        assert_eq!(fx.player, before);
    }

    #[test]
    fn moral_choice_suspends_then_resumes() {
        let mut fx = Fixture::new();
        let mut rng = ScriptedRolls::new([]);
        let outcome = fx.attempt("test_heist", &mut rng).unwrap();
        let MissionStatus::AwaitingChoice(pending) = &outcome.status else {
            panic!("expected a pending choice, got {:?}", outcome.status);
        };
        assert_eq!(pending.stage, 1);
        assert_eq!(outcome.stages.len(), 1);
        assert_eq!(fx.board.attempt("test_heist").unwrap().elapsed(), 3);

        let before = fx.player.clone();
        let err = fx.choose("test_heist", 1, "flee", &mut rng).unwrap_err();
        assert!(matches!(err, GameError::InvalidChoice { .. }));
        let err = fx.choose("test_heist", 2, "bribe", &mut rng).unwrap_err();
        assert!(matches!(err, GameError::NoPendingChoice { stage: 2, .. }));
        assert_eq!(fx.player, before);

        let result = fx.choose("test_heist", 1, "bribe", &mut rng).unwrap();
        assert_eq!(result.stage.choice.as_deref(), Some("bribe"));
        assert_eq!(result.stage.consequences, vec![Effect::Usd { amount: -50 }]);
        assert!(result.outcome.succeeded());
        assert_eq!(result.outcome.elapsed, Some(6));
        assert_eq!(result.outcome.time_bonus.as_deref(), Some("on time"));
        assert_eq!(fx.player.usd, 50);
        assert_eq!(fx.player.btc, Btc::from_sats(1_000_000));
        assert_eq!(fx.player.reputation, 12);
        assert!(fx.board.active.is_empty());
    }

    #[test]
    fn unselected_option_has_no_effect() {
        let mut fx = Fixture::new();
        let mut rng = ScriptedRolls::new([]);
        fx.attempt("test_heist", &mut rng).unwrap();
        fx.choose("test_heist", 1, "leak", &mut rng).unwrap();
        assert_eq!(fx.player.usd, 100);
        assert_eq!(fx.player.heat(), 10 + 4);
    }

    #[test]
    fn failed_required_stage_withholds_final_rewards() {
        let mut fx = Fixture::new();
        let mut rng = ScriptedRolls::new([5.0]);
        let outcome = fx.attempt("test_heist", &mut rng).unwrap();
        assert_eq!(
            outcome.status,
            MissionStatus::Failure(FailureReason::StageFailed { stage: 0 })
        );
        assert_eq!(outcome.stages.len(), 1);
        assert!(outcome.rewards.is_empty());
        assert_eq!(fx.player.btc, Btc::zero());
        assert_eq!(fx.player.warnings, 1);
        assert!(!fx.player.completed_missions.contains("test_heist"));
        assert!(fx.board.active.is_empty());
    }

    #[test]
    fn non_blocking_failure_continues_without_final_rewards() {
        let mut fx = Fixture::new();
        fx.mission_mut("test_heist").stages[0].non_blocking = true;
        let mut rng = ScriptedRolls::new([5.0]);
        fx.attempt("test_heist", &mut rng).unwrap();
        let result = fx.choose("test_heist", 1, "bribe", &mut rng).unwrap();
        assert_eq!(result.outcome.status, MissionStatus::Compromised);
        assert_eq!(fx.player.btc, Btc::zero());
        assert!(fx.player.completed_missions.contains("test_heist"));
    }

    #[test]
    fn missing_stage_skill_fails_without_a_roll() {
        let mut fx = Fixture::new();
        fx.mission_mut("test_heist").stages[0]
            .required_skills
            .insert("cryptography".to_string(), 5);
        let mut rng = ScriptedRolls::new([]);
        let outcome = fx.attempt("test_heist", &mut rng).unwrap();
        assert!(matches!(
            outcome.status,
            MissionStatus::Failure(FailureReason::MissingSkills { stage: 0, .. })
        ));
        assert_eq!(rng.consumed(), 0);
    }

    #[test]
    fn time_limit_expires_while_waiting() {
        let mut fx = Fixture::new();
        let mut rng = ScriptedRolls::new([]);
        fx.attempt("test_heist", &mut rng).unwrap();
        for _ in 0..3 {
            assert!(fx.tick().is_empty());
        }
        let outcomes = fx.tick();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(
            outcomes[0].status,
            MissionStatus::Failure(FailureReason::TimedOut {
                limit: 6,
                elapsed: 7
            })
        );
        assert_eq!(fx.player.btc, Btc::zero());
        assert_eq!(fx.player.warnings, 1);

        let before = fx.player.clone();
        let err = fx.choose("test_heist", 1, "bribe", &mut rng).unwrap_err();
        assert_eq!(
            err,
            GameError::TimedOut {
                mission: "test_heist".to_string(),
                limit: 6
            }
        );
        assert_eq!(fx.player, before);
    }

    #[test]
    fn stage_durations_alone_can_time_out() {
        let mut fx = Fixture::new();
        fx.mission_mut("test_heist").stages[2].duration = 2;
        let mut rng = ScriptedRolls::new([]);
        fx.attempt("test_heist", &mut rng).unwrap();
        let result = fx.choose("test_heist", 1, "bribe", &mut rng).unwrap();
        assert_eq!(
            result.outcome.status,
            MissionStatus::Failure(FailureReason::TimedOut {
                limit: 6,
                elapsed: 7
            })
        );
        assert!(result.outcome.rewards.is_empty());
    }

    #[test]
    fn abort_applies_heat_only() {
        let mut fx = Fixture::new();
        let mut rng = ScriptedRolls::new([]);
        fx.attempt("test_heist", &mut rng).unwrap();
        let ctx = fx.ctx();
        let mut board = fx.board.clone();
        let mut player = fx.player.clone();
        let outcome = abort_mission(&ctx, &mut board, &mut player, "test_heist").unwrap();
        assert_eq!(outcome.status, MissionStatus::Aborted);
        assert_eq!(player.heat(), 4);
        assert_eq!(player.warnings, 0);
        assert!(board.active.is_empty());
        assert!(matches!(
            abort_mission(&ctx, &mut board, &mut player, "test_heist"),
            Err(GameError::MissionNotStarted { .. })
        ));
    }

    #[test]
    fn cannot_start_an_open_mission_twice() {
        let mut fx = Fixture::new();
        let mut rng = ScriptedRolls::new([]);
        fx.attempt("test_heist", &mut rng).unwrap();
        assert!(matches!(
            fx.attempt("test_heist", &mut rng),
            Err(GameError::MissionInProgress { .. })
        ));
    }

    #[test]
    fn team_role_needs_a_known_contact() {
        let mut fx = Fixture::new();
        let role = fx
            .catalog
            .contacts
            .iter()
            .find(|c| !c.roles.is_empty() && c.id != "cipher")
            .map(|c| c.roles[0].clone())
            .unwrap();
        fx.mission_mut("port_scan").team_role = Some(role.clone());
        fx.player.contacts.retain(|id| id == "cipher");
        let cipher_offers = fx.catalog.contact("cipher").unwrap().offers_role(&role);
        let result = fx.attempt("port_scan", &mut ScriptedRolls::new([]));
        if cipher_offers {
            assert!(result.is_ok());
        } else {
            assert!(matches!(
                result,
                Err(GameError::Ineligible { ref unmet, .. }) if unmet.contains(&UnmetClause::TeamRole { role: role.clone() })
            ));
        }
    }
}
