use crate::core::config::RulesConfig;
use crate::core::error::GameError;
use crate::data::ContentCatalog;
use crate::simulation::player::PlayerState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactionSwitch {
    pub from: Option<String>,
    pub to: String,
    /// Standing lost with the faction that was left.
    pub defection_penalty: i32,
    pub faction_changes: u32,
}

/// Turns left before another switch is allowed. Zero when unaffiliated.
pub fn cooldown_remaining(rules: &RulesConfig, turn: u64, player: &PlayerState) -> u64 {
    if player.faction.is_none() {
        return 0;
    }
    match player.last_faction_switch {
        Some(last) => (last + rules.faction_switch_cooldown).saturating_sub(turn),
        None => 0,
    }
}

pub fn switch_faction(
    catalog: &ContentCatalog,
    rules: &RulesConfig,
    turn: u64,
    player: &mut PlayerState,
    faction_id: &str,
) -> Result<FactionSwitch, GameError> {
    let faction = catalog.faction(faction_id)?;
    if player.faction.as_deref() == Some(faction.id.as_str()) {
        return Err(GameError::AlreadyInFaction {
            faction: faction.id.clone(),
        });
    }
    let remaining = cooldown_remaining(rules, turn, player);
    if remaining > 0 {
        return Err(GameError::Cooldown { remaining });
    }

    let from = player.faction.replace(faction.id.clone());
    let defection_penalty = match &from {
        Some(old) => -player.adjust_faction_reputation(
            old,
            -rules.defection_penalty,
            rules.faction_reputation_cap,
        ),
        None => 0,
    };
    player.faction_changes += 1;
    player.last_faction_switch = Some(turn);
    tracing::info!(
        from = ?from,
        to = %faction.id,
        changes = player.faction_changes,
        "faction switched"
    );

    Ok(FactionSwitch {
        from,
        to: faction.id.clone(),
        defection_penalty,
        faction_changes: player.faction_changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (ContentCatalog, RulesConfig, PlayerState) {
        (
            ContentCatalog::builtin().unwrap(),
            RulesConfig::default(),
            PlayerState::default(),
        )
    }

    fn faction_ids(catalog: &ContentCatalog) -> (String, String) {
        (catalog.factions[0].id.clone(), catalog.factions[1].id.clone())
    }

    #[test]
    fn joining_increments_changes_once() {
        let (catalog, rules, mut player) = setup();
        let (first, _) = faction_ids(&catalog);
        let switch = switch_faction(&catalog, &rules, 0, &mut player, &first).unwrap();
        assert_eq!(switch.from, None);
        assert_eq!(switch.faction_changes, 1);
        assert_eq!(player.faction.as_deref(), Some(first.as_str()));
        assert_eq!(player.faction_changes, 1);
    }

    #[test]
    fn switch_is_rejected_during_cooldown() {
        let (catalog, rules, mut player) = setup();
        let (first, second) = faction_ids(&catalog);
        switch_faction(&catalog, &rules, 0, &mut player, &first).unwrap();
        let before = player.clone();
        let err = switch_faction(&catalog, &rules, 5, &mut player, &second).unwrap_err();
        assert_eq!(
            err,
            GameError::Cooldown {
                remaining: rules.faction_switch_cooldown - 5
            }
        );
        assert_eq!(player, before);

        let turn = rules.faction_switch_cooldown;
        let switch = switch_faction(&catalog, &rules, turn, &mut player, &second).unwrap();
        assert_eq!(switch.from.as_deref(), Some(first.as_str()));
        assert_eq!(switch.defection_penalty, rules.defection_penalty);
        assert_eq!(player.faction_standing(&first), -rules.defection_penalty);
        assert_eq!(player.faction_changes, 2);
    }

    #[test]
    fn rejoining_current_faction_is_refused() {
        let (catalog, rules, mut player) = setup();
        let (first, _) = faction_ids(&catalog);
        switch_faction(&catalog, &rules, 0, &mut player, &first).unwrap();
        assert!(matches!(
            switch_faction(&catalog, &rules, 100, &mut player, &first),
            Err(GameError::AlreadyInFaction { .. })
        ));
        assert_eq!(player.faction_changes, 1);
    }

    #[test]
    fn unknown_faction_is_unknown_id() {
        let (catalog, rules, mut player) = setup();
        assert!(matches!(
            switch_faction(&catalog, &rules, 0, &mut player, "red_hat"),
            Err(GameError::UnknownId { .. })
        ));
    }
}
