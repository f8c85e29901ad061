use crate::core::error::GameError;
use crate::data::{ContentCatalog, ItemCategory, MarketItem};
use crate::rules::money::Price;
use crate::rules::requirement::{ensure_unlocked, unmet_clauses, UnmetClause};
use crate::simulation::player::PlayerState;

/// One row of the black market as the player currently sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct Offer {
    pub item_id: String,
    pub name: String,
    pub category: ItemCategory,
    pub base_price: Price,
    pub price: Price,
    pub owned: bool,
    pub unmet: Vec<UnmetClause>,
}

impl Offer {
    pub fn is_unlocked(&self) -> bool {
        self.unmet.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    pub item_id: String,
    pub price: Price,
    pub expires_turn: Option<u64>,
}

/// Base price scaled by active event multipliers and the faction's market discount.
pub fn adjusted_price(catalog: &ContentCatalog, player: &PlayerState, item: &MarketItem) -> Price {
    let events: f64 = catalog
        .active_events(player)
        .map(|event| event.price_multiplier())
        .product();
    let discount = catalog
        .player_faction(player)
        .map(|faction| faction.market_discount())
        .unwrap_or(0.0);
    item.price.scale(events * (1.0 - discount))
}

pub fn offers(catalog: &ContentCatalog, player: &PlayerState) -> Vec<Offer> {
    catalog
        .items
        .iter()
        .map(|item| Offer {
            item_id: item.id.clone(),
            name: item.name.clone(),
            category: item.category,
            base_price: item.price,
            price: adjusted_price(catalog, player, item),
            owned: player.owns_item(&item.id),
            unmet: unmet_clauses(&item.requirement, player),
        })
        .collect()
}

/// Checks, in order: the id, ownership, the item's requirement, then funds.
pub fn purchase(
    catalog: &ContentCatalog,
    turn: u64,
    player: &mut PlayerState,
    item_id: &str,
) -> Result<Purchase, GameError> {
    let item = catalog.item(item_id)?;
    if player.owns_item(&item.id) {
        return Err(GameError::AlreadyOwned {
            item: item.id.clone(),
        });
    }
    ensure_unlocked(&item.id, unmet_clauses(&item.requirement, player))?;
    let price = adjusted_price(catalog, player, item);
    if !player.can_afford(price) {
        return Err(GameError::InsufficientFunds {
            item: item.id.clone(),
            required: price,
            available: player.balance_in(price),
        });
    }

    player.spend(price);
    player.grant_item(&item.id, turn, item.valid_for);
    let expires_turn = player.items.get(&item.id).and_then(|owned| owned.expires_turn);
    tracing::info!(item = %item.id, price = %price, "item purchased");
    Ok(Purchase {
        item_id: item.id.clone(),
        price,
        expires_turn,
    })
}

/// Drops items whose validity ran out by `turn`. Returns the removed ids.
pub fn expire_items(player: &mut PlayerState, turn: u64) -> Vec<String> {
    let expired: Vec<String> = player
        .items
        .iter()
        .filter(|(_, owned)| owned.expires_turn.is_some_and(|expires| expires <= turn))
        .map(|(id, _)| id.clone())
        .collect();
    for id in &expired {
        player.items.remove(id);
        tracing::debug!(item = %id, "item expired");
    }
    expired
}
