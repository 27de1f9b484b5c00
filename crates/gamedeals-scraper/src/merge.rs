//! The merge engine: decides what one price observation changes in storage.
//!
//! Pure functions over values, no store access and no I/O, so every decision
//! rule is unit-testable in isolation. The crawl pipeline performs the
//! writes this module prescribes.
//!
//! Two independent decisions per observation:
//!
//! 1. **Discount ledger append**: a [`DiscountRecord`] marks the start of a
//!    distinct promotion window. Re-observing the same still-active window
//!    must not duplicate entries, but a changed end date (new promotion, or
//!    an extended/shortened one) is a new ledger entry.
//! 2. **Game record write**: the current-state record is rewritten when the
//!    observation changes anything the record tracks: current price, a new
//!    cheapest-price floor, or the listing identity. An unchanged
//!    observation produces no write at all.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use gamedeals_core::{DiscountRecord, GameRecord, ListingIdentity, PriceFact};

/// What one observation changes: either write may independently be absent.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub discount_record: Option<DiscountRecord>,
    pub game_record: Option<GameRecord>,
}

impl MergeOutcome {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.discount_record.is_none() && self.game_record.is_none()
    }
}

/// Merges one normalized observation against the previously stored record.
///
/// `stored` is `None` on first sight of the id. `now` stamps any new ledger
/// entry; it is passed in rather than read from the clock so merges are
/// reproducible in tests.
#[must_use]
pub fn merge_observation(
    id: &str,
    identity: &ListingIdentity,
    fact: &PriceFact,
    stored: Option<&GameRecord>,
    now: DateTime<Utc>,
) -> MergeOutcome {
    MergeOutcome {
        discount_record: decide_discount_record(id, fact, stored, now),
        game_record: decide_game_record(id, identity, fact, stored),
    }
}

/// Decision 1: append a ledger entry iff a discount price is present and
/// the observed window differs from the stored one (or nothing is stored).
fn decide_discount_record(
    id: &str,
    fact: &PriceFact,
    stored: Option<&GameRecord>,
    now: DateTime<Utc>,
) -> Option<DiscountRecord> {
    let discount_price = fact.discount_price?;

    let window_changed = match stored {
        None => true,
        Some(game) => game.discount_end_at != fact.discount_end_at,
    };
    if !window_changed {
        return None;
    }

    Some(DiscountRecord {
        id: Uuid::new_v4(),
        game_id: id.to_owned(),
        regular_price: fact.regular_price,
        discount_price,
        discount_rate: fact.discount_rate(),
        discount_start_at: fact.discount_start_at,
        discount_end_at: fact.discount_end_at,
        created_at: now,
    })
}

/// Decision 2: rewrite the current-state record iff something it tracks
/// changed. On write, the cheapest-price floor only ever moves down, and
/// its associated window-end timestamp moves with it.
fn decide_game_record(
    id: &str,
    identity: &ListingIdentity,
    fact: &PriceFact,
    stored: Option<&GameRecord>,
) -> Option<GameRecord> {
    let current_price = fact.current_price();

    let needs_write = match stored {
        None => true,
        Some(game) => {
            let price_changed = game.current_price != current_price;
            let new_floor = matches!(
                (game.cheapest_price, current_price),
                (Some(cheapest), Some(current)) if cheapest > current
            );
            let identity_changed = game.name != identity.name
                || game.image != identity.image
                || game.link != identity.link;
            price_changed || new_floor || identity_changed
        }
    };
    if !needs_write {
        return None;
    }

    let stored_cheapest = stored.and_then(|g| g.cheapest_price);
    let (cheapest_price, cheapest_price_end_at) = match (stored_cheapest, current_price) {
        // First priced observation, or a new floor: the floor and its
        // window end both come from this observation.
        (None, Some(current)) => (Some(current), fact.discount_end_at),
        (Some(cheapest), Some(current)) if current < cheapest => {
            (Some(current), fact.discount_end_at)
        }
        // No new floor: retain what was stored.
        _ => (
            stored_cheapest,
            stored.and_then(|g| g.cheapest_price_end_at),
        ),
    };

    Some(GameRecord {
        id: id.to_owned(),
        name: identity.name.clone(),
        image: identity.image.clone(),
        link: identity.link.clone(),
        current_price,
        regular_price: fact.regular_price,
        discount_rate: fact.discount_rate(),
        discount_start_at: fact.discount_start_at,
        discount_end_at: fact.discount_end_at,
        cheapest_price,
        cheapest_price_end_at,
    })
}
