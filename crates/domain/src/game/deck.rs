//! Dealing: builds the werewolf-count + optional-roles + villager-padded
//! deck, then splits it into player cards and three table cards.

use std::collections::HashMap;

use crate::card::Card;
use crate::ids::UserId;
use crate::random::{shuffle, RandomPort};

pub struct Deal {
    pub player_cards: HashMap<UserId, Card>,
    pub table_cards: [Card; 3],
}

/// Builds a deck of `players.len() + 3` cards: `werewolf_count` Werewolves,
/// then `optional_roles` (shuffled), padded with Villagers to size and
/// truncated if oversized, then the whole deck is shuffled. The last three
/// cards become the table cards.
pub fn deal(
    players: &[UserId],
    werewolf_count: u32,
    optional_roles: &[Card],
    rng: &dyn RandomPort,
) -> Deal {
    let total = players.len() + 3;

    let mut deck = Vec::with_capacity(total.max(werewolf_count as usize));
    for _ in 0..werewolf_count {
        deck.push(Card::Werewolf);
    }

    let mut roles = optional_roles.to_vec();
    shuffle(&mut roles, rng);
    deck.extend(roles);

    while deck.len() < total {
        deck.push(Card::Villager);
    }
    deck.truncate(total);
    shuffle(&mut deck, rng);

    let mut player_cards = HashMap::with_capacity(players.len());
    for (player, card) in players.iter().zip(deck.iter()) {
        player_cards.insert(player.clone(), *card);
    }

    let table_slice = &deck[players.len()..total];
    let table_cards = [table_slice[0], table_slice[1], table_slice[2]];

    Deal {
        player_cards,
        table_cards,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::FixedRandom;

    fn players(n: usize) -> Vec<UserId> {
        (0..n).map(|i| UserId::new(format!("p{i}"))).collect()
    }

    #[test]
    fn deal_produces_player_count_plus_three_cards_with_exact_werewolf_count() {
        let ps = players(3);
        let rng = FixedRandom(0);
        let d = deal(&ps, 2, &[Card::Seer, Card::Robber, Card::Troublemaker], &rng);
        assert_eq!(d.player_cards.len(), 3);
        let mut all: Vec<Card> = d.player_cards.values().copied().collect();
        all.extend(d.table_cards);
        assert_eq!(all.len(), 6);
        assert_eq!(all.iter().filter(|c| **c == Card::Werewolf).count(), 2);
    }

    #[test]
    fn oversized_optional_roles_are_truncated() {
        let ps = players(2);
        let rng = FixedRandom(0);
        // 1 werewolf + 6 optional roles > 5 total slots; must truncate to 5.
        let d = deal(&ps, 1, &Card::OPTIONAL_ROLES, &rng);
        let mut all: Vec<Card> = d.player_cards.values().copied().collect();
        all.extend(d.table_cards);
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn undersized_deck_is_padded_with_villagers() {
        let ps = players(4);
        let rng = FixedRandom(0);
        let d = deal(&ps, 1, &[Card::Seer], &rng);
        let mut all: Vec<Card> = d.player_cards.values().copied().collect();
        all.extend(d.table_cards);
        assert_eq!(all.len(), 7);
        assert!(all.iter().any(|c| *c == Card::Villager));
    }
}
