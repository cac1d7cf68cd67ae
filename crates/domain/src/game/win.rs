//! Win determination, ported verbatim (as boolean algebra) from the
//! original's `_query_post_game_results`.

use std::collections::HashSet;

use crate::card::Card;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum WinnerKind {
    TannerAndVillage,
    Village,
    Tanner,
    Werewolf,
    NoOne,
}

/// `eliminated` is the set of cards (on the current deal) held by eliminated
/// players; `current_player_cards` is the full current-deal multiset, here
/// only ever inspected for membership.
pub fn determine_winner(eliminated: &HashSet<Card>, current_player_cards: &[Card]) -> WinnerKind {
    let tanner_win = eliminated.contains(&Card::Tanner);

    let werewolf_in_eliminated = eliminated.contains(&Card::Werewolf);
    let werewolf_in_play = current_player_cards.contains(&Card::Werewolf);
    let minion_in_play = current_player_cards.contains(&Card::Minion);
    let minion_in_eliminated = eliminated.contains(&Card::Minion);

    let village_win = werewolf_in_eliminated || (eliminated.is_empty() && !werewolf_in_play);

    let werewolf_win = !tanner_win
        && ((werewolf_in_play && !werewolf_in_eliminated)
            || (!werewolf_in_play
                && minion_in_play
                && !minion_in_eliminated
                && !eliminated.is_empty()));

    match (tanner_win, village_win, werewolf_win) {
        (true, true, _) => WinnerKind::TannerAndVillage,
        (false, true, _) => WinnerKind::Village,
        (true, false, _) => WinnerKind::Tanner,
        (false, false, true) => WinnerKind::Werewolf,
        (false, false, false) => WinnerKind::NoOne,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn werewolf_eliminated_is_a_village_win() {
        let eliminated = HashSet::from([Card::Werewolf]);
        let players = [Card::Werewolf, Card::Villager, Card::Villager];
        assert_eq!(determine_winner(&eliminated, &players), WinnerKind::Village);
    }

    #[test]
    fn tanner_eliminated_alongside_werewolf_is_tanner_and_village() {
        let eliminated = HashSet::from([Card::Werewolf, Card::Tanner]);
        let players = [Card::Werewolf, Card::Tanner, Card::Villager];
        assert_eq!(
            determine_winner(&eliminated, &players),
            WinnerKind::TannerAndVillage
        );
    }

    #[test]
    fn no_one_eliminated_with_a_werewolf_in_play_is_a_werewolf_win() {
        let eliminated = HashSet::new();
        let players = [Card::Werewolf, Card::Villager, Card::Villager];
        assert_eq!(determine_winner(&eliminated, &players), WinnerKind::Werewolf);
    }

    #[test]
    fn no_one_eliminated_with_no_werewolf_in_play_is_a_village_win() {
        let eliminated = HashSet::new();
        let players = [Card::Villager, Card::Villager, Card::Villager];
        assert_eq!(determine_winner(&eliminated, &players), WinnerKind::Village);
    }

    #[test]
    fn tanner_alone_eliminated_with_no_werewolf_dealt_is_tanner_win() {
        let eliminated = HashSet::from([Card::Tanner]);
        let players = [Card::Tanner, Card::Villager, Card::Villager];
        assert_eq!(determine_winner(&eliminated, &players), WinnerKind::Tanner);
    }

    #[test]
    fn minion_wins_with_werewolves_absent_when_minion_survives_and_someone_died() {
        let eliminated = HashSet::from([Card::Villager]);
        let players = [Card::Minion, Card::Villager, Card::Villager];
        assert_eq!(determine_winner(&eliminated, &players), WinnerKind::Werewolf);
    }
}
