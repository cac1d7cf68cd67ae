//! The game state machine (`HandledWerewolfGame` in the original): dealing,
//! the ordered night phases with role-absent skipping, role powers, voting,
//! and win determination.

pub mod deck;
pub mod phases;
pub mod powers;
pub mod votes;
pub mod win;

use std::collections::{HashMap, HashSet};

use crate::card::Card;
use crate::error::DomainError;
use crate::ids::UserId;
use crate::random::RandomPort;

pub use phases::GamePhase;
pub use powers::SeerResult;
pub use win::WinnerKind;

/// The card/table results from a finished game, for the post-game summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostGameResult {
    pub winner: WinnerKind,
    pub player_cards_original: HashMap<UserId, Card>,
    pub player_cards_current: HashMap<UserId, Card>,
    pub table_cards_original: [Card; 3],
    pub table_cards_current: [Card; 3],
    pub eliminated: HashSet<UserId>,
}

#[derive(Debug, Clone)]
pub struct GameMachine {
    members: Vec<UserId>,
    phase: GamePhase,
    wait_list: HashSet<UserId>,
    active_roles: HashSet<Card>,

    player_cards_original: HashMap<UserId, Card>,
    player_cards_current: HashMap<UserId, Card>,
    table_cards_original: [Card; 3],
    table_cards_current: [Card; 3],

    seer_activated: bool,
    seer_result: Option<SeerResult>,
    robber_activated: bool,
    robber_result: Option<Card>,
    troublemaker_activated: bool,
    troublemaker_pick_a: Option<UserId>,
    insomniac_result: Option<Card>,

    votes: HashMap<UserId, UserId>,
    post_game: Option<PostGameResult>,
}

impl GameMachine {
    pub fn new(members: Vec<UserId>) -> Self {
        Self {
            members,
            phase: GamePhase::HavePlayers,
            wait_list: HashSet::new(),
            active_roles: HashSet::new(),
            player_cards_original: HashMap::new(),
            player_cards_current: HashMap::new(),
            table_cards_original: [Card::Villager; 3],
            table_cards_current: [Card::Villager; 3],
            seer_activated: false,
            seer_result: None,
            robber_activated: false,
            robber_result: None,
            troublemaker_activated: false,
            troublemaker_pick_a: None,
            insomniac_result: None,
            votes: HashMap::new(),
            post_game: None,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn members(&self) -> &[UserId] {
        &self.members
    }

    /// Deals cards and enters the first non-skipped night phase (or
    /// straight through to `Daybreak` if no role cards were dealt at all).
    pub fn deal_cards(
        &mut self,
        werewolf_count: u32,
        optional_roles: &[Card],
        rng: &dyn RandomPort,
    ) -> Result<(), DomainError> {
        if self.phase != GamePhase::HavePlayers {
            return Err(DomainError::invalid_transition(
                "deal_cards is only valid from HavePlayers",
            ));
        }

        let deal = deck::deal(&self.members, werewolf_count, optional_roles, rng);
        self.active_roles = deal
            .player_cards
            .values()
            .copied()
            .chain(deal.table_cards.iter().copied())
            .collect();
        self.player_cards_original = deal.player_cards.clone();
        self.player_cards_current = deal.player_cards;
        self.table_cards_original = deal.table_cards;
        self.table_cards_current = deal.table_cards;

        self.phase = GamePhase::CardsDealt;
        self.enter_next_skippable_phase();
        Ok(())
    }

    /// Advances `self.phase` forward through the order, skipping any phase
    /// whose gating role was not dealt, stopping at the first phase that
    /// either has no gating role or whose role is present. Initializes the
    /// wait list for the phase it lands on.
    fn enter_next_skippable_phase(&mut self) {
        loop {
            let Some(next) = self.phase.next() else {
                break;
            };
            self.phase = next;
            if let Some(role) = self.phase.gating_role() {
                if !self.active_roles.contains(&role) {
                    continue;
                }
            }
            break;
        }
        self.reset_wait_list_for_current_phase();
    }

    fn reset_wait_list_for_current_phase(&mut self) {
        self.wait_list = if self.phase.has_wait_list() {
            self.members.iter().cloned().collect()
        } else {
            HashSet::new()
        };
    }

    fn require_phase(&self, expected: GamePhase) -> Result<(), DomainError> {
        if self.phase != expected {
            return Err(DomainError::invalid_transition(format!(
                "expected phase {expected:?}, machine is in {:?}",
                self.phase
            )));
        }
        Ok(())
    }

    /// A member signals they are done with the current phase. When the last
    /// member signals, the machine advances (or, at `Daybreak`, counts
    /// votes and moves to `Endgame`).
    pub fn signal_advance(&mut self, member: &UserId) -> Result<(), DomainError> {
        if !self.phase.has_wait_list() {
            return Err(DomainError::invalid_transition(format!(
                "{:?} has no wait list to signal against",
                self.phase
            )));
        }
        self.wait_list.remove(member);
        if self.wait_list.is_empty() {
            if self.phase == GamePhase::Daybreak {
                self.finish_daybreak();
            } else {
                self.enter_next_skippable_phase();
            }
        }
        Ok(())
    }

    /// Casts `voter`'s vote for `target`. Implicitly signals advance for
    /// `voter`; a lone holdout voting empties the wait list and triggers
    /// counting.
    pub fn cast_vote(&mut self, voter: &UserId, target: &UserId) -> Result<(), DomainError> {
        self.require_phase(GamePhase::Daybreak)?;
        if !self.members.contains(target) {
            return Err(DomainError::UnknownPlayer(target.to_string()));
        }
        self.votes.insert(voter.clone(), target.clone());
        self.signal_advance(voter)
    }

    fn finish_daybreak(&mut self) {
        let hunter = powers::holders_of(&self.player_cards_current, Card::Hunter)
            .into_iter()
            .next();
        let eliminated = votes::count_votes(&self.votes, hunter.as_ref());

        let eliminated_cards: HashSet<Card> = eliminated
            .iter()
            .filter_map(|p| self.player_cards_current.get(p).copied())
            .collect();
        let current_cards: Vec<Card> = self.player_cards_current.values().copied().collect();
        let winner = win::determine_winner(&eliminated_cards, &current_cards);

        self.post_game = Some(PostGameResult {
            winner,
            player_cards_original: self.player_cards_original.clone(),
            player_cards_current: self.player_cards_current.clone(),
            table_cards_original: self.table_cards_original,
            table_cards_current: self.table_cards_current,
            eliminated,
        });
        self.phase = GamePhase::Endgame;
        self.wait_list.clear();
    }

    /// Current holders of `Card::Werewolf`, for the Werewolf/Minion
    /// observation phases.
    pub fn observe_werewolves(&self) -> Result<Vec<UserId>, DomainError> {
        match self.phase {
            GamePhase::WerewolfPhase | GamePhase::MinionPhase => {
                Ok(powers::holders_of(&self.player_cards_current, Card::Werewolf))
            }
            _ => Err(DomainError::invalid_transition(
                "werewolves are only observable during the Werewolf or Minion phase",
            )),
        }
    }

    pub fn seer_view_player(
        &mut self,
        seer: &UserId,
        target: &UserId,
    ) -> Result<Card, DomainError> {
        self.require_phase(GamePhase::SeerPhase)?;
        self.require_holds_original(seer, Card::Seer)?;
        self.begin_seer_activation()?;
        let card = powers::seer_view_player(&self.player_cards_current, target)?;
        self.seer_result = Some(SeerResult::Player {
            target: target.clone(),
            card,
        });
        Ok(card)
    }

    pub fn seer_view_table(
        &mut self,
        seer: &UserId,
        a: usize,
        b: usize,
    ) -> Result<(Card, Card), DomainError> {
        self.require_phase(GamePhase::SeerPhase)?;
        self.require_holds_original(seer, Card::Seer)?;
        self.begin_seer_activation()?;
        let cards = powers::seer_view_table(&self.table_cards_current, a, b)?;
        self.seer_result = Some(SeerResult::Table {
            positions: (a, b),
            cards,
        });
        Ok(cards)
    }

    /// `player`'s own originally-dealt card, so an adapter can decide
    /// whether to offer that player's role-power prompt without revealing
    /// anyone else's card. `None` before dealing or for an unknown player.
    pub fn original_card_of(&self, player: &UserId) -> Option<Card> {
        self.player_cards_original.get(player).copied()
    }

    /// Checks that `player` was dealt `card` in the original deal — the
    /// gate every role power uses to confirm only the actual role holder
    /// may activate it.
    fn require_holds_original(&self, player: &UserId, card: Card) -> Result<(), DomainError> {
        if self.player_cards_original.get(player) == Some(&card) {
            Ok(())
        } else {
            Err(DomainError::invalid_transition(format!(
                "{player} does not hold {card}"
            )))
        }
    }

    fn begin_seer_activation(&mut self) -> Result<(), DomainError> {
        if self.seer_activated {
            return Err(DomainError::PowerAlreadyActivated);
        }
        self.seer_activated = true;
        Ok(())
    }

    pub fn seer_result(&self) -> Result<&SeerResult, DomainError> {
        self.seer_result.as_ref().ok_or(DomainError::PowerNotActivated)
    }

    pub fn robber_steal_card(
        &mut self,
        robber: &UserId,
        target: &UserId,
    ) -> Result<Card, DomainError> {
        self.require_phase(GamePhase::RobberPhase)?;
        self.require_holds_original(robber, Card::Robber)?;
        if self.robber_activated {
            return Err(DomainError::PowerAlreadyActivated);
        }
        let stolen = powers::robber_steal_card(&mut self.player_cards_current, robber, target)?;
        self.robber_activated = true;
        self.robber_result = Some(stolen);
        Ok(stolen)
    }

    pub fn robber_result(&self) -> Result<Card, DomainError> {
        self.robber_result.ok_or(DomainError::PowerNotActivated)
    }

    /// First of the Troublemaker's two sequential picks.
    pub fn troublemaker_pick_first(
        &mut self,
        troublemaker: &UserId,
        a: &UserId,
    ) -> Result<(), DomainError> {
        self.require_phase(GamePhase::TroublemakerPhase)?;
        self.require_holds_original(troublemaker, Card::Troublemaker)?;
        if self.troublemaker_activated {
            return Err(DomainError::PowerAlreadyActivated);
        }
        self.troublemaker_pick_a = Some(a.clone());
        Ok(())
    }

    /// Second pick; performs the swap.
    pub fn troublemaker_pick_second(
        &mut self,
        troublemaker: &UserId,
        b: &UserId,
    ) -> Result<(), DomainError> {
        self.require_phase(GamePhase::TroublemakerPhase)?;
        self.require_holds_original(troublemaker, Card::Troublemaker)?;
        if self.troublemaker_activated {
            return Err(DomainError::PowerAlreadyActivated);
        }
        let a = self
            .troublemaker_pick_a
            .take()
            .ok_or_else(|| DomainError::invalid_transition("no first pick recorded"))?;
        powers::troublemaker_switch_cards(&mut self.player_cards_current, &a, b)?;
        self.troublemaker_activated = true;
        Ok(())
    }

    pub fn insomniac_reveal(&mut self, insomniac: &UserId) -> Result<Card, DomainError> {
        self.require_phase(GamePhase::InsomniacPhase)?;
        self.require_holds_original(insomniac, Card::Insomniac)?;
        if self.insomniac_result.is_some() {
            return Err(DomainError::PowerAlreadyActivated);
        }
        let card = powers::insomniac_reveal(&self.player_cards_current, insomniac)?;
        self.insomniac_result = Some(card);
        Ok(card)
    }

    pub fn insomniac_result(&self) -> Result<Card, DomainError> {
        self.insomniac_result.ok_or(DomainError::PowerNotActivated)
    }

    /// A shuffled copy of the original deal, as the Insomniac/end-of-game
    /// `query_cards()` view needs.
    pub fn query_cards(&self, rng: &dyn RandomPort) -> Vec<Card> {
        let mut all: Vec<Card> = self
            .player_cards_original
            .values()
            .copied()
            .chain(self.table_cards_original.iter().copied())
            .collect();
        crate::random::shuffle(&mut all, rng);
        all
    }

    pub fn query_player_cards(&self) -> Result<HashMap<UserId, Card>, DomainError> {
        self.require_dealt()?;
        Ok(self.player_cards_current.clone())
    }

    pub fn query_table_cards(&self) -> Result<[Card; 3], DomainError> {
        self.require_dealt()?;
        Ok(self.table_cards_current)
    }

    fn require_dealt(&self) -> Result<(), DomainError> {
        if self.phase == GamePhase::HavePlayers {
            return Err(DomainError::invalid_transition(
                "cards have not been dealt yet",
            ));
        }
        Ok(())
    }

    pub fn post_game_results(&self) -> Result<&PostGameResult, DomainError> {
        self.post_game.as_ref().ok_or_else(|| {
            DomainError::invalid_transition("post-game results are only available at Endgame")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::FixedRandom;

    fn members(names: &[&str]) -> Vec<UserId> {
        names.iter().map(|n| UserId::new(*n)).collect()
    }

    #[test]
    fn absent_role_phases_are_skipped_without_an_advance_signal() {
        let mut g = GameMachine::new(members(&["alice", "bob", "charlie"]));
        // No optional roles at all: only Werewolf present (2 of them), so
        // every role phase but WerewolfPhase/MinionPhase should be skipped
        // straight through to Daybreak.
        g.deal_cards(2, &[], &FixedRandom(0)).unwrap();
        assert_eq!(g.phase(), GamePhase::WerewolfPhase);
    }

    #[test]
    fn full_role_roster_visits_every_power_phase() {
        let mut g = GameMachine::new(members(&["alice", "bob", "charlie"]));
        g.deal_cards(1, &Card::OPTIONAL_ROLES, &FixedRandom(0)).unwrap();
        // Walk the whole way to Daybreak, signaling every member through
        // each stop (some will be skipped if their role didn't land).
        for _ in 0..20 {
            if g.phase() == GamePhase::Daybreak || g.phase() == GamePhase::Endgame {
                break;
            }
            for m in members(&["alice", "bob", "charlie"]) {
                let _ = g.signal_advance(&m);
            }
        }
        assert_eq!(g.phase(), GamePhase::Daybreak);
    }

    #[test]
    fn troublemaker_swap_example_from_spec() {
        let mut g = GameMachine::new(members(&["alice", "bob", "charlie"]));
        g.deal_cards(1, &[Card::Troublemaker], &FixedRandom(0)).unwrap();

        let all = members(&["alice", "bob", "charlie"]);
        let original = g.player_cards_original.clone();
        let troublemaker = all
            .iter()
            .find(|m| original[*m] == Card::Troublemaker)
            .cloned()
            .expect("Troublemaker was dealt to a player in this scenario");
        let others: Vec<UserId> = all.into_iter().filter(|m| *m != troublemaker).collect();
        let (target_a, target_b) = (others[0].clone(), others[1].clone());

        // Drive to TroublemakerPhase regardless of dealt order by walking
        // signal_advance until we land there (werewolf/minion/seer/robber
        // phases auto-skip if absent).
        for _ in 0..10 {
            if g.phase() == GamePhase::TroublemakerPhase {
                break;
            }
            for m in [&troublemaker, &target_a, &target_b] {
                let _ = g.signal_advance(m);
            }
        }
        assert_eq!(g.phase(), GamePhase::TroublemakerPhase);

        g.troublemaker_pick_first(&troublemaker, &target_a).unwrap();
        g.troublemaker_pick_second(&troublemaker, &target_b).unwrap();

        let current = g.query_player_cards().unwrap();
        assert_eq!(current[&target_a], original[&target_b]);
        assert_eq!(current[&target_b], original[&target_a]);
        assert_eq!(current[&troublemaker], original[&troublemaker]);
    }

    #[test]
    fn voting_and_endgame_tanner_scenario() {
        let mut g = GameMachine::new(members(&["alice", "bob", "charlie"]));
        g.deal_cards(0, &[Card::Tanner], &FixedRandom(0)).unwrap();
        for _ in 0..10 {
            if g.phase() == GamePhase::Daybreak {
                break;
            }
            for m in members(&["alice", "bob", "charlie"]) {
                let _ = g.signal_advance(&m);
            }
        }
        assert_eq!(g.phase(), GamePhase::Daybreak);

        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        let charlie = UserId::new("charlie");
        g.cast_vote(&bob, &alice).unwrap();
        g.cast_vote(&charlie, &alice).unwrap();
        g.cast_vote(&alice, &alice).unwrap();

        assert_eq!(g.phase(), GamePhase::Endgame);
        let results = g.post_game_results().unwrap();
        if results.player_cards_original[&alice] == Card::Tanner {
            assert_eq!(results.winner, WinnerKind::Tanner);
        }
    }

    #[test]
    fn original_card_of_reflects_the_deal_and_ignores_later_swaps() {
        let mut g = GameMachine::new(members(&["alice", "bob", "charlie"]));
        g.deal_cards(1, &[Card::Troublemaker], &FixedRandom(0)).unwrap();
        let original = g.player_cards_original.clone();
        for (player, card) in &original {
            assert_eq!(g.original_card_of(player), Some(*card));
        }
        assert_eq!(g.original_card_of(&UserId::new("nobody")), None);
    }

    #[test]
    fn querying_before_deal_fails() {
        let g = GameMachine::new(members(&["alice"]));
        assert!(g.query_player_cards().is_err());
    }

    #[test]
    fn power_activation_twice_is_an_error() {
        let mut g = GameMachine::new(members(&["alice", "bob", "charlie"]));
        g.deal_cards(0, &[Card::Seer], &FixedRandom(0)).unwrap();
        if g.phase() == GamePhase::SeerPhase {
            let all = members(&["alice", "bob", "charlie"]);
            let original = g.player_cards_original.clone();
            let seer = all
                .iter()
                .find(|m| original[*m] == Card::Seer)
                .cloned()
                .expect("Seer was dealt to a player in this scenario");
            let other = all.into_iter().find(|m| *m != seer).unwrap();
            let _ = g.seer_view_player(&seer, &other);
            let err = g.seer_view_player(&seer, &other).unwrap_err();
            assert_eq!(err, DomainError::PowerAlreadyActivated);
        }
    }
}
