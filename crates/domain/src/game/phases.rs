//! The night-cycle phase order and the role card each phase gates on.

use crate::card::Card;

/// Ordered states of `GameMachine`, matching the night cycle one-to-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum GamePhase {
    HavePlayers,
    CardsDealt,
    WerewolfPhase,
    MinionPhase,
    SeerPhase,
    SeerPowerActivated,
    RobberPhase,
    RobberPowerActivated,
    TroublemakerPhase,
    TroublemakerPowerActivated,
    InsomniacPhase,
    Daybreak,
    Endgame,
}

/// The full phase order, used both for `advance` and for locating a phase's
/// position.
pub const ORDER: [GamePhase; 13] = [
    GamePhase::HavePlayers,
    GamePhase::CardsDealt,
    GamePhase::WerewolfPhase,
    GamePhase::MinionPhase,
    GamePhase::SeerPhase,
    GamePhase::SeerPowerActivated,
    GamePhase::RobberPhase,
    GamePhase::RobberPowerActivated,
    GamePhase::TroublemakerPhase,
    GamePhase::TroublemakerPowerActivated,
    GamePhase::InsomniacPhase,
    GamePhase::Daybreak,
    GamePhase::Endgame,
];

impl GamePhase {
    /// The role card this phase is transparent to when absent from the
    /// dealt deck. `None` for phases with no associated role (including the
    /// ceremonial `*PowerActivated` phases, which always run).
    pub fn gating_role(self) -> Option<Card> {
        match self {
            GamePhase::WerewolfPhase => Some(Card::Werewolf),
            GamePhase::MinionPhase => Some(Card::Minion),
            GamePhase::SeerPhase => Some(Card::Seer),
            GamePhase::RobberPhase => Some(Card::Robber),
            GamePhase::TroublemakerPhase => Some(Card::Troublemaker),
            GamePhase::InsomniacPhase => Some(Card::Insomniac),
            _ => None,
        }
    }

    /// Does this phase own a per-member wait list that gates its advance?
    pub fn has_wait_list(self) -> bool {
        !matches!(
            self,
            GamePhase::HavePlayers | GamePhase::CardsDealt | GamePhase::Endgame
        )
    }

    pub fn next(self) -> Option<GamePhase> {
        let idx = ORDER.iter().position(|p| *p == self)?;
        ORDER.get(idx + 1).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn night_role_phases_gate_on_their_card() {
        assert_eq!(GamePhase::SeerPhase.gating_role(), Some(Card::Seer));
        assert_eq!(GamePhase::SeerPowerActivated.gating_role(), None);
    }

    #[test]
    fn order_is_strictly_increasing_and_terminates() {
        let mut p = GamePhase::HavePlayers;
        let mut steps = 0;
        while let Some(next) = p.next() {
            p = next;
            steps += 1;
            assert!(steps <= ORDER.len());
        }
        assert_eq!(p, GamePhase::Endgame);
    }
}
