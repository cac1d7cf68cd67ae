//! Role cards.

use serde::{Deserialize, Serialize};

/// A tagged role card. Mirrors `WerewolfGame.CARD_*` in the original
/// implementation one-for-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Card {
    Werewolf,
    Seer,
    Robber,
    Troublemaker,
    Villager,
    Minion,
    Insomniac,
    Hunter,
    Tanner,
}

impl Card {
    /// Cards a table's "optional role" settings may include, i.e. every card
    /// other than Werewolf (dealt via the werewolf count) and Villager
    /// (the padding card).
    pub const OPTIONAL_ROLES: [Card; 6] = [
        Card::Seer,
        Card::Robber,
        Card::Troublemaker,
        Card::Minion,
        Card::Insomniac,
        Card::Hunter,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Card::Werewolf => "Werewolf",
            Card::Seer => "Seer",
            Card::Robber => "Robber",
            Card::Troublemaker => "Troublemaker",
            Card::Villager => "Villager",
            Card::Minion => "Minion",
            Card::Insomniac => "Insomniac",
            Card::Hunter => "Hunter",
            Card::Tanner => "Tanner",
        }
    }
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_roles_excludes_werewolf_and_villager() {
        assert!(!Card::OPTIONAL_ROLES.contains(&Card::Werewolf));
        assert!(!Card::OPTIONAL_ROLES.contains(&Card::Villager));
    }

    #[test]
    fn display_name_matches_card() {
        assert_eq!(Card::Tanner.display_name(), "Tanner");
        assert_eq!(Card::Tanner.to_string(), "Tanner");
    }
}
