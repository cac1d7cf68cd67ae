//! The dialog stack (§4.4): Help, Chat, SessionAdmin, ChoosePlayer,
//! BriefMessage/SystemMessage. Ported in spirit from `dialogs.py`; each
//! `Dialog` here is handed its rendering context explicitly rather than
//! holding a weak back-reference to its parent application (the source's
//! `weakref.ref(self)` dance), which sidesteps the reference-cycle concern
//! §9 calls out entirely rather than re-implementing it with `Weak`.

use std::collections::HashSet;
use std::time::Duration;

use txwerewolves_domain::{Card, UserId};

use super::keymap::Key;
use super::render;

/// What the application should do in response to a key the dialog
/// consumed. Dialogs never touch the registries or signal bus directly
/// (§4.2's "side effects performed by the adapter" principle, generalized
/// to dialogs); they hand back a description of the effect instead.
pub enum DialogOutcome {
    /// The key was not meaningful to this dialog; fall through to the
    /// application's own command table.
    Fallthrough,
    /// The key was consumed; redraw, keep the dialog installed.
    Handled,
    /// The key was consumed and the dialog should be uninstalled.
    Close,
    SendChat(String),
    CommitSettings {
        werewolf_count: u32,
        roles: HashSet<Card>,
    },
    /// A player was picked from a `ChoosePlayerDialog`; `purpose` says what
    /// the application should do with the pick (invite, Seer target,
    /// Robber target, ...).
    PlayerChosen(SelectionPurpose, UserId),
}

/// What a `ChoosePlayerDialog`'s selection feeds into (§4.4's "choose a
/// player" dialog is reused across invites and every single-target night
/// power rather than duplicated per use).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPurpose {
    Invite,
    SeerPlayer,
    RobberTarget,
    TroublemakerFirst,
    TroublemakerSecond,
    Vote,
}

/// Context a dialog needs to draw itself; passed in rather than stored, so
/// dialogs hold no reference back to the application.
pub struct RenderCtx<'a> {
    pub width: u16,
    pub height: u16,
    pub chat_scrollback: &'a [(UserId, String)],
    pub pending_settings: (u32, &'a HashSet<Card>),
}

pub trait Dialog: Send + Sync {
    fn draw(&self, ctx: &RenderCtx<'_>) -> String;
    fn handle_input(&mut self, key: Key) -> DialogOutcome;
    /// Cursor position to place after drawing, if this dialog wants the
    /// cursor positioned somewhere other than the application's default
    /// (§4.4 `set_cursor_pos`).
    fn cursor_pos(&self, _ctx: &RenderCtx<'_>) -> Option<(u16, u16)> {
        None
    }
    /// A non-negative auto-close duration installs a timer that uninstalls
    /// this dialog even without input (§4.4 BriefMessage/SystemMessage,
    /// §5 "dialogs with msg_duration >= 0").
    fn auto_close_after(&self) -> Option<Duration> {
        None
    }
}

pub struct HelpDialog;

impl Dialog for HelpDialog {
    fn draw(&self, ctx: &RenderCtx<'_>) -> String {
        let mut out = String::new();
        out.push_str(&render::centered("Available Commands", ctx.width));
        out.push('\n');
        out.push_str(
            "h        - This help.\n\
             q or ESC - Close this dialog.\n\
             TAB      - Toggle chat window.\n\
             CTRL-A   - Session settings (owner only).\n\
             CTRL-X   - Shut down the session.\n\
             CTRL-D   - Disconnect.\n",
        );
        out
    }

    fn handle_input(&mut self, _key: Key) -> DialogOutcome {
        // §4.4: any key closes this dialog.
        DialogOutcome::Close
    }
}

/// Split-pane chat: prompt with cursor editing plus session scrollback
/// (§4.4). TAB toggles the dialog closed; Enter sends and clears the
/// prompt.
#[derive(Default)]
pub struct ChatDialog {
    prompt: String,
    cursor: usize,
}

impl ChatDialog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Dialog for ChatDialog {
    fn draw(&self, ctx: &RenderCtx<'_>) -> String {
        let mut out = String::new();
        out.push_str(&render::section_rule(ctx.width));
        out.push('\n');
        for (sender, text) in ctx.chat_scrollback.iter().rev().take(10).rev() {
            out.push_str(&format!("{sender}: {text}\n"));
        }
        out.push_str(&format!(">>> {}", self.prompt));
        out
    }

    fn handle_input(&mut self, key: Key) -> DialogOutcome {
        match key {
            Key::Tab => DialogOutcome::Close,
            Key::Enter => {
                if self.prompt.is_empty() {
                    return DialogOutcome::Handled;
                }
                let text = std::mem::take(&mut self.prompt);
                self.cursor = 0;
                DialogOutcome::SendChat(text)
            }
            Key::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.prompt.remove(self.cursor);
                }
                DialogOutcome::Handled
            }
            Key::ArrowLeft => {
                self.cursor = self.cursor.saturating_sub(1);
                DialogOutcome::Handled
            }
            Key::Char(c) => {
                self.prompt.insert(self.cursor, c);
                self.cursor += 1;
                DialogOutcome::Handled
            }
            _ => DialogOutcome::Handled,
        }
    }

    fn cursor_pos(&self, ctx: &RenderCtx<'_>) -> Option<(u16, u16)> {
        Some((4 + self.cursor as u16, ctx.height.saturating_sub(1)))
    }
}

/// Digit keys set the pending werewolf count (clamped to [1, 9]); role
/// letters toggle optional-role inclusion; CTRL-R commits (§4.4).
pub struct SessionAdminDialog {
    pub werewolf_count: u32,
    pub roles: HashSet<Card>,
}

impl SessionAdminDialog {
    pub fn new(werewolf_count: u32, roles: HashSet<Card>) -> Self {
        Self {
            werewolf_count,
            roles,
        }
    }

    fn role_for_letter(c: char) -> Option<Card> {
        match c {
            's' => Some(Card::Seer),
            'r' => Some(Card::Robber),
            't' => Some(Card::Troublemaker),
            'm' => Some(Card::Minion),
            'o' => Some(Card::Insomniac),
            'u' => Some(Card::Hunter),
            _ => None,
        }
    }
}

impl Dialog for SessionAdminDialog {
    fn draw(&self, ctx: &RenderCtx<'_>) -> String {
        let mut out = String::new();
        out.push_str(&render::centered("Session Settings", ctx.width));
        out.push('\n');
        out.push_str(&format!("Werewolves: {}  (1-9 to change)\n", self.werewolf_count));
        for card in Card::OPTIONAL_ROLES {
            let mark = if self.roles.contains(&card) { 'x' } else { ' ' };
            out.push_str(&format!("[{mark}] {}\n", card.display_name()));
        }
        out.push_str("CTRL-R to commit and restart the game.\n");
        out
    }

    fn handle_input(&mut self, key: Key) -> DialogOutcome {
        match key {
            Key::Char(c) if c.is_ascii_digit() => {
                let n = c.to_digit(10).unwrap_or(1).clamp(1, 9);
                self.werewolf_count = n;
                DialogOutcome::Handled
            }
            Key::Char(c) => {
                if let Some(card) = Self::role_for_letter(c) {
                    if !self.roles.remove(&card) {
                        self.roles.insert(card);
                    }
                }
                DialogOutcome::Handled
            }
            Key::Ctrl('r') => DialogOutcome::CommitSettings {
                werewolf_count: self.werewolf_count,
                roles: self.roles.clone(),
            },
            Key::Escape => DialogOutcome::Close,
            _ => DialogOutcome::Handled,
        }
    }
}

/// Scrollable player list; up/down moves the selection, `i` invites the
/// selected player, `q` cancels (§4.4).
pub struct ChoosePlayerDialog {
    pub players: Vec<UserId>,
    pub selected: usize,
    pub purpose: SelectionPurpose,
}

impl ChoosePlayerDialog {
    pub fn new(players: Vec<UserId>, purpose: SelectionPurpose) -> Self {
        Self {
            players,
            selected: 0,
            purpose,
        }
    }
}

impl Dialog for ChoosePlayerDialog {
    fn draw(&self, ctx: &RenderCtx<'_>) -> String {
        let mut out = String::new();
        out.push_str(&render::centered("Choose a player", ctx.width));
        out.push('\n');
        for (n, player) in self.players.iter().enumerate() {
            let marker = if n == self.selected { '>' } else { ' ' };
            out.push_str(&format!("{marker} {player}\n"));
        }
        out.push_str("(i)nvite  (q)uit\n");
        out
    }

    fn handle_input(&mut self, key: Key) -> DialogOutcome {
        match key {
            Key::ArrowUp => {
                self.selected = self.selected.saturating_sub(1);
                DialogOutcome::Handled
            }
            Key::ArrowDown => {
                if self.selected + 1 < self.players.len() {
                    self.selected += 1;
                }
                DialogOutcome::Handled
            }
            Key::Char('i') => self
                .players
                .get(self.selected)
                .cloned()
                .map(|player| DialogOutcome::PlayerChosen(self.purpose, player))
                .unwrap_or(DialogOutcome::Handled),
            Key::Char('q') | Key::Escape => DialogOutcome::Close,
            _ => DialogOutcome::Handled,
        }
    }
}

/// Transient message; closes on any key or after `duration` (§4.4).
pub struct BriefMessageDialog {
    pub text: String,
    pub duration: Option<Duration>,
}

impl BriefMessageDialog {
    pub fn new(text: impl Into<String>, duration: Option<Duration>) -> Self {
        Self {
            text: text.into(),
            duration,
        }
    }
}

impl Dialog for BriefMessageDialog {
    fn draw(&self, ctx: &RenderCtx<'_>) -> String {
        render::centered(&self.text, ctx.width)
    }

    fn handle_input(&mut self, _key: Key) -> DialogOutcome {
        DialogOutcome::Close
    }

    fn auto_close_after(&self) -> Option<Duration> {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RenderCtx<'static> {
        RenderCtx {
            width: 40,
            height: 10,
            chat_scrollback: &[],
            pending_settings: (1, &EMPTY_ROLES),
        }
    }

    static EMPTY_ROLES: std::sync::OnceLock<HashSet<Card>> = std::sync::OnceLock::new();

    #[test]
    fn help_dialog_closes_on_any_key() {
        let mut dialog = HelpDialog;
        assert!(matches!(dialog.handle_input(Key::Char('z')), DialogOutcome::Close));
    }

    #[test]
    fn chat_dialog_enter_sends_and_clears() {
        let mut dialog = ChatDialog::new();
        dialog.handle_input(Key::Char('h'));
        dialog.handle_input(Key::Char('i'));
        match dialog.handle_input(Key::Enter) {
            DialogOutcome::SendChat(text) => assert_eq!(text, "hi"),
            _ => panic!("expected SendChat"),
        }
        assert!(dialog.prompt.is_empty());
    }

    #[test]
    fn chat_dialog_tab_closes() {
        let mut dialog = ChatDialog::new();
        assert!(matches!(dialog.handle_input(Key::Tab), DialogOutcome::Close));
    }

    #[test]
    fn session_admin_clamps_werewolf_count() {
        let mut dialog = SessionAdminDialog::new(1, HashSet::new());
        dialog.handle_input(Key::Char('9'));
        assert_eq!(dialog.werewolf_count, 9);
    }

    #[test]
    fn session_admin_toggles_role() {
        let mut dialog = SessionAdminDialog::new(1, HashSet::new());
        dialog.handle_input(Key::Char('s'));
        assert!(dialog.roles.contains(&Card::Seer));
        dialog.handle_input(Key::Char('s'));
        assert!(!dialog.roles.contains(&Card::Seer));
    }

    #[test]
    fn choose_player_arrow_down_moves_selection() {
        let mut dialog = ChoosePlayerDialog::new(
            vec![UserId::new("a"), UserId::new("b")],
            SelectionPurpose::Invite,
        );
        dialog.handle_input(Key::ArrowDown);
        assert_eq!(dialog.selected, 1);
    }

    #[test]
    fn choose_player_invite_returns_selected() {
        let mut dialog = ChoosePlayerDialog::new(
            vec![UserId::new("a"), UserId::new("b")],
            SelectionPurpose::Invite,
        );
        dialog.handle_input(Key::ArrowDown);
        match dialog.handle_input(Key::Char('i')) {
            DialogOutcome::PlayerChosen(SelectionPurpose::Invite, user) => {
                assert_eq!(user, UserId::new("b"))
            }
            _ => panic!("expected PlayerChosen"),
        }
    }

    #[test]
    fn render_ctx_smoke() {
        let c = ctx();
        assert_eq!(c.width, 40);
    }
}
