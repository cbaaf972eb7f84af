//! HUD collaborator
//!
//! The simulation never touches the HUD directly. It queues [`GameEvent`]s;
//! the host drains them once per frame and hands them to [`dispatch_events`],
//! which forwards the HUD calls and returns what audio and the loop still
//! need to act on.

use crate::assets::SoundCue;
use crate::leaderboard::{LeaderboardEntry, LeaderboardError};
use crate::sim::GameEvent;
use crate::consts::MESSAGE_MS;

/// Overlay surface: score, lives, transient messages, terminal screens
pub trait Hud {
    fn update_score(&mut self, score: u64);
    fn update_lives(&mut self, lives: u32);
    fn show_message(&mut self, text: &str, duration_ms: u32);
    fn show_game_over(&mut self, score: u64);
    fn show_leaderboard(&mut self, entries: &[LeaderboardEntry]);
}

/// Audio work pulled out of the event stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioRequest {
    Play(SoundCue),
    StartMusic,
    StopMusic,
}

/// What the host still has to do after the HUD was updated
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dispatch {
    pub audio: Vec<AudioRequest>,
    /// Final score when the run ended this frame
    pub game_over: Option<u64>,
}

/// Forward queued events to the HUD
pub fn dispatch_events<H, I>(hud: &mut H, events: I) -> Dispatch
where
    H: Hud + ?Sized,
    I: IntoIterator<Item = GameEvent>,
{
    let mut out = Dispatch::default();
    for event in events {
        match event {
            GameEvent::ScoreChanged(score) => hud.update_score(score),
            GameEvent::LivesChanged(lives) => hud.update_lives(lives),
            GameEvent::Message { text, duration_ms } => hud.show_message(&text, duration_ms),
            GameEvent::Sound(cue) => out.audio.push(AudioRequest::Play(cue)),
            GameEvent::StartMusic => out.audio.push(AudioRequest::StartMusic),
            GameEvent::StopMusic => out.audio.push(AudioRequest::StopMusic),
            GameEvent::GameOver { score } => {
                hud.show_game_over(score);
                out.game_over = Some(score);
            }
        }
    }
    out
}

/// Surface a leaderboard failure as a transient message
pub fn report_leaderboard_error<H: Hud + ?Sized>(hud: &mut H, context: &str, err: &LeaderboardError) {
    log::warn!("{context}: {err}");
    hud.show_message(context, MESSAGE_MS * 2);
}

/// Rows as shown in the leaderboard list: rank, player, score
pub fn leaderboard_rows(entries: &[LeaderboardEntry]) -> Vec<(usize, String, u64)> {
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| (i + 1, e.display_name(), e.score))
        .collect()
}

/// HUD that writes to the log; used by the headless native run
#[derive(Debug, Default)]
pub struct LogHud;

impl Hud for LogHud {
    fn update_score(&mut self, score: u64) {
        log::debug!("score {score}");
    }

    fn update_lives(&mut self, lives: u32) {
        log::info!("lives {lives}");
    }

    fn show_message(&mut self, text: &str, _duration_ms: u32) {
        log::info!("{text}");
    }

    fn show_game_over(&mut self, score: u64) {
        log::info!("Game over, final score {score}");
    }

    fn show_leaderboard(&mut self, entries: &[LeaderboardEntry]) {
        for (rank, name, score) in leaderboard_rows(entries) {
            log::info!("{rank:>2}. {name:<20} {score}");
        }
    }
}

/// HUD that remembers every call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingHud {
    pub score: u64,
    pub lives: Option<u32>,
    pub messages: Vec<(String, u32)>,
    pub game_over: Vec<u64>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl Hud for RecordingHud {
    fn update_score(&mut self, score: u64) {
        self.score = score;
    }

    fn update_lives(&mut self, lives: u32) {
        self.lives = Some(lives);
    }

    fn show_message(&mut self, text: &str, duration_ms: u32) {
        self.messages.push((text.to_string(), duration_ms));
    }

    fn show_game_over(&mut self, score: u64) {
        self.game_over.push(score);
    }

    fn show_leaderboard(&mut self, entries: &[LeaderboardEntry]) {
        self.leaderboard = entries.to_vec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_routes_events() {
        let mut hud = RecordingHud::default();
        let events = vec![
            GameEvent::ScoreChanged(15),
            GameEvent::LivesChanged(2),
            GameEvent::Message {
                text: "2X POINTS!".into(),
                duration_ms: 1000,
            },
            GameEvent::Sound(SoundCue::Dunk),
            GameEvent::StopMusic,
            GameEvent::GameOver { score: 15 },
        ];
        let out = dispatch_events(&mut hud, events);

        assert_eq!(hud.score, 15);
        assert_eq!(hud.lives, Some(2));
        assert_eq!(hud.messages, vec![("2X POINTS!".to_string(), 1000)]);
        assert_eq!(hud.game_over, vec![15]);
        assert_eq!(
            out.audio,
            vec![AudioRequest::Play(SoundCue::Dunk), AudioRequest::StopMusic]
        );
        assert_eq!(out.game_over, Some(15));
    }

    #[test]
    fn test_empty_dispatch() {
        let mut hud = RecordingHud::default();
        assert_eq!(dispatch_events(&mut hud, Vec::new()), Dispatch::default());
    }

    #[test]
    fn test_leaderboard_error_becomes_message() {
        let mut hud = RecordingHud::default();
        report_leaderboard_error(&mut hud, "Error saving score", &LeaderboardError::Status(503));
        assert_eq!(hud.messages.len(), 1);
        assert_eq!(hud.messages[0].0, "Error saving score");
    }

    #[test]
    fn test_leaderboard_rows_are_ranked() {
        let entries = vec![
            LeaderboardEntry::for_email("jane.doe@example.com", 90, 0.0),
            LeaderboardEntry::for_email("bob@example.com", 40, 0.0),
        ];
        let rows = leaderboard_rows(&entries);
        assert_eq!(rows[0], (1, "JD (Unknown)".to_string(), 90));
        assert_eq!(rows[1].0, 2);
        assert_eq!(rows[1].2, 40);
    }
}
