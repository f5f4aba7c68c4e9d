//! Autoplay and quality escalation.
//!
//! Playback starts muted (autoplay policies demand it) and is unmuted once it
//! is actually playing. Unmuting, or the player reporting ready, triggers a
//! burst of quality commands: lock the range to the top tier, then request
//! each tier from highest to lowest so the player settles on the best one it
//! has. The burst is sent at most once per page life, except that a fresh
//! `onReady` means the player re-initialized and gets a new burst.

use std::time::Duration;

use log::debug;

use super::player::{PlayerCommand, PlayerEvent, QUALITY_ORDER};

/// A player command and how long after the trigger to post it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledCommand {
    pub delay: Duration,
    pub command: PlayerCommand,
}

/// What the host should do once playback has started.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayingStep {
    pub unmute: bool,
    pub commands: Vec<ScheduledCommand>,
}

#[derive(Debug)]
pub struct AutoplayDriver {
    stagger: Duration,
    unmuted: bool,
    quality_requested: bool,
}

impl AutoplayDriver {
    pub fn new(stagger: Duration) -> Self {
        Self {
            stagger,
            unmuted: false,
            quality_requested: false,
        }
    }

    pub fn quality_requested(&self) -> bool {
        self.quality_requested
    }

    /// The video element started playing.
    pub fn on_playing(&mut self) -> PlayingStep {
        if self.unmuted {
            return PlayingStep::default();
        }
        self.unmuted = true;
        PlayingStep {
            unmute: true,
            commands: self.quality_burst(),
        }
    }

    pub fn on_player_event(&mut self, event: &PlayerEvent) -> Vec<ScheduledCommand> {
        match event {
            PlayerEvent::Ready => {
                debug!(target: "content", "Player ready; re-requesting quality");
                self.quality_requested = false;
                self.quality_burst()
            }
            _ => Vec::new(),
        }
    }

    /// Quality commands, or nothing if this page life already sent them.
    pub fn quality_burst(&mut self) -> Vec<ScheduledCommand> {
        if self.quality_requested {
            return Vec::new();
        }
        self.quality_requested = true;

        let mut commands = Vec::with_capacity(QUALITY_ORDER.len() + 1);
        commands.push(ScheduledCommand {
            delay: Duration::ZERO,
            command: PlayerCommand::set_quality_range(QUALITY_ORDER[0]),
        });
        for (i, tier) in QUALITY_ORDER.iter().enumerate() {
            commands.push(ScheduledCommand {
                delay: self.stagger * (i as u32 + 1),
                command: PlayerCommand::set_quality(tier),
            });
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> AutoplayDriver {
        AutoplayDriver::new(Duration::from_millis(150))
    }

    #[test]
    fn burst_locks_range_then_walks_tiers_down() {
        let commands = driver().quality_burst();
        assert_eq!(commands.len(), 7);
        assert_eq!(commands[0].command.func, "setPlaybackQualityRange");
        assert_eq!(commands[0].delay, Duration::ZERO);

        let tiers: Vec<&str> = commands[1..]
            .iter()
            .map(|c| c.command.args[0].as_str().unwrap())
            .collect();
        assert_eq!(tiers, QUALITY_ORDER.to_vec());
        assert_eq!(commands[1].delay, Duration::from_millis(150));
        assert_eq!(commands[6].delay, Duration::from_millis(900));
    }

    #[test]
    fn burst_is_sent_once_per_page_life() {
        let mut driver = driver();
        assert!(!driver.quality_burst().is_empty());
        assert!(driver.quality_burst().is_empty());
        assert!(driver.quality_requested());
    }

    #[test]
    fn first_playing_unmutes_and_requests_quality() {
        let mut driver = driver();
        let step = driver.on_playing();
        assert!(step.unmute);
        assert_eq!(step.commands.len(), 7);

        assert_eq!(driver.on_playing(), PlayingStep::default());
    }

    #[test]
    fn ready_resets_the_latch() {
        let mut driver = driver();
        driver.on_playing();
        assert_eq!(driver.on_player_event(&PlayerEvent::Ready).len(), 7);
        assert!(driver.on_player_event(&PlayerEvent::StateChange(1)).is_empty());
        assert!(driver.quality_burst().is_empty());
    }
}
