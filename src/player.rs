//! Per-guild player state.
//!
//! A [`Player`] lives as the user data of a Lavalink player context, so it is
//! created when the bot joins a voice channel and dropped when the context is
//! deleted. The methods here only update state and tell the caller which
//! track, if any, should be sent to the node next.
use std::time::Duration;

use lavalink_rs::model::track::TrackData;
use serenity::model::id::ChannelId;

use crate::{
    error::{MusicError, MusicResult},
    queue::Queue,
};

/// Volume a fresh player starts at.
pub const DEFAULT_VOLUME: u16 = 10;
pub const MAX_VOLUME: u16 = 200;
/// How many tracks the queue command lists when not told otherwise.
pub const DEFAULT_SHOW_COUNT: usize = 10;

pub type GuildPlayer = Player<TrackData>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// What the node has to do after a command moved the queue.
///
/// `track` is started with `play_now`, or the node is stopped when there is
/// none. The node keeps its own pause flag across track changes, so
/// `unpause` says it must be lifted to match the player.
#[derive(Debug, PartialEq, Eq)]
pub struct Transition<T> {
    pub track: Option<T>,
    pub unpause: bool,
}

#[derive(Debug)]
pub struct Player<T> {
    queue: Queue<T>,
    state: PlayerState,
    volume: u16,
    pub latest_query: String,
    pub text_channel: ChannelId,
    pub autoplay: bool,
    pub chipmunk: bool,
}

impl<T: Clone> Player<T> {
    pub fn new(text_channel: ChannelId) -> Self {
        Self {
            queue: Queue::new(),
            state: PlayerState::Idle,
            volume: DEFAULT_VOLUME,
            latest_query: String::new(),
            text_channel,
            autoplay: false,
            chipmunk: false,
        }
    }

    pub fn queue(&self) -> &Queue<T> {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut Queue<T> {
        &mut self.queue
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != PlayerState::Idle
    }

    pub fn is_paused(&self) -> bool {
        self.state == PlayerState::Paused
    }

    pub fn volume(&self) -> u16 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: u16) {
        self.volume = volume.min(MAX_VOLUME);
    }

    /// The track the node should be playing, if any.
    pub fn current(&self) -> MusicResult<&T> {
        if !self.is_active() {
            return Err(MusicError::NothingPlaying);
        }
        self.queue.current().ok_or(MusicError::NothingPlaying)
    }

    /// Queues tracks and, if the player was idle, returns the one to start.
    pub fn enqueue(&mut self, tracks: impl IntoIterator<Item = T>) -> Option<T> {
        self.queue.add(tracks);

        if self.is_active() {
            return None;
        }

        // After the last track ended the cursor sits on the old `len`, which
        // is now the first of the new tracks.
        let next = self.queue.current().cloned()?;

        self.state = PlayerState::Playing;
        Some(next)
    }

    pub fn pause(&mut self) -> MusicResult<()> {
        self.current()?;
        self.state = PlayerState::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> MusicResult<()> {
        self.current()?;
        self.state = PlayerState::Playing;
        Ok(())
    }

    /// Flips between paused and playing; returns whether the player is now
    /// paused.
    pub fn toggle_pause(&mut self) -> MusicResult<bool> {
        if self.is_paused() {
            self.resume()?;
        } else {
            self.pause()?;
        }
        Ok(self.is_paused())
    }

    /// Called when the node reports the current track ended on its own.
    pub fn track_finished(&mut self) -> Option<T> {
        if self.queue.repeat_mode() == crate::queue::RepeatMode::Song {
            if let Some(track) = self.queue.current() {
                let track = track.clone();
                self.state = PlayerState::Playing;
                return Some(track);
            }
        }

        self.step()
    }

    /// Skips the current track regardless of song repeat.
    pub fn skip(&mut self) -> MusicResult<Transition<T>> {
        self.current()?;
        if self.queue.is_empty() {
            return Err(MusicError::QueueIsEmpty);
        }
        let unpause = self.is_paused();
        let track = self.step();
        Ok(Transition { track, unpause })
    }

    fn step(&mut self) -> Option<T> {
        match self.queue.advance().cloned() {
            Some(track) => {
                self.state = PlayerState::Playing;
                Some(track)
            }
            None => {
                self.state = PlayerState::Idle;
                None
            }
        }
    }

    pub fn previous(&mut self) -> MusicResult<Transition<T>> {
        let track = self.queue.rewind()?.clone();
        let unpause = self.is_paused();
        self.state = PlayerState::Playing;
        Ok(Transition {
            track: Some(track),
            unpause,
        })
    }

    pub fn stop(&mut self) -> MusicResult<Transition<T>> {
        if !self.is_active() && self.queue.upcoming().is_empty() {
            return Err(MusicError::NothingPlaying);
        }
        let unpause = self.is_paused();
        self.queue.reset();
        self.state = PlayerState::Idle;
        Ok(Transition {
            track: None,
            unpause,
        })
    }

    /// Gives up on the rest of the queue after the node failed to start a
    /// track. Tracks queued afterwards start playing straight away.
    pub fn halt(&mut self) {
        self.queue.skip_to_end();
        self.state = PlayerState::Idle;
    }

    pub fn clear(&mut self) -> MusicResult<()> {
        if self.queue.is_empty() {
            return Err(MusicError::QueueIsEmpty);
        }
        self.queue.clear_upcoming();
        if self.queue.is_empty() {
            self.state = PlayerState::Idle;
        }
        Ok(())
    }
}

fn parse_digits(arg: &str, err: MusicError) -> MusicResult<u64> {
    let arg = arg.trim();
    if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err);
    }
    // All digits, so the only failure left is overflow.
    arg.parse().map_err(|_| err)
}

pub fn parse_volume(arg: &str) -> MusicResult<u16> {
    let volume = parse_digits(arg, MusicError::NotDigit)?;
    match volume {
        0 => Err(MusicError::TooLowVolume),
        v if v > MAX_VOLUME as u64 => Err(MusicError::TooHighVolume),
        v => Ok(v as u16),
    }
}

/// Parses a seek target in whole seconds and checks it fits inside the track.
pub fn parse_seek(arg: &str, track_length_ms: u64) -> MusicResult<Duration> {
    let seconds = parse_digits(arg, MusicError::InvalidTimeString)?;
    let target = Duration::from_secs(seconds);
    if target.as_millis() > track_length_ms as u128 {
        return Err(MusicError::InvalidPosition);
    }
    Ok(target)
}

pub fn parse_show_count(arg: Option<&str>) -> MusicResult<usize> {
    let Some(arg) = arg else {
        return Ok(DEFAULT_SHOW_COUNT);
    };
    let count = parse_digits(arg, MusicError::NotDigit)?;
    if count <= 1 {
        return Err(MusicError::TooShort);
    }
    Ok(usize::try_from(count).unwrap_or(usize::MAX))
}

pub fn parse_slot(arg: &str) -> MusicResult<usize> {
    let slot = parse_digits(arg, MusicError::FaultyIndex)?;
    usize::try_from(slot).map_err(|_| MusicError::FaultyIndex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::RepeatMode;

    fn player() -> Player<&'static str> {
        Player::new(ChannelId::new(1))
    }

    #[test]
    fn new_player_is_idle_at_default_volume() {
        let player = player();

        assert_eq!(player.state(), PlayerState::Idle);
        assert_eq!(player.volume(), DEFAULT_VOLUME);
        assert_eq!(player.current(), Err(MusicError::NothingPlaying));
    }

    #[test]
    fn first_enqueue_starts_playback() {
        let mut player = player();

        assert_eq!(player.enqueue(["a"]), Some("a"));
        assert_eq!(player.state(), PlayerState::Playing);
        assert_eq!(player.enqueue(["b"]), None);
        assert_eq!(player.current(), Ok(&"a"));
    }

    #[test]
    fn enqueue_after_queue_ran_dry_plays_new_track() {
        let mut player = player();
        player.enqueue(["a"]);
        assert_eq!(player.track_finished(), None);
        assert_eq!(player.state(), PlayerState::Idle);

        assert_eq!(player.enqueue(["b", "c"]), Some("b"));
        assert_eq!(player.queue().history(), &["a"]);
    }

    #[test]
    fn pause_and_resume_need_a_track() {
        let mut player = player();
        assert_eq!(player.toggle_pause(), Err(MusicError::NothingPlaying));

        player.enqueue(["a"]);
        assert_eq!(player.toggle_pause(), Ok(true));
        assert!(player.is_paused());
        assert_eq!(player.toggle_pause(), Ok(false));
        assert_eq!(player.state(), PlayerState::Playing);
    }

    #[test]
    fn finished_track_advances() {
        let mut player = player();
        player.enqueue(["a", "b"]);

        assert_eq!(player.track_finished(), Some("b"));
        assert_eq!(player.track_finished(), None);
        assert!(!player.is_active());
    }

    #[test]
    fn song_repeat_replays_current() {
        let mut player = player();
        player.enqueue(["a", "b"]);
        player.queue_mut().set_repeat_mode(RepeatMode::Song);

        assert_eq!(player.track_finished(), Some("a"));
        assert_eq!(player.track_finished(), Some("a"));
    }

    #[test]
    fn skip_ignores_song_repeat() {
        let mut player = player();
        player.enqueue(["a", "b"]);
        player.queue_mut().set_repeat_mode(RepeatMode::Song);

        assert_eq!(player.skip().map(|t| t.track), Ok(Some("b")));
        assert_eq!(player.skip().map(|t| t.track), Ok(None));
        assert_eq!(player.skip(), Err(MusicError::NothingPlaying));
    }

    #[test]
    fn skipping_while_paused_asks_to_unpause() {
        let mut player = player();
        player.enqueue(["a", "b"]);
        assert_eq!(player.toggle_pause(), Ok(true));

        assert_eq!(
            player.skip(),
            Ok(Transition {
                track: Some("b"),
                unpause: true
            })
        );
        assert_eq!(player.state(), PlayerState::Playing);

        // Playing again, so a single pause is enough.
        assert_eq!(player.toggle_pause(), Ok(true));
    }

    #[test]
    fn skipping_past_the_end_while_paused_still_unpauses() {
        let mut player = player();
        player.enqueue(["a"]);
        player.toggle_pause().unwrap();

        assert_eq!(
            player.skip(),
            Ok(Transition {
                track: None,
                unpause: true
            })
        );
        assert_eq!(player.state(), PlayerState::Idle);
    }

    #[test]
    fn previous_and_stop_while_paused_ask_to_unpause() {
        let mut player = player();
        player.enqueue(["a", "b"]);
        player.track_finished();
        player.toggle_pause().unwrap();

        let back = player.previous().unwrap();
        assert_eq!(back.track, Some("a"));
        assert!(back.unpause);
        assert!(!player.is_paused());

        player.toggle_pause().unwrap();
        assert!(player.stop().unwrap().unpause);
        assert_eq!(player.state(), PlayerState::Idle);
    }

    #[test]
    fn unpaused_transitions_leave_the_node_alone() {
        let mut player = player();
        player.enqueue(["a", "b"]);

        assert!(!player.skip().unwrap().unpause);
        assert!(!player.previous().unwrap().unpause);
    }

    #[test]
    fn halted_player_is_idle_and_starts_new_tracks() {
        let mut player = player();
        player.enqueue(["a", "b"]);

        player.halt();
        assert!(!player.is_active());
        assert_eq!(player.current(), Err(MusicError::NothingPlaying));

        assert_eq!(player.enqueue(["c"]), Some("c"));
        assert_eq!(player.queue().history(), &["a", "b"]);
    }

    #[test]
    fn queue_repeat_loops_forever() {
        let mut player = player();
        player.enqueue(["a", "b"]);
        player.queue_mut().set_repeat_mode(RepeatMode::Queue);

        assert_eq!(player.track_finished(), Some("b"));
        assert_eq!(player.track_finished(), Some("a"));
        assert!(player.is_active());
    }

    #[test]
    fn previous_goes_back_even_when_idle() {
        let mut player = player();
        assert_eq!(player.previous(), Err(MusicError::QueueIsEmpty));

        player.enqueue(["a", "b"]);
        assert_eq!(player.previous(), Err(MusicError::NoPreviousTracks));

        player.track_finished();
        player.track_finished();
        assert!(!player.is_active());
        assert_eq!(player.previous().map(|t| t.track), Ok(Some("b")));
        assert_eq!(player.state(), PlayerState::Playing);
    }

    #[test]
    fn stop_resets_everything() {
        let mut player = player();
        assert_eq!(player.stop(), Err(MusicError::NothingPlaying));

        player.enqueue(["a", "b"]);
        player.queue_mut().set_repeat_mode(RepeatMode::Queue);
        assert_eq!(
            player.stop(),
            Ok(Transition {
                track: None,
                unpause: false
            })
        );
        assert!(player.queue().is_empty());
        assert_eq!(player.queue().repeat_mode(), RepeatMode::None);
        assert_eq!(player.state(), PlayerState::Idle);
    }

    #[test]
    fn clear_keeps_current_track_playing() {
        let mut player = player();
        assert_eq!(player.clear(), Err(MusicError::QueueIsEmpty));

        player.enqueue(["a", "b", "c"]);
        player.track_finished();
        assert_eq!(player.clear(), Ok(()));
        assert_eq!(player.queue().tracks(), &["b"]);
        assert_eq!(player.current(), Ok(&"b"));
    }

    #[test]
    fn volume_is_capped() {
        let mut player = player();
        player.set_volume(500);
        assert_eq!(player.volume(), MAX_VOLUME);
    }

    #[test]
    fn volume_argument() {
        assert_eq!(parse_volume("50"), Ok(50));
        assert_eq!(parse_volume("200"), Ok(200));
        assert_eq!(parse_volume("0"), Err(MusicError::TooLowVolume));
        assert_eq!(parse_volume("201"), Err(MusicError::TooHighVolume));
        assert_eq!(parse_volume("-5"), Err(MusicError::NotDigit));
        assert_eq!(parse_volume("loud"), Err(MusicError::NotDigit));
        assert_eq!(
            parse_volume("99999999999999999999999"),
            Err(MusicError::NotDigit)
        );
    }

    #[test]
    fn seek_argument() {
        assert_eq!(parse_seek("30", 60_000), Ok(Duration::from_secs(30)));
        assert_eq!(parse_seek("60", 60_000), Ok(Duration::from_secs(60)));
        assert_eq!(parse_seek("61", 60_000), Err(MusicError::InvalidPosition));
        assert_eq!(parse_seek("1:30", 600_000), Err(MusicError::InvalidTimeString));
        assert_eq!(parse_seek("", 600_000), Err(MusicError::InvalidTimeString));
    }

    #[test]
    fn show_count_argument() {
        assert_eq!(parse_show_count(None), Ok(DEFAULT_SHOW_COUNT));
        assert_eq!(parse_show_count(Some("25")), Ok(25));
        assert_eq!(parse_show_count(Some("1")), Err(MusicError::TooShort));
        assert_eq!(parse_show_count(Some("0")), Err(MusicError::TooShort));
        assert_eq!(parse_show_count(Some("ten")), Err(MusicError::NotDigit));
    }

    #[test]
    fn slot_argument() {
        assert_eq!(parse_slot("3"), Ok(3));
        assert_eq!(parse_slot("x"), Err(MusicError::FaultyIndex));
    }
}
