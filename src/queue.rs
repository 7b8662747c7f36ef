//! In-memory playback queue.
//!
//! The queue keeps every track it has been given, played or not. A cursor
//! points at the current track: everything before it is history, everything
//! after it is upcoming. Commands address tracks by *slot*, where slot 1 is
//! the current track and slot 2 is the next one up.
use rand::{seq::SliceRandom, Rng};

use crate::error::{MusicError, MusicResult};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RepeatMode {
    #[default]
    None,
    Song,
    Queue,
}

impl RepeatMode {
    /// Next mode in the `None -> Song -> Queue -> None` cycle.
    pub fn next(self) -> Self {
        match self {
            Self::None => Self::Song,
            Self::Song => Self::Queue,
            Self::Queue => Self::None,
        }
    }

    /// Parses the optional argument of the loop command. Anything that is not
    /// `song` or `queue` turns looping off.
    pub fn from_arg(arg: &str) -> Self {
        match arg.trim().to_lowercase().as_str() {
            "song" => Self::Song,
            "queue" => Self::Queue,
            _ => Self::None,
        }
    }

    /// Suffix shown in the queue embed title.
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Song => Some("Song repeat"),
            Self::Queue => Some("Queue repeat"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Queue<T> {
    tracks: Vec<T>,
    position: usize,
    repeat_mode: RepeatMode,
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            position: 0,
            repeat_mode: RepeatMode::None,
        }
    }
}

impl<T> Queue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn repeat_mode(&self) -> RepeatMode {
        self.repeat_mode
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat_mode = mode;
    }

    pub fn cycle_repeat_mode(&mut self) -> RepeatMode {
        self.repeat_mode = self.repeat_mode.next();
        self.repeat_mode
    }

    /// All tracks, played or not, in queue order.
    pub fn tracks(&self) -> &[T] {
        &self.tracks
    }

    /// `None` when the queue is empty or the cursor ran off the end.
    pub fn current(&self) -> Option<&T> {
        self.tracks.get(self.position)
    }

    pub fn upcoming(&self) -> &[T] {
        self.tracks.get(self.position + 1..).unwrap_or(&[])
    }

    pub fn history(&self) -> &[T] {
        &self.tracks[..self.position]
    }

    pub fn add(&mut self, tracks: impl IntoIterator<Item = T>) {
        self.tracks.extend(tracks);
    }

    pub fn get(&self, slot: usize) -> Option<&T> {
        match slot {
            0 => None,
            1 => self.current(),
            _ => self.upcoming().get(slot - 2),
        }
    }

    /// Moves the cursor forward and returns the new current track.
    ///
    /// Past the end the cursor wraps to the start only in queue repeat mode;
    /// otherwise it stays clamped at `len` and nothing is returned.
    pub fn advance(&mut self) -> Option<&T> {
        let len = self.tracks.len();
        self.position = (self.position + 1).min(len);

        if self.position == len {
            if self.repeat_mode == RepeatMode::Queue && len > 0 {
                self.position = 0;
            } else {
                return None;
            }
        }

        self.tracks.get(self.position)
    }

    /// Steps the cursor back onto the previously played track.
    pub fn rewind(&mut self) -> MusicResult<&T> {
        if self.tracks.is_empty() {
            return Err(MusicError::QueueIsEmpty);
        }
        if self.position == 0 {
            return Err(MusicError::NoPreviousTracks);
        }

        self.position -= 1;
        Ok(&self.tracks[self.position])
    }

    /// Translates an upcoming slot into an index into `tracks`.
    fn upcoming_index(&self, slot: usize) -> MusicResult<usize> {
        if slot < 2 || slot - 2 >= self.upcoming().len() {
            return Err(MusicError::FaultyIndex);
        }

        Ok(self.position + slot - 1)
    }

    /// Moves the track at slot `from` to slot `to`, returning the moved track
    /// and the slot it landed in. A destination past the end is clamped to
    /// the last slot.
    pub fn move_track(&mut self, from: usize, to: usize) -> MusicResult<(&T, usize)> {
        if from < 2 || to < 2 {
            return Err(MusicError::FaultyIndex);
        }
        if from == to {
            return Err(MusicError::SameValue);
        }

        let source = self.upcoming_index(from)?;
        let to = to.min(self.upcoming().len() + 1);
        let dest = self.position + to - 1;

        let track = self.tracks.remove(source);
        self.tracks.insert(dest, track);

        Ok((&self.tracks[dest], to))
    }

    pub fn remove(&mut self, slot: usize) -> MusicResult<T> {
        let index = self.upcoming_index(slot)?;
        Ok(self.tracks.remove(index))
    }

    /// Moves the last track in the queue to the next-up slot.
    pub fn cut(&mut self) -> MusicResult<&T> {
        if self.upcoming().len() < 2 {
            return Err(MusicError::TooShort);
        }

        let dest = self.position + 1;
        if let Some(track) = self.tracks.pop() {
            self.tracks.insert(dest, track);
        }

        Ok(&self.tracks[dest])
    }

    /// Randomises the upcoming tracks. History and the current track keep
    /// their places.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> MusicResult<()> {
        if self.tracks.is_empty() {
            return Err(MusicError::QueueIsEmpty);
        }

        let start = (self.position + 1).min(self.tracks.len());
        self.tracks[start..].shuffle(rng);

        Ok(())
    }

    /// Drops history and upcoming tracks, keeping only the current one.
    pub fn clear_upcoming(&mut self) {
        if self.position < self.tracks.len() {
            let current = self.tracks.swap_remove(self.position);
            self.tracks.clear();
            self.tracks.push(current);
        } else {
            self.tracks.clear();
        }
        self.position = 0;
    }

    /// Moves the cursor past the last track; everything becomes history.
    pub fn skip_to_end(&mut self) {
        self.position = self.tracks.len();
    }

    pub fn reset(&mut self) {
        self.tracks.clear();
        self.position = 0;
        self.repeat_mode = RepeatMode::None;
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn queue_of(tracks: &[&'static str]) -> Queue<&'static str> {
        let mut queue = Queue::new();
        queue.add(tracks.iter().copied());
        queue
    }

    #[test]
    fn empty_queue_has_nothing_current() {
        let queue: Queue<&str> = Queue::new();

        assert!(queue.is_empty());
        assert_eq!(queue.current(), None);
        assert!(queue.upcoming().is_empty());
        assert!(queue.history().is_empty());
    }

    #[test]
    fn add_does_not_move_cursor() {
        let mut queue = queue_of(&["a"]);
        queue.add(["b", "c"]);

        assert_eq!(queue.current(), Some(&"a"));
        assert_eq!(queue.upcoming(), &["b", "c"]);
    }

    #[test]
    fn advance_walks_the_queue_then_stops() {
        let mut queue = queue_of(&["a", "b"]);

        assert_eq!(queue.advance(), Some(&"b"));
        assert_eq!(queue.history(), &["a"]);
        assert_eq!(queue.advance(), None);
        assert_eq!(queue.position(), 2);
        assert_eq!(queue.current(), None);

        // Clamped, not growing past the end.
        assert_eq!(queue.advance(), None);
        assert_eq!(queue.position(), queue.len());
    }

    #[test]
    fn advance_wraps_only_in_queue_mode() {
        let mut queue = queue_of(&["a", "b"]);
        queue.set_repeat_mode(RepeatMode::Queue);

        queue.advance();
        assert_eq!(queue.advance(), Some(&"a"));
        assert_eq!(queue.position(), 0);

        let mut queue = queue_of(&["a", "b"]);
        queue.set_repeat_mode(RepeatMode::Song);
        queue.advance();
        assert_eq!(queue.advance(), None);
    }

    #[test]
    fn advance_on_empty_queue_keeps_position_zero() {
        let mut queue: Queue<&str> = Queue::new();
        queue.set_repeat_mode(RepeatMode::Queue);

        assert_eq!(queue.advance(), None);
        assert_eq!(queue.position(), 0);
    }

    #[test]
    fn rewind_needs_history() {
        let mut queue = queue_of(&["a", "b"]);
        assert_eq!(queue.rewind(), Err(MusicError::NoPreviousTracks));

        queue.advance();
        queue.advance();
        assert_eq!(queue.rewind(), Ok(&"b"));
        assert_eq!(queue.rewind(), Ok(&"a"));

        let mut empty: Queue<&str> = Queue::new();
        assert_eq!(empty.rewind(), Err(MusicError::QueueIsEmpty));
    }

    #[test]
    fn slots_start_at_current_track() {
        let mut queue = queue_of(&["a", "b", "c", "d"]);
        queue.advance();

        assert_eq!(queue.get(0), None);
        assert_eq!(queue.get(1), Some(&"b"));
        assert_eq!(queue.get(3), Some(&"d"));
        assert_eq!(queue.get(4), None);
    }

    #[test]
    fn remove_rejects_out_of_range_slots_without_mutating() {
        let mut queue = queue_of(&["a", "b", "c"]);

        for slot in [0, 1, 4, 100] {
            assert_eq!(queue.remove(slot), Err(MusicError::FaultyIndex));
        }
        assert_eq!(queue.tracks(), &["a", "b", "c"]);

        assert_eq!(queue.remove(3), Ok("c"));
        assert_eq!(queue.tracks(), &["a", "b"]);
    }

    #[test]
    fn remove_is_relative_to_cursor() {
        let mut queue = queue_of(&["a", "b", "c", "d"]);
        queue.advance();

        assert_eq!(queue.remove(2), Ok("c"));
        assert_eq!(queue.tracks(), &["a", "b", "d"]);
    }

    #[test]
    fn move_track_reorders_upcoming() {
        let mut queue = queue_of(&["a", "b", "c", "d"]);

        let (moved, slot) = queue.move_track(4, 2).map(|(t, s)| (*t, s)).unwrap();
        assert_eq!((moved, slot), ("d", 2));
        assert_eq!(queue.tracks(), &["a", "d", "b", "c"]);

        queue.move_track(2, 4).unwrap();
        assert_eq!(queue.tracks(), &["a", "b", "c", "d"]);
    }

    #[test]
    fn move_track_clamps_destination() {
        let mut queue = queue_of(&["a", "b", "c", "d"]);

        let (_, slot) = queue.move_track(2, 50).unwrap();
        assert_eq!(slot, 4);
        assert_eq!(queue.tracks(), &["a", "c", "d", "b"]);
    }

    #[test]
    fn move_track_validates_before_mutating() {
        let mut queue = queue_of(&["a", "b", "c"]);

        assert_eq!(
            queue.move_track(1, 2).map(|(t, s)| (*t, s)),
            Err(MusicError::FaultyIndex)
        );
        assert_eq!(
            queue.move_track(3, 3).map(|(t, s)| (*t, s)),
            Err(MusicError::SameValue)
        );
        assert_eq!(
            queue.move_track(9, 2).map(|(t, s)| (*t, s)),
            Err(MusicError::FaultyIndex)
        );
        assert_eq!(queue.tracks(), &["a", "b", "c"]);
    }

    #[test]
    fn cut_moves_last_to_next_up() {
        let mut queue = queue_of(&["a", "b", "c", "d"]);
        queue.advance();

        assert_eq!(queue.cut(), Ok(&"d"));
        assert_eq!(queue.tracks(), &["a", "b", "d", "c"]);
    }

    #[test]
    fn cut_needs_two_upcoming() {
        let mut queue = queue_of(&["a", "b"]);

        assert_eq!(queue.cut(), Err(MusicError::TooShort));
        assert_eq!(queue.tracks(), &["a", "b"]);
    }

    #[test]
    fn shuffle_leaves_history_and_current_alone() {
        let tracks: Vec<u32> = (0..50).collect();
        let mut rng = StdRng::seed_from_u64(7);

        for played in 0..10 {
            let mut queue = Queue::new();
            queue.add(tracks.iter().copied());
            for _ in 0..played {
                queue.advance();
            }

            queue.shuffle(&mut rng).unwrap();

            assert_eq!(queue.history(), &tracks[..played]);
            assert_eq!(queue.current(), Some(&tracks[played]));

            let mut upcoming = queue.upcoming().to_vec();
            upcoming.sort_unstable();
            assert_eq!(upcoming, &tracks[played + 1..]);
        }
    }

    #[test]
    fn shuffle_empty_queue_fails() {
        let mut queue: Queue<u8> = Queue::new();
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(queue.shuffle(&mut rng), Err(MusicError::QueueIsEmpty));
    }

    #[test]
    fn shuffle_after_running_off_the_end_is_a_no_op() {
        let mut queue = queue_of(&["a", "b"]);
        queue.advance();
        queue.advance();
        let mut rng = StdRng::seed_from_u64(3);

        assert_eq!(queue.shuffle(&mut rng), Ok(()));
        assert_eq!(queue.tracks(), &["a", "b"]);
    }

    #[test]
    fn repeat_mode_cycles() {
        let mut queue: Queue<u8> = Queue::new();

        assert_eq!(queue.cycle_repeat_mode(), RepeatMode::Song);
        assert_eq!(queue.cycle_repeat_mode(), RepeatMode::Queue);
        assert_eq!(queue.cycle_repeat_mode(), RepeatMode::None);
    }

    #[test]
    fn repeat_mode_from_argument() {
        assert_eq!(RepeatMode::from_arg("SONG"), RepeatMode::Song);
        assert_eq!(RepeatMode::from_arg("queue"), RepeatMode::Queue);
        assert_eq!(RepeatMode::from_arg("off"), RepeatMode::None);
    }

    #[test]
    fn clear_upcoming_keeps_current() {
        let mut queue = queue_of(&["a", "b", "c", "d"]);
        queue.advance();

        queue.clear_upcoming();
        assert_eq!(queue.tracks(), &["b"]);
        assert_eq!(queue.position(), 0);
        assert_eq!(queue.current(), Some(&"b"));
    }

    #[test]
    fn clear_upcoming_after_end_empties_queue() {
        let mut queue = queue_of(&["a"]);
        queue.advance();

        queue.clear_upcoming();
        assert!(queue.is_empty());
        assert_eq!(queue.position(), 0);
    }

    #[test]
    fn reset_forgets_everything() {
        let mut queue = queue_of(&["a", "b"]);
        queue.advance();
        queue.set_repeat_mode(RepeatMode::Queue);

        queue.reset();
        assert!(queue.is_empty());
        assert_eq!(queue.position(), 0);
        assert_eq!(queue.repeat_mode(), RepeatMode::None);
    }
}
