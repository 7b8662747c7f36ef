use thiserror::Error;

/// Everything a music command can refuse to do.
///
/// The `Display` text of each variant is the reply sent back to the channel,
/// so keep them short and user facing.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MusicError {
    #[error("I need to be connected to a voice channel for this command.")]
    NoPlayerFound,
    #[error("You need to be connected to a voice channel to use this command.")]
    NoVoiceChannel,
    #[error("I am already connected to a voice channel. :slight_smile:")]
    AlreadyConnectedToChannel,
    #[error("You must provide a song for this command.")]
    NoSongProvided,
    #[error("I could not find any songs from that query.")]
    NoSongFound,
    #[error("This command does not accept playlists.")]
    NoSongPlaylistInstead,
    #[error("The queue is empty.")]
    QueueIsEmpty,
    #[error("No songs in history.")]
    NoPreviousTracks,
    #[error("Nothing is currently playing.")]
    NothingPlaying,
    #[error("Invalid value for seconds.")]
    InvalidTimeString,
    #[error("Value is too high for song.")]
    InvalidPosition,
    #[error("Volume must be higher than 0.")]
    TooLowVolume,
    #[error("Volume must be at most {}.", crate::player::MAX_VOLUME)]
    TooHighVolume,
    #[error("Invalid index.")]
    FaultyIndex,
    #[error("Indexes can't have the same values.")]
    SameValue,
    #[error("Value must be a digit.")]
    NotDigit,
    #[error("Too short value.")]
    TooShort,
    #[error("No lyrics could be found.")]
    NoLyricsFound,
    #[error("You do not have the correct role for this command.")]
    MissingRole,
}

pub type MusicResult<T> = Result<T, MusicError>;

/// Reply used for failures that are not a [`MusicError`].
pub const UNEXPECTED_ERROR: &str = "Unexpected error.";

/// Picks the chat reply for a failed command.
///
/// Known music errors get their canned message, anything else collapses to
/// [`UNEXPECTED_ERROR`] and should be logged by the caller.
pub fn reply_for(err: &(dyn std::error::Error + 'static)) -> Option<String> {
    err.downcast_ref::<MusicError>().map(ToString::to_string)
}
