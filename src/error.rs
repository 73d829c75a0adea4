use thiserror::Error;

/// Errors surfaced by the channel layer. Display messages keep the wording
/// of the classic RPi.GPIO API so callers ported from it can match on them.
#[derive(Debug, Error)]
pub enum GpioError {
    #[error("Please set pin numbering mode using set_mode(Mode::Board) or set_mode(Mode::Bcm)")]
    ModeUnset,
    #[error("A different mode has already been set!")]
    ModeAlreadySet,
    #[error("An invalid mode was passed to set_mode()")]
    InvalidMode,
    #[error("The channel sent is invalid")]
    InvalidChannel,
    #[error("Channel must be an integer or list/tuple of integers")]
    InvalidChannelShape,
    #[error("Value must be an integer/boolean or a list/tuple of integers/booleans")]
    InvalidValueShape,
    #[error("Number of channels != number of values")]
    CountMismatch,
    #[error("pull_up_down parameter is not valid for outputs")]
    PullOnOutput,
    #[error("initial parameter is not valid for inputs")]
    InitialOnInput,
    #[error("Bouncetime must be greater than 0")]
    InvalidBouncetime,
    #[error("You must setup() the GPIO channel first")]
    NotConfigured,
    #[error("You must setup() the GPIO channel as an input first")]
    NotInput,
    #[error("Conflicting edge detection already enabled for this GPIO channel")]
    EventAlreadyAdded,
    #[error("Add event detection using add_event_detect first")]
    NoEventDetection,
    #[error("event detection not setup")]
    EventNotSetup,
    #[error("Line {0} is already in use")]
    LineBusy(u32),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("GPIO error: {0}")]
    Gpio(String),
}
