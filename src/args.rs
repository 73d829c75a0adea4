//! Tagged argument shapes decided at the API boundary. A scalar and a
//! sequence are the only accepted forms; everything else is unrepresentable.

use crate::config::Level;
use crate::error::GpioError;

/// One channel or a batch of channels.
#[derive(Debug, Clone)]
pub enum Channels {
    One(u32),
    Many(Vec<u32>),
}

impl Channels {
    /// Normalizes to a non-empty batch. An empty sequence is a shape error,
    /// guarding the call before any state is touched.
    pub(crate) fn into_vec(self) -> Result<Vec<u32>, GpioError> {
        match self {
            Channels::One(channel) => Ok(vec![channel]),
            Channels::Many(channels) if channels.is_empty() => {
                Err(GpioError::InvalidChannelShape)
            }
            Channels::Many(channels) => Ok(channels),
        }
    }
}

impl From<u32> for Channels {
    fn from(channel: u32) -> Self {
        Channels::One(channel)
    }
}

impl From<Vec<u32>> for Channels {
    fn from(channels: Vec<u32>) -> Self {
        Channels::Many(channels)
    }
}

impl From<&[u32]> for Channels {
    fn from(channels: &[u32]) -> Self {
        Channels::Many(channels.to_vec())
    }
}

impl<const N: usize> From<[u32; N]> for Channels {
    fn from(channels: [u32; N]) -> Self {
        Channels::Many(channels.to_vec())
    }
}

/// One logic level or a batch of levels.
#[derive(Debug, Clone)]
pub enum Levels {
    One(Level),
    Many(Vec<Level>),
}

impl Levels {
    /// Expands to exactly `count` levels: a scalar broadcasts over the batch,
    /// a sequence must match the channel count.
    pub(crate) fn for_count(self, count: usize) -> Result<Vec<Level>, GpioError> {
        match self {
            Levels::One(level) => Ok(vec![level; count]),
            Levels::Many(levels) if levels.is_empty() => Err(GpioError::InvalidValueShape),
            Levels::Many(levels) if levels.len() != count => Err(GpioError::CountMismatch),
            Levels::Many(levels) => Ok(levels),
        }
    }
}

impl From<Level> for Levels {
    fn from(level: Level) -> Self {
        Levels::One(level)
    }
}

impl From<bool> for Levels {
    fn from(high: bool) -> Self {
        Levels::One(high.into())
    }
}

impl From<u8> for Levels {
    fn from(value: u8) -> Self {
        Levels::One(value.into())
    }
}

impl From<Vec<Level>> for Levels {
    fn from(levels: Vec<Level>) -> Self {
        Levels::Many(levels)
    }
}

impl From<Vec<bool>> for Levels {
    fn from(levels: Vec<bool>) -> Self {
        Levels::Many(levels.into_iter().map(Level::from).collect())
    }
}

impl<const N: usize> From<[Level; N]> for Levels {
    fn from(levels: [Level; N]) -> Self {
        Levels::Many(levels.to_vec())
    }
}

impl<const N: usize> From<[bool; N]> for Levels {
    fn from(levels: [bool; N]) -> Self {
        Levels::Many(levels.iter().map(|&b| Level::from(b)).collect())
    }
}
