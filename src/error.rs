use derive_more::derive::{Display, Error};

use crate::engine::TransmissionState;

/// A specialized `Result` where the error is this crate's `Error` type.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Everything that can go wrong between a frame producer and the LEDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Row or column outside the LED matrix.
    #[display("pixel coordinate out of range")]
    OutOfRange,

    /// Operation not allowed while the engine is in the given state.
    #[display("not allowed in state {_0:?}")]
    InvalidState(#[error(not(source))] TransmissionState),

    /// Text longer than the scroll buffer.
    #[display("text does not fit the marquee buffer")]
    TextTooLong,

    /// Timer/DMA configuration was rejected at start-up.
    #[display("peripheral configuration failed")]
    Config,

    /// DMA reported a transfer error in the middle of a frame.
    #[display("DMA transfer error")]
    Transfer,
}
