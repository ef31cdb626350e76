//! Parallel WS2812 driver and frame producers for the STM32F103 word clock.
//!
//! Each of the [`ROWS`] LED strips hangs off its own GPIOA pin. A frame is kept
//! pre-encoded as one 16-bit GPIO word per bit-time, so a single timer and three
//! DMA channels clock all strips out at once (see [`engine`]).
#![cfg_attr(not(test), no_std)]

#[cfg(feature = "embedded")]
use defmt_rtt as _; // global logger
#[cfg(feature = "embedded")]
use panic_probe as _;
// memory layout
#[cfg(feature = "embedded")]
use stm32f1xx_hal as _;

pub mod clock_face;
pub mod draw;
pub mod effects;
pub mod engine;
mod error;
pub mod font;
pub mod frame;
#[cfg(feature = "embedded")]
pub mod hw;
pub mod timing;

pub use crate::engine::{PixelBus, TransferEvent, TransmissionState, Ws2812};
pub use crate::error::{Error, Result};
pub use crate::frame::{Column, EncodedFrame, Row, COLS, FRAME_WORDS, ROWS};
pub use crate::timing::Timing;
pub use smart_leds::RGB8;

// same panicking *behavior* as `panic-probe` but doesn't print a panic message
// this prevents the panic message being printed *twice* when `defmt::panic` is invoked
#[cfg(feature = "embedded")]
#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}
