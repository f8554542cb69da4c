//! Drives smart RGB LED strips (WS2812 and relatives) by encoding pixel colors into precisely timed pulse trains and streaming them through a memory-to-peripheral transfer engine. This is a driver core for the [smart-leds](https://crates.io/crates/smart-leds) framework: the [`SmartLedStrip`] facade implements [`SmartLedsWrite`](smart_leds_trait::SmartLedsWrite) on top of any [`TransferEngine`] backend.
//!
//! These LEDs are driven over a single data line whose bit timing is microsecond-scale and must hold for thousands of bits per frame; a software loop on a general-purpose, preemptible core cannot guarantee that. The driver therefore encodes each frame up front into [`Pulse`] symbols, one per protocol bit, and hands the whole buffer to a free-running hardware pulse generator; the CPU only waits on the completion signal. A backend for the ESP32 family's RMT peripheral via [esp-hal](https://github.com/esp-rs/esp-hal) is included behind the chip features, and any other buffer-fed pulse generator can be plugged in by implementing [`TransferEngine`].
//!
//! ## Example
//!
//! ```rust,ignore
//! let rmt = Rmt::new(peripherals.RMT, Rate::from_mhz(80)).unwrap();
//! let engine = RmtTransferEngine::<{ buffer_size::<RGB8>(60) + 1 }>::new(
//!     rmt.channel0, peripherals.GPIO2
//! ).unwrap();
//!
//! let mut strip = Ws2812Strip::<60, { buffer_size::<RGB8>(60) }, _, _>::new(engine, HalTimeSource);
//! strip.begin().unwrap();
//! strip.set_brightness(0.25).unwrap();
//! strip.set_pixel_color(5, 0, 0, 255).unwrap();
//! strip.show().unwrap();
//! ```
//!
//! ## Usage overview
//!
//! The [`SmartLedStrip`] struct owns the pixel buffer, a [`PulseEncoder`] and
//! a [`TransferEngine`]. [`begin`](SmartLedStrip::begin) claims the hardware,
//! [`set_pixel`](SmartLedStrip::set_pixel) /
//! [`set_brightness`](SmartLedStrip::set_brightness) /
//! [`clear`](SmartLedStrip::clear) mutate the buffer, and
//! [`show`](SmartLedStrip::show) encodes and transmits one frame, blocking
//! until the line is idle again. [`end`](SmartLedStrip::end) (or dropping the
//! strip) releases the hardware. The strip is configured at compile time
//! through its type parameters; see the [`SmartLedStrip`] documentation.
//!
//! ## Features
//!
//! - `defmt`: derive `defmt::Format` on public types and log transfer faults.
//! - `esp32`, `esp32c2`, `esp32c3`, `esp32c6`, `esp32h2`, `esp32s2`,
//!   `esp32s3`: enable the [`RmtTransferEngine`] backend for that chip.
#![deny(missing_docs)]
#![no_std]

mod driver;
mod encoder;
mod pixel;
#[cfg(feature = "esp-hal")]
mod rmt;
mod transfer;

pub use color_order::ColorOrder;
pub use driver::{Rgb8Strip, SmartLedStrip, StripError, StripState, Ws2812Strip};
pub use encoder::{Pulse, PulseEncoder, RESET_GAP_SYMBOLS, buffer_size};
use num_traits::Unsigned;
pub use pixel::{PixelBuffer, RangeError};
#[cfg(feature = "esp-hal")]
pub use rmt::{HalTimeSource, RmtEngineError, RmtTransferEngine};
use smart_leds_trait::{CctWhite, RGB, RGBCCT, RGBW, White};
pub use transfer::{TimeSource, TransferEngine, TransferStatus, TransmissionDescriptor};

/// Common trait for all different smart LED dependent timings.
///
/// All common smart LEDs are controlled by sending PWM-like pulses, in two different configurations for high and low.
/// The required timings (and tolerances) can be found in the relevant datasheets.
///
/// Provided timings: [`Sk68xxTiming`], [`Ws2812bTiming`], [`Ws2811Timing`], [`Ws2812Timing`]
// Implementations of this should be vacant enums so they can’t be constructed.
pub trait Timing {
    /// Low time for zero pulse, in nanoseconds.
    const TIME_0_LOW: u16;
    /// High time for zero pulse, in nanoseconds.
    const TIME_0_HIGH: u16;
    /// Low time for one pulse, in nanoseconds.
    const TIME_1_LOW: u16;
    /// High time for one pulse, in nanoseconds.
    const TIME_1_HIGH: u16;
}

const SK68XX_CODE_PERIOD: u16 = 1200;
/// Timing for the SK68 collection of LEDs.
pub enum Sk68xxTiming {}
impl Timing for Sk68xxTiming {
    const TIME_0_HIGH: u16 = 320;
    const TIME_0_LOW: u16 = SK68XX_CODE_PERIOD - Self::TIME_0_HIGH;
    const TIME_1_HIGH: u16 = 640;
    const TIME_1_LOW: u16 = SK68XX_CODE_PERIOD - Self::TIME_1_HIGH;
}

/// Timing for the WS2812B LEDs.
pub enum Ws2812bTiming {}
impl Timing for Ws2812bTiming {
    const TIME_0_HIGH: u16 = 400;
    const TIME_0_LOW: u16 = 800;
    const TIME_1_HIGH: u16 = 850;
    const TIME_1_LOW: u16 = 450;
}

/// Timing for the WS2812 LEDs.
pub enum Ws2812Timing {}
impl Timing for Ws2812Timing {
    const TIME_0_HIGH: u16 = 350;
    const TIME_0_LOW: u16 = 700;
    const TIME_1_HIGH: u16 = 800;
    const TIME_1_LOW: u16 = 600;
}

/// Timing for the WS2811 driver ICs, low-speed mode.
pub enum Ws2811LowSpeedTiming {}
impl Timing for Ws2811LowSpeedTiming {
    const TIME_0_HIGH: u16 = 500;
    const TIME_0_LOW: u16 = 2000;
    const TIME_1_HIGH: u16 = 1200;
    const TIME_1_LOW: u16 = 1300;
}

/// Timing for the WS2811 driver ICs, high-speed mode.
pub enum Ws2811Timing {}
impl Timing for Ws2811Timing {
    const TIME_0_HIGH: u16 = Ws2811LowSpeedTiming::TIME_0_HIGH / 2;
    const TIME_0_LOW: u16 = Ws2811LowSpeedTiming::TIME_0_LOW / 2;
    const TIME_1_HIGH: u16 = Ws2811LowSpeedTiming::TIME_1_HIGH / 2;
    const TIME_1_LOW: u16 = Ws2811LowSpeedTiming::TIME_1_LOW / 2;
}

/// Utility trait that retrieves metadata about all `smart-leds` color types.
pub trait Color {
    /// The maximum channel number this color supports.
    ///
    /// - For RGB (or any permutation thereof), this is 3.
    /// - For RGBW, this is 4.
    /// - For RGBCCT, this is 5.
    /// - For CCT, this is 2.
    ///
    /// Note that this channel count is used by users of [`ColorOrder`] to limit the channel number that’s passed into [`ColorOrder::get_channel_data`].
    const CHANNELS: u8;

    /// Type of a single channel of this color. Usually [`u8`], but [`u16`] is also used for some LEDs.
    type ChannelType: Unsigned + Into<usize>;
}

impl<T> Color for RGB<T>
where
    T: Unsigned + Into<usize>,
{
    const CHANNELS: u8 = 3;
    type ChannelType = T;
}

impl<T> Color for RGBW<T>
where
    T: Unsigned + Into<usize>,
{
    const CHANNELS: u8 = 4;
    type ChannelType = T;
}

impl<T> Color for RGBCCT<T>
where
    T: Unsigned + Into<usize>,
{
    const CHANNELS: u8 = 5;
    type ChannelType = T;
}

impl<T> Color for White<T>
where
    T: Unsigned + Into<usize>,
{
    const CHANNELS: u8 = 1;
    type ChannelType = T;
}

impl<T> Color for CctWhite<T>
where
    T: Unsigned + Into<usize>,
{
    const CHANNELS: u8 = 2;
    type ChannelType = T;
}

/// Common [`ColorOrder`] implementations.
pub mod color_order {
    use num_traits::Unsigned;
    use smart_leds_trait::{RGB, RGBW};

    use crate::Color;

    /// Order of colors in the physical LEDs.
    /// The most common color orders for RGB LEDs are [`Grb`] (integrated controllers like the WS2812 family) and [`Rgb`].
    /// Note that discrete ICs have generic channels and are often wired up arbitrarily, so you will have to check which order is correct for your hardware.
    // Implementations of this should be vacant enums so they can’t be constructed.
    // This should also be a constant trait once that becomes a stable Rust feature.
    pub trait ColorOrder<C: Color> {
        /// Retrieve the output value for the provided channel.
        /// For instance, if color order is RGB, then the red value will be returned for channel 0,
        /// the green value for channel 1 and the blue value for channel 2.
        ///
        /// The maximum channel number users are allowed to pass in is [`Color::CHANNELS`] minus one.
        /// If this restriction is not upheld, the implementation may panic.
        fn get_channel_data(color: &C, channel: u8) -> C::ChannelType;
    }

    macro_rules! color_order_rgb {
        ($name:ident => $first:ident, $second:ident, $third:ident) => {
            #[doc = concat!("[`ColorOrder`] ", stringify!($name), ".")]
            pub enum $name {}
            impl<T> ColorOrder<RGB<T>> for $name
            where
                T: Copy + Unsigned + Into<usize>,
            {
                fn get_channel_data(color: &RGB<T>, channel: u8) -> T {
                    match channel {
                        0 => color.$first,
                        1 => color.$second,
                        2 => color.$third,
                        _ => unreachable!(),
                    }
                }
            }
        };
    }

    color_order_rgb!(Rgb => r, g, b);
    color_order_rgb!(Rbg => r, b, g);
    color_order_rgb!(Grb => g, r, b);
    color_order_rgb!(Gbr => g, b, r);
    color_order_rgb!(Brg => b, r, g);
    color_order_rgb!(Bgr => b, g, r);

    /// [`ColorOrder`] RGBW.
    pub enum Rgbw {}
    impl<T> ColorOrder<RGBW<T>> for Rgbw
    where
        T: Copy + Unsigned + Into<usize>,
    {
        fn get_channel_data(color: &RGBW<T>, channel: u8) -> T {
            match channel {
                0 => color.r,
                1 => color.g,
                2 => color.b,
                3 => color.a.0,
                _ => unreachable!(),
            }
        }
    }
}
