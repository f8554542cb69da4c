//! Deterministic conversion of pixel data into wire-timing pulse symbols.

use core::marker::PhantomData;

use crate::{Color, ColorOrder};

/// One timing symbol on the wire: the line is driven high for `high` ticks of
/// the sample clock, then low for `low` ticks.
///
/// Every protocol bit maps to exactly one `Pulse`; the reset gap after a frame
/// is a run of all-low pulses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pulse {
    /// Ticks spent at the high level.
    pub high: u16,
    /// Ticks spent at the low level.
    pub low: u16,
}

impl Pulse {
    /// A pulse with the given high and low phase lengths.
    pub const fn new(high: u16, low: u16) -> Self {
        Self { high, low }
    }

    /// A pulse that keeps the line low for `ticks`.
    pub const fn silence(ticks: u16) -> Self {
        Self { high: 0, low: ticks }
    }

    /// Total length of the symbol in sample-clock ticks.
    pub const fn period(&self) -> u32 {
        self.high as u32 + self.low as u32
    }
}

/// Number of silent bit periods appended after the pixel data so the strip
/// latches the frame: 64 periods are 80µs at the nominal 800kHz bit rate,
/// above the ≥50µs minimum of the supported LED families.
pub const RESET_GAP_SYMBOLS: usize = 64;

/// Calculate the required signal buffer size for a certain number of LEDs.
/// This should be used to create the `BUFFER_SIZE` parameter of
/// [`SmartLedStrip`](crate::SmartLedStrip).
///
/// The result counts one pulse symbol per protocol bit plus the fixed reset
/// gap, so it is also the exact frame length produced by
/// [`PulseEncoder::encode`].
// TODO: As soon as generic expressions are more stabilized, we should be able to do this calculation entirely internally in `SmartLedStrip`. For now, users have to be careful.
pub const fn buffer_size<C: Color>(led_count: usize) -> usize {
    led_count * (size_of::<C::ChannelType>() * 8) * C::CHANNELS as usize + RESET_GAP_SYMBOLS
}

/// Pure encoder from pixel colors to a flat pulse-symbol frame.
///
/// The channel order and bit timing are fixed by the type parameters; the
/// sample clock rate is fixed at construction. Given the same pixels and
/// brightness, [`encode`](Self::encode) always produces an identical frame.
pub struct PulseEncoder<C, Order, Timing>
where
    C: Color,
    Order: ColorOrder<C>,
    Timing: crate::Timing,
{
    pulses: (Pulse, Pulse),
    reset: Pulse,
    _color: PhantomData<C>,
    _order: PhantomData<Order>,
    _timing: PhantomData<Timing>,
}

impl<C, Order, Timing> PulseEncoder<C, Order, Timing>
where
    C: Color,
    Order: ColorOrder<C>,
    Timing: crate::Timing,
{
    /// Creates an encoder for a pulse generator running at `clock_hz`.
    ///
    /// The nanosecond timing constants are converted to sample-clock ticks
    /// once here; a clock too slow to resolve the shortest phase of the
    /// timing profile is a configuration contract violation and panics.
    pub fn new(clock_hz: u32) -> Self {
        let pulses = (
            Pulse::new(
                ticks(Timing::TIME_0_HIGH, clock_hz),
                ticks(Timing::TIME_0_LOW, clock_hz),
            ),
            Pulse::new(
                ticks(Timing::TIME_1_HIGH, clock_hz),
                ticks(Timing::TIME_1_LOW, clock_hz),
            ),
        );
        assert!(
            pulses.0.high > 0 && pulses.0.low > 0 && pulses.1.high > 0 && pulses.1.low > 0,
            "sample clock too slow for this timing profile"
        );
        let reset = Pulse::silence(pulses.0.period().max(pulses.1.period()) as u16);
        Self {
            pulses,
            reset,
            _color: PhantomData,
            _order: PhantomData,
            _timing: PhantomData,
        }
    }

    /// Length of the longest bit symbol in ticks, used as the per-symbol time
    /// budget when estimating frame duration.
    pub fn bit_period_ticks(&self) -> u32 {
        self.pulses.0.period().max(self.pulses.1.period())
    }

    /// Encodes `pixels` into `out` and returns the number of symbols written,
    /// which is always [`buffer_size::<C>`](buffer_size) of the pixel count.
    ///
    /// Channels are scaled by `floor(channel × brightness)`, emitted in the
    /// `Order` the hardware expects, most significant bit first. An empty
    /// pixel slice produces just the reset gap. Brightness 0 produces an
    /// all-zero-bit frame of full length, which is what actually turns
    /// previously lit LEDs off.
    ///
    /// `out` too small for the pixel count or a brightness outside `0.0..=1.0`
    /// is a caller contract violation and panics.
    pub fn encode(&self, pixels: &[C], brightness: f32, out: &mut [Pulse]) -> usize {
        assert!(
            (0.0..=1.0).contains(&brightness),
            "brightness {brightness} outside 0.0..=1.0"
        );
        let required = buffer_size::<C>(pixels.len());
        assert!(
            out.len() >= required,
            "signal buffer holds {} symbols, frame needs {required}",
            out.len()
        );

        let mut cursor = 0;
        for color in pixels {
            for channel in 0..C::CHANNELS {
                let value: usize = Order::get_channel_data(color, channel).into();
                self.encode_channel(scale(value, brightness), out, &mut cursor);
            }
        }
        for _ in 0..RESET_GAP_SYMBOLS {
            out[cursor] = self.reset;
            cursor += 1;
        }
        cursor
    }

    /// Appends one symbol per bit of `value`, most significant first.
    fn encode_channel(&self, value: usize, out: &mut [Pulse], cursor: &mut usize) {
        for index in (0..size_of::<C::ChannelType>() * 8).rev() {
            let position = 1 << index;
            out[*cursor] = match value & position {
                0 => self.pulses.0,
                _ => self.pulses.1,
            };
            *cursor += 1;
        }
    }
}

/// Converts a nanosecond duration to ticks of the sample clock, truncating.
fn ticks(nanos: u16, clock_hz: u32) -> u16 {
    ((nanos as u64 * clock_hz as u64) / 1_000_000_000) as u16
}

/// Brightness scaling as `floor(value × brightness)`, monotonic in both
/// arguments.
fn scale(value: usize, brightness: f32) -> usize {
    (value as f32 * brightness) as usize
}
