//! The strip facade owning the pixel state, the encoder and the hardware
//! lifecycle.

use core::fmt;

use smart_leds_trait::{RGB8, SmartLedsWrite};

use crate::{
    Color, ColorOrder, Pulse, PulseEncoder, RangeError, TimeSource, TransferEngine,
    TransferStatus, TransmissionDescriptor, Ws2812Timing, buffer_size, color_order,
    pixel::PixelBuffer,
};

/// Lifecycle of a [`SmartLedStrip`].
///
/// [`Configuring`](Self::Configuring), [`Transmitting`](Self::Transmitting)
/// and [`Faulted`](Self::Faulted) are passed through inside a single
/// [`begin`](SmartLedStrip::begin) or [`show`](SmartLedStrip::show) call;
/// between calls the strip is either [`Released`](Self::Released) or
/// [`Idle`](Self::Idle).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StripState {
    /// Hardware resources are not held, either before `begin` or after `end`.
    Released,
    /// `begin` is binding the transmission descriptor to the engine.
    Configuring,
    /// Ready; no transfer in flight.
    Idle,
    /// A frame transfer is in flight.
    Transmitting,
    /// The engine reported a fault; the strip resets it and returns to
    /// [`Idle`](Self::Idle) before the failing call returns.
    Faulted,
}

/// All types of errors that can happen while operating a [`SmartLedStrip`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum StripError<E> {
    /// The transfer engine could not be acquired or configured during
    /// [`begin`](SmartLedStrip::begin). The strip stays released.
    HardwareUnavailable(E),
    /// [`show`](SmartLedStrip::show) was called before
    /// [`begin`](SmartLedStrip::begin) or after [`end`](SmartLedStrip::end).
    NotStarted,
    /// A pixel index or brightness value was rejected; no state changed.
    Range(RangeError),
    /// The engine faulted while a frame was in flight. The frame is dropped,
    /// the engine is reset and the strip is idle again; the next
    /// [`show`](SmartLedStrip::show) re-sends the full current pixel state.
    TransferFault(E),
    /// The engine never signaled completion within the watchdog bound.
    /// Treated like a fault: frame dropped, engine reset, strip idle.
    Timeout,
}

impl<E> From<RangeError> for StripError<E> {
    fn from(value: RangeError) -> Self {
        Self::Range(value)
    }
}

impl<E: fmt::Debug> fmt::Display for StripError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HardwareUnavailable(e) => write!(f, "transfer engine unavailable: {e:?}"),
            Self::NotStarted => write!(f, "strip not started, call begin first"),
            Self::Range(e) => write!(f, "{e}"),
            Self::TransferFault(e) => write!(f, "transfer fault, frame dropped: {e:?}"),
            Self::Timeout => write!(f, "transfer watchdog expired, frame dropped"),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for StripError<E> {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Range(e) => Some(e),
            _ => None,
        }
    }
}

/// Driver for one addressable LED strip: a pixel buffer, a pulse encoder and
/// a [`TransferEngine`] that streams encoded frames to the line.
///
/// Configuration is compile-time, in the manner of the rest of this crate:
/// - `LED_COUNT` fixes the strip length; pixel indices are checked against it.
/// - `BUFFER_SIZE` sizes the encoded-frame buffer. Use
///   [`buffer_size::<C>(LED_COUNT)`](buffer_size); anything smaller fails to
///   compile.
/// - `C`, `Order` and `Timing` pick the color model, the channel order on the
///   wire and the LED family's pulse timing.
///
/// The `E` and `T` parameters supply the hardware: a transfer engine and a
/// time source for the transfer watchdog. Both are owned for the strip's
/// lifetime; mutable references work too, so tests can keep inspecting their
/// engine from outside.
///
/// [`show`](Self::show) blocks until the hardware reports frame completion,
/// which keeps exactly one transfer in flight and means two frames can never
/// interleave on the wire.
pub struct SmartLedStrip<const LED_COUNT: usize, const BUFFER_SIZE: usize, E, T, C, Order, Timing>
where
    E: TransferEngine,
    T: TimeSource,
    C: Color + Copy + Default,
    Order: ColorOrder<C>,
    Timing: crate::Timing,
{
    engine: E,
    clock: T,
    pixels: PixelBuffer<C, LED_COUNT>,
    signal: [Pulse; BUFFER_SIZE],
    encoder: PulseEncoder<C, Order, Timing>,
    descriptor: TransmissionDescriptor,
    state: StripState,
}

/// A [`SmartLedStrip`] for 8-bit RGB colors, which is what most smart LEDs
/// use.
pub type Rgb8Strip<const LED_COUNT: usize, const BUFFER_SIZE: usize, E, T, Order, Timing> =
    SmartLedStrip<LED_COUNT, BUFFER_SIZE, E, T, RGB8, Order, Timing>;

/// A [`SmartLedStrip`] preconfigured for WS2812-family strips: 8-bit RGB
/// pixels sent in GRB order with WS2812 timing.
pub type Ws2812Strip<const LED_COUNT: usize, const BUFFER_SIZE: usize, E, T> =
    SmartLedStrip<LED_COUNT, BUFFER_SIZE, E, T, RGB8, color_order::Grb, Ws2812Timing>;

impl<const LED_COUNT: usize, const BUFFER_SIZE: usize, E, T, C, Order, Timing>
    SmartLedStrip<LED_COUNT, BUFFER_SIZE, E, T, C, Order, Timing>
where
    E: TransferEngine,
    T: TimeSource,
    C: Color + Copy + Default,
    Order: ColorOrder<C>,
    Timing: crate::Timing,
{
    /// Creates a released strip around `engine` and `clock`.
    ///
    /// No hardware is touched here; pixels and brightness can already be set,
    /// but nothing reaches the line until [`begin`](Self::begin) and
    /// [`show`](Self::show). The per-frame transmission descriptor and the
    /// nanosecond-to-tick pulse tables are derived once from the engine's
    /// sample clock.
    pub fn new(engine: E, clock: T) -> Self {
        const {
            assert!(
                BUFFER_SIZE >= buffer_size::<C>(LED_COUNT),
                "BUFFER_SIZE is smaller than buffer_size::<C>(LED_COUNT)"
            )
        }

        let clock_hz = engine.clock_hz();
        let encoder = PulseEncoder::new(clock_hz);
        let descriptor = TransmissionDescriptor::new(
            clock_hz,
            buffer_size::<C>(LED_COUNT),
            encoder.bit_period_ticks(),
        );
        Self {
            engine,
            clock,
            pixels: PixelBuffer::new(),
            signal: [Pulse::default(); BUFFER_SIZE],
            encoder,
            descriptor,
            state: StripState::Released,
        }
    }

    /// Acquires the transfer engine and binds the transmission descriptor.
    ///
    /// Calling `begin` on a strip that is already running does nothing.
    ///
    /// # Errors
    ///
    /// [`StripError::HardwareUnavailable`] if the engine cannot be claimed or
    /// configured; the strip stays released and holds no hardware.
    pub fn begin(&mut self) -> Result<(), StripError<E::Error>> {
        if self.state != StripState::Released {
            return Ok(());
        }
        self.state = StripState::Configuring;
        match self.engine.configure(&self.descriptor) {
            Ok(()) => {
                #[cfg(feature = "defmt")]
                defmt::debug!(
                    "pulse engine configured: {=u32}Hz sample clock, {=usize} symbols per frame",
                    self.descriptor.clock_hz(),
                    self.descriptor.symbol_count()
                );
                self.state = StripState::Idle;
                Ok(())
            }
            Err(error) => {
                self.state = StripState::Released;
                Err(StripError::HardwareUnavailable(error))
            }
        }
    }

    /// Encodes the current pixel state and transmits it, blocking until the
    /// engine reports completion.
    ///
    /// The frame is regenerated from scratch on every call, so a successful
    /// `show` always puts the complete current pixel state on the wire,
    /// including after an earlier dropped frame. Brightness 0 still transmits
    /// a full frame, which is what actually turns previously lit LEDs off.
    ///
    /// # Errors
    ///
    /// [`StripError::NotStarted`] if [`begin`](Self::begin) has not run.
    /// [`StripError::TransferFault`] if the engine fails to start or faults in
    /// flight, [`StripError::Timeout`] if it never signals completion within
    /// the watchdog bound. In all three cases the engine is reset and the
    /// strip is [`Idle`](StripState::Idle) again when this returns; the frame
    /// is not retried automatically since the pixel state may have moved on.
    pub fn show(&mut self) -> Result<(), StripError<E::Error>> {
        if self.state == StripState::Released {
            return Err(StripError::NotStarted);
        }

        let len =
            self.encoder
                .encode(self.pixels.as_slice(), self.pixels.brightness(), &mut self.signal);

        self.state = StripState::Transmitting;
        if let Err(error) = self.engine.start(&self.signal[..len]) {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "transfer failed to start, frame dropped: {}",
                defmt::Debug2Format(&error)
            );
            self.recover();
            return Err(StripError::TransferFault(error));
        }

        let started = self.clock.now();
        loop {
            match self.engine.status() {
                TransferStatus::Complete => {
                    self.state = StripState::Idle;
                    return Ok(());
                }
                TransferStatus::Faulted(error) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!(
                        "transfer fault, frame dropped: {}",
                        defmt::Debug2Format(&error)
                    );
                    self.recover();
                    return Err(StripError::TransferFault(error));
                }
                TransferStatus::InFlight => {
                    let waited = self.clock.micros_since(started);
                    if waited > self.descriptor.watchdog_micros() {
                        #[cfg(feature = "defmt")]
                        defmt::warn!(
                            "transfer watchdog expired after {=u64}us, frame dropped",
                            waited
                        );
                        self.recover();
                        return Err(StripError::Timeout);
                    }
                    core::hint::spin_loop();
                }
            }
        }
    }

    /// Releases the transfer engine. Safe to call repeatedly; the strip also
    /// releases itself when dropped.
    pub fn end(&mut self) {
        if self.state == StripState::Released {
            return;
        }
        self.engine.release();
        self.state = StripState::Released;
        #[cfg(feature = "defmt")]
        defmt::debug!("pulse engine released");
    }

    /// Stores `color` at `index`.
    ///
    /// # Errors
    ///
    /// [`StripError::Range`] if `index` is outside the strip; no pixel
    /// changes.
    pub fn set_pixel(&mut self, index: usize, color: C) -> Result<(), StripError<E::Error>> {
        self.pixels.set(index, color)?;
        Ok(())
    }

    /// Returns the color at `index`, or `None` outside the strip.
    pub fn pixel(&self, index: usize) -> Option<C> {
        self.pixels.get(index)
    }

    /// All pixels in physical order.
    pub fn pixels(&self) -> &[C] {
        self.pixels.as_slice()
    }

    /// Resets every pixel to all channels zero. Takes effect on the wire with
    /// the next [`show`](Self::show).
    pub fn clear(&mut self) {
        self.pixels.clear();
    }

    /// Stores the global brightness, applied at encode time only. The stored
    /// pixel colors are never scaled in place, so earlier colors survive any
    /// sequence of brightness changes exactly.
    ///
    /// # Errors
    ///
    /// [`StripError::Range`] if `value` is outside `0.0..=1.0`; the stored
    /// brightness is unchanged.
    pub fn set_brightness(&mut self, value: f32) -> Result<(), StripError<E::Error>> {
        self.pixels.set_brightness(value)?;
        Ok(())
    }

    /// The stored global brightness.
    pub fn brightness(&self) -> f32 {
        self.pixels.brightness()
    }

    /// Number of LEDs on the strip.
    pub const fn len(&self) -> usize {
        LED_COUNT
    }

    /// Whether the strip has zero LEDs. Showing such a strip transmits just
    /// the reset gap.
    pub const fn is_empty(&self) -> bool {
        LED_COUNT == 0
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StripState {
        self.state
    }

    /// The transmission configuration derived at construction.
    pub fn descriptor(&self) -> &TransmissionDescriptor {
        &self.descriptor
    }

    /// Resets the engine after a fault and returns the strip to idle, per the
    /// no-partial-frame rule: the failed frame is dropped, never resumed.
    fn recover(&mut self) {
        self.state = StripState::Faulted;
        self.engine.reset();
        self.state = StripState::Idle;
    }
}

impl<const LED_COUNT: usize, const BUFFER_SIZE: usize, E, T, Order, Timing>
    SmartLedStrip<LED_COUNT, BUFFER_SIZE, E, T, RGB8, Order, Timing>
where
    E: TransferEngine,
    T: TimeSource,
    Order: ColorOrder<RGB8>,
    Timing: crate::Timing,
{
    /// Stores an (r, g, b) color at `index`.
    ///
    /// # Errors
    ///
    /// [`StripError::Range`] if `index` is outside the strip; no pixel
    /// changes.
    pub fn set_pixel_color(
        &mut self,
        index: usize,
        r: u8,
        g: u8,
        b: u8,
    ) -> Result<(), StripError<E::Error>> {
        self.set_pixel(index, RGB8::new(r, g, b))
    }
}

impl<const LED_COUNT: usize, const BUFFER_SIZE: usize, E, T, C, Order, Timing> SmartLedsWrite
    for SmartLedStrip<LED_COUNT, BUFFER_SIZE, E, T, C, Order, Timing>
where
    E: TransferEngine,
    T: TimeSource,
    C: Color + Copy + Default,
    Order: ColorOrder<C>,
    Timing: crate::Timing,
{
    type Error = StripError<E::Error>;
    type Color = C;

    /// Fills the pixel buffer from the start with the iterator's colors, then
    /// shows the frame. Pixels past the iterator's length keep their current
    /// colors; an iterator longer than the strip is rejected with
    /// [`StripError::Range`] before anything is transmitted.
    fn write<I, IC>(&mut self, iterator: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = IC>,
        IC: Into<Self::Color>,
    {
        for (index, color) in iterator.into_iter().enumerate() {
            self.pixels.set(index, color.into())?;
        }
        self.show()
    }
}

impl<const LED_COUNT: usize, const BUFFER_SIZE: usize, E, T, C, Order, Timing> Drop
    for SmartLedStrip<LED_COUNT, BUFFER_SIZE, E, T, C, Order, Timing>
where
    E: TransferEngine,
    T: TimeSource,
    C: Color + Copy + Default,
    Order: ColorOrder<C>,
    Timing: crate::Timing,
{
    /// Releases the engine on every exit path, including early-return errors
    /// in the caller.
    fn drop(&mut self) {
        self.end();
    }
}
