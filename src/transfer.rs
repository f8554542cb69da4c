//! The seam between the driver and the hardware that moves encoded frames.

use crate::Pulse;

/// Progress of the single outstanding transfer, as reported by
/// [`TransferEngine::status`].
///
/// This is deliberately a narrow single-slot signal rather than a callback
/// mechanism: at most one transfer is ever in flight per strip, and the driver
/// only needs to distinguish not-yet, done and faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferStatus<E> {
    /// The transfer is still moving data to the peripheral.
    InFlight,
    /// The most recent transfer finished and the line is idle.
    Complete,
    /// The engine faulted, for example on a buffer underrun. The frame on the
    /// wire is invalid and must be considered dropped.
    Faulted(E),
}

/// Peripheral configuration derived once when the driver starts and reused for
/// every transmission; only the frame payload changes between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransmissionDescriptor {
    clock_hz: u32,
    symbol_count: usize,
    bit_period_ticks: u32,
}

impl TransmissionDescriptor {
    /// Describes frames of `symbol_count` pulse symbols emitted on a sample
    /// clock of `clock_hz`, where no symbol is longer than `bit_period_ticks`.
    pub const fn new(clock_hz: u32, symbol_count: usize, bit_period_ticks: u32) -> Self {
        Self {
            clock_hz,
            symbol_count,
            bit_period_ticks,
        }
    }

    /// Sample clock the pulse generator runs at, in Hertz.
    pub const fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    /// Transfer length of one frame, in pulse symbols.
    pub const fn symbol_count(&self) -> usize {
        self.symbol_count
    }

    /// Nominal duration of one full frame, in microseconds.
    pub const fn frame_micros(&self) -> u64 {
        (self.symbol_count as u64 * self.bit_period_ticks as u64 * 1_000_000)
            / self.clock_hz as u64
    }

    /// Watchdog bound for one transfer: the nominal frame duration plus half
    /// again, plus a 1ms margin for scheduling slack. A transfer that has not
    /// completed within this interval is treated as a hardware fault.
    pub const fn watchdog_micros(&self) -> u64 {
        let nominal = self.frame_micros();
        nominal + nominal / 2 + 1_000
    }
}

/// A memory-to-peripheral transfer engine feeding a free-running pulse
/// generator, the mechanism that keeps protocol timing accurate without the
/// CPU touching every symbol.
///
/// Implementations wrap concrete hardware (an RMT channel, a DMA-fed PWM) or a
/// test double. The driver guarantees the call sequence
/// [`configure`](Self::configure) once, then per frame one
/// [`start`](Self::start) followed by [`status`](Self::status) polls until the
/// slot leaves [`TransferStatus::InFlight`], with [`reset`](Self::reset) after
/// any fault and [`release`](Self::release) exactly once at shutdown.
pub trait TransferEngine {
    /// Hardware-level error reported on configuration and transfer failures.
    type Error: core::fmt::Debug;

    /// Sample clock the pulse generator runs at, in Hertz. Must be known
    /// before [`configure`](Self::configure) and nonzero, since the frame
    /// timing budget is derived from it.
    fn clock_hz(&self) -> u32;

    /// Claims the peripheral and binds the per-strip transfer configuration.
    ///
    /// # Errors
    ///
    /// Any acquisition or configuration failure; the driver surfaces it as an
    /// initialization error and the engine must be left released.
    fn configure(&mut self, descriptor: &TransmissionDescriptor) -> Result<(), Self::Error>;

    /// Starts transmitting one frame.
    ///
    /// The engine must latch `frame` into transfer-visible memory before
    /// returning; the caller's buffer is not borrowed beyond this call.
    /// Engines may complete synchronously before returning, in which case
    /// [`status`](Self::status) reports [`TransferStatus::Complete`]
    /// immediately.
    ///
    /// # Errors
    ///
    /// A failure to start counts as a transfer fault for this frame.
    fn start(&mut self, frame: &[Pulse]) -> Result<(), Self::Error>;

    /// Reads the completion slot for the most recently started transfer.
    fn status(&mut self) -> TransferStatus<Self::Error>;

    /// Forces the engine back to an idle, startable state after a fault or
    /// watchdog timeout. The in-flight frame, if any, is abandoned.
    fn reset(&mut self);

    /// Releases the peripheral. Called once at shutdown; starting afterwards
    /// is an error.
    fn release(&mut self);
}

impl<E: TransferEngine> TransferEngine for &mut E {
    type Error = E::Error;

    fn clock_hz(&self) -> u32 {
        (**self).clock_hz()
    }

    fn configure(&mut self, descriptor: &TransmissionDescriptor) -> Result<(), Self::Error> {
        (**self).configure(descriptor)
    }

    fn start(&mut self, frame: &[Pulse]) -> Result<(), Self::Error> {
        (**self).start(frame)
    }

    fn status(&mut self) -> TransferStatus<Self::Error> {
        (**self).status()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Monotonic time readings for the transfer watchdog.
pub trait TimeSource {
    /// An opaque point in time.
    type Instant: Copy;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Microseconds elapsed between `earlier` and now.
    fn micros_since(&self, earlier: Self::Instant) -> u64;
}

impl<T: TimeSource> TimeSource for &T {
    type Instant = T::Instant;

    fn now(&self) -> Self::Instant {
        (**self).now()
    }

    fn micros_since(&self, earlier: Self::Instant) -> u64 {
        (**self).micros_since(earlier)
    }
}
