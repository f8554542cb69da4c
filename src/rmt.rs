//! [`TransferEngine`] backend for the ESP32 family's RMT peripheral.

use esp_hal::{
    Blocking,
    clock::Clocks,
    gpio::{Level, interconnect::PeripheralOutput},
    rmt::{Channel, Error as RmtError, PulseCode, Tx, TxChannelConfig, TxChannelCreator},
};

use crate::{Pulse, TimeSource, TransferEngine, TransferStatus, TransmissionDescriptor};

/// All types of errors that can happen in the RMT transfer engine.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum RmtEngineError {
    /// The frame does not fit the engine's pulse buffer.
    ///
    /// This almost always points to an issue with the `BUFFER_SIZE` parameter of [`RmtTransferEngine`].
    /// You should create this parameter as [`buffer_size`](crate::buffer_size) of the desired LED count, plus one for the end marker.
    BufferSizeExceeded,
    /// The RMT channel was already released or consumed by an earlier
    /// transmission error; the engine must be constructed anew.
    ChannelReleased,
    /// Raised if something goes wrong in the transmission. This contains the inner HAL error ([`RmtError`]).
    Transmission(RmtError),
}

impl From<RmtError> for RmtEngineError {
    fn from(value: RmtError) -> Self {
        Self::Transmission(value)
    }
}

/// [`TransferEngine`] implementation using the ESP32's "remote control" (RMT)
/// peripheral for hardware-offloaded, protocol-accurate pulse output.
///
/// `BUFFER_SIZE` determines how many RMT pulse entries can be sent per frame
/// and allows the engine to function entirely without heap allocation; it must
/// hold the strip's full frame plus one end-marker entry.
///
/// The RMT transmission is driven through the blocking HAL API, so a started
/// frame has already completed (or faulted) by the time
/// [`start`](TransferEngine::start) returns and the driver's status poll
/// finishes on its first pass.
pub struct RmtTransferEngine<'d, const BUFFER_SIZE: usize> {
    channel: Option<Channel<'d, Blocking, Tx>>,
    pulse_buffer: [PulseCode; BUFFER_SIZE],
    slot: TransferStatus<RmtEngineError>,
    apb_hz: u32,
}

impl<'d, const BUFFER_SIZE: usize> RmtTransferEngine<'d, BUFFER_SIZE> {
    /// Creates an engine that drives the provided output pin using the given
    /// RMT channel.
    ///
    /// If you want to reuse the channel afterwards, you can use
    /// [`esp_hal::rmt::ChannelCreator::reborrow`] to create a shorter-lived
    /// derived channel.
    ///
    /// # Errors
    ///
    /// If any configuration issue with the RMT [`Channel`] occurs, the error
    /// will be returned.
    pub fn new<Ch, P>(channel: Ch, pin: P) -> Result<Self, RmtEngineError>
    where
        Ch: TxChannelCreator<'d, Blocking>,
        P: PeripheralOutput<'d>,
    {
        Self::new_with_memsize(channel, pin, 1)
    }

    /// Creates an engine that drives the provided output pin using the given
    /// RMT channel and `memsize` RMT memory blocks.
    ///
    /// If you use any value other than 1, other RMT channels will not be
    /// available, as their memory blocks will be used up by this engine.
    /// However, this can allow you to control many more LEDs without issues.
    ///
    /// # Errors
    ///
    /// If any configuration issue with the RMT [`Channel`] occurs, the error
    /// will be returned.
    pub fn new_with_memsize<Ch, P>(channel: Ch, pin: P, memsize: u8) -> Result<Self, RmtEngineError>
    where
        Ch: TxChannelCreator<'d, Blocking>,
        P: PeripheralOutput<'d>,
    {
        let config = TxChannelConfig::default()
            .with_clk_divider(1)
            .with_idle_output_level(Level::Low)
            .with_memsize(memsize)
            .with_carrier_modulation(false)
            .with_idle_output(true);

        let channel = channel.configure_tx(pin, config)?;

        // Assume the RMT peripheral is set up to use the APB clock
        let clocks = Clocks::get();

        Ok(Self {
            channel: Some(channel),
            pulse_buffer: [PulseCode::end_marker(); BUFFER_SIZE],
            slot: TransferStatus::Complete,
            apb_hz: clocks.apb_clock.as_hz(),
        })
    }
}

impl<'d, const BUFFER_SIZE: usize> TransferEngine for RmtTransferEngine<'d, BUFFER_SIZE> {
    type Error = RmtEngineError;

    fn clock_hz(&self) -> u32 {
        self.apb_hz
    }

    fn configure(&mut self, descriptor: &TransmissionDescriptor) -> Result<(), Self::Error> {
        if self.channel.is_none() {
            return Err(RmtEngineError::ChannelReleased);
        }
        // One extra entry per frame for the end marker.
        if descriptor.symbol_count() + 1 > BUFFER_SIZE {
            return Err(RmtEngineError::BufferSizeExceeded);
        }
        Ok(())
    }

    fn start(&mut self, frame: &[Pulse]) -> Result<(), Self::Error> {
        if frame.len() + 1 > BUFFER_SIZE {
            return Err(RmtEngineError::BufferSizeExceeded);
        }
        for (entry, pulse) in self.pulse_buffer.iter_mut().zip(frame) {
            *entry = if pulse.high == 0 {
                // The RMT reads a zero-length phase as an end marker, so
                // silence has to occupy both halves of the entry.
                PulseCode::new(Level::Low, pulse.low, Level::Low, pulse.low)
            } else {
                PulseCode::new(Level::High, pulse.high, Level::Low, pulse.low)
            };
        }
        self.pulse_buffer[frame.len()] = PulseCode::end_marker();

        let Some(channel) = self.channel.take() else {
            return Err(RmtEngineError::ChannelReleased);
        };
        // transmit() consumes the channel on a start failure; the engine then
        // stays released until constructed anew.
        match channel.transmit(&self.pulse_buffer[..frame.len() + 1])?.wait() {
            Ok(channel) => {
                self.channel = Some(channel);
                self.slot = TransferStatus::Complete;
                Ok(())
            }
            Err((error, channel)) => {
                self.channel = Some(channel);
                self.slot = TransferStatus::Faulted(RmtEngineError::Transmission(error));
                Err(RmtEngineError::Transmission(error))
            }
        }
    }

    fn status(&mut self) -> TransferStatus<Self::Error> {
        self.slot
    }

    fn reset(&mut self) {
        self.slot = TransferStatus::Complete;
    }

    fn release(&mut self) {
        // Dropping the channel hands it back to the HAL.
        self.channel = None;
    }
}

/// [`TimeSource`] backed by the esp-hal system timer.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HalTimeSource;

impl TimeSource for HalTimeSource {
    type Instant = esp_hal::time::Instant;

    fn now(&self) -> Self::Instant {
        esp_hal::time::Instant::now()
    }

    fn micros_since(&self, earlier: Self::Instant) -> u64 {
        (esp_hal::time::Instant::now() - earlier).as_micros()
    }
}
