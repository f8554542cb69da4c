//! Shared test infrastructure: a scriptable recording transfer engine and a
//! deterministic time source.

#![allow(dead_code)]

use std::cell::Cell;

use smartled_pulse::{Pulse, TimeSource, TransferEngine, TransferStatus, TransmissionDescriptor};

/// Sample clock used by the mock engine, matching a typical 80MHz APB clock.
pub const CLOCK_HZ: u32 = 80_000_000;

/// WS2812 zero-bit pulse at [`CLOCK_HZ`]: 350ns high, 700ns low.
pub const ZERO: Pulse = Pulse::new(28, 56);

/// WS2812 one-bit pulse at [`CLOCK_HZ`]: 800ns high, 600ns low.
pub const ONE: Pulse = Pulse::new(64, 48);

/// Reset-gap symbol at [`CLOCK_HZ`]: silence for one longest bit period.
pub const GAP: Pulse = Pulse::silence(112);

/// Calls observed by [`MockEngine`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Configured { clock_hz: u32, symbol_count: usize },
    Started { symbols: usize },
    Polled,
    Reset,
    Released,
}

/// Error reported by [`MockEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockError {
    Configure,
    Start,
    Underrun,
}

/// Transfer engine double: records every call, captures every frame, and
/// completes, faults or stalls according to its script fields.
pub struct MockEngine {
    pub clock_hz: u32,
    /// `InFlight` polls to report before a started transfer completes.
    pub polls_before_complete: u32,
    /// Make `configure` fail, as if the peripheral were already claimed.
    pub fail_configure: bool,
    /// Make `start` fail before anything is considered in flight.
    pub fail_start: bool,
    /// Report this fault from `status` instead of ever completing.
    pub fault: Option<MockError>,
    /// Stay `InFlight` forever, to exercise the watchdog.
    pub never_complete: bool,
    pub events: Vec<EngineEvent>,
    pub frames: Vec<Vec<Pulse>>,
    remaining_polls: u32,
    in_flight: bool,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            clock_hz: CLOCK_HZ,
            polls_before_complete: 0,
            fail_configure: false,
            fail_start: false,
            fault: None,
            never_complete: false,
            events: Vec::new(),
            frames: Vec::new(),
            remaining_polls: 0,
            in_flight: false,
        }
    }

    /// Number of transfers that were started.
    pub fn started_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, EngineEvent::Started { .. }))
            .count()
    }
}

impl TransferEngine for MockEngine {
    type Error = MockError;

    fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    fn configure(&mut self, descriptor: &TransmissionDescriptor) -> Result<(), MockError> {
        self.events.push(EngineEvent::Configured {
            clock_hz: descriptor.clock_hz(),
            symbol_count: descriptor.symbol_count(),
        });
        if self.fail_configure {
            return Err(MockError::Configure);
        }
        Ok(())
    }

    fn start(&mut self, frame: &[Pulse]) -> Result<(), MockError> {
        // A second frame started while one is on the wire would interleave
        // bits; the driver must never let that happen.
        assert!(!self.in_flight, "start() while a transfer is in flight");
        self.events.push(EngineEvent::Started {
            symbols: frame.len(),
        });
        self.frames.push(frame.to_vec());
        if self.fail_start {
            return Err(MockError::Start);
        }
        self.in_flight = true;
        self.remaining_polls = self.polls_before_complete;
        Ok(())
    }

    fn status(&mut self) -> TransferStatus<MockError> {
        self.events.push(EngineEvent::Polled);
        if let Some(error) = self.fault {
            return TransferStatus::Faulted(error);
        }
        if self.never_complete {
            return TransferStatus::InFlight;
        }
        if self.remaining_polls > 0 {
            self.remaining_polls -= 1;
            return TransferStatus::InFlight;
        }
        self.in_flight = false;
        TransferStatus::Complete
    }

    fn reset(&mut self) {
        self.in_flight = false;
        self.events.push(EngineEvent::Reset);
    }

    fn release(&mut self) {
        self.events.push(EngineEvent::Released);
    }
}

/// Time source that advances a fixed number of microseconds on every reading.
pub struct MockClock {
    now: Cell<u64>,
    step: u64,
}

impl MockClock {
    pub fn new(step_micros: u64) -> Self {
        Self {
            now: Cell::new(0),
            step: step_micros,
        }
    }
}

impl TimeSource for MockClock {
    type Instant = u64;

    fn now(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }

    fn micros_since(&self, earlier: u64) -> u64 {
        self.now().saturating_sub(earlier)
    }
}

/// Reads one encoded channel (8 symbols, MSB first) back into its byte value.
pub fn decode_channel(symbols: &[Pulse]) -> u8 {
    symbols.iter().fold(0, |value, symbol| {
        let bit = match *symbol {
            ZERO => 0,
            ONE => 1,
            other => panic!("not a WS2812 bit symbol: {other:?}"),
        };
        (value << 1) | bit
    })
}

/// Reads one encoded RGB8 pixel (24 symbols) back as its three wire-order
/// channel bytes.
pub fn decode_pixel(symbols: &[Pulse]) -> (u8, u8, u8) {
    (
        decode_channel(&symbols[0..8]),
        decode_channel(&symbols[8..16]),
        decode_channel(&symbols[16..24]),
    )
}
