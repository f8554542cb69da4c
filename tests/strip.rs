//! Integration tests for the strip driver state machine.

mod common;

use common::*;
use smart_leds::{RGB8, SmartLedsWrite};
use smartled_pulse::{
    RESET_GAP_SYMBOLS, RangeError, StripError, StripState, Ws2812Strip, buffer_size,
};

const LEDS: usize = 60;
const BUF: usize = buffer_size::<RGB8>(LEDS);

type TestStrip<'a> = Ws2812Strip<LEDS, BUF, &'a mut MockEngine, &'a MockClock>;

#[test]
fn begin_configures_the_engine_once() {
    let mut engine = MockEngine::new();
    let clock = MockClock::new(10);
    {
        let mut strip = TestStrip::new(&mut engine, &clock);
        assert_eq!(strip.state(), StripState::Released);

        strip.begin().unwrap();
        assert_eq!(strip.state(), StripState::Idle);

        // A second begin on a configured strip is a no-op.
        strip.begin().unwrap();
        assert_eq!(strip.state(), StripState::Idle);
    }

    assert_eq!(
        engine.events,
        vec![
            EngineEvent::Configured {
                clock_hz: CLOCK_HZ,
                symbol_count: BUF
            },
            EngineEvent::Released,
        ]
    );
}

#[test]
fn begin_surfaces_engine_acquisition_failure() {
    let mut engine = MockEngine::new();
    engine.fail_configure = true;
    let clock = MockClock::new(10);
    let mut strip = TestStrip::new(&mut engine, &clock);

    let result = strip.begin();

    assert!(matches!(
        result,
        Err(StripError::HardwareUnavailable(MockError::Configure))
    ));
    assert_eq!(strip.state(), StripState::Released);
}

#[test]
fn show_before_begin_is_rejected() {
    let mut engine = MockEngine::new();
    let clock = MockClock::new(10);
    {
        let mut strip = TestStrip::new(&mut engine, &clock);
        strip.set_pixel_color(0, 255, 0, 0).unwrap();

        assert!(matches!(strip.show(), Err(StripError::NotStarted)));
        assert_eq!(strip.state(), StripState::Released);
    }

    // Nothing reached the engine, so there is nothing to release on drop.
    assert!(engine.events.is_empty());
}

#[test]
fn show_transmits_the_current_frame() {
    let mut engine = MockEngine::new();
    let clock = MockClock::new(10);
    {
        let mut strip = TestStrip::new(&mut engine, &clock);
        strip.begin().unwrap();
        strip.set_pixel_color(5, 0, 0, 255).unwrap();

        strip.show().unwrap();
        assert_eq!(strip.state(), StripState::Idle);
    }

    assert_eq!(engine.frames.len(), 1);
    let frame = &engine.frames[0];
    assert_eq!(frame.len(), BUF);
    assert_eq!(decode_pixel(&frame[5 * 24..6 * 24]), (0, 0, 255));
    assert_eq!(decode_pixel(&frame[0..24]), (0, 0, 0));
    assert!(frame[LEDS * 24..].iter().all(|symbol| *symbol == GAP));
}

#[test]
fn consecutive_shows_wait_for_the_previous_transfer() {
    let mut engine = MockEngine::new();
    engine.polls_before_complete = 2;
    let clock = MockClock::new(10);
    {
        let mut strip = TestStrip::new(&mut engine, &clock);
        strip.begin().unwrap();
        strip.show().unwrap();
        strip.show().unwrap();
        strip.end();
    }

    // The second start happens only after the first transfer completed;
    // MockEngine::start additionally panics on overlap.
    assert_eq!(
        engine.events,
        vec![
            EngineEvent::Configured {
                clock_hz: CLOCK_HZ,
                symbol_count: BUF
            },
            EngineEvent::Started { symbols: BUF },
            EngineEvent::Polled,
            EngineEvent::Polled,
            EngineEvent::Polled,
            EngineEvent::Started { symbols: BUF },
            EngineEvent::Polled,
            EngineEvent::Polled,
            EngineEvent::Polled,
            EngineEvent::Released,
        ]
    );
}

#[test]
fn transfer_fault_recovers_to_idle() {
    let mut engine = MockEngine::new();
    engine.fault = Some(MockError::Underrun);
    let clock = MockClock::new(10);
    {
        let mut strip = TestStrip::new(&mut engine, &clock);
        strip.begin().unwrap();

        let result = strip.show();
        assert!(matches!(
            result,
            Err(StripError::TransferFault(MockError::Underrun))
        ));
        // The failed frame is dropped and the strip accepts the next show.
        assert_eq!(strip.state(), StripState::Idle);

        let result = strip.show();
        assert!(matches!(result, Err(StripError::TransferFault(_))));
        assert_eq!(strip.state(), StripState::Idle);
        strip.end();
    }

    assert_eq!(
        engine.events,
        vec![
            EngineEvent::Configured {
                clock_hz: CLOCK_HZ,
                symbol_count: BUF
            },
            EngineEvent::Started { symbols: BUF },
            EngineEvent::Polled,
            EngineEvent::Reset,
            EngineEvent::Started { symbols: BUF },
            EngineEvent::Polled,
            EngineEvent::Reset,
            EngineEvent::Released,
        ]
    );
}

#[test]
fn start_failure_is_reported_as_a_transfer_fault() {
    let mut engine = MockEngine::new();
    engine.fail_start = true;
    let clock = MockClock::new(10);
    {
        let mut strip = TestStrip::new(&mut engine, &clock);
        strip.begin().unwrap();

        let result = strip.show();

        assert!(matches!(
            result,
            Err(StripError::TransferFault(MockError::Start))
        ));
        assert_eq!(strip.state(), StripState::Idle);
    }

    assert_eq!(
        engine.events,
        vec![
            EngineEvent::Configured {
                clock_hz: CLOCK_HZ,
                symbol_count: BUF
            },
            EngineEvent::Started { symbols: BUF },
            EngineEvent::Reset,
            EngineEvent::Released,
        ]
    );
}

#[test]
fn stalled_transfer_hits_the_watchdog() {
    let mut engine = MockEngine::new();
    engine.never_complete = true;
    // Every clock reading jumps far past the transfer watchdog.
    let clock = MockClock::new(100_000);
    {
        let mut strip = TestStrip::new(&mut engine, &clock);
        strip.begin().unwrap();

        let result = strip.show();

        assert!(matches!(result, Err(StripError::Timeout)));
        assert_eq!(strip.state(), StripState::Idle);
    }

    assert_eq!(
        engine.events,
        vec![
            EngineEvent::Configured {
                clock_hz: CLOCK_HZ,
                symbol_count: BUF
            },
            EngineEvent::Started { symbols: BUF },
            EngineEvent::Polled,
            EngineEvent::Reset,
            EngineEvent::Released,
        ]
    );
}

#[test]
fn descriptor_reflects_the_configured_frame() {
    let mut engine = MockEngine::new();
    let clock = MockClock::new(10);
    let strip = TestStrip::new(&mut engine, &clock);
    let descriptor = strip.descriptor();

    assert_eq!(descriptor.clock_hz(), CLOCK_HZ);
    assert_eq!(descriptor.symbol_count(), BUF);
    // 1504 symbols of up to 112 ticks each at 80MHz.
    assert_eq!(descriptor.frame_micros(), 2105);
    assert_eq!(descriptor.watchdog_micros(), 4157);
}

#[test]
fn out_of_range_writes_have_no_side_effects() {
    let mut engine = MockEngine::new();
    let clock = MockClock::new(10);
    {
        let mut strip = TestStrip::new(&mut engine, &clock);
        strip.begin().unwrap();

        let result = strip.set_pixel_color(LEDS, 255, 255, 255);
        assert!(matches!(
            result,
            Err(StripError::Range(RangeError::PixelIndex {
                index: 60,
                len: 60
            }))
        ));
        let result = strip.set_brightness(1.5);
        assert!(matches!(
            result,
            Err(StripError::Range(RangeError::Brightness { .. }))
        ));

        assert!(strip.pixels().iter().all(|color| *color == RGB8::default()));
        strip.show().unwrap();
    }

    // The rejected writes never made it into the transmitted frame.
    let frame = &engine.frames[0];
    assert!(frame[..LEDS * 24].iter().all(|symbol| *symbol == ZERO));
}

#[test]
fn pixel_accessors_read_back_stored_colors() {
    let mut engine = MockEngine::new();
    let clock = MockClock::new(10);
    let mut strip = TestStrip::new(&mut engine, &clock);

    assert_eq!(strip.len(), LEDS);
    assert!(!strip.is_empty());

    strip.set_pixel(2, RGB8::new(7, 8, 9)).unwrap();
    strip.set_pixel_color(3, 10, 11, 12).unwrap();

    assert_eq!(strip.pixel(2), Some(RGB8::new(7, 8, 9)));
    assert_eq!(strip.pixel(3), Some(RGB8::new(10, 11, 12)));
    assert_eq!(strip.pixel(LEDS), None);
    assert_eq!(strip.pixels()[2], RGB8::new(7, 8, 9));

    strip.clear();
    assert_eq!(strip.pixel(2), Some(RGB8::default()));

    strip.set_brightness(0.5).unwrap();
    assert_eq!(strip.brightness(), 0.5);
}

#[test]
fn end_is_idempotent_and_show_needs_a_new_begin() {
    let mut engine = MockEngine::new();
    let clock = MockClock::new(10);
    {
        let mut strip = TestStrip::new(&mut engine, &clock);
        strip.begin().unwrap();
        strip.show().unwrap();

        strip.end();
        assert_eq!(strip.state(), StripState::Released);
        strip.end();

        assert!(matches!(strip.show(), Err(StripError::NotStarted)));
    }

    let released = engine
        .events
        .iter()
        .filter(|event| matches!(event, EngineEvent::Released))
        .count();
    assert_eq!(released, 1);
}

#[test]
fn dropping_a_running_strip_releases_the_engine() {
    let mut engine = MockEngine::new();
    let clock = MockClock::new(10);
    {
        let mut strip = TestStrip::new(&mut engine, &clock);
        strip.begin().unwrap();
        strip.show().unwrap();
    }

    assert_eq!(engine.events.last(), Some(&EngineEvent::Released));
}

#[test]
fn smart_leds_write_updates_every_pixel_and_shows() {
    let mut engine = MockEngine::new();
    let clock = MockClock::new(10);
    {
        let mut strip = TestStrip::new(&mut engine, &clock);
        strip.begin().unwrap();

        strip
            .write((0..LEDS).map(|i| RGB8::new(i as u8, 0, 0)))
            .unwrap();
    }

    let frame = &engine.frames[0];
    for led in 0..LEDS {
        let window = &frame[led * 24..(led + 1) * 24];
        assert_eq!(decode_pixel(window), (0, led as u8, 0));
    }
}

#[test]
fn smart_leds_write_rejects_an_overlong_iterator() {
    let mut engine = MockEngine::new();
    let clock = MockClock::new(10);
    {
        let mut strip = TestStrip::new(&mut engine, &clock);
        strip.begin().unwrap();

        let result = strip.write(std::iter::repeat(RGB8::new(0, 0, 255)).take(LEDS + 1));

        assert!(matches!(result, Err(StripError::Range(_))));
    }

    // The oversized update never reached the wire.
    assert_eq!(engine.started_count(), 0);
}

#[test]
fn zero_length_strip_still_latches_the_reset_gap() {
    let mut engine = MockEngine::new();
    let clock = MockClock::new(10);
    {
        let mut strip: Ws2812Strip<0, { buffer_size::<RGB8>(0) }, _, _> =
            Ws2812Strip::new(&mut engine, &clock);
        assert_eq!(strip.len(), 0);
        assert!(strip.is_empty());

        strip.begin().unwrap();
        strip.show().unwrap();
    }

    let frame = &engine.frames[0];
    assert_eq!(frame.len(), RESET_GAP_SYMBOLS);
    assert!(frame.iter().all(|symbol| *symbol == GAP));
}
