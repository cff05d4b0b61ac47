//! End-to-end verification tests for the expander assembly.
//!
//! These drive a full module (four CV and four trigger channels on one
//! recording DAC) through simulated time, verifying:
//!
//! - **Envelope events:** end-of-rise and end-of-cycle reach the right trigger
//! - **Bad references:** trigger numbers past the end are ignored
//! - **Write path:** every CV channel lands on its own DAC channel, once per change
//! - **Fault tolerance:** a failing DAC still lets trigger channels and envelope events run
//! - **Kill and reset:** module-wide stop and power-on defaults

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use crate::clock::{Clock, Millis};
    use crate::constants::ticks_for_ms;
    use crate::dac::mock::{RecordingDac, WriteFailed};
    use crate::expander::Expander;
    use crate::quantizer::EqualTemperament;
    use crate::units::TimeUnit;

    type Module = Expander<RecordingDac, EqualTemperament, 4, 4>;

    fn module() -> Module {
        Expander::with_default_quantizers(RecordingDac::new())
    }

    /// Run whole milliseconds `from..to`, counting rising edges per trigger.
    fn run_ms(m: &mut Module, from: u32, to: u32) -> [u32; 4] {
        let mut edges = [0; 4];
        let mut last = [false; 4];
        for ms in from..to {
            for _ in 0..ticks_for_ms(1) {
                m.tick(Millis(ms)).unwrap();
                for (i, tr) in m.tr.iter().enumerate() {
                    if tr.is_high() && !last[i] {
                        edges[i] += 1;
                    }
                    last[i] = tr.is_high();
                }
            }
        }
        edges
    }

    // ═══════════════════════════════════════════════════════════════════
    //  Verification 1: envelope end-of-rise and end-of-cycle pulse the
    //  configured trigger outputs
    // ═══════════════════════════════════════════════════════════════════

    #[test]
    fn verify_envelope_events_pulse_triggers() {
        let mut m = module();
        m.cv[0].set_value(12_000);
        m.cv[0].set_envelope_mode(true);
        m.cv[0].set_attack(3, TimeUnit::Milliseconds);
        m.cv[0].set_decay(6, TimeUnit::Milliseconds);
        m.cv[0].set_end_of_rise(1);
        m.cv[0].set_end_of_cycle(2);
        for tr in m.tr.iter_mut() {
            tr.set_time(1, TimeUnit::Milliseconds);
        }
        run_ms(&mut m, 0, 2);

        m.cv[0].trigger_envelope();
        // attack only
        let edges = run_ms(&mut m, 2, 5);
        assert_eq!(edges, [0, 0, 0, 0]);
        // peak and full decay
        let edges = run_ms(&mut m, 5, 20);
        assert_eq!(edges, [1, 1, 0, 0]);
        assert_eq!(m.cv[0].current_value(), 0);
        assert!(!m.cv[0].is_envelope_running());
    }

    #[test]
    fn verify_looping_envelope_clocks_trigger() {
        let mut m = module();
        m.cv[1].set_value(8000);
        m.cv[1].set_envelope_mode(true);
        m.cv[1].set_attack(2, TimeUnit::Milliseconds);
        m.cv[1].set_decay(2, TimeUnit::Milliseconds);
        m.cv[1].set_end_of_cycle(4);
        m.cv[1].set_envelope_loop(3);
        m.tr[3].set_time(1, TimeUnit::Milliseconds);
        run_ms(&mut m, 0, 1);

        m.cv[1].trigger_envelope();
        let edges = run_ms(&mut m, 1, 40);
        assert_eq!(edges, [0, 0, 0, 3]);
    }

    // ═══════════════════════════════════════════════════════════════════
    //  Verification 2: references past the trigger array are ignored
    // ═══════════════════════════════════════════════════════════════════

    #[test]
    fn verify_out_of_range_trigger_is_ignored() {
        let mut m = module();
        m.cv[2].set_value(5000);
        m.cv[2].set_envelope_mode(true);
        m.cv[2].set_attack(1, TimeUnit::Milliseconds);
        m.cv[2].set_decay(1, TimeUnit::Milliseconds);
        m.cv[2].set_end_of_rise(9);
        m.cv[2].set_end_of_cycle(5);
        m.cv[2].trigger_envelope();
        let edges = run_ms(&mut m, 0, 10);
        assert_eq!(edges, [0, 0, 0, 0]);
        assert!(!m.cv[2].is_envelope_running());
    }

    // ═══════════════════════════════════════════════════════════════════
    //  Verification 3: DAC channel mapping and redundant-write suppression
    // ═══════════════════════════════════════════════════════════════════

    #[test]
    fn verify_channels_write_their_own_dac_channel() {
        let mut m = module();
        for (i, cv) in m.cv.iter_mut().enumerate() {
            cv.set_value(1000 * (i as i32 + 1));
        }
        m.tick(Millis(0)).unwrap();
        for i in 0..4 {
            assert_eq!(m.dac().writes[i], 1);
            assert_eq!(m.dac().values[i], Some((32767 - 1000 * (i as i32 + 1)) as u16));
        }

        // idle ticks and identical values cause no further writes
        for cv in m.cv.iter_mut() {
            cv.set_value(cv.current_value());
        }
        run_ms(&mut m, 0, 5);
        assert_eq!(m.dac().total_writes(), 4);
    }

    #[test]
    fn verify_oscillating_channel_streams() {
        let mut m = module();
        m.cv[3].set_value(16_000);
        m.cv[3].set_waveform(0);
        m.cv[3].set_frequency(440);
        run_ms(&mut m, 0, 4);
        let streamed = m.dac().writes[3];
        assert!(streamed > ticks_for_ms(4) * 9 / 10);
        // the quiet channels wrote their initial zero only
        assert_eq!(m.dac().writes[0], 1);

        let (cv_leds, _) = m.led_tick();
        assert_eq!(cv_leds[0], 0);
    }

    // ═══════════════════════════════════════════════════════════════════
    //  Verification 4: a failing DAC reports the error but time moves on
    // ═══════════════════════════════════════════════════════════════════

    #[test]
    fn verify_dac_failure_keeps_triggers_running() {
        let mut m = module();
        m.tr[0].set_time(10, TimeUnit::Milliseconds);
        m.tr[0].pulse(Millis(0));
        m.cv[0].set_value(100);
        m.dac_mut().fail = true;
        assert_eq!(m.tick(Millis(10)), Err(WriteFailed));
        assert!(!m.tr[0].is_high());

        m.dac_mut().fail = false;
        m.cv[0].set_value(100);
        m.tick(Millis(11)).unwrap();
        assert_eq!(m.dac().values[0], Some(32667));
    }

    #[test]
    fn verify_end_of_rise_survives_failed_peak_write() {
        let mut m = module();
        m.cv[0].set_value(10_007);
        m.cv[0].set_envelope_mode(true);
        m.cv[0].set_attack(1, TimeUnit::Milliseconds);
        m.cv[0].set_decay(4, TimeUnit::Milliseconds);
        m.cv[0].set_end_of_rise(1);
        m.tr[0].set_time(1, TimeUnit::Milliseconds);
        run_ms(&mut m, 0, 1);

        // the bus is down for the whole attack, peak tick included
        m.cv[0].trigger_envelope();
        m.dac_mut().fail = true;
        let mut pulsed = false;
        for _ in 0..ticks_for_ms(1) + 1 {
            assert_eq!(m.tick(Millis(1)), Err(WriteFailed));
            pulsed |= m.tr[0].is_high();
        }
        assert!(pulsed);
        assert!(m.cv[0].is_envelope_running());

        m.dac_mut().fail = false;
        run_ms(&mut m, 2, 10);
        assert_eq!(m.cv[0].current_value(), 0);
        assert!(!m.cv[0].is_envelope_running());
        assert_eq!(m.dac().values[0], Some(32767));
    }

    // ═══════════════════════════════════════════════════════════════════
    //  Verification 5: metronomes run from the module clock
    // ═══════════════════════════════════════════════════════════════════

    struct TestClock(Cell<u32>);

    impl Clock for TestClock {
        fn now(&self) -> Millis {
            Millis(self.0.get())
        }
    }

    #[test]
    fn verify_metronome_from_clock() {
        let mut m = module();
        let clock = TestClock(Cell::new(0));
        m.tr[1].set_time(5, TimeUnit::Milliseconds);
        m.tr[1].set_metro_time(240, TimeUnit::Bpm);
        m.tr[1].set_multiplier(2);
        m.tr[1].set_metro(true, clock.now());

        let mut edges = 0;
        let mut last = false;
        for ms in 0..2000 {
            clock.0.set(ms);
            m.tick_clock(&clock).unwrap();
            if m.tr[1].is_high() && !last {
                edges += 1;
            }
            last = m.tr[1].is_high();
        }
        // 250 ms beats doubled over two seconds
        assert_eq!(edges, 16);
        assert_eq!(m.tr[1].next_reference_beat(), Millis(2000));

        let (_, tr_leds) = m.led_tick();
        assert_eq!(tr_leds[1], if m.tr[1].is_high() { 255 } else { 0 });
    }

    // ═══════════════════════════════════════════════════════════════════
    //  Verification 6: module-wide kill and reset
    // ═══════════════════════════════════════════════════════════════════

    #[test]
    fn verify_kill_all_stops_everything() {
        let mut m = module();
        m.cv[0].set_slew(5, TimeUnit::Seconds);
        m.cv[0].target_value(20_000);
        m.tr[2].set_metro(true, Millis(0));
        run_ms(&mut m, 0, 3);
        assert!(m.cv[0].current_value() < 20_000);

        m.kill_all();
        m.tick(Millis(3)).unwrap();
        assert_eq!(m.cv[0].current_value(), 20_000);
        assert!(!m.tr[2].is_metro_armed());
    }

    #[test]
    fn verify_reset_all_restores_defaults() {
        let mut m = module();
        m.cv[0].set_value(3000);
        m.cv[0].set_envelope_mode(true);
        m.cv[1].set_lfo(2000);
        m.tr[0].set_division(3);
        m.tr[0].set_metro(true, Millis(0));
        run_ms(&mut m, 0, 2);

        m.reset_all(Millis(2));
        assert!(!m.cv[0].is_envelope_mode());
        assert!(!m.cv[1].is_oscillating());
        assert!(!m.tr[0].is_metro_armed());

        m.tr[0].pulse(Millis(2));
        assert!(m.tr[0].is_high());
        m.tick(Millis(2)).unwrap();
        assert_eq!(m.cv[0].current_value(), 3000);
    }
}
