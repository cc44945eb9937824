/**************************************************************************
 *                                                                        *
 * tapeforge - cassette-tape program file generator for 6809 home        *
 * computers.                                                            *
 *                                                                        *
 * This program is free software; you can redistribute it and/or modify   *
 * it under the terms of the GNU General Public License as published by   *
 * the Free Software Foundation, either version 3 of the License, or      *
 * (at your option) any later version.                                    *
 *                                                                        *
 * This program is distributed in the hope that it will be useful,        *
 * but WITHOUT ANY WARRANTY; without even the implied warranty of         *
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the           *
 * GNU General Public License for more details.                           *
 *                                                                        *
 **************************************************************************/

//! The waveform synthesizer (C5): turns a run of bytes into PCM samples
//! using per-bit pulse shaping, a running fractional-period error so long
//! runs don't drift, and a cache of reusable half-sine pairs.

use std::collections::HashMap;

use crate::timing::{PulseSpec, SOURCE_CLOCK};

/// Sine amplitude; samples are unsigned 8-bit PCM with midpoint 128.
const AMPLITUDE: f64 = 115.0;

/// Shared mutable state for one emit context (§5): the fractional-period
/// error and the sine-pair memoization cache.
#[derive(Default)]
pub struct SynthState {
  ao_error: f64,
  sinewave_cache: HashMap<(u32, u32), Vec<u8>>,
  pub sample_count: u64,
}

impl SynthState {
  pub fn new() -> Self {
    SynthState::default()
  }

  /// Round `units` (expressed in the same "source-clock ticks / 16" scale
  /// as `TimingSpec::cycles`) to a sample count, carrying the rounding
  /// residue forward into `ao_error` so long runs stay within +/-0.5
  /// sample of ideal.
  fn samples_for(&mut self, sample_rate: u32, units: f64) -> u32 {
    let nominal = sample_rate as f64 * units * 16.0 / SOURCE_CLOCK;
    let target = self.ao_error + nominal;
    let rounded = target.round();
    self.ao_error = target - rounded;
    rounded.max(1.0) as u32
  }

  fn half_sine_pair(&mut self, period0: u32, period1: u32) -> &[u8] {
    self
      .sinewave_cache
      .entry((period0, period1))
      .or_insert_with(|| generate_half_sine_pair(period0, period1))
  }

  /// Emit one bit's worth of waveform: two half-sine lobes whose lengths
  /// are derived from `cycles` plus the position-dependent delay pair.
  pub fn emit_bit(&mut self, sample_rate: u32, cycles: u16, delay_low: u16, delay_high: u16, out: &mut Vec<u8>) {
    let period0 = self.samples_for(sample_rate, cycles as f64 / 2.0 + delay_low as f64);
    let period1 = self.samples_for(sample_rate, cycles as f64 / 2.0 + delay_high as f64);
    let pair = self.half_sine_pair(period0, period1);
    out.extend_from_slice(pair);
    self.sample_count += pair.len() as u64;
  }

  /// Emit a run of bytes (LSB first) using the three-context delay
  /// selection rule from §4.5: bit 0 of the first byte of the run, bits
  /// 1..7 of every byte, bit 0 of subsequent bytes.
  pub fn emit_run(&mut self, sample_rate: u32, cycles: &[u16; 2], pspec: &PulseSpec, bytes: &[u8], out: &mut Vec<u8>) {
    for (byte_idx, &byte) in bytes.iter().enumerate() {
      for bit in 0..8u8 {
        let bitval = (byte >> bit) & 1;
        let (dl, dh) = if bit == 0 && byte_idx == 0 {
          (pspec[0], pspec[1])
        } else if bit == 0 {
          (pspec[4], pspec[5])
        } else {
          (pspec[2], pspec[3])
        };
        self.emit_bit(sample_rate, cycles[bitval as usize], dl, dh, out);
      }
    }
  }

  /// A constant mid-level (0x80) hold of `ticks` source-clock ticks,
  /// independent of the periodic running error.
  pub fn emit_idle(&mut self, sample_rate: u32, ticks: u32, out: &mut Vec<u8>) {
    let samples = (sample_rate as f64 * ticks as f64 / SOURCE_CLOCK).round() as usize;
    out.resize(out.len() + samples, 0x80);
    self.sample_count += samples as u64;
  }
}

fn generate_half_sine_pair(period0: u32, period1: u32) -> Vec<u8> {
  let mut buf = Vec::with_capacity((period0 + period1) as usize);
  for i in 1..=period0 {
    let theta = std::f64::consts::PI * i as f64 / (period0 as f64 + 1.0);
    buf.push(((AMPLITUDE * theta.sin()).round() + 128.0) as u8);
  }
  for i in 1..=period1 {
    let theta = std::f64::consts::PI + std::f64::consts::PI * i as f64 / (period1 as f64 + 1.0);
    buf.push(((AMPLITUDE * theta.sin()).round() + 128.0) as u8);
  }
  buf
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::timing::ROM;

  #[test]
  fn emit_bit_accumulates_exact_sample_count() {
    let mut s = SynthState::new();
    let mut out = Vec::new();
    s.emit_bit(9600, ROM.cycles[0], 0, 8, &mut out);
    assert_eq!(out.len() as u64, s.sample_count);
    assert!(!out.is_empty());
  }

  #[test]
  fn period_drift_law_stays_within_one_sample_over_many_pulses() {
    let mut s = SynthState::new();
    let mut out = Vec::new();
    let n = 500;
    for _ in 0..n {
      s.emit_bit(9600, ROM.cycles[1], 0, 8, &mut out);
    }
    let ideal: f64 = (0..2 * n)
      .map(|_| 9600.0 * (ROM.cycles[1] as f64 / 2.0 + 4.0) * 16.0 / SOURCE_CLOCK)
      .sum();
    let actual = s.sample_count as f64;
    assert!((actual - ideal).abs() <= 1.0, "actual={} ideal={}", actual, ideal);
  }

  #[test]
  fn sine_cache_reuses_identical_period_pairs() {
    let mut s = SynthState::new();
    let a = generate_half_sine_pair(10, 10);
    let cached = s.half_sine_pair(10, 10).to_vec();
    assert_eq!(a, cached);
    // second lookup hits the cache and returns the same bytes
    let cached_again = s.half_sine_pair(10, 10).to_vec();
    assert_eq!(cached, cached_again);
    assert_eq!(s.sinewave_cache.len(), 1);
  }

  #[test]
  fn emit_run_lsb_first_uses_correct_delay_context() {
    let mut s = SynthState::new();
    let mut out = Vec::new();
    s.emit_run(9600, &ROM.cycles, &ROM.rest, &[0xFF, 0x01], &mut out);
    assert!(!out.is_empty());
  }
}
