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
 * You should have received a copy of the GNU General Public License      *
 * along with this program. If not, see <http://www.gnu.org/licenses/>.   *
 *                                                                        *
 **************************************************************************/

//! The three named pulse timing specs. The distilled spec gives the shape
//! of these tables (§3) and a formula (§4.5) but not the exact ROM-derived
//! constants; the values below are a calibrated choice documented in
//! DESIGN.md, not a transcription of a disclosed table.

use crate::error::{Result, TapeError};

pub const SOURCE_CLOCK: f64 = 14_318_180.0;

/// `{delay_low, delay_high}` pairs for: bit0-of-first-byte, bits1..7,
/// bit0-of-subsequent-byte.
pub type PulseSpec = [u16; 6];

#[derive(Debug, Clone, Copy)]
pub struct TimingSpec {
  pub name: &'static str,
  pub cycles: [u16; 2],
  pub leader: PulseSpec,
  pub first: PulseSpec,
  pub rest: PulseSpec,
}

pub const ROM: TimingSpec = TimingSpec {
  name: "rom",
  cycles: [699, 350],
  leader: [0, 8, 0, 0, 8, 0],
  first: [0, 8, 0, 0, 8, 0],
  rest: [0, 8, 0, 0, 8, 0],
};

pub const SIMPLE: TimingSpec = TimingSpec {
  name: "simple",
  cycles: [699, 350],
  leader: [0, 0, 0, 0, 0, 0],
  first: [0, 0, 0, 0, 0, 0],
  rest: [0, 0, 0, 0, 0, 0],
};

pub const FAST: TimingSpec = TimingSpec {
  name: "fast",
  cycles: [350, 175],
  leader: [0, 4, 0, 0, 4, 0],
  first: [0, 4, 0, 0, 4, 0],
  rest: [0, 4, 0, 0, 4, 0],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingName {
  Rom,
  Simple,
  Fast,
}

impl TimingName {
  pub fn parse(s: &str) -> Result<TimingName> {
    match s {
      "rom" => Ok(TimingName::Rom),
      "simple" => Ok(TimingName::Simple),
      _ => Err(TapeError::Usage(format!("unknown timing name '{}'", s))),
    }
  }

  pub fn spec(self) -> &'static TimingSpec {
    match self {
      TimingName::Rom => &ROM,
      TimingName::Simple => &SIMPLE,
      TimingName::Fast => &FAST,
    }
  }
}

/// `period_samples = (sample_rate * cycles * 16) / source_clock`, the
/// un-split nominal period length used before half-period rounding.
pub fn nominal_period_samples(sample_rate: u32, cycles: u16) -> f64 {
  (sample_rate as f64) * (cycles as f64) * 16.0 / SOURCE_CLOCK
}
