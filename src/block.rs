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
 **************************************************************************/

//! The block framer (C4): sync/header/payload/checksum/trailer framing,
//! shared verbatim by both the CAS and WAV backends through the
//! `ByteSink` trait. Each backend decides *how* a run of bytes becomes
//! output; the framer only decides *what* bytes to send, in what groups.

use crate::error::{Result, TapeError};
use crate::timing::{PulseSpec, TimingSpec};

pub const KIND_NAMEFILE: u8 = 0x00;
pub const KIND_DATA: u8 = 0x01;
pub const KIND_EOF: u8 = 0xFF;

pub const SYNC: [u8; 2] = [0x55, 0x3C];
pub const FILLER: u8 = 0x55;

/// `checksum = (kind + len + sum(payload)) mod 256` (§3).
pub fn checksum(kind: u8, payload: &[u8]) -> u8 {
  let sum: u32 = kind as u32 + payload.len() as u32 + payload.iter().map(|&b| b as u32).sum::<u32>();
  (sum % 256) as u8
}

/// The medium-specific half of emitting a tape byte stream: CAS writes
/// bytes straight through; WAV synthesizes waveform samples. Each call is
/// one "run" for the purposes of the first/subsequent-byte timing rule.
pub trait ByteSink {
  fn write_run(&mut self, bytes: &[u8], cycles: &[u16; 2], pspec: &PulseSpec) -> Result<()>;
  fn write_idle_prelude(&mut self, cycles: &[u16; 2], leader_pspec: &PulseSpec) -> Result<()>;
}

pub struct Framer<'a, S: ByteSink> {
  sink: &'a mut S,
  pub timing: TimingSpec,
}

impl<'a, S: ByteSink> Framer<'a, S> {
  pub fn new(sink: &'a mut S, timing: TimingSpec) -> Self {
    Framer { sink, timing }
  }

  /// §4.4: idle prelude, then `leader_count` filler bytes through the
  /// leader pulse spec.
  pub fn write_leader(&mut self, leader_count: u16) -> Result<()> {
    self.sink.write_idle_prelude(&self.timing.cycles, &self.timing.leader)?;
    let fill = vec![FILLER; leader_count as usize];
    self.sink.write_run(&fill, &self.timing.cycles, &self.timing.leader)
  }

  /// §4.4: sync, header, payload, checksum, trailer.
  pub fn block_out(&mut self, kind: u8, payload: &[u8]) -> Result<()> {
    if payload.len() > 255 {
      return Err(TapeError::Invariant(format!(
        "block payload of {} bytes exceeds the 255-byte limit",
        payload.len()
      )));
    }
    let len = payload.len() as u8;
    let cksum = checksum(kind, payload);

    self.sink.write_run(&SYNC, &self.timing.cycles, &self.timing.leader)?;
    self.sink.write_run(&[kind, len], &self.timing.cycles, &self.timing.first)?;
    self.sink.write_run(payload, &self.timing.cycles, &self.timing.rest)?;
    self.sink.write_run(&[cksum], &self.timing.cycles, &self.timing.rest)?;
    self.sink.write_run(&[FILLER], &self.timing.cycles, &self.timing.leader)
  }
}
