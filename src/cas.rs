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

//! The CAS writer (C6): drops waveform synthesis entirely, writing every
//! framed byte straight to the output sink.

use std::io::Write;

use crate::block::ByteSink;
use crate::error::{Result, TapeError};
use crate::timing::PulseSpec;

pub struct CasSink<W: Write> {
  writer: W,
}

impl<W: Write> CasSink<W> {
  pub fn new(writer: W) -> Self {
    CasSink { writer }
  }
}

impl<W: Write> ByteSink for CasSink<W> {
  fn write_run(&mut self, bytes: &[u8], _cycles: &[u16; 2], _pspec: &PulseSpec) -> Result<()> {
    self.writer.write_all(bytes).map_err(TapeError::Io)
  }

  fn write_idle_prelude(&mut self, cycles: &[u16; 2], leader_pspec: &PulseSpec) -> Result<()> {
    // §4.4: 94 filler bytes through the leader pulse spec (ignored here,
    // but kept for symmetry with the WAV sink's call shape).
    let fill = [0x55u8; 94];
    self.write_run(&fill, cycles, leader_pspec)
  }
}
