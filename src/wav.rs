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

//! The WAV writer (C7): a canonical 44-byte RIFF/WAVE PCM header written
//! as a placeholder on open, fixed up at offsets 4 and 40 on close.
//! Backed by the waveform synthesizer (C5) for per-bit pulse shaping.

use std::io::{Seek, SeekFrom, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::block::ByteSink;
use crate::error::{Result, TapeError};
use crate::timing::PulseSpec;
use crate::waveform::SynthState;

pub const HEADER_LEN: u64 = 44;

pub struct WavSink<W: Write + Seek> {
  writer: W,
  sample_rate: u32,
  synth: SynthState,
}

impl<W: Write + Seek> WavSink<W> {
  pub fn create(mut writer: W, sample_rate: u32) -> Result<Self> {
    write_placeholder_header(&mut writer, sample_rate)?;
    Ok(WavSink {
      writer,
      sample_rate,
      synth: SynthState::new(),
    })
  }

  /// WAV header law: fix up `ChunkSize` at offset 4 and `Subchunk2Size` at
  /// offset 40 from the final sample count, then return the writer.
  pub fn finish(mut self) -> Result<W> {
    let sample_count = self.synth.sample_count;
    self.writer.seek(SeekFrom::Start(4))?;
    self.writer.write_u32::<LittleEndian>(sample_count as u32 + 36)?;
    self.writer.seek(SeekFrom::Start(40))?;
    self.writer.write_u32::<LittleEndian>(sample_count as u32)?;
    self.writer.flush()?;
    Ok(self.writer)
  }

  pub fn sample_count(&self) -> u64 {
    self.synth.sample_count
  }
}

impl<W: Write + Seek> ByteSink for WavSink<W> {
  fn write_run(&mut self, bytes: &[u8], cycles: &[u16; 2], pspec: &PulseSpec) -> Result<()> {
    let mut out = Vec::new();
    self.synth.emit_run(self.sample_rate, cycles, pspec, bytes, &mut out);
    self.writer.write_all(&out).map_err(TapeError::Io)
  }

  fn write_idle_prelude(&mut self, _cycles: &[u16; 2], _leader_pspec: &PulseSpec) -> Result<()> {
    // §4.4: a constant 0x80 sample held for 0xDA5C * 8 source-clock ticks.
    let mut out = Vec::new();
    self.synth.emit_idle(self.sample_rate, 0xDA5C * 8, &mut out);
    self.writer.write_all(&out).map_err(TapeError::Io)
  }
}

fn write_placeholder_header(w: &mut impl Write, sample_rate: u32) -> Result<()> {
  const CHANNELS: u16 = 1;
  const BITS_PER_SAMPLE: u16 = 8;
  let byte_rate = sample_rate * CHANNELS as u32 * BITS_PER_SAMPLE as u32 / 8;
  let block_align = CHANNELS * BITS_PER_SAMPLE / 8;

  w.write_all(b"RIFF")?;
  w.write_u32::<LittleEndian>(0)?; // ChunkSize, fixed up at close
  w.write_all(b"WAVE")?;
  w.write_all(b"fmt ")?;
  w.write_u32::<LittleEndian>(16)?; // Subchunk1Size (PCM)
  w.write_u16::<LittleEndian>(1)?; // AudioFormat = PCM
  w.write_u16::<LittleEndian>(CHANNELS)?;
  w.write_u32::<LittleEndian>(sample_rate)?;
  w.write_u32::<LittleEndian>(byte_rate)?;
  w.write_u16::<LittleEndian>(block_align)?;
  w.write_u16::<LittleEndian>(BITS_PER_SAMPLE)?;
  w.write_all(b"data")?;
  w.write_u32::<LittleEndian>(0)?; // Subchunk2Size, fixed up at close
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Cursor;

  #[test]
  fn header_law_holds_after_finish() {
    let cursor = Cursor::new(Vec::new());
    let mut sink = WavSink::create(cursor, 9600).unwrap();
    let mut out = Vec::new();
    sink.synth.emit_idle(9600, 1000, &mut out);
    sink.writer.write_all(&out).unwrap();
    let sample_count = sink.sample_count();
    let buf = sink.finish().unwrap().into_inner();

    let chunk_size = u32::from_le_bytes(buf[4..8].try_into().unwrap());
    let subchunk2 = u32::from_le_bytes(buf[40..44].try_into().unwrap());
    assert_eq!(chunk_size as u64, sample_count + 36);
    assert_eq!(subchunk2 as u64, sample_count);
    assert_eq!(&buf[0..4], b"RIFF");
    assert_eq!(&buf[8..12], b"WAVE");
    assert_eq!(u16::from_le_bytes(buf[20..22].try_into().unwrap()), 1); // PCM
    assert_eq!(u16::from_le_bytes(buf[22..24].try_into().unwrap()), 1); // mono
    assert_eq!(u16::from_le_bytes(buf[34..36].try_into().unwrap()), 8); // 8-bit
  }

  #[test]
  fn sample_count_matches_pcm_body_length() {
    let cursor = Cursor::new(Vec::new());
    let mut sink = WavSink::create(cursor, 9600).unwrap();
    let mut out = Vec::new();
    sink.synth.emit_idle(9600, 2000, &mut out);
    sink.writer.write_all(&out).unwrap();
    let sample_count = sink.sample_count();
    let buf = sink.finish().unwrap().into_inner();
    assert_eq!(buf.len() as u64 - HEADER_LEN, sample_count);
  }
}
