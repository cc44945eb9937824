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

//! The top-level driver (C10): honors per-file option stickiness, drives
//! C1 (decode) -> C2 (coalesce) -> C3 (optional compress) -> either the
//! autorun path (C9 + C4) or the plain path (C4) -> C5/C6 -> output sink.

use std::io::{Seek, Write};

use crate::autorun::{self, Directive, Step};
use crate::block::{ByteSink, Framer, KIND_DATA, KIND_EOF, KIND_NAMEFILE};
use crate::cas::CasSink;
use crate::compress::Transform;
use crate::container;
use crate::error::{Result, TapeError};
use crate::plan::{AutorunDirective, OutputFormat, PlannedStep, RunPlan};
use crate::segment::FileRecord;
use crate::timing::{TimingSpec, FAST, ROM, SIMPLE};
use crate::wav::WavSink;

/// Delegates to the concrete CAS or WAV backend so the driver can frame
/// through a single `Framer` regardless of output format.
enum OutputSink<W: Write + Seek> {
  Cas(CasSink<W>),
  Wav(WavSink<W>),
}

impl<W: Write + Seek> ByteSink for OutputSink<W> {
  fn write_run(&mut self, bytes: &[u8], cycles: &[u16; 2], pspec: &crate::timing::PulseSpec) -> Result<()> {
    match self {
      OutputSink::Cas(s) => s.write_run(bytes, cycles, pspec),
      OutputSink::Wav(s) => s.write_run(bytes, cycles, pspec),
    }
  }

  fn write_idle_prelude(&mut self, cycles: &[u16; 2], leader_pspec: &crate::timing::PulseSpec) -> Result<()> {
    match self {
      OutputSink::Cas(s) => s.write_idle_prelude(cycles, leader_pspec),
      OutputSink::Wav(s) => s.write_idle_prelude(cycles, leader_pspec),
    }
  }
}

fn timing_for(plan: &RunPlan, fast: bool) -> TimingSpec {
  if fast {
    return FAST;
  }
  match plan.default_timing {
    crate::timing::TimingName::Rom => ROM,
    crate::timing::TimingName::Simple => SIMPLE,
    crate::timing::TimingName::Fast => FAST,
  }
}

/// Read and decode every `PlannedStep::Input` into a `FileRecord`,
/// running C1 (decode), C2 (coalesce), and optional C3 (compress).
fn build_file_record(
  path: &std::path::Path,
  options: &crate::plan::FileOptions,
  compressor: &dyn Transform,
) -> Result<FileRecord> {
  let data = std::fs::read(path).map_err(TapeError::Io)?;

  let default_name = container::default_name_from_path(path);
  let mut rec = FileRecord::new(options.name.as_deref().map(FileRecord::pack_name).unwrap_or(default_name));
  rec.load = options.load;
  rec.exec = options.exec;
  rec.zload = options.zload;
  rec.fnblock = options.fnblock;
  rec.eof = options.eof;
  rec.eof_data = options.eof_data;
  rec.fast = options.fast;
  rec.flasher = options.flasher;
  rec.leader = options.leader;

  container::decode(options.mode, &data, &mut rec)?;
  rec.coalesce()?;

  if options.dzip {
    crate::compress::compress_segment(&mut rec.segments[0], compressor)?;
  }

  Ok(rec)
}

/// Run the whole pipeline for `plan`, writing the final tape image to
/// `out`. `out` must support `Seek` because the WAV backend patches its
/// header in place at close; the CAS backend ignores the capability.
pub fn run(plan: &RunPlan, compressor: &dyn Transform, out: impl Write + Seek) -> Result<()> {
  let is_wav = plan.format == OutputFormat::Wav;
  let mut sink = match plan.format {
    OutputFormat::Cas => OutputSink::Cas(CasSink::new(out)),
    OutputFormat::Wav => OutputSink::Wav(WavSink::create(out, plan.wav_rate)?),
  };

  let mut last_leader = crate::segment::DEFAULT_LEADER;

  if plan.autorun {
    let mut steps = Vec::new();
    for planned in &plan.steps {
      match planned {
        PlannedStep::Input(spec) => {
          let rec = build_file_record(&spec.path, &spec.options, compressor)?;
          last_leader = rec.leader;
          steps.push(Step::File(rec));
        }
        PlannedStep::Directive(d) => steps.push(Step::Directive(match d {
          AutorunDirective::SetVdg(v) => Directive::SetVdg(*v),
          AutorunDirective::SetSamV(v) => Directive::SetSamV(*v),
          AutorunDirective::SetSamF(v) => Directive::SetSamF(*v),
          AutorunDirective::Lds(v) => Directive::Lds(*v),
        })),
      }
    }

    let loader_name = steps
      .iter()
      .find_map(|s| match s {
        Step::File(f) => Some(f.name),
        _ => None,
      })
      .unwrap_or(*b"        ");

    let out = autorun::compose(loader_name, &steps, is_wav)?;

    {
      let mut framer = Framer::new(&mut sink, ROM);
      framer.write_leader(last_leader)?;
      framer.block_out(KIND_NAMEFILE, &out.main_loader)?;
      framer.write_leader(last_leader)?;
      framer.block_out(KIND_EOF, &out.stub)?;
    }

    for step in &steps {
      if let Step::File(rec) = step {
        emit_file_data(&mut sink, timing_for(plan, rec.fast), rec)?;
      }
    }
  } else {
    for planned in &plan.steps {
      let spec = match planned {
        PlannedStep::Input(spec) => spec,
        PlannedStep::Directive(_) => {
          return Err(TapeError::Usage(
            "autorun directives require --autorun".to_string(),
          ))
        }
      };
      let rec = build_file_record(&spec.path, &spec.options, compressor)?;
      last_leader = rec.leader;
      let timing = timing_for(plan, rec.fast);

      if rec.fnblock {
        let mut framer = Framer::new(&mut sink, timing);
        framer.write_leader(rec.leader)?;
        framer.block_out(KIND_NAMEFILE, &filename_payload(&rec))?;
      }
      emit_file_data(&mut sink, timing, &rec)?;
    }
  }

  {
    let mut framer = Framer::new(&mut sink, ROM);
    framer.write_leader(last_leader)?;
  }

  match sink {
    OutputSink::Cas(_) => {}
    OutputSink::Wav(s) => {
      s.finish()?;
    }
  }
  Ok(())
}

fn filename_payload(rec: &FileRecord) -> Vec<u8> {
  let mut p = Vec::with_capacity(15);
  p.extend_from_slice(&rec.name);
  p.push(rec.ftype as u8);
  p.push(0x00); // encoding: binary
  p.push(0x00); // gap: continuous
  p.extend_from_slice(&rec.exec.unwrap_or(0).to_be_bytes());
  p.extend_from_slice(&rec.load.unwrap_or(0).to_be_bytes());
  p
}

/// §4.10 / the autorun per-file tail: leader + data blocks of <=255 bytes
/// each, with the last block an EOF unless `eof_data` redirects the final
/// chunk's payload into the EOF block, or `eof` suppresses it entirely.
fn emit_file_data(sink: &mut impl ByteSink, timing: TimingSpec, rec: &FileRecord) -> Result<()> {
  let mut framer = Framer::new(sink, timing);
  framer.write_leader(rec.leader)?;

  let data = &rec.segment().data;
  let chunks: Vec<&[u8]> = data.chunks(255).collect();

  if chunks.is_empty() {
    if rec.eof {
      framer.block_out(KIND_EOF, &[])?;
    }
    return Ok(());
  }

  for (i, chunk) in chunks.iter().enumerate() {
    let is_last = i + 1 == chunks.len();
    if is_last && rec.eof_data {
      framer.block_out(KIND_EOF, chunk)?;
    } else {
      framer.block_out(KIND_DATA, chunk)?;
    }
  }

  if rec.eof && !rec.eof_data {
    framer.block_out(KIND_EOF, &[])?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::compress::Transform;
  use crate::container::InputMode;
  use crate::plan::{FileOptions, InputSpec};
  use crate::timing::TimingName;
  use std::io::Cursor;

  struct Noop;
  impl Transform for Noop {
    fn apply(&self, input: &[u8]) -> Result<Vec<u8>> {
      Ok(input.to_vec())
    }
  }

  fn file_options() -> FileOptions {
    FileOptions {
      mode: InputMode::Raw,
      leader: 8,
      fnblock: true,
      name: Some("HI".to_string()),
      load: Some(0x1000),
      exec: Some(0x1000),
      zload: None,
      dzip: false,
      fast: false,
      eof_data: false,
      eof: true,
      flasher: false,
    }
  }

  #[test]
  fn scenario_1_raw_to_cas_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hello.bin");
    std::fs::write(&path, [0x48, 0x49]).unwrap();

    let plan = RunPlan {
      output_path: "out.cas".into(),
      format: OutputFormat::Cas,
      wav_rate: 9600,
      default_timing: TimingName::Rom,
      autorun: false,
      steps: vec![PlannedStep::Input(InputSpec {
        path,
        options: file_options(),
      })],
    };

    let mut buf = Cursor::new(Vec::new());
    run(&plan, &Noop, &mut buf).unwrap();
    let bytes = buf.into_inner();

    let data_pos = bytes
      .windows(6)
      .position(|w| w == [0x55, 0x3C, KIND_DATA, 0x02, 0x48, 0x49])
      .expect("data block present");
    assert_eq!(bytes[data_pos + 6], 0x94);

    let eof_pos = bytes
      .windows(4)
      .position(|w| w == [0x55, 0x3C, KIND_EOF, 0x00])
      .expect("eof block present");
    assert_eq!(bytes[eof_pos + 4], 0xFF);
  }
}
