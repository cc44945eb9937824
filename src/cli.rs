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

//! The CLI front-end (C11): a hand-written sequential scanner over argv.
//! Not a declarative derive-based parser, because per-file stickiness
//! (§9) is a state machine over token order, not a flat flag set.

use std::path::PathBuf;

use crate::container::InputMode;
use crate::error::{Result, TapeError};
use crate::plan::{AutorunDirective, OutputFormat, PendingOptions, PlannedStep, RunPlan};
use crate::timing::TimingName;

pub const USAGE: &str = "\
tapeforge - converts binary program images into 6809 cassette-tape program files

USAGE:
  tapeforge -o OUTPUT [GLOBAL OPTIONS] [PER-FILE OPTIONS] FILE...

See README.md for the full option reference.";

pub const VERSION: &str = concat!("tapeforge ", env!("CARGO_PKG_VERSION"));

/// What the scan produced before the plan is fully assembled: either a
/// finished plan (including the `--help`/`--version` short circuit) or
/// one more token consumed.
pub enum ParseOutcome {
  Plan(RunPlan),
  Print(&'static str),
}

fn parse_number(s: &str) -> Result<u16> {
  let trimmed = s.trim();
  let parsed = if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
    u16::from_str_radix(hex, 16)
  } else {
    trimmed.parse::<u16>()
  };
  parsed.map_err(|_| TapeError::Usage(format!("not a valid number: '{}'", s)))
}

fn next_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
  *i += 1;
  args
    .get(*i)
    .map(|s| s.as_str())
    .ok_or_else(|| TapeError::Usage(format!("'{}' requires a value", flag)))
}

/// Scan `args` (excluding argv[0]) into a `RunPlan`.
pub fn parse(args: &[String]) -> Result<ParseOutcome> {
  let mut output_path: Option<PathBuf> = None;
  let mut format: Option<OutputFormat> = None;
  let mut wav_rate: u32 = 9600;
  let mut default_timing = TimingName::Rom;
  let mut autorun = false;
  let mut pending = PendingOptions::default();
  let mut steps: Vec<PlannedStep> = Vec::new();

  let mut i = 0;
  while i < args.len() {
    let arg = args[i].as_str();
    match arg {
      "--help" => return Ok(ParseOutcome::Print(USAGE)),
      "--version" => return Ok(ParseOutcome::Print(VERSION)),
      "-o" | "--output" => output_path = Some(PathBuf::from(next_value(args, &mut i, arg)?)),
      "--cas" => format = Some(OutputFormat::Cas),
      "--wav" => format = Some(OutputFormat::Wav),
      "-r" | "--wav-rate" => wav_rate = parse_number(next_value(args, &mut i, arg)?)? as u32,
      "-t" | "--timing" => default_timing = TimingName::parse(next_value(args, &mut i, arg)?)?,
      "-B" => pending.mode = InputMode::Raw,
      "-D" => pending.mode = InputMode::DragonDos,
      "-C" => pending.mode = InputMode::Coco,
      "--leader" => pending.leader = parse_number(next_value(args, &mut i, arg)?)?,
      "--filename" => pending.fnblock = true,
      "--no-filename" => pending.fnblock = false,
      "-n" => pending.name = Some(next_value(args, &mut i, arg)?.to_string()),
      "-l" => pending.load = Some(parse_number(next_value(args, &mut i, arg)?)?),
      "-e" => pending.exec = Some(parse_number(next_value(args, &mut i, arg)?)?),
      "--zload" => pending.zload = Some(parse_number(next_value(args, &mut i, arg)?)?),
      "-z" | "--dzip" => pending.dzip = true,
      "--no-dzip" => pending.dzip = false,
      "--fast" => pending.fast = true,
      "--no-fast" => pending.fast = false,
      "--eof-data" => pending.eof_data = true,
      "--no-eof-data" => pending.eof_data = false,
      "--eof" => pending.eof = true,
      "--no-eof" => pending.eof = false,
      "--flasher" => pending.flasher = true,
      "--no-flasher" => pending.flasher = false,
      "--autorun" => autorun = true,
      "--no-autorun" => autorun = false,
      "--vdg" => steps.push(PlannedStep::Directive(AutorunDirective::SetVdg(
        parse_number(next_value(args, &mut i, arg)?)? as u8,
      ))),
      "--sam-v" => steps.push(PlannedStep::Directive(AutorunDirective::SetSamV(
        parse_number(next_value(args, &mut i, arg)?)? as u8,
      ))),
      "--sam-f" => steps.push(PlannedStep::Directive(AutorunDirective::SetSamF(
        parse_number(next_value(args, &mut i, arg)?)? as u8,
      ))),
      "--lds" => steps.push(PlannedStep::Directive(AutorunDirective::Lds(parse_number(
        next_value(args, &mut i, arg)?,
      )?))),
      "-i" => {
        let path = PathBuf::from(next_value(args, &mut i, arg)?);
        steps.push(PlannedStep::Input(crate::plan::InputSpec {
          path,
          options: pending.snapshot(autorun),
        }));
      }
      other if !other.starts_with('-') => {
        steps.push(PlannedStep::Input(crate::plan::InputSpec {
          path: PathBuf::from(other),
          options: pending.snapshot(autorun),
        }));
      }
      other => return Err(TapeError::Usage(format!("unknown option '{}'", other))),
    }
    i += 1;
  }

  let output_path = output_path.ok_or_else(|| TapeError::Usage("missing required -o/--output".to_string()))?;

  let format = format.unwrap_or_else(|| {
    if output_path.extension().and_then(|e| e.to_str()) == Some("wav") {
      OutputFormat::Wav
    } else {
      OutputFormat::Cas
    }
  });

  if format == OutputFormat::Cas {
    for step in &steps {
      if let PlannedStep::Input(spec) = step {
        if spec.options.fast {
          return Err(TapeError::Usage(
            "--fast has no meaning for CAS output (no timing channel); use --wav".to_string(),
          ));
        }
      }
    }
  }

  Ok(ParseOutcome::Plan(RunPlan {
    output_path,
    format,
    wav_rate,
    default_timing,
    autorun,
    steps,
  }))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(s: &[&str]) -> Vec<String> {
    s.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn scenario_1_command_line_builds_expected_plan() {
    let a = args(&[
      "-o", "out.cas", "-B", "-l", "0x1000", "-e", "0x1000", "-n", "HI", "hello.bin",
    ]);
    let plan = match parse(&a).unwrap() {
      ParseOutcome::Plan(p) => p,
      _ => panic!("expected a plan"),
    };
    assert_eq!(plan.format, OutputFormat::Cas);
    assert_eq!(plan.steps.len(), 1);
    match &plan.steps[0] {
      PlannedStep::Input(spec) => {
        assert_eq!(spec.options.load, Some(0x1000));
        assert_eq!(spec.options.exec, Some(0x1000));
        assert_eq!(spec.options.name.as_deref(), Some("HI"));
      }
      _ => panic!("expected an input step"),
    }
  }

  #[test]
  fn missing_output_is_usage_error() {
    let a = args(&["hello.bin"]);
    assert!(parse(&a).is_err());
  }

  #[test]
  fn fast_with_cas_is_rejected() {
    let a = args(&["-o", "out.cas", "--fast", "hello.bin"]);
    assert!(parse(&a).is_err());
  }

  #[test]
  fn wav_extension_infers_format() {
    let a = args(&["-o", "out.wav", "hello.bin"]);
    let plan = match parse(&a).unwrap() {
      ParseOutcome::Plan(p) => p,
      _ => panic!("expected a plan"),
    };
    assert_eq!(plan.format, OutputFormat::Wav);
  }

  #[test]
  fn sticky_name_and_exec_persist_across_files_under_autorun() {
    let a = args(&[
      "-o", "out.wav", "--autorun", "-n", "GAME", "-e", "0x3000", "a.bin", "b.bin",
    ]);
    let plan = match parse(&a).unwrap() {
      ParseOutcome::Plan(p) => p,
      _ => panic!("expected a plan"),
    };
    let names: Vec<_> = plan
      .steps
      .iter()
      .filter_map(|s| match s {
        PlannedStep::Input(spec) => spec.options.name.clone(),
        _ => None,
      })
      .collect();
    assert_eq!(names, vec!["GAME".to_string(), "GAME".to_string()]);
  }

  #[test]
  fn help_short_circuits_before_requiring_output() {
    let a = args(&["--help"]);
    assert!(matches!(parse(&a).unwrap(), ParseOutcome::Print(_)));
  }
}
