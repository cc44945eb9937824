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

//! The run plan (ambient data model extension): sticky per-file options,
//! the autorun step list, and the top-level plan the CLI front-end hands
//! to the driver.

use std::path::PathBuf;

use crate::container::InputMode;
use crate::segment::DEFAULT_LEADER;
use crate::timing::TimingName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
  Cas,
  Wav,
}

#[derive(Debug, Clone, Copy)]
pub enum AutorunDirective {
  SetVdg(u8),
  SetSamV(u8),
  SetSamF(u8),
  Lds(u16),
}

/// The mutable, sticky per-file option record (§9): updated by option
/// tokens, snapshot-copied into a `FileOptions` when a file token is
/// consumed.
#[derive(Debug, Clone)]
pub struct PendingOptions {
  pub mode: InputMode,
  pub leader: u16,
  pub fnblock: bool,
  pub name: Option<String>,
  pub load: Option<u16>,
  pub exec: Option<u16>,
  pub zload: Option<u16>,
  pub dzip: bool,
  pub fast: bool,
  pub eof_data: bool,
  pub eof: bool,
  pub flasher: bool,
}

impl Default for PendingOptions {
  fn default() -> Self {
    PendingOptions {
      mode: InputMode::Raw,
      leader: DEFAULT_LEADER,
      fnblock: true,
      name: None,
      load: None,
      exec: None,
      zload: None,
      dzip: false,
      fast: false,
      eof_data: false,
      eof: true,
      flasher: false,
    }
  }
}

/// The immutable snapshot taken when an input file token is consumed.
#[derive(Debug, Clone)]
pub struct FileOptions {
  pub mode: InputMode,
  pub leader: u16,
  pub fnblock: bool,
  pub name: Option<String>,
  pub load: Option<u16>,
  pub exec: Option<u16>,
  pub zload: Option<u16>,
  pub dzip: bool,
  pub fast: bool,
  pub eof_data: bool,
  pub eof: bool,
  pub flasher: bool,
}

impl PendingOptions {
  /// Snapshot the current options into a `FileOptions`, then apply the
  /// sticky-reset rule: `load`/`zload` always reset; `name`/`exec` reset
  /// unless autorun mode is active (§9, sticky-option law).
  pub fn snapshot(&mut self, autorun: bool) -> FileOptions {
    let snap = FileOptions {
      mode: self.mode,
      leader: self.leader,
      fnblock: self.fnblock,
      name: self.name.clone(),
      load: self.load,
      exec: self.exec,
      zload: self.zload,
      dzip: self.dzip,
      fast: self.fast,
      eof_data: self.eof_data,
      eof: self.eof,
      flasher: self.flasher,
    };
    self.load = None;
    self.zload = None;
    if !autorun {
      self.name = None;
      self.exec = None;
    }
    snap
  }
}

#[derive(Debug, Clone)]
pub struct InputSpec {
  pub path: PathBuf,
  pub options: FileOptions,
}

#[derive(Debug, Clone)]
pub enum PlannedStep {
  Input(InputSpec),
  Directive(AutorunDirective),
}

#[derive(Debug, Clone)]
pub struct RunPlan {
  pub output_path: PathBuf,
  pub format: OutputFormat,
  pub wav_rate: u32,
  pub default_timing: TimingName,
  pub autorun: bool,
  pub steps: Vec<PlannedStep>,
}
