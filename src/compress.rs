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

//! The compressor gateway (C3): a byte-sequence-in, byte-sequence-out
//! transform backed by the external `dzip` tool. OS specifics never leak
//! past this module.

use std::io::{Read, Write};
use std::process::{Command, Stdio};

use crate::error::{Result, TapeError};
use crate::segment::Segment;

/// A byte-to-byte transform, implemented either by piping a child process
/// or by round-tripping through a temp file.
pub trait Transform {
  fn apply(&self, input: &[u8]) -> Result<Vec<u8>>;
}

/// Spawns `dzip -c`, feeding `input` on stdin from a dedicated thread while
/// the caller drains stdout, avoiding the classic pipe deadlock.
pub struct PipedDzip;

impl Transform for PipedDzip {
  fn apply(&self, input: &[u8]) -> Result<Vec<u8>> {
    let mut child = Command::new("dzip")
      .arg("-c")
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .map_err(|e| TapeError::Invariant(format!("failed to spawn dzip: {}", e)))?;

    let mut stdin = child
      .stdin
      .take()
      .ok_or_else(|| TapeError::Invariant("dzip child has no stdin handle".to_string()))?;
    let input = input.to_vec();
    let writer = std::thread::spawn(move || {
      let _ = stdin.write_all(&input);
      drop(stdin);
    });

    let mut output = Vec::new();
    child
      .stdout
      .take()
      .ok_or_else(|| TapeError::Invariant("dzip child has no stdout handle".to_string()))?
      .read_to_end(&mut output)
      .map_err(TapeError::Io)?;

    let _ = writer.join();
    let status = child.wait().map_err(TapeError::Io)?;
    if !status.success() {
      return Err(TapeError::Invariant(format!("dzip exited with status {}", status)));
    }
    Ok(output)
  }
}

/// Writes the segment to a temp file and invokes `dzip -k FILE`, reading
/// back `FILE.dz`. Used on hosts where piping is undesirable.
pub struct TempFileDzip;

impl Transform for TempFileDzip {
  fn apply(&self, input: &[u8]) -> Result<Vec<u8>> {
    let dir = tempfile::tempdir().map_err(TapeError::Io)?;
    let in_path = dir.path().join("segment.bin");
    std::fs::write(&in_path, input).map_err(TapeError::Io)?;

    let status = Command::new("dzip")
      .arg("-k")
      .arg(&in_path)
      .status()
      .map_err(|e| TapeError::Invariant(format!("failed to spawn dzip: {}", e)))?;
    if !status.success() {
      return Err(TapeError::Invariant(format!("dzip exited with status {}", status)));
    }

    let out_path = in_path.with_extension("bin.dz");
    std::fs::read(&out_path).map_err(TapeError::Io)
  }
}

/// Run `segment.data` through `transform`, recording the original size and
/// marking the segment as dzip-compressed. Fatal if the transform produces
/// no output.
pub fn compress_segment(segment: &mut Segment, transform: &dyn Transform) -> Result<()> {
  let compressed = transform.apply(&segment.data)?;
  if compressed.is_empty() {
    return Err(TapeError::Invariant(
      "dzip produced empty output for a non-trivial segment".to_string(),
    ));
  }
  segment.osize = Some(segment.data.len() as u32);
  segment.data = compressed;
  segment.size = segment.data.len() as u32;
  segment.dzip = true;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Identity;
  impl Transform for Identity {
    fn apply(&self, input: &[u8]) -> Result<Vec<u8>> {
      Ok(input.to_vec())
    }
  }

  struct Empty;
  impl Transform for Empty {
    fn apply(&self, _input: &[u8]) -> Result<Vec<u8>> {
      Ok(Vec::new())
    }
  }

  #[test]
  fn compress_sets_dzip_metadata() {
    let mut seg = Segment::new(0x1000, vec![1, 2, 3, 4]);
    compress_segment(&mut seg, &Identity).unwrap();
    assert!(seg.dzip);
    assert_eq!(seg.osize, Some(4));
    assert_eq!(seg.size, 4);
  }

  #[test]
  fn compress_fails_on_empty_output() {
    let mut seg = Segment::new(0x1000, vec![1, 2, 3, 4]);
    assert!(compress_segment(&mut seg, &Empty).is_err());
  }
}
