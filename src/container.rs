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

//! Parsers for the three input container formats (C1): raw, DragonDOS, CoCo
//! DECB. Each produces a `FileRecord` whose `name`, `type`, `load`, and
//! `exec` are only set when the caller hasn't already pinned them down via
//! sticky CLI options.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::Read;

use crate::error::{Result, TapeError};
use crate::segment::{FileRecord, FileType, Segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
  Raw,
  DragonDos,
  Coco,
}

/// Decode `data` (the whole contents of one input file) according to `mode`,
/// filling in only the fields of `rec` that are still at their defaults.
pub fn decode(mode: InputMode, data: &[u8], rec: &mut FileRecord) -> Result<()> {
  match mode {
    InputMode::Raw => decode_raw(data, rec),
    InputMode::DragonDos => decode_dragondos(data, rec),
    InputMode::Coco => decode_coco(data, rec),
  }
}

fn decode_raw(data: &[u8], rec: &mut FileRecord) -> Result<()> {
  rec.segments.push(Segment::new(0, data.to_vec()));
  Ok(())
}

/// DragonDOS: `0x55, type, start_be:u16, size_be:u16, exec_be:u16, 0xAA`
/// followed by `size` payload bytes.
fn decode_dragondos(data: &[u8], rec: &mut FileRecord) -> Result<()> {
  if data.len() < 9 {
    return Err(TapeError::Input(
      "DragonDOS header is truncated (need at least 9 bytes)".to_string(),
    ));
  }
  let mut r = data;
  let marker = r.read_u8()?;
  if marker != 0x55 {
    return Err(TapeError::Input(format!(
      "DragonDOS header missing leading 0x55 marker (found 0x{:02X})",
      marker
    )));
  }
  let type_byte = r.read_u8()?;
  let start = r.read_u16::<BigEndian>()?;
  let size = r.read_u16::<BigEndian>()? as usize;
  let exec = r.read_u16::<BigEndian>()?;
  let trailer = r.read_u8()?;
  if trailer != 0xAA {
    log::warn!("DragonDOS header missing trailing 0xAA marker (found 0x{:02X})", trailer);
  }

  let payload = r;
  let take = size.min(payload.len());
  if take < size {
    log::warn!(
      "DragonDOS payload short read: expected {} bytes, found {}",
      size,
      payload.len()
    );
  }

  if rec.load.is_none() {
    rec.load = Some(start);
  }
  if rec.exec.is_none() {
    rec.exec = Some(exec);
  }
  if rec.ftype == FileType::Binary {
    rec.ftype = match type_byte {
      1 => FileType::Basic,
      _ => FileType::Binary,
    };
  }

  rec.segments.push(Segment::new(start, payload[..take].to_vec()));
  Ok(())
}

/// CoCo DECB: a stream of chunks, each starting with a type byte.
/// `0x00` -> data chunk `size_be:u16, start_be:u16, <size bytes>`.
/// `0xFF` -> either a whole-file BASIC program (if no data chunk has been
/// seen yet) or an EXEC trailer (if one has).
fn decode_coco(data: &[u8], rec: &mut FileRecord) -> Result<()> {
  let mut cursor = std::io::Cursor::new(data);
  let mut saw_data = false;

  loop {
    let tag = match cursor.read_u8() {
      Ok(b) => b,
      Err(_) => break,
    };

    match tag {
      0x00 => {
        let size = cursor.read_u16::<BigEndian>()? as usize;
        let start = cursor.read_u16::<BigEndian>()?;
        let mut buf = vec![0u8; size];
        let n = read_up_to(&mut cursor, &mut buf)?;
        if n < size {
          log::warn!("CoCo data chunk short read: expected {} bytes, found {}", size, n);
          buf.truncate(n);
        }
        rec.segments.push(Segment::new(start, buf));
        saw_data = true;
      }
      0xFF if !saw_data => {
        let size = cursor.read_u16::<BigEndian>()? as usize;
        let mut buf = vec![0u8; size];
        let n = read_up_to(&mut cursor, &mut buf)?;
        if n < size {
          log::warn!("CoCo BASIC chunk short read: expected {} bytes, found {}", size, n);
          buf.truncate(n);
        }
        if rec.ftype == FileType::Binary {
          rec.ftype = FileType::Basic;
        }
        if rec.exec.is_none() {
          rec.exec = Some(0);
        }
        if rec.load.is_none() {
          rec.load = Some(0);
        }
        rec.segments.push(Segment::new(0, buf));
        saw_data = true;
      }
      0xFF => {
        let size = cursor.read_u16::<BigEndian>()?;
        if size != 0 {
          log::warn!("CoCo EXEC chunk declares non-zero size {} (preserved leniently)", size);
        }
        let exec = cursor.read_u16::<BigEndian>()?;
        if rec.exec.is_none() {
          rec.exec = Some(exec);
        }
        break;
      }
      other => {
        log::warn!("unknown CoCo chunk tag 0x{:02X}, stopping decode", other);
        break;
      }
    }
  }

  Ok(())
}

fn read_up_to(r: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
  let mut total = 0;
  while total < buf.len() {
    match r.read(&mut buf[total..]) {
      Ok(0) => break,
      Ok(n) => total += n,
      Err(e) => return Err(TapeError::Io(e)),
    }
  }
  Ok(total)
}

/// Default name for a raw input: the basename up to the first `.`,
/// truncated to 8 chars and uppercased.
pub fn default_name_from_path(path: &std::path::Path) -> [u8; 8] {
  let stem = path
    .file_name()
    .and_then(|s| s.to_str())
    .unwrap_or("")
    .split('.')
    .next()
    .unwrap_or("");
  FileRecord::pack_name(stem)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dragondos_parses_header_and_payload() {
    // Scenario 3: 55 02 0E 00 00 03 0E 00 AA then AA BB CC
    let bytes = [0x55, 0x02, 0x0E, 0x00, 0x00, 0x03, 0x0E, 0x00, 0xAA, 0xAA, 0xBB, 0xCC];
    let mut rec = FileRecord::new(*b"TEST    ");
    decode_dragondos(&bytes, &mut rec).unwrap();
    assert_eq!(rec.load, Some(0x0E00));
    assert_eq!(rec.exec, Some(0x0E00));
    assert_eq!(rec.segments.len(), 1);
    assert_eq!(rec.segments[0].start, 0x0E00);
    assert_eq!(rec.segments[0].data, vec![0xAA, 0xBB, 0xCC]);
  }

  #[test]
  fn coco_data_then_exec() {
    // 00 (data) size=2 start=0x2000, AA BB; FF size=0 exec=0x2000
    let bytes = [
      0x00, 0x00, 0x02, 0x20, 0x00, 0xAA, 0xBB, 0xFF, 0x00, 0x00, 0x20, 0x00,
    ];
    let mut rec = FileRecord::new(*b"TEST    ");
    decode_coco(&bytes, &mut rec).unwrap();
    assert_eq!(rec.segments.len(), 1);
    assert_eq!(rec.segments[0].start, 0x2000);
    assert_eq!(rec.exec, Some(0x2000));
  }

  #[test]
  fn coco_basic_program_defaults_to_zero() {
    let bytes = [0xFF, 0x00, 0x02, 0x41, 0x42];
    let mut rec = FileRecord::new(*b"TEST    ");
    decode_coco(&bytes, &mut rec).unwrap();
    assert_eq!(rec.load, Some(0));
    assert_eq!(rec.exec, Some(0));
    assert_eq!(rec.ftype, FileType::Basic);
    assert_eq!(rec.segments[0].data, vec![0x41, 0x42]);
  }

  #[test]
  fn coco_unknown_tag_stops_decoding() {
    let bytes = [0x00, 0x00, 0x01, 0x00, 0x00, 0x99, 0x42];
    let mut rec = FileRecord::new(*b"TEST    ");
    decode_coco(&bytes, &mut rec).unwrap();
    assert_eq!(rec.segments.len(), 1);
  }

  #[test]
  fn raw_is_one_segment_at_zero() {
    let mut rec = FileRecord::new(*b"TEST    ");
    decode_raw(&[0x48, 0x49], &mut rec).unwrap();
    assert_eq!(rec.segments.len(), 1);
    assert_eq!(rec.segments[0].start, 0);
    assert_eq!(rec.segments[0].data, vec![0x48, 0x49]);
  }

  #[test]
  fn default_name_truncates_at_dot() {
    let path = std::path::Path::new("hello.bin");
    assert_eq!(default_name_from_path(path), *b"HELLO   ");
  }
}
