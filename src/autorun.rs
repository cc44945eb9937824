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

//! The autorun composer (C9): assembles the conditional loader and the
//! BASIC hijack stub on top of the two-phase assembler (C8), then hands
//! both blobs back for framing as a NAMEFILE block and an EOF block.

use crate::asm::{byte, bytes, label, ref_word, rel_low, rel_word, Assembler};
use crate::error::Result;
use crate::segment::FileRecord;

const MAIN_ORG: u16 = 0x01DA;
const STUB_ORG: u16 = 0x00A6;

const TYPE_BINARY: u8 = 0x02;
const ENCODING_BINARY: u8 = 0x00;
const GAP_FALSE: u8 = 0x00;

// A minimal 6809 instruction subset, named for the addressing mode they
// use here. Two-byte prebyte opcodes (page-2, used only for LDS #imm)
// are split into their own constant pair.
const LDA_IMM: u8 = 0x86;
const LDA_EXT: u8 = 0xB6;
const STA_EXT: u8 = 0xB7;
const ANDA_IMM: u8 = 0x84;
const ANDB_IMM: u8 = 0xC4;
const EORA_IMM: u8 = 0x88;
const LDX_IMM: u8 = 0x8E;
const STX_EXT: u8 = 0xBF;
const CMPX_EXT: u8 = 0xBC;
const LDD_IMM: u8 = 0xCC;
const ADDD_IMM: u8 = 0xC3;
const LDU_IMM: u8 = 0xCE;
const LDS_PREBYTE: u8 = 0x10;
const LDS_IMM: u8 = 0xCE;
const JMP_EXT: u8 = 0x7E;
const LBSR: u8 = 0x17;
const JSR_EXT: u8 = 0xBD;
const TSTA: u8 = 0x4D;
const TSTB: u8 = 0x5D;
const INCA: u8 = 0x4C;
const NEGA: u8 = 0x40;
const COMA: u8 = 0x43;
const COMB: u8 = 0x53;
const TFR: u8 = 0x1F;
const PSHS: u8 = 0x34;
const PULS: u8 = 0x35;
const BEQ: u8 = 0x27;
const BNE: u8 = 0x26;
const BPL: u8 = 0x2A;
const BMI: u8 = 0x2B;
const BCC: u8 = 0x24;
const BRA: u8 = 0x20;
const CLR_DIRECT: u8 = 0x0F;
const DEC_DIRECT: u8 = 0x0A;
const LDA_DIRECT: u8 = 0x96;
const STA_DIRECT: u8 = 0x97;
const STB_DIRECT: u8 = 0xD7;
const RTS: u8 = 0x39;

// Indexed-addressing postbytes (register field = U, §9 glossary: all
// back-reference reads are relative to the output cursor in U).
const POSTBYTE_B_U: u8 = 0xC5; // B,U: EA = U + sign_extend(B)
const POSTBYTE_D_U: u8 = 0xCB; // D,U: EA = U + D

// TFR/EXG register-select nibbles (6809 postbyte: high=source, low=dest).
const TFR_A_TO_B: u8 = 0x89;
const PUSH_PULL_D: u8 = 0x06; // CC/A/B/DP/X/Y/U-or-S/PC bit mask: A|B

// ROM vectors (glossary): cassette motor on, block-read, char-out.
const CSRDON: u16 = 0xA004;
const BLKIN: u16 = 0xA006;
const OUTCH: u16 = 0xA002;

/// Directives a `--vdg`/`--sam-v`/`--sam-f`/`--lds` CLI token inserts into
/// the ordered step list, interleaved with file steps.
#[derive(Debug, Clone, Copy)]
pub enum Directive {
  SetVdg(u8),
  SetSamV(u8),
  SetSamF(u8),
  Lds(u16),
}

/// A tagged-variant step: clearer than a heterogeneous map with a `code`
/// string (§9 design note).
#[derive(Debug, Clone)]
pub enum Step {
  File(FileRecord),
  Directive(Directive),
}

pub struct AutorunOutput {
  pub main_loader: Vec<u8>,
  pub stub: Vec<u8>,
}

/// Assemble the main loader and BASIC hijack stub for `steps`, sharing one
/// label namespace across the two origin resets (§9 design note).
pub fn compose(name: [u8; 8], steps: &[Step], output_is_wav: bool) -> Result<AutorunOutput> {
  let mut asm = Assembler::new(MAIN_ORG);
  asm.set_label("fast_pw", 0x0C06);

  emit_header_prefix(&mut asm, name);

  let fast_used = steps.iter().any(|s| matches!(s, Step::File(f) if f.fast));
  let flasher_used = steps.iter().any(|s| matches!(s, Step::File(f) if f.flasher));
  let dzip_used = steps
    .iter()
    .any(|s| matches!(s, Step::File(f) if f.segment().dzip));

  if fast_used && output_is_wav {
    emit_arch_probe_and_fast_setup(&mut asm);
  }

  let mut last_vdg: Option<u8> = None;
  let mut last_samv: Option<u8> = None;
  let mut last_samf: Option<u8> = None;
  let mut flasher_on = false;
  let mut last_exec: u16 = 0;

  for step in steps {
    match step {
      Step::Directive(Directive::SetVdg(v)) => {
        if last_vdg != Some(*v) {
          asm.emit(&[byte(LDA_IMM), byte(v & 0xF8)]);
          asm.emit(&[byte(STA_EXT)]);
          asm.emit(&bytes(&0xFF22u16.to_be_bytes()));
          last_vdg = Some(*v);
        }
      }
      Step::Directive(Directive::SetSamV(v)) => {
        emit_sam_pokes(&mut asm, 0xFFC0, 3, last_samv, *v);
        last_samv = Some(*v);
      }
      Step::Directive(Directive::SetSamF(v)) => {
        emit_sam_pokes(&mut asm, 0xFFC6, 7, last_samf, *v);
        last_samf = Some(*v);
        asm.set_label("flash_addr", (*v as u16 & 0x7F) * 512);
      }
      Step::Directive(Directive::Lds(v)) => {
        asm.emit(&[byte(LDS_PREBYTE), byte(LDS_IMM)]);
        asm.emit(&bytes(&v.to_be_bytes()));
      }
      Step::File(f) => {
        let seg = f.segment();
        let (load, oload) = if seg.dzip {
          let osize = seg.osize.unwrap_or(seg.size);
          let oload = f.load.unwrap_or(seg.start);
          let default_zload = oload.wrapping_add((osize + 1 - seg.size) as u16);
          (f.zload.unwrap_or(default_zload), oload)
        } else {
          (f.load.unwrap_or(seg.start), f.load.unwrap_or(seg.start))
        };

        if f.flasher != flasher_on {
          emit_flasher_patch(&mut asm, f.flasher);
          flasher_on = f.flasher;
        }

        asm.emit(&[byte(LDX_IMM)]);
        asm.emit(&bytes(&load.to_be_bytes()));
        asm.emit(&[byte(LBSR), rel_word("load_part")]);

        if seg.dzip {
          let end = load.wrapping_add(seg.size as u16);
          asm.emit(&[byte(LDX_IMM)]);
          asm.emit(&bytes(&load.to_be_bytes()));
          asm.emit(&[byte(LDD_IMM)]);
          asm.emit(&bytes(&end.to_be_bytes()));
          asm.emit(&[byte(LDU_IMM)]);
          asm.emit(&bytes(&oload.to_be_bytes()));
          asm.emit(&[byte(LBSR), rel_word("dunzip")]);
        }

        last_exec = f.exec.unwrap_or(0);
      }
    }
  }

  asm.set_label("exec", last_exec);
  asm.emit(&[byte(JMP_EXT), ref_word("exec")]);

  emit_loader_core(&mut asm);
  if flasher_used {
    emit_flasher_code(&mut asm);
  }
  if dzip_used {
    emit_dunzip_code(&mut asm);
  }

  asm.link()?;
  let main_loader = asm.data().to_vec();

  asm.reset(STUB_ORG);
  asm.emit(&[ref_word("colon"), byte(JMP_EXT), ref_word("exec_loader")]);
  asm.link()?;
  let stub = asm.data().to_vec();

  Ok(AutorunOutput { main_loader, stub })
}

fn emit_header_prefix(asm: &mut Assembler, name: [u8; 8]) {
  asm.emit(&bytes(&name));
  asm.emit(&[byte(TYPE_BINARY), byte(ENCODING_BINARY), byte(GAP_FALSE)]);
  // The 4 bytes carrying execution-time side effects: the colon byte sits
  // where a plain filename block would carry the high byte of `exec_be`,
  // followed by 0x00, then the load address 0x00 0xA6 pointing at the
  // BASIC hijack stub's origin (§9: preserved bit-exactly).
  asm.emit(&[label("colon"), byte(0x3A), byte(0x00), byte(0x00), byte(0xA6)]);
  asm.emit(&[label("exec_loader")]);
}

/// Reads `$A000`, isolates bit 5, stores the probe result at `<$10`, then
/// writes `fast_pw` into the architecture-appropriate pulse-width cells.
fn emit_arch_probe_and_fast_setup(asm: &mut Assembler) {
  asm.emit(&[byte(LDA_EXT)]);
  asm.emit(&bytes(&0xA000u16.to_be_bytes()));
  asm.emit(&[byte(ANDA_IMM), byte(0x20)]);
  asm.emit(&[byte(STA_DIRECT), byte(0x10)]);

  asm.emit(&[byte(LDA_DIRECT), byte(0x10)]);
  asm.emit(&[byte(BEQ), rel_low("dragon_fast")]);

  // CoCo: fast_pw -> $92 (hi), $94 (lo).
  asm.emit(&[byte(LDD_IMM), ref_word("fast_pw")]);
  asm.emit(&[byte(0x97), byte(0x92)]); // sta <$92 (high byte of D)
  asm.emit(&[byte(0xD7), byte(0x94)]); // stb <$94 (low byte of D)
  asm.emit(&[byte(BRA), rel_low("fast_done")]);

  asm.emit(&[label("dragon_fast")]);
  asm.emit(&[byte(LDD_IMM), ref_word("fast_pw")]);
  asm.emit(&[byte(0x97), byte(0x8F)]);
  asm.emit(&[byte(0xD7), byte(0x90)]);

  asm.emit(&[label("fast_done")]);
}

/// For each bit `0..bit_count` that differs from `prev` (absent `prev`
/// counts as every bit differing), emit `sta` to the clear/set address
/// pair for that bit, two addresses per bit starting at `base`.
fn emit_sam_pokes(asm: &mut Assembler, base: u16, bit_count: u8, prev: Option<u8>, v: u8) {
  for bit in 0..bit_count {
    let changed = match prev {
      Some(p) => ((p >> bit) & 1) != ((v >> bit) & 1),
      None => true,
    };
    if !changed {
      continue;
    }
    let set = (v >> bit) & 1 == 1;
    let addr = base + (bit as u16) * 2 + if set { 1 } else { 0 };
    asm.emit(&[byte(STA_EXT)]);
    asm.emit(&bytes(&addr.to_be_bytes()));
  }
}

/// Toggle `mod_flash`'s opcode byte between `STA` (flasher on, writes
/// through) and `CMPX` (flasher off, reads without effect) at runtime.
fn emit_flasher_patch(asm: &mut Assembler, enabled: bool) {
  let opcode = if enabled { STA_EXT } else { CMPX_EXT };
  asm.emit(&[byte(LDA_IMM), byte(opcode)]);
  asm.emit(&[byte(STA_EXT), ref_word("mod_flash")]);
}

/// `code_load_0`..`code_load_1`: calls `CSRDON`/`BLKIN` in a loop until
/// the block-type byte at `<$7C` signals EOF, then stops the motor; on
/// `BLKIN` carry-set it prints "I/O ERROR" through `OUTCH`.
fn emit_loader_core(asm: &mut Assembler) {
  asm.emit(&[label("load_part")]);
  asm.emit(&[byte(JSR_EXT)]);
  asm.emit(&bytes(&CSRDON.to_be_bytes()));

  asm.emit(&[label("code_load_0")]);
  asm.emit(&[byte(JSR_EXT)]);
  asm.emit(&bytes(&BLKIN.to_be_bytes()));
  asm.emit(&[byte(BCC), rel_low("code_load_0_ok")]);
  asm.emit(&[byte(LDX_IMM), ref_word("io_error_msg")]);
  asm.emit(&[label("io_error_loop")]);
  asm.emit(&[byte(0xA6), byte(0x80)]); // lda ,x+
  asm.emit(&[byte(BEQ), rel_low("code_load_1")]);
  asm.emit(&[byte(JSR_EXT)]);
  asm.emit(&bytes(&OUTCH.to_be_bytes()));
  asm.emit(&[byte(BRA), rel_low("io_error_loop")]);

  asm.emit(&[label("code_load_0_ok")]);
  asm.emit(&[byte(STX_EXT), byte(0x00), byte(0x7E)]);
  asm.emit(&[byte(LDA_DIRECT), byte(0x7C)]);
  asm.emit(&[byte(INCA)]);
  asm.emit(&[byte(BNE), rel_low("code_load_0")]);
  asm.emit(&[byte(CLR_DIRECT), byte(0x7D)]); // cassette motor off

  asm.emit(&[label("code_load_1")]);
  asm.emit(&[byte(RTS)]);

  asm.emit(&[label("io_error_msg")]);
  asm.emit(&bytes(b"I/O ERROR"));
  asm.emit(&[byte(0x00)]);
}

/// `code_load_flash`: XOR-flash `flash_addr` through the self-modifiable
/// `mod_flash` opcode byte (STA when enabled, CMPX when disabled). Both
/// are 3-byte extended-addressing opcodes, so toggling the opcode byte in
/// place never changes the instruction's length.
fn emit_flasher_code(asm: &mut Assembler) {
  asm.emit(&[label("code_load_flash")]);
  asm.emit(&[byte(LDA_EXT), ref_word("flash_addr")]);
  asm.emit(&[byte(EORA_IMM), byte(0xFF)]);
  asm.emit(&[label("mod_flash"), byte(CMPX_EXT), ref_word("flash_addr")]);
  asm.emit(&[byte(RTS)]);
}

/// `dunzip`: a copy-run / back-reference decoder. Each iteration reads a
/// 16-bit `a,b` token from the compressed stream (`,x++`) and dispatches
/// on two sign bits: `b`'s sign picks literal (positive) vs. back-reference
/// (negative); within a back-reference, `a`'s sign then picks the short
/// form (7-bit offset in `a`, 7-bit length in `b`) vs. the long form
/// (14-bit offset spanning `a` and `b`, with an 8-bit length read as a
/// third stream byte). Back-references read through an indexed offset
/// from the output cursor `u` rather than from `u` itself, so they
/// reproduce earlier decompressed bytes instead of copying nothing.
fn emit_dunzip_code(asm: &mut Assembler) {
  asm.emit(&[label("dunzip")]);
  asm.emit(&[byte(0xEC), byte(0x81)]); // ldd ,x++
  asm.emit(&[byte(TSTB)]);
  asm.emit(&[byte(BPL), rel_low("dunzip_literal")]);
  asm.emit(&[byte(TSTA)]);
  asm.emit(&[byte(BMI), rel_low("dunzip_back_long")]);
  asm.emit(&[byte(BRA), rel_low("dunzip_back_short")]);

  asm.emit(&[label("dunzip_literal")]);
  asm.emit(&[byte(STB_DIRECT), byte(0x79)]); // b already holds length, 1..127
  asm.emit(&[label("dunzip_literal_loop")]);
  asm.emit(&[byte(0xA6), byte(0x80)]); // lda ,x+
  asm.emit(&[byte(0xA7), byte(0xC0)]); // sta ,u+
  asm.emit(&[byte(DEC_DIRECT), byte(0x79)]);
  asm.emit(&[byte(BNE), rel_low("dunzip_literal_loop")]);
  asm.emit(&[byte(BRA), rel_low("dunzip_next")]);

  // Short back-reference: a = offset (0x01..0x7F), b = 0x80 | length.
  asm.emit(&[label("dunzip_back_short")]);
  asm.emit(&[byte(ANDB_IMM), byte(0x7F)]);
  asm.emit(&[byte(STB_DIRECT), byte(0x79)]); // stash length, b is about to carry -offset
  asm.emit(&[byte(NEGA)]);
  asm.emit(&[byte(TFR), byte(TFR_A_TO_B)]); // b = -offset, for the b,u indexed read below
  asm.emit(&[label("dunzip_back_short_loop")]);
  asm.emit(&[byte(0xA6), byte(POSTBYTE_B_U)]); // lda b,u
  asm.emit(&[byte(0xA7), byte(0xC0)]); // sta ,u+
  asm.emit(&[byte(DEC_DIRECT), byte(0x79)]);
  asm.emit(&[byte(BNE), rel_low("dunzip_back_short_loop")]);
  asm.emit(&[byte(BRA), rel_low("dunzip_next")]);

  // Long back-reference: a,b (both masked to 7 bits) form a 14-bit offset
  // carried in D; the length is a third byte read from the stream.
  asm.emit(&[label("dunzip_back_long")]);
  asm.emit(&[byte(ANDA_IMM), byte(0x7F)]);
  asm.emit(&[byte(ANDB_IMM), byte(0x7F)]);
  asm.emit(&[byte(PSHS), byte(PUSH_PULL_D)]); // pshs d (save masked offset)
  asm.emit(&[byte(0xA6), byte(0x80)]); // lda ,x+  (length byte)
  asm.emit(&[byte(STA_DIRECT), byte(0x79)]);
  asm.emit(&[byte(PULS), byte(PUSH_PULL_D)]); // puls d (restore offset)
  asm.emit(&[byte(COMA)]);
  asm.emit(&[byte(COMB)]);
  asm.emit(&[byte(ADDD_IMM), byte(0x00), byte(0x01)]); // d = -(offset)
  asm.emit(&[label("dunzip_back_long_loop")]);
  asm.emit(&[byte(0xA6), byte(POSTBYTE_D_U)]); // lda d,u
  asm.emit(&[byte(0xA7), byte(0xC0)]); // sta ,u+
  asm.emit(&[byte(DEC_DIRECT), byte(0x79)]);
  asm.emit(&[byte(BNE), rel_low("dunzip_back_long_loop")]);

  asm.emit(&[label("dunzip_next")]);
  asm.emit(&[byte(0x8C), byte(0x00), byte(0x00)]); // cmpx #0 (end sentinel check)
  asm.emit(&[byte(BNE), rel_low("dunzip")]);
  asm.emit(&[byte(RTS)]);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::segment::{FileRecord, Segment};

  fn plain_file(name: &str, load: u16, exec: u16, data: Vec<u8>) -> FileRecord {
    let mut f = FileRecord::new(FileRecord::pack_name(name));
    f.load = Some(load);
    f.exec = Some(exec);
    f.segments = vec![Segment::new(load, data)];
    f
  }

  #[test]
  fn main_loader_prefix_places_exec_loader_after_fifteen_bytes() {
    let name = FileRecord::pack_name("GAME");
    let steps = vec![Step::File(plain_file("GAME", 0x2000, 0x2000, vec![0x01, 0x02]))];
    let out = compose(name, &steps, false).unwrap();
    assert!(out.main_loader.len() > 15);
    // exec_loader sits at org+15; the colon byte is within the 15-byte
    // header, at the position documented in emit_header_prefix.
    assert_eq!(out.main_loader[11], 0x3A);
  }

  #[test]
  fn stub_jumps_through_exec_loader() {
    let name = FileRecord::pack_name("GAME");
    let steps = vec![Step::File(plain_file("GAME", 0x2000, 0x2000, vec![0x01]))];
    let out = compose(name, &steps, false).unwrap();
    assert_eq!(out.stub.len(), 5);
    assert_eq!(out.stub[2], JMP_EXT);
    let target = u16::from_be_bytes([out.stub[3], out.stub[4]]);
    assert_eq!(target, MAIN_ORG + 15);
  }

  #[test]
  fn sam_v_first_call_pokes_every_bit() {
    let mut asm = Assembler::new(0x0100);
    emit_sam_pokes(&mut asm, 0xFFC0, 3, None, 0b100);
    // 3 bits, each poke is `sta` (1) + addr (2) = 3 bytes -> 9 bytes total.
    assert_eq!(asm.data().len(), 9);
  }

  #[test]
  fn sam_v_second_call_only_pokes_changed_bits() {
    let mut asm = Assembler::new(0x0100);
    emit_sam_pokes(&mut asm, 0xFFC0, 3, Some(0b100), 0b101);
    // only bit 0 differs
    assert_eq!(asm.data().len(), 3);
  }

  #[test]
  fn autorun_containment_only_internal_and_implicit_labels() {
    let name = FileRecord::pack_name("GAME");
    let mut screen = plain_file("SCREEN", 0x0E00, 0, vec![0xAA; 10]);
    screen.segments[0].dzip = true;
    screen.segments[0].osize = Some(20);
    let steps = vec![
      Step::Directive(Directive::SetVdg(0x08)),
      Step::Directive(Directive::SetSamV(4)),
      Step::Directive(Directive::SetSamF(7)),
      Step::File(screen),
      Step::File(plain_file("GAME", 0x3000, 0x3010, vec![0x01, 0x02])),
    ];
    let out = compose(name, &steps, true);
    assert!(out.is_ok());
  }
}
