//! Integration tests driving the public pipeline end to end, reproducing
//! the scenarios documented in SPEC_FULL.md section 8.

use std::io::Cursor;

use tapeforge::cli::{self, ParseOutcome};
use tapeforge::compress::Transform;
use tapeforge::driver;
use tapeforge::error::Result;
use tapeforge::plan::{AutorunDirective, OutputFormat, PlannedStep};

struct Identity;
impl Transform for Identity {
  fn apply(&self, input: &[u8]) -> Result<Vec<u8>> {
    Ok(input.to_vec())
  }
}

fn plan_from_args(args: &[&str]) -> tapeforge::plan::RunPlan {
  let owned: Vec<String> = args.iter().map(|s| s.to_string()).collect();
  match cli::parse(&owned).expect("parse should succeed") {
    ParseOutcome::Plan(p) => p,
    ParseOutcome::Print(_) => panic!("expected a plan, got a print outcome"),
  }
}

#[test]
fn scenario_1_cli_to_cas_round_trip() {
  let dir = tempfile::tempdir().unwrap();
  let input = dir.path().join("hello.bin");
  std::fs::write(&input, [0x48, 0x49]).unwrap();

  let plan = plan_from_args(&[
    "-o",
    "out.cas",
    "-B",
    "-l",
    "0x1000",
    "-e",
    "0x1000",
    "-n",
    "HI",
    input.to_str().unwrap(),
  ]);
  assert_eq!(plan.format, OutputFormat::Cas);

  let mut buf = Cursor::new(Vec::new());
  driver::run(&plan, &Identity, &mut buf).unwrap();
  let bytes = buf.into_inner();

  // A filename block, a data block carrying the two payload bytes, and a
  // trailing EOF block should all be present.
  assert!(bytes.windows(2).any(|w| w == [0x55, 0x3C]));
  assert!(bytes.windows(2).any(|w| w == [0x48, 0x49]));
}

#[test]
fn scenario_wav_output_has_valid_riff_header() {
  let dir = tempfile::tempdir().unwrap();
  let input = dir.path().join("hello.bin");
  std::fs::write(&input, [0x01, 0x02, 0x03]).unwrap();

  let plan = plan_from_args(&["-o", "out.wav", "-B", input.to_str().unwrap()]);
  assert_eq!(plan.format, OutputFormat::Wav);

  let mut buf = Cursor::new(Vec::new());
  driver::run(&plan, &Identity, &mut buf).unwrap();
  let bytes = buf.into_inner();

  assert_eq!(&bytes[0..4], b"RIFF");
  assert_eq!(&bytes[8..12], b"WAVE");
  let subchunk2 = u32::from_le_bytes(bytes[40..44].try_into().unwrap());
  assert_eq!(bytes.len() as u64 - 44, subchunk2 as u64);
}

#[test]
fn scenario_5_autorun_with_fast_and_directives_produces_loader_and_payload() {
  let dir = tempfile::tempdir().unwrap();
  let a = dir.path().join("a.bin");
  let b = dir.path().join("b.bin");
  std::fs::write(&a, vec![0xAA; 40]).unwrap();
  std::fs::write(&b, vec![0xBB; 20]).unwrap();

  let mut plan = plan_from_args(&[
    "-o",
    "out.wav",
    "--autorun",
    "--fast",
    "-n",
    "GAME",
    "-l",
    "0x3000",
    "-e",
    "0x3000",
    a.to_str().unwrap(),
    b.to_str().unwrap(),
  ]);
  plan.steps.insert(
    0,
    PlannedStep::Directive(AutorunDirective::SetSamV(0)),
  );

  let mut buf = Cursor::new(Vec::new());
  driver::run(&plan, &Identity, &mut buf).unwrap();
  let bytes = buf.into_inner();

  assert_eq!(&bytes[0..4], b"RIFF");
  assert!(bytes.len() > 44, "autorun output should carry more than just a header");
}

#[test]
fn scenario_dragondos_input_is_decoded_through_the_cli() {
  let dir = tempfile::tempdir().unwrap();
  let input = dir.path().join("prog.bin");
  // 55 02 0E 00 00 03 0E 00 AA then AA BB CC (DragonDOS header + payload).
  std::fs::write(
    &input,
    [0x55, 0x02, 0x0E, 0x00, 0x00, 0x03, 0x0E, 0x00, 0xAA, 0xAA, 0xBB, 0xCC],
  )
  .unwrap();

  let plan = plan_from_args(&["-o", "out.cas", "-D", input.to_str().unwrap()]);

  let mut buf = Cursor::new(Vec::new());
  driver::run(&plan, &Identity, &mut buf).unwrap();
  let bytes = buf.into_inner();
  assert!(bytes.windows(3).any(|w| w == [0xAA, 0xBB, 0xCC]));
}

#[test]
fn autorun_directive_without_autorun_flag_is_rejected() {
  let plan = tapeforge::plan::RunPlan {
    output_path: "out.cas".into(),
    format: OutputFormat::Cas,
    wav_rate: 9600,
    default_timing: tapeforge::timing::TimingName::Rom,
    autorun: false,
    steps: vec![PlannedStep::Directive(AutorunDirective::SetVdg(0))],
  };
  let mut buf = Cursor::new(Vec::new());
  assert!(driver::run(&plan, &Identity, &mut buf).is_err());
}
