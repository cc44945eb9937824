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

use std::fs::File;
use std::process::ExitCode;

use tapeforge::cli::{self, ParseOutcome};
use tapeforge::compress::PipedDzip;
use tapeforge::driver;

fn main() -> ExitCode {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  let args: Vec<String> = std::env::args().skip(1).collect();

  let plan = match cli::parse(&args) {
    Ok(ParseOutcome::Print(text)) => {
      println!("{}", text);
      return ExitCode::SUCCESS;
    }
    Ok(ParseOutcome::Plan(plan)) => plan,
    Err(e) => {
      eprintln!("tapeforge: {}", e);
      return ExitCode::FAILURE;
    }
  };

  let out = match File::create(&plan.output_path) {
    Ok(f) => f,
    Err(e) => {
      eprintln!("tapeforge: cannot create '{}': {}", plan.output_path.display(), e);
      return ExitCode::FAILURE;
    }
  };

  match driver::run(&plan, &PipedDzip, out) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("tapeforge: {}", e);
      ExitCode::FAILURE
    }
  }
}
