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

use thiserror::Error;

/// The four error kinds from the error-handling design: usage mistakes,
/// fatal input problems, invariant violations, and I/O failures.
#[derive(Debug, Error)]
pub enum TapeError {
  #[error("usage error: {0}")]
  Usage(String),

  #[error("input error: {0}")]
  Input(String),

  #[error("invariant violation: {0}")]
  Invariant(String),

  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TapeError>;
