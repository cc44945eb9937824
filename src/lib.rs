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

//! Converts binary program images into 6809 cassette-tape program files,
//! either as a raw CAS block stream or as an 8-bit mono PCM WAV waveform,
//! with an optional synthesized autorun loader.

pub mod asm;
pub mod autorun;
pub mod block;
pub mod cas;
pub mod cli;
pub mod compress;
pub mod container;
pub mod driver;
pub mod error;
pub mod plan;
pub mod segment;
pub mod timing;
pub mod wav;
pub mod waveform;

pub use error::{Result, TapeError};
