// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! A beat generator: a tempo engine that plays a click on every beat and fans beats and tempo
//! changes out to registered observers, with a terminal view and keyboard controller on top.

pub mod audio;
pub mod config;
pub mod controller;
pub mod decay;
pub mod engine;
pub mod observer;
pub mod view;

#[cfg(test)]
mod testutil;
