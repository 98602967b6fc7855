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

/// Typed error for config load/parse failures so callers can distinguish
/// e.g. file-not-found from a bad decay setting without string matching.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid duration {0:?}: {1}")]
    InvalidDuration(String, String),

    #[error("Decay interval {0:?} must be longer than zero")]
    ZeroDecayInterval(String),

    #[error("Decay factor must be between 0 and 1 exclusive, got {0}")]
    InvalidDecayFactor(f64),

    #[error("Decay minimum must be between 0 and 100, got {0}")]
    InvalidDecayMinimum(f64),
}
