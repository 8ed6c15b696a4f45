// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs::read_to_string;
use std::path::Path;

use serde::Deserialize;

use crate::error::Fallible;
use crate::types::study_date::DEFAULT_ROLLOVER_HOUR;

/// Engine configuration. Callers construct this explicitly; the CLI reads
/// it from an optional `kartei.toml` next to the database.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Hour of day at which the study day rolls over.
    pub rollover_hour: u32,
    /// Fixed seed for the randomness source. Leave unset for
    /// entropy-seeded scheduling; set it to make sessions reproducible.
    pub seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            rollover_hour: DEFAULT_ROLLOVER_HOUR,
            seed: None,
        }
    }
}

impl SchedulerConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: &Path) -> Fallible<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
