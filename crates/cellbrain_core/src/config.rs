//! Configuration for the headless runner.
//!
//! Maps to `config.toml`:
//!
//! ```toml
//! [simulator]
//! num_automata = 64
//! input_size = 4
//! output_size = 4
//! kind = "interpreted"
//! seed = 42
//! bits_per_entity = 8
//! members = 2
//!
//! [run]
//! ticks = 1000
//! entities = 64
//! log_interval = 100
//! ```
//!
//! Missing keys take the values of the `Default` impls.

use serde::{Deserialize, Serialize};

use crate::simulator::SimulatorConfig;

/// Driver loop settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RunConfig {
    pub ticks: u64,
    /// Number of automata bound to simulator slots.
    pub entities: usize,
    /// Ticks between progress log lines; 0 disables them.
    pub log_interval: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: 100,
            entities: 1,
            log_interval: 10,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub simulator: SimulatorConfig,
    pub run: RunConfig,
}

impl AppConfig {
    /// Checks the settings for values the simulator stack cannot honor.
    pub fn validate(&self) -> anyhow::Result<()> {
        let simulator = &self.simulator;
        anyhow::ensure!(
            simulator.num_automata > 0,
            "Number of automata must be positive"
        );
        anyhow::ensure!(simulator.members > 0, "Member count must be positive");
        anyhow::ensure!(
            simulator.members <= simulator.num_automata,
            "Member count exceeds number of automata"
        );
        if let Some(bits) = simulator.bits_per_entity {
            anyhow::ensure!(
                (1..32).contains(&bits) && 32 % bits == 0,
                "Bits per entity must divide 32 and lie in [1, 31]"
            );
        }

        anyhow::ensure!(
            self.run.entities <= simulator.num_automata,
            "Entity count exceeds number of automata"
        );
        Ok(())
    }

    /// Parses and validates a `config.toml` document.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }
}
