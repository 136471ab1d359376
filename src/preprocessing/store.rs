// Named configurations kept together in one JSON file

use std::{
    error::Error,
    fs::{self, File},
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::preprocessing::SimulationInput;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
struct StoreFile {
    configs: Vec<SimulationInput>,
}

/// An ordered list of [`SimulationInput`]s backed by a JSON file
pub struct ConfigStore {
    path: PathBuf,
    configs: Vec<SimulationInput>,
}

impl ConfigStore {
    /// A store holding `configs` that writes to `path`; nothing is read or written yet
    pub fn new(path: PathBuf, configs: Vec<SimulationInput>) -> Self {
        ConfigStore { path, configs }
    }

    /// Open the store at `path`, creating it with the default configuration
    /// when it does not exist yet
    pub fn load_or_create(path: &Path) -> Result<Self, Box<dyn Error>> {
        if !path.exists() {
            info!("Creating configuration file {:?}", path);
            let store = ConfigStore {
                path: path.to_path_buf(),
                configs: vec![SimulationInput::default()],
            };
            store.flush()?;
            return Ok(store);
        }

        if path.is_dir() {
            return Err(format!("configuration file {:?} is a directory", path).into());
        }

        let reader = BufReader::new(File::open(path)?);
        let file: StoreFile = serde_json::from_reader(reader)?;

        Ok(ConfigStore {
            path: path.to_path_buf(),
            configs: file.configs,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn configs(&self) -> &[SimulationInput] {
        &self.configs
    }

    /// Find a configuration by index, or by name when `key` is not an index
    pub fn select(&self, key: &str) -> Option<&SimulationInput> {
        self.position(key).map(|i| &self.configs[i])
    }

    fn position(&self, key: &str) -> Option<usize> {
        if let Ok(i) = key.parse::<usize>() {
            if i < self.configs.len() {
                return Some(i);
            }
        }
        self.configs.iter().position(|c| c.name == key)
    }

    /// Replace the configuration with the same name, or append it
    pub fn upsert(&mut self, input: SimulationInput) {
        match self.configs.iter_mut().find(|c| c.name == input.name) {
            Some(existing) => *existing = input,
            None => self.configs.push(input),
        }
    }

    /// Remove a configuration by index or name, returning it
    pub fn remove(&mut self, key: &str) -> Option<SimulationInput> {
        self.position(key).map(|i| self.configs.remove(i))
    }

    /// A human-readable listing of every configuration
    pub fn table(&self) -> String {
        let mut table = format!(
            "{:>3}  {:<20} {:>9} {:>9}  {}\n",
            "#", "name", "grid", "obstacles", "description"
        );
        for (i, c) in self.configs.iter().enumerate() {
            let lock = if c.protected { " (protected)" } else { "" };
            table.push_str(&format!(
                "{:>3}  {:<20} {:>9} {:>9}  {}{}\n",
                i,
                c.name,
                format!("{}x{}", c.width, c.height),
                c.segments.len(),
                c.description,
                lock
            ));
        }
        table
    }

    /// Save `input` under its name and write the store to disk.
    ///
    /// A protected configuration is left untouched and only `false` is
    /// returned.
    pub fn write(&mut self, input: SimulationInput) -> Result<bool, Box<dyn Error>> {
        let protected = self
            .configs
            .iter()
            .any(|c| c.name == input.name && c.protected);
        if protected {
            warn!(
                "Configuration '{}' is protected; changes are kept in memory only",
                input.name
            );
            return Ok(false);
        }

        self.upsert(input);
        self.flush()?;
        Ok(true)
    }

    /// Write the store as it is to disk
    pub fn flush(&self) -> Result<(), Box<dyn Error>> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(
            writer,
            &StoreFile {
                configs: self.configs.clone(),
            },
        )?;
        Ok(())
    }
}
