use std::path::PathBuf;

/// Workspace-level configuration, loaded from a `tiletune.toml` found in
/// the current directory or one of its parents. Every field has a default,
/// and a damaged file degrades to the defaults with a warning rather than
/// stopping the run; the command line still overrides everything here.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct GlobalConfig {
    /// Settings for the tuning sweep itself.
    #[serde(default)]
    pub tuning: TuningConfig,

    /// Settings for the persisted configuration table.
    #[serde(default)]
    pub table: TableConfig,
}

/// Sweep settings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TuningConfig {
    /// Timed iterations per candidate when the command line does not say.
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Options handed to the device compiler for every candidate.
    #[serde(default = "default_build_options")]
    pub build_options: String,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            build_options: default_build_options(),
        }
    }
}

/// Configuration-table settings.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct TableConfig {
    /// Table file loaded at startup, if any.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_iterations() -> u32 {
    10
}

fn default_build_options() -> String {
    "-cl-mad-enable -Werror".to_string()
}

impl GlobalConfig {
    /// Loads the configuration, walking up from the current directory and
    /// applying environment overrides.
    pub fn load() -> Self {
        Self::from_current_dir().override_from_env()
    }

    /// Applies `TILETUNE_ITERATIONS` and `TILETUNE_CONF` overrides.
    pub fn override_from_env(mut self) -> Self {
        if let Ok(value) = std::env::var("TILETUNE_ITERATIONS") {
            match value.parse() {
                Ok(iterations) => self.tuning.iterations = iterations,
                Err(_) => log::warn!("ignoring non-numeric TILETUNE_ITERATIONS: {value}"),
            }
        }
        if let Ok(value) = std::env::var("TILETUNE_CONF") {
            self.table.file = Some(PathBuf::from(value));
        }
        self
    }

    // Finds `tiletune.toml` in the current directory or its parents.
    fn from_current_dir() -> Self {
        let Ok(mut dir) = std::env::current_dir() else {
            return Self::default();
        };

        loop {
            let candidate = dir.join("tiletune.toml");
            if let Ok(content) = std::fs::read_to_string(&candidate) {
                return Self::from_toml(&content, &candidate.display().to_string());
            }
            if !dir.pop() {
                break;
            }
        }

        Self::default()
    }

    fn from_toml(content: &str, origin: &str) -> Self {
        match toml::from_str(content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("{origin}: falling back to defaults, config does not parse: {err}");
                Self::default()
            }
        }
    }
}
