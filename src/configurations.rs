use std::collections::HashMap;

use serde::Deserialize;
use serde_yaml::Value;
use url::Url;

use crate::errors::ConfigurationError;

const DEFAULT_AUTH_ATTEMPTS: u32 = 3;
const DEFAULT_AUTH_TIME_OUT: u32 = 15;

/// Operation mode of a provisioning run. A configured master host means
/// client mode; otherwise the run is masterless.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Masterless,
    Client,
}

/// Raw provisioning settings as they appear in a profile document.
#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    #[serde(rename = "type", default = "default_provisioner")]
    pub provisioner: String,
    #[serde(default)]
    pub master: Option<String>,
    #[serde(default)]
    pub keys_url: Option<String>,
    #[serde(default)]
    pub auth_attempts: Option<u32>,
    #[serde(default)]
    pub auth_time_out: Option<u32>,
    #[serde(default)]
    pub enable_services: bool,
    #[serde(default)]
    pub log_level: Option<String>,
}

fn default_provisioner() -> String {
    "salt".to_string()
}

/// Resolved configuration for a provisioning run.
#[derive(Clone, Debug)]
pub struct Configuration {
    pub provisioner: String,
    pub mode: Mode,
    pub master: Option<String>,
    pub keys_url: Option<Url>,
    pub auth_attempts: u32,
    pub auth_time_out: u32,
    pub enable_services: bool,
    pub log_level: String,
}

impl Configuration {
    /// Resolves raw settings into a configuration. Authentication knobs
    /// only apply in client mode; masterless runs get a single attempt with
    /// no timeout.
    pub fn from_settings(settings: Settings) -> Result<Self, ConfigurationError> {
        let mode = if settings.master.is_some() {
            Mode::Client
        } else {
            Mode::Masterless
        };
        let keys_url = settings
            .keys_url
            .as_deref()
            .map(Url::parse)
            .transpose()?;
        let (auth_attempts, auth_time_out) = match mode {
            Mode::Client => (
                settings.auth_attempts.unwrap_or(DEFAULT_AUTH_ATTEMPTS),
                settings.auth_time_out.unwrap_or(DEFAULT_AUTH_TIME_OUT),
            ),
            Mode::Masterless => (1, 0),
        };
        Ok(Configuration {
            provisioner: settings.provisioner,
            mode,
            master: settings.master,
            keys_url,
            auth_attempts,
            auth_time_out,
            enable_services: settings.enable_services,
            log_level: settings.log_level.unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Deserializes the provisioning section of a profile document.
    pub fn from_profile(profile: &Value) -> Result<Self, ConfigurationError> {
        let settings: Settings = serde_yaml::from_value(profile.clone())?;
        Self::from_settings(settings)
    }

    pub fn auth_required(&self) -> bool {
        self.mode == Mode::Client
    }
}

/// Declarative surface of a provisioner: what to install and what to
/// enable. Carrying out the installation is outside this crate.
pub trait Configurator: std::fmt::Debug {
    fn packages(&self) -> Vec<String>;
    fn services(&self) -> Vec<String>;
}

#[derive(Debug)]
struct SaltConfigurator {
    mode: Mode,
}

impl Configurator for SaltConfigurator {
    // `salt` ships salt-call; the minion package is only needed against a
    // master.
    fn packages(&self) -> Vec<String> {
        let mut packages = vec!["salt".to_string()];
        if self.mode == Mode::Client {
            packages.push("salt-minion".to_string());
        }
        packages
    }

    fn services(&self) -> Vec<String> {
        vec!["salt-minion".to_string()]
    }
}

#[derive(Debug)]
struct PuppetConfigurator;

impl Configurator for PuppetConfigurator {
    fn packages(&self) -> Vec<String> {
        vec!["puppet".to_string()]
    }

    fn services(&self) -> Vec<String> {
        vec!["puppet".to_string()]
    }
}

type Factory = fn(&Configuration) -> Box<dyn Configurator>;

/// Explicit registry mapping a provisioner type identifier to its
/// configurator constructor. Populated with the built-in types at
/// construction; unknown identifiers are an error, never a panic.
pub struct ConfiguratorRegistry {
    factories: HashMap<String, Factory>,
}

impl ConfiguratorRegistry {
    pub fn new() -> Self {
        let mut registry = ConfiguratorRegistry {
            factories: HashMap::new(),
        };
        registry.register("salt", |config| {
            Box::new(SaltConfigurator { mode: config.mode })
        });
        registry.register("puppet", |_| Box::new(PuppetConfigurator));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, factory: Factory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn configurator_for(
        &self,
        config: &Configuration,
    ) -> Result<Box<dyn Configurator>, ConfigurationError> {
        match self.factories.get(config.provisioner.as_str()) {
            Some(factory) => Ok(factory(config)),
            None => Err(ConfigurationError::UnknownType(config.provisioner.clone())),
        }
    }
}

impl Default for ConfiguratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
