//! Desktop and system automation
//!
//! Actions are planned into a program + arguments first and only then
//! spawned, so every action can be checked (allow-list, power-action
//! switch) before anything runs. Commands target a freedesktop Linux
//! session: `xdg-open`, `amixer`, `brightnessctl`, `systemctl`, `loginctl`.

use async_trait::async_trait;
use reqwest::Url;
use tokio::process::Command;

use shadow_config::AutomationConfig;
use shadow_core::{Automation, CapabilityResult, Parameters, Result};

use crate::CapabilityError;

const SEARCH_URL: &str = "https://www.google.com/search";

/// Program invocation an action resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Planned {
    pub program: String,
    pub args: Vec<String>,
    /// Reply on success
    pub confirmation: String,
}

impl Planned {
    fn new(program: &str, args: &[&str], confirmation: impl Into<String>) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            confirmation: confirmation.into(),
        }
    }
}

/// Automation that spawns local processes
#[derive(Debug, Clone)]
pub struct ProcessAutomation {
    allowed_apps: Vec<String>,
    allow_power_actions: bool,
}

impl ProcessAutomation {
    pub fn new(config: &AutomationConfig) -> Self {
        Self {
            allowed_apps: config.allowed_apps.iter().map(|a| a.to_lowercase()).collect(),
            allow_power_actions: config.allow_power_actions,
        }
    }

    /// Resolve an action into a command without running it
    pub fn plan(&self, action: &str, params: &Parameters) -> std::result::Result<Planned, CapabilityError> {
        let param = |key: &str| params.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let planned = match action {
            "open_app" => {
                let app = param("app")
                    .or_else(|| param("target"))
                    .ok_or_else(|| CapabilityError::invalid_params("which application?"))?
                    .to_lowercase();
                if !self.allowed_apps.iter().any(|a| *a == app) {
                    return Err(CapabilityError::not_permitted(format!("'{}' is not an allowed application", app)));
                }
                Planned::new(&app, &[], format!("Opening {}.", app))
            }
            "open_url" => {
                let raw = param("url")
                    .or_else(|| param("target"))
                    .ok_or_else(|| CapabilityError::invalid_params("which website?"))?;
                let url = normalize_url(raw)?;
                Planned::new("xdg-open", &[url.as_str()], format!("Opening {}.", url))
            }
            "web_search" => {
                let query = param("query")
                    .or_else(|| param("target"))
                    .ok_or_else(|| CapabilityError::invalid_params("what should I search for?"))?;
                let url = Url::parse_with_params(SEARCH_URL, &[("q", query)])
                    .map_err(|e| CapabilityError::Configuration(e.to_string()))?;
                Planned::new("xdg-open", &[url.as_str()], format!("Searching the web for {}.", query))
            }
            "volume_up" => Planned::new("amixer", &["-q", "set", "Master", "10%+"], "Volume up."),
            "volume_down" => Planned::new("amixer", &["-q", "set", "Master", "10%-"], "Volume down."),
            "mute" => Planned::new("amixer", &["-q", "set", "Master", "toggle"], "Toggled mute."),
            "brightness_up" => Planned::new("brightnessctl", &["-q", "set", "10%+"], "Brightness up."),
            "brightness_down" => Planned::new("brightnessctl", &["-q", "set", "10%-"], "Brightness down."),
            "lock" => Planned::new("loginctl", &["lock-session"], "Locking the screen."),
            "sleep" | "shutdown" | "restart" => {
                if !self.allow_power_actions {
                    return Err(CapabilityError::not_permitted(format!("{} is disabled", action)));
                }
                let verb = match action {
                    "sleep" => "suspend",
                    "shutdown" => "poweroff",
                    _ => "reboot",
                };
                Planned::new("systemctl", &[verb], format!("Running {}.", action))
            }
            other => {
                return Err(CapabilityError::invalid_params(format!("unknown automation action '{}'", other)));
            }
        };
        Ok(planned)
    }
}

#[async_trait]
impl Automation for ProcessAutomation {
    async fn automate(&self, action: &str, params: &Parameters) -> Result<CapabilityResult> {
        let planned = match self.plan(action, params) {
            Ok(planned) => planned,
            Err(CapabilityError::NotPermitted(reason)) => {
                tracing::warn!(action, %reason, "Automation refused");
                return Ok(CapabilityResult::failure(reason));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(action, program = %planned.program, "Running automation");
        let status = Command::new(&planned.program)
            .args(&planned.args)
            .status()
            .await
            .map_err(CapabilityError::from)?;

        if status.success() {
            Ok(CapabilityResult::ok(planned.confirmation))
        } else {
            tracing::error!(action, %status, "Automation command failed");
            Ok(CapabilityResult::failure(format!("{} exited with {}", planned.program, status)))
        }
    }
}

/// Automation used when desktop control is switched off
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpAutomation;

#[async_trait]
impl Automation for NoOpAutomation {
    async fn automate(&self, action: &str, _params: &Parameters) -> Result<CapabilityResult> {
        tracing::debug!(action, "Automation disabled");
        Ok(CapabilityResult::failure("Device control is not enabled."))
    }
}

/// Accept bare domains ("example.com") as https URLs
fn normalize_url(raw: &str) -> std::result::Result<Url, CapabilityError> {
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };
    let url = Url::parse(&candidate).map_err(|e| CapabilityError::invalid_params(format!("bad url: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(CapabilityError::not_permitted(format!("scheme '{}' is not allowed", scheme))),
    }
}
