#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use buildwatch::config::{RunSettings, StopTiming, TerminationMode};

/// Builder for `RunSettings` to simplify test setup.
pub struct RunSettingsBuilder {
    settings: RunSettings,
}

impl RunSettingsBuilder {
    pub fn new(command: &str) -> Self {
        Self {
            settings: RunSettings::new(command),
        }
    }

    pub fn stop_before_build(mut self) -> Self {
        self.settings.stop = StopTiming::BeforeBuild;
        self
    }

    pub fn graceful(mut self, timeout: Duration) -> Self {
        self.settings.termination = TerminationMode::Graceful { timeout };
        self
    }

    pub fn directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings.directory = dir.into();
        self
    }

    pub fn label_output(mut self, val: bool) -> Self {
        self.settings.label_output = val;
        self
    }

    pub fn build(self) -> RunSettings {
        self.settings
    }
}
