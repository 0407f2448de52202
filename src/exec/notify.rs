// src/exec/notify.rs

use std::process::Stdio;

use tracing::{debug, warn};

use crate::exec::command::shell_command;

/// Shell commands run after each build, depending on its outcome.
///
/// Hooks run one after another with inherited stdio. A failing hook is
/// logged and otherwise ignored; it never changes the build outcome.
#[derive(Debug, Clone, Default)]
pub struct BuildHooks {
    on_success: Vec<String>,
    on_failure: Vec<String>,
}

impl BuildHooks {
    pub fn new(on_success: Vec<String>, on_failure: Vec<String>) -> Self {
        Self {
            on_success,
            on_failure,
        }
    }

    /// Run the hooks for a build outcome. Returns true if every hook succeeded.
    pub async fn notify(&self, build_succeeded: bool) -> bool {
        let hooks = if build_succeeded {
            &self.on_success
        } else {
            &self.on_failure
        };

        let mut all_good = true;
        for script in hooks {
            debug!(hook = %script, build_succeeded, "running build hook");
            let status = shell_command(script)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .status()
                .await;

            match status {
                Ok(status) if status.success() => {}
                Ok(status) => {
                    all_good = false;
                    warn!(hook = %script, exit_code = status.code().unwrap_or(-1), "notification failed");
                }
                Err(err) => {
                    all_good = false;
                    warn!(hook = %script, error = %err, "notification failed");
                }
            }
        }
        all_good
    }
}
