//! Authorization code acquisition
//!
//! Logging in to Mi Fit takes a Google authorization code. The code is
//! obtained with [token-cli](https://github.com/imduffy15/token-cli), which
//! may open a browser and wait for the user to sign in.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Command;

use crate::config::AuthConfig;
use crate::error::{Error, Result};

/// Source of one-time authorization codes.
pub trait AuthorizationProvider {
    /// Obtain a code for `client_id`.
    ///
    /// `reuse_session` skips the setup steps when a provider session is
    /// already running.
    fn obtain_code(&self, client_id: &str, reuse_session: bool) -> Result<String>;
}

/// Authorization through the `token-cli` executable.
#[derive(Debug, Clone)]
pub struct TokenCli {
    program: PathBuf,
    discovery_url: String,
}

impl TokenCli {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            program: config.token_cli.clone(),
            discovery_url: config.discovery_url.clone(),
        }
    }

    /// Arguments of each invocation, in order.
    fn invocations(&self, client_id: &str, reuse_session: bool) -> Vec<Vec<String>> {
        let mut steps = Vec::new();
        if !reuse_session {
            steps.push(vec![
                "target".into(),
                "create".into(),
                "google".into(),
                "-t".into(),
                self.discovery_url.clone(),
            ]);
            steps.push(vec!["target".into(), "set".into(), "google".into()]);
        }
        steps.push(vec![
            "token".into(),
            "get".into(),
            client_id.to_string(),
            "--scope".into(),
            "openid".into(),
        ]);
        steps
    }

    fn run<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = Command::new(&self.program).args(args).output().map_err(|e| {
            Error::Authentication(format!(
                "failed to run {}: {}",
                self.program.display(),
                e
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Authentication(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl AuthorizationProvider for TokenCli {
    fn obtain_code(&self, client_id: &str, reuse_session: bool) -> Result<String> {
        let mut steps = self.invocations(client_id, reuse_session);
        // The last step prints the code
        let get_token = steps
            .pop()
            .ok_or_else(|| Error::Authentication("no token-cli command to run".to_string()))?;

        for args in steps {
            // Target setup fails harmlessly when the target already exists
            if let Err(e) = self.run(&args) {
                tracing::warn!(error = %e, "token-cli setup step failed");
            }
        }

        let code = self.run(&get_token)?;
        if code.is_empty() {
            return Err(Error::Authentication(
                "token-cli returned an empty code".to_string(),
            ));
        }
        tracing::info!("Obtained authorization code");
        Ok(code)
    }
}
