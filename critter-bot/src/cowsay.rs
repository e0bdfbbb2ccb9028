//! Text-art formatting through the cowsay subprocess.

use tokio::process::Command;

/// What the cow says when given nothing to say.
pub const BLANK_STARE: &str = "* The cow stares at you blankly *";

#[derive(Debug, thiserror::Error)]
pub enum CowsayError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Formats messages by piping them through an external cowsay binary.
#[derive(Debug, Clone)]
pub struct CowFormatter {
    program: String,
}

impl CowFormatter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Format `message` as a speaking cow. Empty or absent input becomes
    /// the blank-stare placeholder rather than an error.
    pub async fn format(&self, message: Option<&str>) -> Result<String, CowsayError> {
        let message = match message {
            Some(text) if !text.trim().is_empty() => text,
            _ => BLANK_STARE,
        };

        let output = Command::new(&self.program)
            .arg(message)
            .output()
            .await
            .map_err(|source| CowsayError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(CowsayError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
