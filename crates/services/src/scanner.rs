use std::path::{Path, PathBuf};
use toolbridge_core::{BridgeConfig, ServiceEndpoints};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub repository: String,
    pub with_intent: bool,
    pub with_embed: bool,
    pub output_file: Option<String>,
}

impl ScanOptions {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            with_intent: true,
            with_embed: true,
            output_file: None,
        }
    }
}

/// The external `web3-scanner` executable and the directory hosting it.
#[derive(Debug, Clone)]
pub struct ScannerBinary {
    dir: PathBuf,
    path: PathBuf,
}

impl ScannerBinary {
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            dir: config.scanner_dir.clone(),
            path: config.scanner_binary(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_present(&self) -> bool {
        self.path.exists()
    }

    /// `<binary> scan <repository> [--intent] [--embed] [--output <file>]`
    ///
    /// Arguments are joined verbatim; the repository and output file are not quoted.
    pub fn scan_command(&self, options: &ScanOptions) -> String {
        let mut parts = vec![
            self.path.to_string_lossy().into_owned(),
            "scan".to_string(),
            options.repository.clone(),
        ];
        if options.with_intent {
            parts.push("--intent".to_string());
        }
        if options.with_embed {
            parts.push("--embed".to_string());
        }
        if let Some(output) = options.output_file.as_deref().filter(|o| !o.is_empty()) {
            parts.push("--output".to_string());
            parts.push(output.to_string());
        }
        parts.join(" ")
    }

    /// Shell line that starts both services detached from the caller.
    pub fn background_start_command(&self) -> String {
        format!(
            "cd {} && nohup {} start > /dev/null 2>&1 &",
            self.dir.display(),
            self.path.display()
        )
    }

    pub fn foreground_start_command(&self) -> String {
        format!("cd {} && ./web3-scanner start", self.dir.display())
    }

    /// How to start the services by hand; returned instead of blocking on them.
    pub fn start_instructions(&self, endpoints: &ServiceEndpoints) -> String {
        let command = self.foreground_start_command();
        format!(
            "To start web3se-lab services, run:\n\
             {command}\n\n\
             Or use: execute_command with command: '{command}'\n\n\
             Services will run on:\n\
             - SmartBERT API: {}\n\
             - web3-sekit API: {}",
            endpoints.smartbert, endpoints.web3_sekit
        )
    }
}
