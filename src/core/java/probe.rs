// ─── Java Probe ───
// Inspects a Java executable (`-XshowSettings:properties -version`) and
// decides whether it can run a given Minecraft version.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaInstallation {
    pub path: PathBuf,
    pub version: String,
    pub major: u32,
    pub is_64bit: bool,
    pub vendor: String,
}

/// Verdict for a configured Java executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaValidation {
    pub valid: bool,
    pub installation: Option<JavaInstallation>,
}

impl JavaValidation {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            installation: None,
        }
    }
}

/// Re-validates a previously resolved Java executable before it is reused.
#[async_trait]
pub trait JavaValidator: Send + Sync {
    async fn validate(&self, executable: &Path, minecraft_version: &str) -> JavaValidation;
}

/// Runs the executable and parses its property dump.
#[derive(Debug, Default, Clone)]
pub struct ProbeJavaValidator;

#[async_trait]
impl JavaValidator for ProbeJavaValidator {
    async fn validate(&self, executable: &Path, minecraft_version: &str) -> JavaValidation {
        let Some(installation) = probe_java(executable).await else {
            return JavaValidation::invalid();
        };

        let required = required_java_for_minecraft_version(minecraft_version);
        let valid =
            installation.is_64bit && is_java_compatible_major(installation.major, required);
        if !valid {
            warn!(
                "Java {} at {:?} cannot run Minecraft {} (needs {}, 64-bit: {})",
                installation.version,
                installation.path,
                minecraft_version,
                required,
                installation.is_64bit
            );
        }

        JavaValidation {
            valid,
            installation: Some(installation),
        }
    }
}

#[instrument]
pub async fn probe_java(path: &Path) -> Option<JavaInstallation> {
    let output = Command::new(path)
        .args(["-XshowSettings:properties", "-version"])
        .stdin(Stdio::null())
        .output()
        .await
        .ok()?;

    let version_output = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stderr),
        String::from_utf8_lossy(&output.stdout)
    );
    debug!(
        "Probing {:?}: {}",
        path,
        version_output.lines().next().unwrap_or("")
    );

    parse_probe_output(path, &version_output)
}

fn parse_probe_output(path: &Path, output: &str) -> Option<JavaInstallation> {
    let version = parse_version_string(output)?;
    let major = parse_major_version(&version);
    let lower = output.to_ascii_lowercase();
    let is_64bit = lower.contains("sun.arch.data.model = 64")
        || lower.contains("os.arch = amd64")
        || lower.contains("os.arch = x86_64")
        || lower.contains("os.arch = aarch64");

    Some(JavaInstallation {
        path: path.to_path_buf(),
        version,
        major,
        is_64bit,
        vendor: parse_vendor(output),
    })
}

fn parse_version_string(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let start = line.find('"')?;
        let end = line[start + 1..].find('"')?;
        Some(line[start + 1..start + 1 + end].to_string())
    })
}

fn parse_vendor(output: &str) -> String {
    for vendor in ["Temurin", "Adoptium", "Zulu", "OpenJDK"] {
        if output.lines().any(|line| line.contains(vendor)) {
            return vendor.to_string();
        }
    }
    "unknown".to_string()
}

fn parse_major_version(version: &str) -> u32 {
    let first_part = version.split('.').next().unwrap_or("0");
    let major: u32 = first_part.parse().unwrap_or(0);

    if major == 1 {
        version
            .split('.')
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap_or(major)
    } else {
        major
    }
}

fn runtime_track(required_major: u32) -> u32 {
    if required_major <= 8 {
        8
    } else if required_major >= 21 {
        21
    } else {
        17
    }
}

pub fn required_java_for_minecraft_version(minecraft_version: &str) -> u32 {
    let mut parts = minecraft_version.split('.');
    let major = parts
        .next()
        .and_then(|p| p.parse::<u32>().ok())
        .unwrap_or(1);
    let minor = parts
        .next()
        .and_then(|p| p.parse::<u32>().ok())
        .unwrap_or(20);
    let patch = parts
        .next()
        .and_then(|p| p.parse::<u32>().ok())
        .unwrap_or(0);

    if major > 1 || minor >= 21 || (minor == 20 && patch >= 5) {
        21
    } else if minor >= 17 {
        17
    } else {
        8
    }
}

pub fn is_java_compatible_major(installed_major: u32, required_major: u32) -> bool {
    installed_major >= required_major
        && runtime_track(installed_major) == runtime_track(required_major)
}
