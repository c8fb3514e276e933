// ─── Game Command ───
// Turns resolved version + mod-loader metadata into the java command line
// that starts the game.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::core::auth::AuthAccount;
use crate::core::distro::Server;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::state::JavaSettings;
use crate::core::version::{ModLoaderMetadata, VersionDescriptor, VersionMetadata};

const LAUNCHER_NAME: &str = "launchsuite";
const LAUNCHER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything needed to build the game command for one session.
pub struct LaunchContext<'a> {
    pub java_executable: &'a Path,
    pub account: &'a AuthAccount,
    pub server: &'a Server,
    pub version: &'a VersionMetadata,
    pub mod_loader: &'a ModLoaderMetadata,
    pub common_dir: PathBuf,
    pub game_dir: PathBuf,
    pub java: JavaSettings,
}

/// A fully resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub current_dir: PathBuf,
    pub env: Vec<(String, String)>,
}

impl GameCommand {
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.current_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        configure_platform_spawn(&mut cmd);
        cmd
    }

    /// Copy/paste-able rendering for the log.
    pub fn display_for_logs(&self) -> String {
        let program = shell_escape(&self.program.to_string_lossy());
        let args = self
            .args
            .iter()
            .map(|arg| shell_escape(arg))
            .collect::<Vec<_>>()
            .join(" ");

        if args.is_empty() {
            program
        } else {
            format!("{} {}", program, args)
        }
    }
}

pub trait GameCommandBuilder: Send + Sync {
    fn build(&self, ctx: &LaunchContext<'_>) -> LauncherResult<GameCommand>;
}

/// Builds the command from version descriptors the way the vanilla
/// launcher does, with the mod-loader profile layered on top.
#[derive(Debug, Default, Clone)]
pub struct MinecraftCommandBuilder;

impl GameCommandBuilder for MinecraftCommandBuilder {
    fn build(&self, ctx: &LaunchContext<'_>) -> LauncherResult<GameCommand> {
        let version = ctx.version.descriptor()?;
        let loader = ctx.mod_loader.descriptor()?;

        let main_class = loader
            .main_class
            .as_deref()
            .or(version.main_class.as_deref())
            .ok_or_else(|| LauncherError::LaunchArguments("no main class in metadata".into()))?
            .to_string();

        let version_id = version
            .id
            .clone()
            .unwrap_or_else(|| ctx.server.minecraft_version.clone());
        let libs_dir = ctx.common_dir.join("libraries");
        let natives_dir = ctx.game_dir.join("natives");
        let classpath = build_classpath(&version, &loader, &libs_dir, &ctx.common_dir, &version_id)?;

        let vars = Placeholders {
            account: ctx.account,
            version_name: loader.id.clone().unwrap_or_else(|| version_id.clone()),
            game_dir: path_str(&ctx.game_dir),
            assets_root: path_str(&ctx.common_dir.join("assets")),
            assets_index: version.asset_index_id().unwrap_or("legacy").to_string(),
            natives_dir: path_str(&natives_dir),
            libs_dir: path_str(&libs_dir),
            classpath: classpath.clone(),
        };

        let mut args = vec![
            format!("-Xmx{}", ctx.java.max_ram),
            format!("-Xms{}", ctx.java.min_ram),
        ];
        args.extend(ctx.java.jvm_options.iter().cloned());

        let mut jvm_args: Vec<String> = version.jvm_args();
        jvm_args.extend(loader.jvm_args());
        if !jvm_args
            .iter()
            .any(|arg| arg.starts_with("-Djava.library.path="))
        {
            jvm_args.insert(0, "-Djava.library.path=${natives_directory}".into());
        }
        args.extend(vars.resolve_jvm_args(&jvm_args));
        args.push("-cp".into());
        args.push(classpath);
        args.push(main_class);

        let game_args = if loader.minecraft_arguments.is_some() {
            // Legacy loader profiles carry the full argument string.
            loader.game_args()
        } else {
            let mut merged = version.game_args();
            merged.extend(loader.game_args());
            merged
        };
        args.extend(vars.resolve_game_args(&game_args));

        if ctx.server.autoconnect {
            let (host, port) = ctx.server.host_and_port();
            args.extend(["--server".into(), host.to_string(), "--port".into(), port.to_string()]);
        }

        let command = GameCommand {
            program: ctx.java_executable.to_path_buf(),
            args,
            current_dir: ctx.game_dir.clone(),
            env: native_library_env(&natives_dir),
        };
        debug!("Command (copy/paste): {}", command.display_for_logs());
        Ok(command)
    }
}

struct Placeholders<'a> {
    account: &'a AuthAccount,
    version_name: String,
    game_dir: String,
    assets_root: String,
    assets_index: String,
    natives_dir: String,
    libs_dir: String,
    classpath: String,
}

impl Placeholders<'_> {
    fn substitute(&self, arg: &str) -> String {
        arg.replace("${auth_player_name}", &self.account.display_name)
            .replace("${version_name}", &self.version_name)
            .replace("${game_directory}", &self.game_dir)
            .replace("${assets_root}", &self.assets_root)
            .replace("${game_assets}", &self.assets_root)
            .replace("${assets_index_name}", &self.assets_index)
            .replace("${auth_uuid}", &self.account.simple_uuid())
            .replace("${auth_access_token}", &self.account.access_token)
            .replace(
                "${auth_session}",
                &format!("token:{}:{}", self.account.access_token, self.account.simple_uuid()),
            )
            .replace("${user_type}", &self.account.user_type)
            .replace("${user_properties}", "{}")
            .replace("${version_type}", "release")
            .replace("${natives_directory}", &self.natives_dir)
            .replace("${library_directory}", &self.libs_dir)
            .replace("${classpath_separator}", classpath_separator())
            .replace("${classpath}", &self.classpath)
            .replace("${launcher_name}", LAUNCHER_NAME)
            .replace("${launcher_version}", LAUNCHER_VERSION)
    }

    fn resolve_jvm_args(&self, raw_args: &[String]) -> Vec<String> {
        let mut resolved = Vec::new();
        let mut i = 0;
        while i < raw_args.len() {
            let arg = &raw_args[i];
            // The classpath is always injected separately.
            if arg == "-cp" || arg == "-classpath" || arg == "--class-path" {
                i += 2;
                continue;
            }
            self.push_resolved(&mut resolved, arg);
            i += 1;
        }
        resolved
    }

    fn resolve_game_args(&self, raw_args: &[String]) -> Vec<String> {
        let mut resolved = Vec::new();
        for arg in raw_args {
            self.push_resolved(&mut resolved, arg);
        }
        resolved
    }

    /// Unresolvable placeholders are dropped together with their option.
    fn push_resolved(&self, out: &mut Vec<String>, arg: &str) {
        let value = self.substitute(arg);
        if value.contains("${") {
            debug!("Dropping unresolved argument {}", arg);
            drop_dangling_option(out);
        } else {
            out.push(value);
        }
    }
}

fn build_classpath(
    version: &VersionDescriptor,
    loader: &VersionDescriptor,
    libs_dir: &Path,
    common_dir: &Path,
    version_id: &str,
) -> LauncherResult<String> {
    let mut entries: Vec<PathBuf> = loader.classpath_entries(libs_dir);
    entries.extend(version.classpath_entries(libs_dir));
    entries.push(
        common_dir
            .join("versions")
            .join(version_id)
            .join(format!("{}.jar", version_id)),
    );

    let mut seen = HashSet::new();
    let entries: Vec<String> = entries
        .iter()
        .map(|entry| path_str(entry))
        .filter(|entry| seen.insert(entry.clone()))
        .collect();

    if entries.is_empty() {
        return Err(LauncherError::LaunchArguments("classpath is empty".into()));
    }
    Ok(entries.join(classpath_separator()))
}

fn drop_dangling_option(args: &mut Vec<String>) {
    if args.last().is_some_and(|last| last.starts_with('-')) {
        let _ = args.pop();
    }
}

fn classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn native_library_env(natives_dir: &Path) -> Vec<(String, String)> {
    let var = if cfg!(target_os = "windows") {
        "PATH"
    } else if cfg!(target_os = "macos") {
        "DYLD_LIBRARY_PATH"
    } else {
        "LD_LIBRARY_PATH"
    };
    vec![(var.to_string(), append_env_path(var, &path_str(natives_dir)))]
}

fn append_env_path(var_name: &str, value: &str) -> String {
    let separator = if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    };
    match std::env::var(var_name) {
        Ok(existing) if !existing.trim().is_empty() => {
            format!("{}{}{}", value, separator, existing)
        }
        _ => value.to_string(),
    }
}

fn configure_platform_spawn(cmd: &mut Command) {
    #[cfg(target_os = "windows")]
    {
        const CREATE_NEW_CONSOLE: u32 = 0x00000010;
        cmd.creation_flags(CREATE_NEW_CONSOLE);
        cmd.env_remove("WT_SESSION");
        cmd.env_remove("TERM");
    }
    #[cfg(not(target_os = "windows"))]
    let _ = cmd;
}

fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '=')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}
