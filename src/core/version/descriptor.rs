// ─── Version Descriptor ───
// Typed view of the version and mod-loader JSON the asset worker resolves.
// Only what the command line needs: main class, libraries, arguments and
// the asset index id.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDescriptor {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub libraries: Vec<Library>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexRef>,
    /// Pre-1.7 descriptors name the index here instead.
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    /// Single argument string used up to 1.12.
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssetIndexRef {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<Argument>,
    #[serde(default)]
    pub jvm: Vec<Argument>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Argument {
    Plain(String),
    Conditional {
        #[serde(default)]
        rules: Vec<Rule>,
        value: ArgumentValue,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
pub struct Library {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub natives: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<ArtifactRef>,
}

#[derive(Debug, Deserialize)]
pub struct ArtifactRef {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsMatcher>,
    /// Launcher features (demo mode, custom resolution). Never enabled here.
    #[serde(default)]
    pub features: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Deserialize)]
pub struct OsMatcher {
    #[serde(default)]
    pub name: Option<String>,
}

impl Rule {
    fn applies(&self) -> bool {
        if self.features.is_some() {
            return false;
        }
        self.os
            .as_ref()
            .and_then(|os| os.name.as_deref())
            .is_none_or(|name| name == os_name())
    }
}

/// An empty rule list allows; otherwise the last applicable rule decides,
/// starting from disallowed.
pub fn rules_allow(rules: &[Rule]) -> bool {
    if rules.is_empty() {
        return true;
    }
    rules
        .iter()
        .filter(|rule| rule.applies())
        .fold(false, |_, rule| rule.action == RuleAction::Allow)
}

fn os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

impl Argument {
    fn values(&self) -> Vec<String> {
        match self {
            Argument::Plain(value) => vec![value.clone()],
            Argument::Conditional { rules, value } if rules_allow(rules) => match value {
                ArgumentValue::One(value) => vec![value.clone()],
                ArgumentValue::Many(values) => values.clone(),
            },
            Argument::Conditional { .. } => Vec::new(),
        }
    }
}

impl Library {
    /// Natives-only entries are unpacked by the worker, never put on the
    /// classpath.
    fn is_natives_only(&self) -> bool {
        self.natives.is_some()
            && self
                .downloads
                .as_ref()
                .is_none_or(|downloads| downloads.artifact.is_none())
    }

    /// Jar location below the libraries directory: the declared artifact
    /// path, else the Maven layout of `name`.
    pub fn relative_path(&self) -> Option<PathBuf> {
        match self.downloads.as_ref().and_then(|d| d.artifact.as_ref()) {
            Some(artifact) => Some(PathBuf::from(&artifact.path)),
            None => maven_path(&self.name),
        }
    }
}

/// `group:artifact:version[:classifier][@ext]` to
/// `group/path/artifact/version/artifact-version[-classifier].ext`.
pub fn maven_path(coordinate: &str) -> Option<PathBuf> {
    let (coordinate, ext) = coordinate.rsplit_once('@').unwrap_or((coordinate, "jar"));
    let parts: Vec<&str> = coordinate.split(':').collect();
    if parts.iter().any(|part| part.trim().is_empty()) {
        return None;
    }
    let (group, artifact, version, classifier) = match parts.as_slice() {
        [group, artifact, version] => (*group, *artifact, *version, None),
        [group, artifact, version, classifier] => (*group, *artifact, *version, Some(*classifier)),
        _ => return None,
    };

    let file = match classifier {
        Some(classifier) => format!("{artifact}-{version}-{classifier}.{ext}"),
        None => format!("{artifact}-{version}.{ext}"),
    };
    let mut path: PathBuf = group.split('.').collect();
    path.push(artifact);
    path.push(version);
    path.push(file);
    Some(path)
}

impl VersionDescriptor {
    /// Jars for every library allowed on this OS, in declaration order.
    pub fn classpath_entries(&self, libs_dir: &Path) -> Vec<PathBuf> {
        self.libraries
            .iter()
            .filter(|lib| rules_allow(&lib.rules) && !lib.is_natives_only())
            .filter_map(|lib| match lib.relative_path() {
                Some(path) => Some(libs_dir.join(path)),
                None => {
                    debug!("Skipping library with unparseable name: {}", lib.name);
                    None
                }
            })
            .collect()
    }

    pub fn asset_index_id(&self) -> Option<&str> {
        self.asset_index
            .as_ref()
            .map(|index| index.id.as_str())
            .or(self.assets.as_deref())
    }

    /// Game arguments allowed on this OS, raw placeholders included.
    pub fn game_args(&self) -> Vec<String> {
        match (&self.arguments, &self.minecraft_arguments) {
            (Some(arguments), _) => arguments.game.iter().flat_map(Argument::values).collect(),
            (None, Some(legacy)) => legacy.split_whitespace().map(str::to_string).collect(),
            (None, None) => Vec::new(),
        }
    }

    pub fn jvm_args(&self) -> Vec<String> {
        self.arguments
            .as_ref()
            .map(|arguments| arguments.jvm.iter().flat_map(Argument::values).collect())
            .unwrap_or_default()
    }
}
