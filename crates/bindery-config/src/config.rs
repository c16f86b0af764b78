//! Generator configuration types (bindery.toml format).

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the configuration file looked up in the input root.
pub const CONFIG_FILE_NAME: &str = "bindery.toml";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BinderyConfig {
    /// Which headers (paths relative to the input root) are processed.
    pub headers: RulesConfig,

    /// Which symbols (fully-qualified names) are kept.
    pub symbols: RulesConfig,

    /// Arguments passed through to the parser.
    pub compiler: CompilerConfig,

    /// Naming conventions of the wrapped library.
    pub generator: GeneratorConfig,
}

/// Include/exclude wildcard rules.
///
/// An empty include list includes everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RulesConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

/// Parser settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// C++ standard (e.g., "c++17", "c++20").
    pub std: Option<String>,

    /// Include directories.
    pub includes: Vec<String>,

    /// Preprocessor definitions.
    pub defines: Vec<String>,

    /// Additional parser flags.
    pub cflags: Vec<String>,
}

/// Lowest access level a property accessor may have.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyAccess {
    #[default]
    Public,
    Protected,
}

/// Library conventions the passes key on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Base class whose subclasses use counted ownership.
    pub refcounted_root: String,
    pub add_ref: String,
    pub release_ref: String,

    /// Type of event identifiers and event parameter names.
    pub string_hash_type: String,

    /// Types accepted as string constants (besides `const char*`).
    pub string_types: Vec<String>,

    /// Trait template whose specializations mark an enum as a bitmask.
    pub flag_marker: String,

    /// Bitmask wrapper template (`FlagSet<E>`).
    pub flagset_template: String,

    pub event_prefix: String,
    pub param_prefix: String,

    /// Wildcards of namespace-scope constants never exported.
    pub excluded_constants: Vec<String>,

    /// Types treated as known even though no definition is parsed.
    pub opaque_types: Vec<String>,

    /// Namespace names removed wherever they appear.
    pub trim_namespaces: Vec<String>,

    pub property_access: PropertyAccess,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            refcounted_root: "Urho3D::RefCounted".to_string(),
            add_ref: "AddRef".to_string(),
            release_ref: "ReleaseRef".to_string(),
            string_hash_type: "Urho3D::StringHash".to_string(),
            string_types: vec![
                "Urho3D::String".to_string(),
                "ea::string".to_string(),
                "std::string".to_string(),
            ],
            flag_marker: "Urho3D::IsFlagSet".to_string(),
            flagset_template: "Urho3D::FlagSet".to_string(),
            event_prefix: "E_".to_string(),
            param_prefix: "P_".to_string(),
            excluded_constants: Vec::new(),
            opaque_types: Vec::new(),
            trim_namespaces: vec!["Detail".to_string(), "detail".to_string(), "Impl".to_string()],
            property_access: PropertyAccess::Public,
        }
    }
}

impl BinderyConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_str(&content)
    }

    pub fn parse_str(content: &str) -> Result<Self> {
        let config: BinderyConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Use `explicit` if given, else `<input_root>/bindery.toml` if present,
    /// else defaults.
    pub fn discover(explicit: Option<&Path>, input_root: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            debug!(path = %path.display(), "loading configuration");
            return Self::from_file(path);
        }
        let candidate = input_root.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            debug!(path = %candidate.display(), "loading configuration");
            Self::from_file(&candidate)
        } else {
            debug!("no {CONFIG_FILE_NAME} found, using defaults");
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        let g = &self.generator;
        let required = [
            ("refcounted_root", &g.refcounted_root),
            ("string_hash_type", &g.string_hash_type),
            ("flag_marker", &g.flag_marker),
            ("flagset_template", &g.flagset_template),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("generator.{key} must not be empty")));
            }
        }
        if g.event_prefix.is_empty() {
            return Err(ConfigError::Validation(
                "generator.event_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Parser arguments from the `[compiler]` section, in a fixed order:
    /// standard, include paths, defines, then raw flags.
    pub fn compiler_args(&self, root: &Path) -> Vec<String> {
        let c = &self.compiler;
        let mut args = Vec::new();
        if let Some(std) = &c.std {
            args.push(format!("-std={std}"));
        }
        for include in &c.includes {
            let path = PathBuf::from(include);
            let path = if path.is_relative() { root.join(path) } else { path };
            args.push(format!("-I{}", path.display()));
        }
        args.extend(c.defines.iter().map(|d| format!("-D{d}")));
        args.extend(c.cflags.iter().cloned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[symbols]
include = ["Urho3D::**"]
exclude = ["Urho3D::Detail::**"]

[compiler]
std = "c++17"
includes = ["Source", "/usr/include/bullet"]
defines = ["URHO3D_STATIC"]
cflags = ["-Wno-pragma-once-outside-header"]

[generator]
property_access = "protected"
excluded_constants = ["Urho3D::M_*"]
        "#;

        let config = BinderyConfig::parse_str(toml).unwrap();
        assert_eq!(config.symbols.include, vec!["Urho3D::**"]);
        assert_eq!(config.compiler.std.as_deref(), Some("c++17"));
        assert_eq!(config.generator.property_access, PropertyAccess::Protected);
        assert_eq!(config.generator.refcounted_root, "Urho3D::RefCounted");

        let args = config.compiler_args(Path::new("/work"));
        assert_eq!(
            args,
            vec![
                "-std=c++17",
                "-I/work/Source",
                "-I/usr/include/bullet",
                "-DURHO3D_STATIC",
                "-Wno-pragma-once-outside-header",
            ]
        );
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = BinderyConfig::parse_str("[generator]\nrefcount_root = \"X\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml(_)));
    }

    #[test]
    fn test_empty_required_value_is_rejected() {
        let err = BinderyConfig::parse_str("[generator]\nflag_marker = \"\"\n").unwrap_err();
        assert!(err.to_string().contains("flag_marker"));
    }

    #[test]
    fn test_discover() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(BinderyConfig::discover(None, dir.path()).unwrap(), BinderyConfig::default());

        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[generator]\nrefcounted_root = \"Engine::Object\"\n",
        )
        .unwrap();
        let config = BinderyConfig::discover(None, dir.path()).unwrap();
        assert_eq!(config.generator.refcounted_root, "Engine::Object");

        let missing = dir.path().join("missing.toml");
        let err = BinderyConfig::discover(Some(&missing), dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
