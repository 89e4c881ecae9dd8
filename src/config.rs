//! Configuration discovery and merging
//!
//! Settings come from several places, lowest priority first:
//!
//! 1. `.editorconfig` files from the formatted file's directory upwards
//! 2. `[tool.beautysh]` in `pyproject.toml`
//! 3. `.beautyshrc`
//! 4. an explicit `--config` file
//! 5. command line flags
//!
//! Each source yields a [`ConfigLayer`] in which unset keys stay `None`, so
//! merging is a field-by-field override.

use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::formatter::style::{FormatOptions, FunctionStyle, StyleError, VariableStyle};

pub const PYPROJECT_FILE: &str = "pyproject.toml";
pub const BEAUTYSHRC_FILE: &str = ".beautyshrc";
pub const EDITORCONFIG_FILE: &str = ".editorconfig";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid indent size {0} (must be at least 1)")]
    IndentSize(i64),
    #[error(transparent)]
    Style(#[from] StyleError),
}

/// Settings from one source
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConfigLayer {
    pub indent_size: Option<i64>,
    pub tab: Option<bool>,
    pub backup: Option<bool>,
    pub check: Option<bool>,
    pub force_function_style: Option<String>,
    pub variable_style: Option<String>,
}

/// Fully resolved settings for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub format: FormatOptions,
    pub backup: bool,
    pub check: bool,
}

impl ConfigLayer {
    /// `over` wins wherever it sets a key
    pub fn merge(self, over: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            indent_size: over.indent_size.or(self.indent_size),
            tab: over.tab.or(self.tab),
            backup: over.backup.or(self.backup),
            check: over.check.or(self.check),
            force_function_style: over.force_function_style.or(self.force_function_style),
            variable_style: over.variable_style.or(self.variable_style),
        }
    }

    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        let indent_size = match self.indent_size {
            Some(size) if size < 1 => return Err(ConfigError::IndentSize(size)),
            Some(size) => size as usize,
            None => FormatOptions::default().indent_size,
        };
        let use_tabs = self.tab.unwrap_or(false);
        let function_style = self
            .force_function_style
            .as_deref()
            .map(str::parse::<FunctionStyle>)
            .transpose()?;
        let variable_style = self
            .variable_style
            .as_deref()
            .map(str::parse::<VariableStyle>)
            .transpose()?;

        Ok(Settings {
            format: FormatOptions {
                indent_size: if use_tabs { 1 } else { indent_size },
                use_tabs,
                function_style,
                variable_style,
            },
            backup: self.backup.unwrap_or(false),
            check: self.check.unwrap_or(false),
        })
    }
}

// =============================================================================
// TOML SOURCES
// =============================================================================

fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

fn into_layer(path: &Path, table: toml::Table) -> Result<ConfigLayer, ConfigError> {
    toml::Value::Table(table)
        .try_into()
        .map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
}

fn sub_table<'t>(table: &'t toml::Table, key: &str) -> Option<&'t toml::Table> {
    match table.get(key) {
        Some(toml::Value::Table(inner)) if !inner.is_empty() => Some(inner),
        _ => None,
    }
}

/// Read a config file: `[tool.beautysh]` if present, else `[beautysh]`,
/// else the top-level keys
pub fn load_file(path: &Path) -> Result<ConfigLayer, ConfigError> {
    let table = read_table(path)?;
    let section = sub_table(&table, "tool")
        .and_then(|tool| sub_table(tool, "beautysh"))
        .or_else(|| sub_table(&table, "beautysh"))
        .cloned()
        .unwrap_or(table);
    let layer = into_layer(path, section)?;
    debug!(path = %path.display(), ?layer, "loaded configuration");
    Ok(layer)
}

/// `[tool.beautysh]` of `pyproject.toml` in `dir`
pub fn from_pyproject(dir: &Path) -> ConfigLayer {
    let path = dir.join(PYPROJECT_FILE);
    if !path.is_file() {
        return ConfigLayer::default();
    }
    let result = read_table(&path).and_then(|table| {
        match sub_table(&table, "tool").and_then(|tool| sub_table(tool, "beautysh")) {
            Some(section) => into_layer(&path, section.clone()),
            None => Ok(ConfigLayer::default()),
        }
    });
    discovered(result)
}

/// `.beautyshrc` in `dir`
pub fn from_beautyshrc(dir: &Path) -> ConfigLayer {
    let path = dir.join(BEAUTYSHRC_FILE);
    if !path.is_file() {
        return ConfigLayer::default();
    }
    discovered(load_file(&path))
}

/// Files found by discovery never abort a run
fn discovered(result: Result<ConfigLayer, ConfigError>) -> ConfigLayer {
    result.unwrap_or_else(|error| {
        warn!("{}", error);
        ConfigLayer::default()
    })
}

// =============================================================================
// EDITORCONFIG
// =============================================================================

#[derive(Debug, Default)]
struct EditorConfigFile {
    root: bool,
    sections: Vec<(String, Vec<(String, String)>)>,
}

fn parse_editorconfig(content: &str) -> EditorConfigFile {
    let mut file = EditorConfigFile::default();
    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            file.sections.push((header.to_string(), Vec::new()));
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim().to_string();
        match file.sections.last_mut() {
            Some((_, properties)) => properties.push((key, value)),
            None if key == "root" => file.root = value.eq_ignore_ascii_case("true"),
            None => {}
        }
    }
    file
}

/// Expand `{a,b}` alternatives into separate patterns
fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };
    let mut depth = 0;
    let mut close = None;
    for (i, c) in pattern[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(open + i);
                    break;
                }
            }
            _ => {}
        }
    }
    let Some(close) = close else {
        return vec![pattern.to_string()];
    };

    let mut alternatives = Vec::new();
    let mut depth = 0;
    let mut start = open + 1;
    for (i, c) in pattern[open + 1..close].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            ',' if depth == 0 => {
                alternatives.push(&pattern[start..open + 1 + i]);
                start = open + 2 + i;
            }
            _ => {}
        }
    }
    alternatives.push(&pattern[start..close]);
    if alternatives.len() < 2 {
        return vec![pattern.to_string()];
    }

    let (head, tail) = (&pattern[..open], &pattern[close + 1..]);
    alternatives
        .into_iter()
        .flat_map(|alt| expand_braces(&format!("{}{}{}", head, alt, tail)))
        .collect()
}

/// Does a section header apply to `relative`, the file path relative to the
/// directory holding the `.editorconfig`? Headers without a slash match the
/// file name at any depth.
fn section_matches(header: &str, relative: &Path) -> bool {
    let options = MatchOptions {
        require_literal_separator: true,
        ..MatchOptions::new()
    };
    expand_braces(header).iter().any(|candidate| {
        let (candidate, target) = if candidate.contains('/') {
            (candidate.trim_start_matches('/'), relative)
        } else {
            match relative.file_name() {
                Some(name) => (candidate.as_str(), Path::new(name)),
                None => return false,
            }
        };
        Pattern::new(candidate).map_or(false, |p| p.matches_path_with(target, options))
    })
}

/// Indentation settings `.editorconfig` files give `file`
pub fn from_editorconfig(file: &Path) -> ConfigLayer {
    let mut found = Vec::new();
    let mut dir = file.parent();
    while let Some(current) = dir {
        let path = current.join(EDITORCONFIG_FILE);
        if path.is_file() {
            match fs::read_to_string(&path) {
                Ok(content) => {
                    let parsed = parse_editorconfig(&content);
                    let root = parsed.root;
                    found.push((current.to_path_buf(), parsed));
                    if root {
                        break;
                    }
                }
                Err(error) => warn!(path = %path.display(), "could not read: {}", error),
            }
        }
        dir = current.parent();
    }

    // Nearer files and later sections win
    let mut layer = ConfigLayer::default();
    for (dir, parsed) in found.iter().rev() {
        let Ok(relative) = file.strip_prefix(dir) else {
            continue;
        };
        for (header, properties) in &parsed.sections {
            if !section_matches(header, relative) {
                continue;
            }
            for (key, value) in properties {
                match key.as_str() {
                    "indent_style" => match value.to_ascii_lowercase().as_str() {
                        "tab" => layer.tab = Some(true),
                        "space" => layer.tab = Some(false),
                        _ => {}
                    },
                    "indent_size" => match value.parse::<i64>() {
                        Ok(size) => layer.indent_size = Some(size),
                        Err(_) => debug!(value = %value, "ignoring non-numeric indent_size"),
                    },
                    _ => {}
                }
            }
        }
    }
    layer
}

/// Everything discovery finds for `file` (None for stdin) with `dir` as
/// the working directory
pub fn discover(file: Option<&Path>, dir: &Path) -> ConfigLayer {
    let editorconfig = match file {
        Some(file) => from_editorconfig(&dir.join(file)),
        None => ConfigLayer::default(),
    };
    let merged = editorconfig
        .merge(from_pyproject(dir))
        .merge(from_beautyshrc(dir));
    debug!(?merged, "discovered configuration");
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_merge_priority() {
        let low = ConfigLayer {
            indent_size: Some(2),
            tab: Some(true),
            ..Default::default()
        };
        let high = ConfigLayer {
            indent_size: Some(8),
            ..Default::default()
        };
        let merged = low.merge(high);
        assert_eq!(merged.indent_size, Some(8));
        assert_eq!(merged.tab, Some(true));
    }

    #[test]
    fn test_resolve() {
        let settings = ConfigLayer::default().resolve().unwrap();
        assert_eq!(settings.format, FormatOptions::default());
        assert!(!settings.backup && !settings.check);

        let layer = ConfigLayer {
            indent_size: Some(2),
            tab: Some(true),
            force_function_style: Some("paronly".to_string()),
            variable_style: Some("braces".to_string()),
            ..Default::default()
        };
        let settings = layer.resolve().unwrap();
        assert_eq!(settings.format.indent_size, 1);
        assert!(settings.format.use_tabs);
        assert_eq!(settings.format.function_style, Some(FunctionStyle::ParensOnly));
        assert_eq!(settings.format.variable_style, Some(VariableStyle::Braces));
    }

    #[test]
    fn test_resolve_rejects_bad_values() {
        let zero = ConfigLayer {
            indent_size: Some(0),
            ..Default::default()
        };
        assert!(matches!(zero.resolve(), Err(ConfigError::IndentSize(0))));

        let style = ConfigLayer {
            force_function_style: Some("lambda".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            style.resolve(),
            Err(ConfigError::Style(StyleError::Function(_)))
        ));
    }

    #[test]
    fn test_load_file_sections() {
        let dir = TempDir::new().unwrap();
        let tool = write(dir.path(), "a.toml", "[tool.beautysh]\nindent_size = 3\n");
        assert_eq!(load_file(&tool).unwrap().indent_size, Some(3));

        let plain = write(dir.path(), "b.toml", "[beautysh]\ntab = true\n");
        assert_eq!(load_file(&plain).unwrap().tab, Some(true));

        let root = write(
            dir.path(),
            "c.toml",
            "force_function_style = \"fnonly\"\nunknown_key = 1\n",
        );
        assert_eq!(
            load_file(&root).unwrap().force_function_style.as_deref(),
            Some("fnonly")
        );
    }

    #[test]
    fn test_load_file_errors() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_file(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
        let bad = write(dir.path(), "bad.toml", "indent_size = [\n");
        assert!(matches!(load_file(&bad), Err(ConfigError::Toml { .. })));
    }

    #[test]
    fn test_pyproject_needs_tool_section() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), PYPROJECT_FILE, "[project]\nname = \"x\"\nindent_size = 9\n");
        assert_eq!(from_pyproject(dir.path()), ConfigLayer::default());

        write(dir.path(), PYPROJECT_FILE, "[tool.beautysh]\nindent_size = 2\n");
        assert_eq!(from_pyproject(dir.path()).indent_size, Some(2));
    }

    #[test]
    fn test_broken_discovered_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), BEAUTYSHRC_FILE, "not toml at all [[[");
        assert_eq!(from_beautyshrc(dir.path()), ConfigLayer::default());
    }

    #[test]
    fn test_expand_braces() {
        assert_eq!(expand_braces("*.sh"), vec!["*.sh"]);
        assert_eq!(expand_braces("*.{sh,bash}"), vec!["*.sh", "*.bash"]);
        assert_eq!(
            expand_braces("{a,b}/{c,d}"),
            vec!["a/c", "a/d", "b/c", "b/d"]
        );
        assert_eq!(expand_braces("{single}"), vec!["{single}"]);
    }

    #[test]
    fn test_section_matching() {
        assert!(section_matches("*", Path::new("deep/dir/x.sh")));
        assert!(section_matches("*.{sh,bash}", Path::new("deep/x.bash")));
        assert!(!section_matches("*.py", Path::new("x.sh")));
        assert!(section_matches("scripts/*.sh", Path::new("scripts/x.sh")));
        assert!(!section_matches("scripts/*.sh", Path::new("other/x.sh")));
        assert!(section_matches("/scripts/**", Path::new("scripts/a/b.sh")));
    }

    #[test]
    fn test_editorconfig_lookup() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            EDITORCONFIG_FILE,
            "root = true\n\n[*]\nindent_style = space\nindent_size = 4\n\n[*.sh]\nindent_size = 2\n",
        );
        write(
            dir.path(),
            "tabs/.editorconfig",
            "[*.sh]\nindent_style = tab\n",
        );
        let plain = write(dir.path(), "run.sh", "");
        let tabbed = write(dir.path(), "tabs/run.sh", "");
        let other = write(dir.path(), "notes.txt", "");

        let layer = from_editorconfig(&plain);
        assert_eq!(layer.indent_size, Some(2));
        assert_eq!(layer.tab, Some(false));

        let layer = from_editorconfig(&tabbed);
        assert_eq!(layer.indent_size, Some(2));
        assert_eq!(layer.tab, Some(true));

        assert_eq!(from_editorconfig(&other).indent_size, Some(4));
    }

    #[test]
    fn test_discover_order() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), EDITORCONFIG_FILE, "root = true\n[*.sh]\nindent_size = 2\nindent_style = tab\n");
        write(dir.path(), PYPROJECT_FILE, "[tool.beautysh]\nindent_size = 3\n");
        write(dir.path(), BEAUTYSHRC_FILE, "indent_size = 5\n");

        let layer = discover(Some(Path::new("x.sh")), dir.path());
        assert_eq!(layer.indent_size, Some(5));
        assert_eq!(layer.tab, Some(true));

        let stdin = discover(None, dir.path());
        assert_eq!(stdin.indent_size, Some(5));
        assert_eq!(stdin.tab, None);
    }
}
