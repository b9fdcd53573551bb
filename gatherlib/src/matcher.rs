//! Ignore rule compilation and matching.
//!
//! Gitignore lines are compiled once into a [`Gitignore`] set. A path is
//! tested prefix by prefix from the root down; at each depth the last
//! matching line decides, so a later `!pattern` re-includes what an earlier
//! line excluded. The path is ignored as soon as any prefix resolves to an
//! exclusion, which keeps a re-include from escaping an excluded parent.
//!
//! Extra user patterns are independent shell globs tested against the base
//! name only.

use std::fs;
use std::io;
use std::path::Path;

use glob::Pattern;
use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::error::GatherError;
use crate::Result;

/// Name of the ignore file read from the walk root.
pub const GITIGNORE_FILE: &str = ".gitignore";

fn compile_glob(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|e| GatherError::InvalidGlob {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Compile gitignore lines against relative paths.
///
/// The builder root is `.` so that no walk-root prefix is ever stripped from
/// the paths handed to [`Gitignore::matched`].
fn compile_gitignore<I, S>(lines: I) -> Result<Gitignore>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut builder = GitignoreBuilder::new(".");
    for line in lines {
        let line = line.as_ref();
        builder
            .add_line(None, line)
            .map_err(|e| GatherError::InvalidGlob {
                pattern: line.to_string(),
                message: e.to_string(),
            })?;
    }
    builder.build().map_err(|e| GatherError::InvalidGlob {
        pattern: GITIGNORE_FILE.to_string(),
        message: e.to_string(),
    })
}

/// Compiled decision function over gitignore rules and extra patterns.
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    gitignore: Gitignore,
    extra: Vec<Pattern>,
    extra_files_only: bool,
}

impl Default for IgnoreMatcher {
    fn default() -> Self {
        Self::empty()
    }
}

impl IgnoreMatcher {
    /// A matcher that ignores nothing.
    pub fn empty() -> Self {
        Self {
            gitignore: Gitignore::empty(),
            extra: Vec::new(),
            extra_files_only: false,
        }
    }

    /// Compile gitignore lines and extra base-name globs.
    ///
    /// Blank lines and comments are skipped; a malformed glob in either set
    /// is an `InvalidGlob` error.
    pub fn compile<I, S>(
        gitignore_lines: I,
        extra_patterns: &[String],
        files_only: bool,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let gitignore = compile_gitignore(gitignore_lines)?;
        let extra = extra_patterns
            .iter()
            .map(|p| compile_glob(p))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            gitignore,
            extra,
            extra_files_only: files_only,
        })
    }

    /// Number of gitignore rules, exclusions and re-includes together.
    pub fn rule_count(&self) -> usize {
        self.gitignore.len()
    }

    /// True when neither gitignore rules nor extra patterns are present.
    pub fn is_empty(&self) -> bool {
        self.gitignore.is_empty() && self.extra.is_empty()
    }

    /// Decide whether a forward-slash relative path is ignored.
    ///
    /// The root (`""` or `"."`) is never ignored.
    pub fn is_ignored(&self, rel_path: &str, is_dir: bool) -> bool {
        let segments: Vec<&str> = rel_path
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        let Some(name) = segments.last() else {
            return false;
        };
        self.gitignore_matches(&segments, is_dir) || self.extra_matches(name, is_dir)
    }

    /// Hierarchical gitignore evaluation over every prefix of `segments`.
    ///
    /// Every proper prefix is a directory; only the full path takes `is_dir`.
    pub fn gitignore_matches(&self, segments: &[&str], is_dir: bool) -> bool {
        if self.gitignore.is_empty() {
            return false;
        }
        let mut prefix = String::new();
        for (depth, segment) in segments.iter().enumerate() {
            if depth > 0 {
                prefix.push('/');
            }
            prefix.push_str(segment);
            let prefix_is_dir = depth + 1 < segments.len() || is_dir;
            if self
                .gitignore
                .matched(Path::new(&prefix), prefix_is_dir)
                .is_ignore()
            {
                return true;
            }
        }
        false
    }

    /// Test the extra patterns against a base name.
    pub fn extra_matches(&self, name: &str, is_dir: bool) -> bool {
        if self.extra_files_only && is_dir {
            return false;
        }
        self.extra.iter().any(|p| p.matches(name))
    }
}

/// Read the `.gitignore` lines at `root`.
///
/// A missing file yields no lines; any other failure is an error.
pub fn load_gitignore(root: &Path) -> Result<Vec<String>> {
    let path = root.join(GITIGNORE_FILE);
    match fs::read_to_string(&path) {
        Ok(text) => Ok(text.lines().map(str::to_string).collect()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(GatherError::Gitignore { path, source }),
    }
}
