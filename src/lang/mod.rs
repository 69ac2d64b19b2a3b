//! Language registry.
//!
//! Static mapping from logical language keys to toolchain invocation recipes.
//! Built once at startup, read-only afterwards; aliasing ("py" -> "python3")
//! is resolved here, never downstream.

use crate::config::types::{Result, SandboxError};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::path::Path;

/// Toolchain recipe for one language. Command templates substitute
/// `{source}`, `{binary}` and `{workdir}` at session time.
#[derive(Clone, Copy, Debug)]
pub struct ToolchainSpec {
    /// Canonical language key
    pub key: &'static str,
    /// Filename the source is written under inside the workspace
    pub source_filename: &'static str,
    /// Compile command template; `None` for interpreted languages
    pub compile: Option<&'static [&'static str]>,
    /// Run command template
    pub run: &'static [&'static str],
}

impl ToolchainSpec {
    pub fn has_compile_stage(&self) -> bool {
        self.compile.is_some()
    }

    pub fn compile_command(&self, workdir: &Path) -> Option<Vec<String>> {
        self.compile.map(|template| substitute(template, self, workdir))
    }

    pub fn run_command(&self, workdir: &Path) -> Vec<String> {
        substitute(self.run, self, workdir)
    }
}

fn substitute(template: &[&str], spec: &ToolchainSpec, workdir: &Path) -> Vec<String> {
    let source = workdir.join(spec.source_filename);
    let binary = workdir.join("prog");
    template
        .iter()
        .map(|arg| {
            arg.replace("{source}", &source.to_string_lossy())
                .replace("{binary}", &binary.to_string_lossy())
                .replace("{workdir}", &workdir.to_string_lossy())
        })
        .collect()
}

static REGISTRY: Lazy<BTreeMap<&'static str, ToolchainSpec>> = Lazy::new(|| {
    let specs = [
        ToolchainSpec {
            key: "python3",
            source_filename: "prog.py",
            compile: None,
            run: &["/usr/bin/python3", "-B", "{source}"],
        },
        ToolchainSpec {
            key: "python2",
            source_filename: "prog.py",
            compile: None,
            run: &["/usr/bin/python2", "{source}"],
        },
        ToolchainSpec {
            key: "c",
            source_filename: "prog.c",
            compile: Some(&[
                "/usr/bin/gcc",
                "-Wall",
                "-std=c99",
                "-o",
                "{binary}",
                "{source}",
                "-lm",
            ]),
            run: &["{binary}"],
        },
        ToolchainSpec {
            key: "cpp",
            source_filename: "prog.cpp",
            compile: Some(&[
                "/usr/bin/g++",
                "-Wall",
                "-std=c++17",
                "-o",
                "{binary}",
                "{source}",
            ]),
            run: &["{binary}"],
        },
        // Convention: the public class must be named Main.
        ToolchainSpec {
            key: "java",
            source_filename: "Main.java",
            compile: Some(&["/usr/bin/javac", "-d", "{workdir}", "{source}"]),
            run: &["/usr/bin/java", "-cp", "{workdir}", "Main"],
        },
    ];

    specs.into_iter().map(|s| (s.key, s)).collect()
});

/// Human/legacy names accepted in addition to the canonical keys.
static ALIASES: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        ("py", "python3"),
        ("python", "python3"),
        ("c++", "cpp"),
        ("cxx", "cpp"),
        ("cc", "cpp"),
    ])
});

/// Resolve a language key (case-insensitive, alias-aware) to its toolchain.
pub fn resolve(language: &str) -> Result<&'static ToolchainSpec> {
    let key = language.trim().to_ascii_lowercase();
    let canonical = ALIASES.get(key.as_str()).copied().unwrap_or(key.as_str());
    REGISTRY
        .get(canonical)
        .ok_or_else(|| SandboxError::UnsupportedLanguage(language.to_string()))
}

/// All keys accepted by [`resolve`], canonical names and aliases, sorted.
pub fn supported_languages() -> Vec<String> {
    let mut keys: Vec<String> = REGISTRY.keys().map(|k| k.to_string()).collect();
    keys.extend(ALIASES.keys().map(|k| k.to_string()));
    keys.sort();
    keys
}
