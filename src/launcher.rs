//! Launch adapters turning a player's source into a running process.
//!
//! The orchestrator never inspects how a player program was prepared or
//! compiled; it only needs a child process with piped stdio per player. A
//! [`Language`] adapter owns that per-language recipe — stage the program
//! into a scratch directory, compile it if the language needs it, and
//! produce the command to run — and a [`LanguageRegistry`] resolves
//! language identifiers to adapters at startup.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context};
use tracing::{info, instrument};

/// Per-language recipe for getting a player program running.
pub trait Language {
    /// Short identifier the registry resolves, e.g. `"native"`.
    fn slug(&self) -> &str;

    /// Stage the program into a scratch directory.
    ///
    /// The default copies the program file into a fresh directory under
    /// the system temp dir, named after the match.
    fn prepare(&self, match_id: &str, program: &Path) -> anyhow::Result<PathBuf> {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let staging = std::env::temp_dir().join(format!("arena-{match_id}-{nonce}"));
        fs::create_dir_all(&staging)
            .with_context(|| format!("creating staging directory {}", staging.display()))?;

        let file_name = program
            .file_name()
            .with_context(|| format!("{} has no file name", program.display()))?;
        fs::copy(program, staging.join(file_name))
            .with_context(|| format!("staging {}", program.display()))?;
        Ok(staging)
    }

    /// Compile the staged program, when the language needs a compile step.
    fn compile(&self, match_id: &str, program: &Path, staging: &Path) -> anyhow::Result<()>;

    /// The command that runs the staged program.
    fn command(&self, match_id: &str, program: &Path, staging: &Path)
        -> anyhow::Result<Command>;

    /// Stage, compile and spawn the program with piped stdio.
    ///
    /// This is the one entry point the orchestrator side uses; stderr is
    /// discarded so player diagnostics cannot garble the protocol.
    #[instrument(skip(self, program), fields(language = self.slug()))]
    fn launch(&self, match_id: &str, program: &Path) -> anyhow::Result<Child> {
        let staging = self.prepare(match_id, program)?;
        self.compile(match_id, program, &staging)
            .with_context(|| format!("compiling {}", program.display()))?;

        let mut command = self.command(match_id, program, &staging)?;
        info!(?command, "starting player program");
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("starting player program {}", program.display()))
    }
}

/// Adapter for precompiled executables: no compile step, the staged file
/// runs as-is.
#[derive(Debug, Default)]
pub struct NativeLanguage;

impl Language for NativeLanguage {
    fn slug(&self) -> &str {
        "native"
    }

    fn compile(&self, _match_id: &str, _program: &Path, _staging: &Path) -> anyhow::Result<()> {
        Ok(())
    }

    fn command(
        &self,
        _match_id: &str,
        program: &Path,
        staging: &Path,
    ) -> anyhow::Result<Command> {
        let file_name = program
            .file_name()
            .with_context(|| format!("{} has no file name", program.display()))?;
        Ok(Command::new(staging.join(file_name)))
    }
}

/// Adapter for interpreted languages: the staged source runs under a named
/// interpreter.
#[derive(Debug)]
pub struct ScriptLanguage {
    slug: String,
    interpreter: String,
}

impl ScriptLanguage {
    /// Adapter registered under `slug`, running programs with
    /// `interpreter`.
    pub fn new(slug: impl Into<String>, interpreter: impl Into<String>) -> Self {
        ScriptLanguage {
            slug: slug.into(),
            interpreter: interpreter.into(),
        }
    }
}

impl Language for ScriptLanguage {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn compile(&self, _match_id: &str, _program: &Path, _staging: &Path) -> anyhow::Result<()> {
        Ok(())
    }

    fn command(
        &self,
        _match_id: &str,
        program: &Path,
        staging: &Path,
    ) -> anyhow::Result<Command> {
        let file_name = program
            .file_name()
            .with_context(|| format!("{} has no file name", program.display()))?;
        let mut command = Command::new(&self.interpreter);
        command.arg(staging.join(file_name));
        Ok(command)
    }
}

/// Maps language identifiers to launch adapters.
#[derive(Default)]
pub struct LanguageRegistry {
    languages: BTreeMap<String, Box<dyn Language + Send + Sync>>,
}

impl LanguageRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        LanguageRegistry::default()
    }

    /// Registry with the shipped adapters: `native`, `python`
    /// (`python3`) and `javascript` (`node`).
    pub fn builtin() -> Self {
        let mut registry = LanguageRegistry::new();
        registry.register(NativeLanguage);
        registry.register(ScriptLanguage::new("python", "python3"));
        registry.register(ScriptLanguage::new("javascript", "node"));
        registry
    }

    /// Register `language` under its slug, replacing any previous entry.
    pub fn register(&mut self, language: impl Language + Send + Sync + 'static) {
        self.languages
            .insert(language.slug().to_owned(), Box::new(language));
    }

    /// The adapter registered under `slug`.
    pub fn get(&self, slug: &str) -> anyhow::Result<&(dyn Language + Send + Sync)> {
        match self.languages.get(slug) {
            Some(language) => Ok(language.as_ref()),
            None => bail!("no language registered under '{slug}'"),
        }
    }

    /// Registered language identifiers, in stable order.
    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }
}
