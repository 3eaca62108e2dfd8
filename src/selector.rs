//! Choice of a persisted model when the arff folder holds several.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::error::ConfigError;

/// Picks one model file out of several candidates.
pub trait ModelSelector {
    fn select(&mut self, candidates: &[PathBuf]) -> Result<PathBuf>;

    /// Whether the choice was made up front and must be honoured even when
    /// only one candidate exists.
    fn is_explicit(&self) -> bool {
        false
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Selects the model named on the command line.
pub struct ExplicitSelector {
    name: String,
}

impl ExplicitSelector {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl ModelSelector for ExplicitSelector {
    fn select(&mut self, candidates: &[PathBuf]) -> Result<PathBuf> {
        candidates
            .iter()
            .find(|path| {
                let name = file_name(path);
                name == self.name
                    || path.file_stem().is_some_and(|stem| stem == self.name.as_str())
            })
            .cloned()
            .ok_or_else(|| ConfigError::ModelNotFound(self.name.clone()).into())
    }

    fn is_explicit(&self) -> bool {
        true
    }
}

/// Lists the candidates and reads the chosen index.
pub struct PromptSelector<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptSelector<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> ModelSelector for PromptSelector<R, W> {
    fn select(&mut self, candidates: &[PathBuf]) -> Result<PathBuf> {
        writeln!(self.output, "Several trained models found:")?;
        for (idx, path) in candidates.iter().enumerate() {
            writeln!(self.output, "  {}: {}", idx, file_name(path))?;
        }

        loop {
            write!(self.output, "Choose a model [0-{}]: ", candidates.len() - 1)?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(ConfigError::InvalidSelection("end of input".to_string()).into());
            }
            match line.trim().parse::<usize>() {
                Ok(idx) if idx < candidates.len() => return Ok(candidates[idx].clone()),
                _ => writeln!(self.output, "Invalid choice '{}'", line.trim())?,
            }
        }
    }
}

/// Refuses to choose; used when nobody can answer a prompt.
pub struct NonInteractiveSelector {
    folder: String,
}

impl NonInteractiveSelector {
    pub fn new(folder: &Path) -> Self {
        Self {
            folder: folder.display().to_string(),
        }
    }
}

impl ModelSelector for NonInteractiveSelector {
    fn select(&mut self, candidates: &[PathBuf]) -> Result<PathBuf> {
        Err(ConfigError::AmbiguousModel {
            folder: self.folder.clone(),
            count: candidates.len(),
        }
        .into())
    }
}

/// Explicit name if given, else a stdin prompt when attached to a terminal,
/// else refusal.
pub fn default_selector(explicit: Option<&str>, folder: &Path) -> Box<dyn ModelSelector> {
    match explicit {
        Some(name) => Box::new(ExplicitSelector::new(name)),
        None if io::stdin().is_terminal() => {
            Box::new(PromptSelector::new(io::stdin().lock(), io::stdout()))
        }
        None => Box::new(NonInteractiveSelector::new(folder)),
    }
}

/// Resolves the model to evaluate among `candidates`.
///
/// A single candidate is returned without asking, unless the selector
/// carries an explicit choice that has to be checked.
pub fn decide(
    candidates: &[PathBuf],
    folder: &Path,
    selector: &mut dyn ModelSelector,
) -> Result<PathBuf> {
    match candidates {
        [] => Err(ConfigError::NoModel(folder.display().to_string()).into()),
        [only] if !selector.is_explicit() => Ok(only.clone()),
        _ => selector.select(candidates),
    }
}
