//! Employer and bank reference data, loaded from JSON and swappable at runtime.

use arc_swap::ArcSwap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ports::{Bank, Establishment, ReferenceData};

#[derive(Debug, Clone, Deserialize)]
pub struct Annexures {
    /// Registration number used for establishments that do not carry their own.
    pub default_lin: String,
    #[serde(default)]
    pub establishments: Vec<Establishment>,
    #[serde(default)]
    pub banks: Vec<Bank>,
}

impl Annexures {
    fn check(&self) -> anyhow::Result<()> {
        if self.default_lin.trim().is_empty() {
            anyhow::bail!("registry default_lin must not be empty");
        }
        for (i, bank) in self.banks.iter().enumerate() {
            if self.banks[..i].iter().any(|other| other.name == bank.name) {
                anyhow::bail!("bank '{}' is listed twice", bank.name);
            }
        }
        Ok(())
    }
}

pub struct ReferenceRegistry {
    inner: ArcSwap<Annexures>,
    source: Option<PathBuf>,
}

impl ReferenceRegistry {
    pub fn new(annexures: Annexures) -> anyhow::Result<Self> {
        annexures.check()?;
        Ok(Self {
            inner: ArcSwap::from_pointee(annexures),
            source: None,
        })
    }

    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let annexures: Annexures = serde_json::from_str(raw)?;
        Self::new(annexures)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let annexures = read_annexures(path)?;
        let mut registry = Self::new(annexures)?;
        registry.source = Some(path.to_path_buf());
        tracing::info!(
            path = %path.display(),
            establishments = registry.inner.load().establishments.len(),
            banks = registry.inner.load().banks.len(),
            "reference registry loaded"
        );
        Ok(registry)
    }

    /// Re-reads the source file. The previous data stays in place on error.
    pub fn reload(&self) -> anyhow::Result<()> {
        let Some(path) = self.source.as_deref() else {
            anyhow::bail!("registry was not loaded from a file");
        };
        let annexures = read_annexures(path)?;
        annexures.check()?;
        self.inner.store(Arc::new(annexures));
        tracing::info!(path = %path.display(), "reference registry reloaded");
        Ok(())
    }
}

fn read_annexures(path: &Path) -> anyhow::Result<Annexures> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read registry {}: {}", path.display(), e))?;
    let annexures = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("invalid registry {}: {}", path.display(), e))?;
    Ok(annexures)
}

impl ReferenceData for ReferenceRegistry {
    fn establishment(&self, employer_id: &str) -> Option<Establishment> {
        self.inner
            .load()
            .establishments
            .iter()
            .find(|e| e.establishment_id == employer_id)
            .cloned()
    }

    fn bank(&self, name: &str) -> Option<Bank> {
        self.inner
            .load()
            .banks
            .iter()
            .find(|b| b.name == name)
            .cloned()
    }

    fn banks(&self) -> Vec<Bank> {
        self.inner.load().banks.clone()
    }

    fn default_lin(&self) -> String {
        self.inner.load().default_lin.clone()
    }
}
