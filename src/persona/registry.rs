//! Persona registry: catalog plus persisted enabled/priority settings.
//!
//! Settings are stored as a JSON document `{id: {enabled, priority}}` and
//! rewritten wholesale, via a temp file and atomic rename, after every
//! successful mutation.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};

use super::types::{PersonaBlueprint, PersonaCatalog, PersonaConfig, PersonaSettings};

/// Catalog of personas with their current settings.
pub struct PersonaRegistry {
    /// Blueprints in registration order.
    blueprints: Vec<Arc<PersonaBlueprint>>,

    /// Current settings, parallel to `blueprints`.
    settings: Vec<PersonaSettings>,

    /// Where settings are persisted; `None` keeps them in memory.
    state_path: Option<PathBuf>,
}

impl PersonaRegistry {
    /// In-memory registry over `catalog` with default settings.
    pub fn from_catalog(catalog: PersonaCatalog) -> Self {
        let settings = catalog
            .personas
            .iter()
            .map(|p| PersonaSettings {
                enabled: true,
                priority: p.priority,
            })
            .collect();

        Self {
            blueprints: catalog.personas.into_iter().map(Arc::new).collect(),
            settings,
            state_path: None,
        }
    }

    /// In-memory registry over the bundled catalog.
    pub fn bundled() -> Result<Self> {
        Ok(Self::from_catalog(PersonaCatalog::bundled()?))
    }

    /// Bundled catalog with settings persisted at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::load(PersonaCatalog::bundled()?, path))
    }

    /// Registry over `catalog`, applying any settings stored at `path`.
    ///
    /// A missing file leaves the defaults; an unreadable or corrupt file is
    /// logged and ignored.
    pub fn load(catalog: PersonaCatalog, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut registry = Self::from_catalog(catalog);

        match read_state(&path) {
            Ok(Some(stored)) => registry.apply_stored(stored),
            Ok(None) => debug!(path = %path.display(), "No persona state file, using defaults"),
            Err(e) => warn!(
                path = %path.display(),
                error = %e,
                "Ignoring unreadable persona state file"
            ),
        }

        registry.state_path = Some(path);
        registry
    }

    fn apply_stored(&mut self, stored: BTreeMap<String, PersonaSettings>) {
        for (id, saved) in stored {
            let Some(idx) = self.index_of(&id) else {
                debug!(persona = %id, "Ignoring stored settings for unknown persona");
                continue;
            };

            self.settings[idx].priority = saved.priority;
            if self.blueprints[idx].privileged {
                if !saved.enabled {
                    warn!(persona = %id, "Stored state disables the privileged persona; ignoring");
                }
            } else {
                self.settings[idx].enabled = saved.enabled;
            }
        }
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.blueprints.iter().position(|b| b.id == id)
    }

    fn config_at(&self, idx: usize) -> PersonaConfig {
        let bp = &self.blueprints[idx];
        PersonaConfig {
            id: bp.id.clone(),
            name: bp.name.clone(),
            description: bp.description.clone(),
            enabled: self.settings[idx].enabled,
            priority: self.settings[idx].priority,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────

    /// All personas sorted by (priority, id).
    pub fn list(&self) -> Vec<PersonaConfig> {
        let mut list: Vec<_> = (0..self.blueprints.len()).map(|i| self.config_at(i)).collect();
        list.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        list
    }

    pub fn get(&self, id: &str) -> Option<PersonaConfig> {
        self.index_of(id).map(|i| self.config_at(i))
    }

    pub fn blueprint(&self, id: &str) -> Option<&Arc<PersonaBlueprint>> {
        self.index_of(id).map(|i| &self.blueprints[i])
    }

    /// Blueprints in registration order.
    pub fn blueprints(&self) -> &[Arc<PersonaBlueprint>] {
        &self.blueprints
    }

    /// Ids of enabled personas in registration order.
    pub fn enabled_set(&self) -> Vec<String> {
        self.blueprints
            .iter()
            .zip(&self.settings)
            .filter(|(_, s)| s.enabled)
            .map(|(b, _)| b.id.clone())
            .collect()
    }

    pub fn is_known(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    pub fn state_path(&self) -> Option<&Path> {
        self.state_path.as_deref()
    }

    // ─────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────

    /// Flip a persona's enabled flag.
    ///
    /// Returns false for unknown ids and for the privileged persona.
    pub fn toggle(&mut self, id: &str) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        if self.blueprints[idx].privileged {
            return false;
        }

        self.settings[idx].enabled = !self.settings[idx].enabled;
        info!(persona = %id, enabled = self.settings[idx].enabled, "Persona toggled");
        self.persist();
        true
    }

    /// Set a persona's priority. Returns false for unknown ids.
    pub fn set_priority(&mut self, id: &str, priority: i32) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };

        self.settings[idx].priority = priority;
        info!(persona = %id, priority, "Persona priority updated");
        self.persist();
        true
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            error!(error = %e, "Failed to persist persona settings");
        }
    }

    /// Write the settings document atomically. No-op when in memory.
    pub fn save(&self) -> Result<()> {
        let Some(ref path) = self.state_path else {
            return Ok(());
        };

        let document: BTreeMap<&str, PersonaSettings> = self
            .blueprints
            .iter()
            .zip(&self.settings)
            .map(|(b, s)| (b.id.as_str(), *s))
            .collect();
        let json = serde_json::to_vec_pretty(&document)?;

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| Error::IoWrite {
            path: dir.clone(),
            source: e,
        })?;

        let write_err = |e: std::io::Error| Error::IoWrite {
            path: path.clone(),
            source: e,
        };
        let mut tmp = NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(&json).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;

        debug!(path = %path.display(), "Persona settings saved");
        Ok(())
    }
}

/// Read the stored settings document; `Ok(None)` when the file is absent.
///
/// Entries are decoded one by one; a malformed entry is skipped without
/// discarding the rest.
fn read_state(path: &Path) -> Result<Option<BTreeMap<String, PersonaSettings>>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(&content)?;

    let mut stored = BTreeMap::new();
    for (id, entry) in raw {
        match serde_json::from_value::<PersonaSettings>(entry) {
            Ok(settings) => {
                stored.insert(id, settings);
            }
            Err(e) => warn!(persona = %id, error = %e, "Skipping malformed persona settings"),
        }
    }
    Ok(Some(stored))
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_registry() -> (PersonaRegistry, TempDir) {
        let tmp = TempDir::new().unwrap();
        let registry = PersonaRegistry::open(tmp.path().join("state").join("personas.json")).unwrap();
        (registry, tmp)
    }

    #[test]
    fn test_defaults_all_enabled() {
        let registry = PersonaRegistry::bundled().unwrap();
        assert_eq!(registry.enabled_set().len(), 9);
        assert_eq!(registry.enabled_set()[0], "sam_altman");
        assert!(registry.state_path().is_none());
    }

    #[test]
    fn test_list_sorted_by_priority_then_id() {
        let mut registry = PersonaRegistry::bundled().unwrap();
        registry.set_priority("elon_musk", 1);

        let ids: Vec<_> = registry.list().into_iter().map(|p| p.id).collect();
        assert_eq!(ids[0], "elon_musk");
        assert_eq!(ids[1], "sam_altman");
        assert_eq!(ids[8], "project_advisor");
    }

    #[test]
    fn test_toggle_rules() {
        let mut registry = PersonaRegistry::bundled().unwrap();

        assert!(registry.toggle("sam_altman"));
        assert!(!registry.get("sam_altman").unwrap().enabled);
        assert!(registry.toggle("sam_altman"));
        assert!(registry.get("sam_altman").unwrap().enabled);

        assert!(!registry.toggle("project_advisor"));
        assert!(registry.get("project_advisor").unwrap().enabled);

        assert!(!registry.toggle("nobody"));
        assert!(!registry.set_priority("nobody", 3));
    }

    #[test]
    fn test_settings_round_trip() {
        let (mut registry, _tmp) = test_registry();
        let path = registry.state_path().unwrap().to_path_buf();

        assert!(registry.toggle("elon_musk"));
        assert!(registry.set_priority("demis_hassabis", 42));
        assert!(path.exists());

        let reloaded = PersonaRegistry::open(&path).unwrap();
        assert!(!reloaded.get("elon_musk").unwrap().enabled);
        assert_eq!(reloaded.get("demis_hassabis").unwrap().priority, 42);
        assert_eq!(reloaded.get("sam_altman").unwrap().priority, 1);
        assert!(!reloaded.enabled_set().contains(&"elon_musk".to_string()));
    }

    #[test]
    fn test_unknown_stored_ids_ignored() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("personas.json");
        fs::write(
            &path,
            r#"{
                "ghost": {"enabled": false, "priority": 1},
                "sam_altman": {"enabled": false, "priority": 7}
            }"#,
        )
        .unwrap();

        let registry = PersonaRegistry::open(&path).unwrap();
        assert!(registry.get("ghost").is_none());
        assert!(!registry.get("sam_altman").unwrap().enabled);
        assert_eq!(registry.get("sam_altman").unwrap().priority, 7);
        // Missing ids keep defaults
        assert!(registry.get("elon_musk").unwrap().enabled);
    }

    #[test]
    fn test_negative_priority_and_bad_entry() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("personas.json");
        fs::write(
            &path,
            r#"{
                "elon_musk": {"enabled": true, "priority": -3},
                "sam_altman": {"enabled": "maybe", "priority": 2},
                "adam_dangelo": {"enabled": false, "priority": 4}
            }"#,
        )
        .unwrap();

        let registry = PersonaRegistry::open(&path).unwrap();
        assert_eq!(registry.get("elon_musk").unwrap().priority, -3);
        assert_eq!(registry.list()[0].id, "elon_musk");
        // The malformed entry keeps defaults, its neighbours still apply
        assert!(registry.get("sam_altman").unwrap().enabled);
        assert_eq!(registry.get("sam_altman").unwrap().priority, 1);
        assert!(!registry.get("adam_dangelo").unwrap().enabled);
    }

    #[test]
    fn test_stored_disable_of_privileged_ignored() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("personas.json");
        fs::write(&path, r#"{"project_advisor": {"enabled": false, "priority": 3}}"#).unwrap();

        let registry = PersonaRegistry::open(&path).unwrap();
        let advisor = registry.get("project_advisor").unwrap();
        assert!(advisor.enabled);
        assert_eq!(advisor.priority, 3);
    }

    #[test]
    fn test_corrupt_state_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("personas.json");
        fs::write(&path, "{ not json").unwrap();

        let mut registry = PersonaRegistry::open(&path).unwrap();
        assert_eq!(registry.enabled_set().len(), 9);

        // Next mutation overwrites the corrupt file with a valid document
        assert!(registry.toggle("adam_dangelo"));
        let reloaded = PersonaRegistry::open(&path).unwrap();
        assert!(!reloaded.get("adam_dangelo").unwrap().enabled);
    }
}
