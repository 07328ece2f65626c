//! Profile Registry - Store and reuse field mappings
//!
//! Saves named [`FieldMapping`]s to disk and suggests them for new exports
//! whose headers overlap the columns a profile was created for.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ProfileError, ProfileResult};
use crate::transform::mapping::FieldMapping;

/// Directory where profiles are stored (relative to current dir)
pub const DEFAULT_PROFILE_DIR: &str = ".rekap/profiles";

/// Environment variable overriding [`DEFAULT_PROFILE_DIR`].
pub const PROFILE_DIR_ENV: &str = "REKAP_PROFILE_DIR";

/// Minimum share of a profile's columns that must appear in the headers.
const COMPATIBILITY_THRESHOLD: f64 = 0.5;

/// A stored mapping with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredProfile {
    /// Unique identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    pub mapping: FieldMapping,
    /// Source columns this profile was created for
    pub columns: Vec<String>,
    /// Creation timestamp
    pub created_at: String,
    /// Last time this profile was used
    pub last_used: Option<String>,
    /// Number of times used
    pub use_count: u32,
}

/// Registry for managing mapping profiles
pub struct ProfileRegistry {
    /// Directory where profiles are stored
    registry_dir: PathBuf,
    /// Loaded profiles (id -> profile)
    profiles: HashMap<String, StoredProfile>,
}

impl ProfileRegistry {
    /// Open the registry at `$REKAP_PROFILE_DIR` or the default directory.
    pub fn new() -> Self {
        match std::env::var(PROFILE_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => Self::with_dir(dir),
            _ => Self::with_dir(DEFAULT_PROFILE_DIR),
        }
    }

    /// Create a registry with a custom directory
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let mut registry = Self {
            registry_dir: PathBuf::from(dir.as_ref()),
            profiles: HashMap::new(),
        };
        registry.load_all();
        registry
    }

    pub fn dir(&self) -> &Path {
        &self.registry_dir
    }

    /// Load all profiles from the registry directory; unreadable files are skipped.
    fn load_all(&mut self) {
        let entries = match fs::read_dir(&self.registry_dir) {
            Ok(e) => e,
            Err(_) => return,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Ok(content) = fs::read_to_string(&path) {
                    if let Ok(profile) = serde_json::from_str::<StoredProfile>(&content) {
                        self.profiles.insert(profile.id.clone(), profile);
                    }
                }
            }
        }
    }

    /// All stored profiles, by name.
    pub fn list(&self) -> Vec<&StoredProfile> {
        let mut profiles: Vec<_> = self.profiles.values().collect();
        profiles.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        profiles
    }

    /// Get a profile by ID
    pub fn get(&self, id: &str) -> ProfileResult<&StoredProfile> {
        self.profiles
            .get(id)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))
    }

    /// Profiles whose columns mostly appear in `headers`, best match first.
    pub fn find_compatible(&self, headers: &[String]) -> Vec<(&StoredProfile, f64)> {
        let mut compatible: Vec<_> = self
            .profiles
            .values()
            .filter_map(|p| {
                let score = compatibility(&p.columns, headers);
                (score > COMPATIBILITY_THRESHOLD).then_some((p, score))
            })
            .collect();

        // Score, then most used
        compatible.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.0.use_count.cmp(&a.0.use_count))
                .then_with(|| a.0.id.cmp(&b.0.id))
        });

        compatible
    }

    /// Save a new profile to the registry
    pub fn save(&mut self, mapping: FieldMapping, name: &str, columns: Vec<String>) -> ProfileResult<String> {
        fs::create_dir_all(&self.registry_dir)?;

        let id = self.generate_id(name);
        let stored = StoredProfile {
            id: id.clone(),
            name: name.to_string(),
            mapping,
            columns,
            created_at: chrono::Utc::now().to_rfc3339(),
            last_used: None,
            use_count: 0,
        };

        self.write(&stored)?;
        self.profiles.insert(id.clone(), stored);
        Ok(id)
    }

    /// Import a mapping from a JSON file
    pub fn import(&mut self, path: &Path, name: Option<&str>) -> ProfileResult<String> {
        let content = fs::read_to_string(path)?;
        let mapping = FieldMapping::from_json(&content)?;

        let columns = mapping.source_columns();
        if columns.is_empty() {
            return Err(ProfileError::InvalidProfile(format!(
                "{} maps no columns",
                path.display()
            )));
        }

        let profile_name = name.unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("imported")
        });

        self.save(mapping, profile_name, columns)
    }

    /// Record a use of a profile
    pub fn touch(&mut self, id: &str) -> ProfileResult<()> {
        let profile = self
            .profiles
            .get_mut(id)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))?;
        profile.last_used = Some(chrono::Utc::now().to_rfc3339());
        profile.use_count += 1;

        let profile = profile.clone();
        self.write(&profile)
    }

    /// Delete a profile from the registry
    pub fn delete(&mut self, id: &str) -> ProfileResult<()> {
        if self.profiles.remove(id).is_none() {
            return Err(ProfileError::NotFound(id.to_string()));
        }
        fs::remove_file(self.path_for(id))?;
        Ok(())
    }

    fn write(&self, profile: &StoredProfile) -> ProfileResult<()> {
        let content = serde_json::to_string_pretty(profile)?;
        fs::write(self.path_for(&profile.id), content)?;
        Ok(())
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.registry_dir.join(format!("{}.json", id))
    }

    /// Generate a unique ID from a name
    fn generate_id(&self, name: &str) -> String {
        let slug: String = name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-");

        let timestamp = chrono::Utc::now().timestamp_millis();
        let mut id = format!("{}-{}", slug, timestamp);
        let mut n = 1;
        while self.profiles.contains_key(&id) {
            n += 1;
            id = format!("{}-{}-{}", slug, timestamp, n);
        }
        id
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Share of `stored` columns present in `headers`, case-insensitive.
fn compatibility(stored: &[String], headers: &[String]) -> f64 {
    if stored.is_empty() {
        return 0.0;
    }

    let headers_lower: Vec<String> = headers.iter().map(|c| c.to_lowercase()).collect();
    let match_count = stored
        .iter()
        .filter(|col| headers_lower.contains(&col.to_lowercase()))
        .count();

    match_count as f64 / stored.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::mapping::Field;
    use tempfile::tempdir;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_compatibility_score() {
        let stored = strings(&["Tanggal", "Kode HS", "Jumlah"]);
        let headers = strings(&["Tanggal", "Kode HS", "Harga"]);
        let score = compatibility(&stored, &headers);
        assert!((score - 0.666).abs() < 0.01);
    }

    #[test]
    fn test_case_insensitive_match() {
        let stored = strings(&["tanggal", "KODE HS"]);
        let headers = strings(&["TANGGAL", "kode hs"]);
        assert!((compatibility(&stored, &headers) - 1.0).abs() < 0.01);
        assert_eq!(compatibility(&[], &headers), 0.0);
    }

    #[test]
    fn test_save_reload_and_find() {
        let dir = tempdir().unwrap();
        let mapping = FieldMapping::new()
            .with_column(Field::Date, "Tanggal")
            .with_column(Field::HsCode, "Kode HS");

        let id = {
            let mut registry = ProfileRegistry::with_dir(dir.path());
            registry.save(mapping.clone(), "CEISA 2024", mapping.source_columns()).unwrap()
        };
        assert!(id.starts_with("ceisa-2024-"));

        let mut registry = ProfileRegistry::with_dir(dir.path());
        assert_eq!(registry.get(&id).unwrap().mapping, mapping);

        let found = registry.find_compatible(&strings(&["TANGGAL", "Kode HS", "Lain"]));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0.id, id);
        assert!(registry.find_compatible(&strings(&["Tanggal"])).is_empty());

        registry.touch(&id).unwrap();
        let reloaded = ProfileRegistry::with_dir(dir.path());
        assert_eq!(reloaded.get(&id).unwrap().use_count, 1);
        assert!(reloaded.get(&id).unwrap().last_used.is_some());
    }

    #[test]
    fn test_import_and_delete() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("bea-cukai.json");
        fs::write(&file, r#"{"columns": {"hsCode": "Pos Tarif", "quantity": "Jumlah"}}"#).unwrap();

        let mut registry = ProfileRegistry::with_dir(dir.path().join("profiles"));
        let id = registry.import(&file, None).unwrap();
        let profile = registry.get(&id).unwrap();
        assert_eq!(profile.name, "bea-cukai");
        assert_eq!(profile.columns, strings(&["Jumlah", "Pos Tarif"]));
        assert_eq!(registry.list().len(), 1);

        registry.delete(&id).unwrap();
        assert!(matches!(registry.get(&id), Err(ProfileError::NotFound(_))));
        assert!(matches!(registry.delete(&id), Err(ProfileError::NotFound(_))));
    }

    #[test]
    fn test_import_rejects_empty_mapping() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("empty.json");
        fs::write(&file, r#"{"columns": {}}"#).unwrap();

        let mut registry = ProfileRegistry::with_dir(dir.path().join("profiles"));
        assert!(matches!(registry.import(&file, Some("x")), Err(ProfileError::InvalidProfile(_))));
    }
}
