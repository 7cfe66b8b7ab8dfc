//! Template store backed by flat per-category JSON files.
//!
//! Each category persists to `<store_dir>/<category>.json` holding every
//! record in that category. The store is constructed once and handed by
//! reference to whoever needs it, so tests run isolated instances against
//! temporary directories.

use crate::error::{Error, Result};
use crate::template::{
    Category, CreateTemplate, TemplateRecord, TemplateSummary, UpdateTemplate,
};
use chrono::Utc;
use log::{debug, info};
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Sort key for template listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    Name,
    CreatedAt,
    UpdatedAt,
}

/// Sort direction for template listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Filter and ordering options for [`TemplateStore::list`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListOptions {
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub category: Option<Category>,
    /// Case-insensitive substring match over name and description.
    pub search: Option<String>,
    /// Defaults to listing active templates only.
    pub is_active: Option<bool>,
}

/// Manages the on-disk template records.
pub struct TemplateStore {
    store_dir: PathBuf,
}

impl TemplateStore {
    /// Creates a store rooted at the default data directory:
    /// - Linux: `~/.local/share/easel/templates`
    /// - macOS: `~/Library/Application Support/easel/templates`
    /// - Windows: `C:\Users\<User>\AppData\Roaming\easel\templates`
    pub fn new() -> Result<Self> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            Error::Internal(anyhow::anyhow!("Could not determine data directory"))
        })?;
        Ok(Self { store_dir: data_dir.join("easel").join("templates") })
    }

    /// Creates a store with a custom directory (useful for testing).
    pub fn with_dir(store_dir: PathBuf) -> Self {
        Self { store_dir }
    }

    /// Returns the path to the store directory.
    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    fn ensure_store_dir(&self) -> Result<()> {
        if !self.store_dir.exists() {
            fs::create_dir_all(&self.store_dir)?;
            debug!("Created template store at: {}", self.store_dir.display());
        }
        Ok(())
    }

    fn category_path(&self, category: Category) -> PathBuf {
        self.store_dir.join(format!("{category}.json"))
    }

    fn load_category(&self, category: Category) -> Result<Vec<TemplateRecord>> {
        let path = self.category_path(category);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn save_category(&self, category: Category, records: &[TemplateRecord]) -> Result<()> {
        self.ensure_store_dir()?;
        let path = self.category_path(category);
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), records)?;
        debug!("Saved {} record(s) to {}", records.len(), path.display());
        Ok(())
    }

    /// Creates a new template record with a fresh id and version 1.
    pub fn create(&self, input: CreateTemplate) -> Result<TemplateRecord> {
        if input.name.trim().is_empty() {
            return Err(Error::InvalidTemplate("template name must not be empty".into()));
        }
        if input.parameters.subject.as_deref().map(str::is_empty).unwrap_or(true) {
            return Err(Error::InvalidTemplate(
                "template defaults must include a non-empty subject".into(),
            ));
        }

        let now = Utc::now();
        let record = TemplateRecord {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            description: input.description,
            category: input.category,
            parameters: input.parameters,
            version: 1,
            created_at: now,
            updated_at: now,
            is_active: true,
        };

        let mut records = self.load_category(record.category)?;
        records.push(record.clone());
        self.save_category(record.category, &records)?;

        info!("Created template '{}' ({})", record.name, record.id);
        Ok(record)
    }

    /// Looks up a record by id, optionally pinned to a version.
    ///
    /// Only the current version of a record is retained, so a supplied
    /// version that does not match the stored one resolves to not-found.
    pub fn get(&self, id: &str, version: Option<u32>) -> Result<TemplateRecord> {
        for category in Category::ALL {
            if let Some(record) = self.load_category(category)?.into_iter().find(|r| r.id == id)
            {
                return match version {
                    Some(v) if v != record.version => {
                        Err(Error::TemplateNotFound { id: format!("{id} (version {v})") })
                    }
                    _ => Ok(record),
                };
            }
        }
        Err(Error::TemplateNotFound { id: id.to_string() })
    }

    /// Applies a partial update and bumps the version by exactly 1.
    pub fn update(&self, id: &str, input: UpdateTemplate) -> Result<TemplateRecord> {
        let mut record = self.get(id, None)?;
        let old_category = record.category;

        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(Error::InvalidTemplate("template name must not be empty".into()));
            }
            record.name = name;
        }
        if let Some(description) = input.description {
            record.description = description;
        }
        if let Some(category) = input.category {
            record.category = category;
        }
        if let Some(parameters) = input.parameters {
            if parameters.subject.as_deref().map(str::is_empty).unwrap_or(true) {
                return Err(Error::InvalidTemplate(
                    "template defaults must include a non-empty subject".into(),
                ));
            }
            record.parameters = parameters;
        }
        if let Some(is_active) = input.is_active {
            record.is_active = is_active;
        }

        record.version += 1;
        record.updated_at = Utc::now();

        // A category change moves the record between files; otherwise the
        // record is replaced in a single rewrite of its file.
        let mut old_records = self.load_category(old_category)?;
        old_records.retain(|r| r.id != id);
        if record.category == old_category {
            old_records.push(record.clone());
            self.save_category(old_category, &old_records)?;
        } else {
            self.save_category(old_category, &old_records)?;
            let mut new_records = self.load_category(record.category)?;
            new_records.push(record.clone());
            self.save_category(record.category, &new_records)?;
        }

        info!("Updated template '{}' to version {}", record.name, record.version);
        Ok(record)
    }

    /// Deletes a record by id.
    pub fn delete(&self, id: &str) -> Result<()> {
        for category in Category::ALL {
            let mut records = self.load_category(category)?;
            let before = records.len();
            records.retain(|r| r.id != id);
            if records.len() != before {
                self.save_category(category, &records)?;
                info!("Deleted template '{}'", id);
                return Ok(());
            }
        }
        Err(Error::TemplateNotFound { id: id.to_string() })
    }

    /// Lists template summaries, filtered and sorted.
    pub fn list(&self, options: &ListOptions) -> Result<Vec<TemplateSummary>> {
        let wanted_active = options.is_active.unwrap_or(true);
        let search = options.search.as_ref().map(|s| s.to_lowercase());

        let mut records = Vec::new();
        for category in Category::ALL {
            if options.category.map(|c| c != category).unwrap_or(false) {
                continue;
            }
            records.extend(self.load_category(category)?);
        }

        records.retain(|r| r.is_active == wanted_active);
        if let Some(needle) = &search {
            records.retain(|r| {
                r.name.to_lowercase().contains(needle)
                    || r.description.to_lowercase().contains(needle)
            });
        }

        records.sort_by(|a, b| {
            let ordering = match options.sort_by {
                SortBy::Name => a.name.cmp(&b.name),
                SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
                SortBy::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            };
            match options.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        Ok(records.iter().map(TemplateSummary::from).collect())
    }
}
