// crates/cockpit-fleet/src/catalog.rs
// ============================================================================
// Module: Fleet Catalogs
// Description: Known benchmark data folders and available database plugins.
// Purpose: Resolve folder names to table lists and plugin names to settings.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The benchmark catalog maps a data folder (for example `tpch_0.1`) to the
//! tables it contains; `load data` expects one `<table>.sql` file per table.
//! The plugin catalog lists the plugins that may be activated on a database
//! together with their declared settings. Setting names travel on the wire
//! qualified by their plugin (`CompressionPlugin_MemoryBudget`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

// ============================================================================
// SECTION: Benchmark Tables
// ============================================================================

/// Tables of the TPC-H benchmark.
const TPCH_TABLES: &[&str] =
    &["nation", "region", "part", "supplier", "partsupp", "customer", "orders", "lineitem"];

/// Tables of the TPC-DS benchmark.
const TPCDS_TABLES: &[&str] = &[
    "call_center",
    "catalog_page",
    "catalog_returns",
    "catalog_sales",
    "customer",
    "customer_address",
    "customer_demographics",
    "date_dim",
    "household_demographics",
    "income_band",
    "inventory",
    "item",
    "promotion",
    "reason",
    "ship_mode",
    "store",
    "store_returns",
    "store_sales",
    "time_dim",
    "warehouse",
    "web_page",
    "web_returns",
    "web_sales",
    "web_site",
];

/// Tables of the Join Order Benchmark.
const JOB_TABLES: &[&str] = &[
    "aka_name",
    "aka_title",
    "cast_info",
    "char_name",
    "comp_cast_type",
    "company_name",
    "company_type",
    "complete_cast",
    "info_type",
    "keyword",
    "kind_type",
    "link_type",
    "movie_companies",
    "movie_info",
    "movie_info_idx",
    "movie_keyword",
    "movie_link",
    "name",
    "person_info",
    "role_type",
    "title",
];

// ============================================================================
// SECTION: Benchmark Catalog
// ============================================================================

/// Data folders that `load data` accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkCatalog {
    /// Table names keyed by data folder.
    folders: BTreeMap<String, Vec<String>>,
}

impl BenchmarkCatalog {
    /// Returns an empty catalog.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            folders: BTreeMap::new(),
        }
    }

    /// Returns the catalog of the standard benchmark folders.
    #[must_use]
    pub fn standard() -> Self {
        Self::empty()
            .with_folder("tpch_0.1", TPCH_TABLES.iter().copied())
            .with_folder("tpch_1", TPCH_TABLES.iter().copied())
            .with_folder("tpcds_1", TPCDS_TABLES.iter().copied())
            .with_folder("job", JOB_TABLES.iter().copied())
    }

    /// Adds or replaces a folder.
    #[must_use]
    pub fn with_folder<'a>(
        mut self,
        folder: impl Into<String>,
        tables: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        self.folders.insert(folder.into(), tables.into_iter().map(str::to_string).collect());
        self
    }

    /// Returns the tables of `folder`.
    #[must_use]
    pub fn tables(&self, folder: &str) -> Option<&[String]> {
        self.folders.get(folder).map(Vec::as_slice)
    }

    /// Returns all folder names in order.
    pub fn folders(&self) -> impl Iterator<Item = &str> {
        self.folders.keys().map(String::as_str)
    }
}

impl Default for BenchmarkCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// SECTION: Plugin Catalog
// ============================================================================

/// Declared plugin setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSettingSpec {
    /// Unqualified setting name.
    pub name: String,
    /// Value applied on first activation.
    pub default_value: String,
    /// Human readable description.
    pub description: String,
}

/// Plugin that can be activated on a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSpec {
    /// Plugin name.
    pub name: String,
    /// Declared settings.
    pub settings: Vec<PluginSettingSpec>,
}

impl PluginSpec {
    /// Creates a plugin without settings.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: Vec::new(),
        }
    }

    /// Adds a declared setting.
    #[must_use]
    pub fn with_setting(
        mut self,
        name: impl Into<String>,
        default_value: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.settings.push(PluginSettingSpec {
            name: name.into(),
            default_value: default_value.into(),
            description: description.into(),
        });
        self
    }

    /// Returns the wire name of `setting` (`<plugin>_<setting>`).
    #[must_use]
    pub fn qualified(&self, setting: &str) -> String {
        format!("{}_{setting}", self.name)
    }

    /// Returns the default value of every declared setting.
    #[must_use]
    pub fn defaults(&self) -> BTreeMap<String, String> {
        self.settings
            .iter()
            .map(|setting| (setting.name.clone(), setting.default_value.clone()))
            .collect()
    }
}

/// Plugins that may be activated on fleet databases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginCatalog {
    /// Plugins keyed by name.
    plugins: BTreeMap<String, PluginSpec>,
}

impl PluginCatalog {
    /// Returns the catalog of bundled plugins.
    #[must_use]
    pub fn standard() -> Self {
        Self::from_specs([
            PluginSpec::new("CompressionPlugin").with_setting(
                "MemoryBudget",
                "5000",
                "The memory budget to target for the CompressionPlugin.",
            ),
            PluginSpec::new("ClusteringPlugin"),
            PluginSpec::new("IndexSelectionPlugin").with_setting(
                "MaxIndexes",
                "10",
                "Upper bound of indexes the IndexSelectionPlugin creates.",
            ),
        ])
    }

    /// Builds a catalog from plugin declarations.
    #[must_use]
    pub fn from_specs(specs: impl IntoIterator<Item = PluginSpec>) -> Self {
        Self {
            plugins: specs.into_iter().map(|spec| (spec.name.clone(), spec)).collect(),
        }
    }

    /// Returns the plugin named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PluginSpec> {
        self.plugins.get(name)
    }

    /// Resolves a qualified setting name to its plugin and declaration.
    #[must_use]
    pub fn resolve_setting(&self, qualified: &str) -> Option<(&PluginSpec, &PluginSettingSpec)> {
        self.plugins.values().find_map(|plugin| {
            let rest = qualified.strip_prefix(plugin.name.as_str())?.strip_prefix('_')?;
            plugin
                .settings
                .iter()
                .find(|setting| setting.name == rest)
                .map(|setting| (plugin, setting))
        })
    }
}

impl Default for PluginCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
