// crates/cockpit-fleet/src/manager.rs
// ============================================================================
// Module: Fleet Manager
// Description: Registry of benchmarked databases, their pools, plugins, and data.
// Purpose: Implement every Fleet Manager command over a thread-safe registry.
// Dependencies: cockpit-contract, cockpit-core
// ============================================================================

//! ## Overview
//! Registration is all-or-nothing: the connection is validated with one
//! blocking round trip, then a bounded connection pool is opened, and only
//! then is the instance inserted. A failure at any point leaves the registry
//! untouched. Instance ids are unique.
//!
//! Loading benchmark data runs on a background thread per instance. While it
//! runs the instance is blocked: its worker pool cannot be started, it
//! receives no generated tasks, and it cannot be removed.
//!
//! Every registry mutation records a `registry_change` audit event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use cockpit_contract::bodies::ActivePluginsEntry;
use cockpit_contract::bodies::AddDatabaseRequest;
use cockpit_contract::bodies::DatabaseSummary;
use cockpit_contract::bodies::PluginSetting;
use cockpit_contract::bodies::PluginSettingsEntry;
use cockpit_contract::bodies::QueueLengthEntry;
use cockpit_core::AuditSink;
use cockpit_core::ConnectionDescriptor;
use cockpit_core::CounterStore;
use cockpit_core::DataFolder;
use cockpit_core::DatabaseDriver;
use cockpit_core::DatabaseId;
use cockpit_core::DatabaseInstance;
use cockpit_core::InstanceStatus;
use cockpit_core::LoadedTable;
use cockpit_core::NoopAuditSink;
use cockpit_core::PluginActivation;
use cockpit_core::PluginName;
use cockpit_core::QueryExecutor;
use cockpit_core::QueryTask;
use cockpit_core::RegistryAuditEvent;
use cockpit_core::WorkerPoolStatus;

use crate::catalog::BenchmarkCatalog;
use crate::catalog::PluginCatalog;
use crate::error::FleetError;
use crate::generator::WorkloadSink;
use crate::workers::WorkerPool;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Fleet Manager settings.
#[derive(Debug, Clone)]
pub struct FleetSettings {
    /// Root directory holding one folder per benchmark data set.
    pub data_root: PathBuf,
    /// Accepted data folders.
    pub benchmarks: BenchmarkCatalog,
    /// Plugins that may be activated.
    pub plugins: PluginCatalog,
}

impl FleetSettings {
    /// Creates settings with the standard catalogs.
    #[must_use]
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            benchmarks: BenchmarkCatalog::standard(),
            plugins: PluginCatalog::standard(),
        }
    }

    /// Replaces the benchmark catalog.
    #[must_use]
    pub fn with_benchmarks(mut self, benchmarks: BenchmarkCatalog) -> Self {
        self.benchmarks = benchmarks;
        self
    }

    /// Replaces the plugin catalog.
    #[must_use]
    pub fn with_plugins(mut self, plugins: PluginCatalog) -> Self {
        self.plugins = plugins;
        self
    }
}

// ============================================================================
// SECTION: Managed Instance
// ============================================================================

/// Mutable per-instance state outside the worker pool.
#[derive(Debug, Default)]
struct InstanceData {
    /// Loaded tables.
    tables: BTreeSet<LoadedTable>,
    /// Plugin state keyed by plugin name.
    plugins: BTreeMap<String, PluginActivation>,
    /// Failure of the most recent data load.
    last_load_error: Option<String>,
}

/// One registered database with the resources it owns.
struct ManagedInstance {
    /// Fleet-unique identifier.
    id: DatabaseId,
    /// Connection parameters.
    connection: ConnectionDescriptor,
    /// Worker pool size.
    number_workers: u32,
    /// Bounded connection pool.
    executor: Arc<dyn QueryExecutor>,
    /// Worker threads.
    workers: WorkerPool,
    /// True while a data operation holds the instance.
    blocked: AtomicBool,
    /// Tables and plugins.
    data: Mutex<InstanceData>,
    /// Most recent data loader thread.
    loader: Mutex<Option<JoinHandle<()>>>,
}

impl ManagedInstance {
    /// Returns true while a data operation holds the instance.
    fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::Acquire)
    }

    /// Returns the worker pool status label.
    fn pool_status(&self) -> WorkerPoolStatus {
        if self.is_blocked() {
            WorkerPoolStatus::Blocked
        } else if self.workers.is_running() {
            WorkerPoolStatus::Running
        } else {
            WorkerPoolStatus::Stopped
        }
    }

    /// Locks tables and plugins.
    fn data(&self) -> std::sync::MutexGuard<'_, InstanceData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the public instance descriptor.
    fn describe(&self) -> DatabaseInstance {
        DatabaseInstance {
            id: self.id.clone(),
            connection: self.connection.clone(),
            number_workers: self.number_workers,
            status: self.pool_status(),
        }
    }
}

// ============================================================================
// SECTION: Fleet Manager
// ============================================================================

/// Registered instances keyed by id.
type Registry = BTreeMap<DatabaseId, Arc<ManagedInstance>>;

/// Registry of fleet databases.
pub struct FleetManager {
    /// Driver used to validate connections and open pools.
    driver: Arc<dyn DatabaseDriver>,
    /// Shared throughput counters written by the worker pools.
    counters: Arc<dyn CounterStore>,
    /// Catalogs and data root.
    settings: FleetSettings,
    /// Audit sink for registry changes.
    audit: Arc<dyn AuditSink>,
    /// Registered instances keyed by id.
    registry: RwLock<Registry>,
}

impl FleetManager {
    /// Creates an empty fleet.
    #[must_use]
    pub fn new(
        driver: Arc<dyn DatabaseDriver>,
        counters: Arc<dyn CounterStore>,
        settings: FleetSettings,
    ) -> Self {
        Self {
            driver,
            counters,
            settings,
            audit: Arc::new(NoopAuditSink),
            registry: RwLock::new(BTreeMap::new()),
        }
    }

    /// Sets the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the manager's settings.
    #[must_use]
    pub const fn settings(&self) -> &FleetSettings {
        &self.settings
    }

    // ------------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------------

    /// Registers a database after validating its connection and opening its pool.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Conflict`] for a duplicate id,
    /// [`FleetError::ConnectionInvalid`] when validation fails, and
    /// [`FleetError::Driver`] when the pool cannot be opened.
    pub fn add_database(&self, request: &AddDatabaseRequest) -> Result<(), FleetError> {
        let result = self.register(request);
        self.audit_result(Some(&request.id), "add", &result);
        result
    }

    /// Performs registration without auditing.
    fn register(&self, request: &AddDatabaseRequest) -> Result<(), FleetError> {
        if self.read_registry()?.contains_key(&request.id) {
            return Err(FleetError::Conflict(request.id.to_string()));
        }
        let connection = request.connection();
        self.driver.validate_connection(&connection)?;
        let executor = self.driver.open_pool(&connection, request.number_workers)?;
        let workers = WorkerPool::new(
            request.id.clone(),
            request.number_workers,
            Arc::clone(&executor),
            Arc::clone(&self.counters),
        );
        let instance = Arc::new(ManagedInstance {
            id: request.id.clone(),
            connection,
            number_workers: request.number_workers,
            executor,
            workers,
            blocked: AtomicBool::new(false),
            data: Mutex::new(InstanceData::default()),
            loader: Mutex::new(None),
        });
        let mut registry = self.write_registry()?;
        if registry.contains_key(&request.id) {
            return Err(FleetError::Conflict(request.id.to_string()));
        }
        registry.insert(request.id.clone(), instance);
        Ok(())
    }

    /// Removes a database, closing its workers and releasing its pool.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::NotFound`] for an unknown id and
    /// [`FleetError::Blocked`] while a data operation holds the instance.
    pub fn delete_database(&self, id: &DatabaseId) -> Result<(), FleetError> {
        let result = self.unregister(id);
        self.audit_result(Some(id), "delete", &result);
        result
    }

    /// Performs removal without auditing.
    fn unregister(&self, id: &DatabaseId) -> Result<(), FleetError> {
        let removed = {
            let mut registry = self.write_registry()?;
            let instance = registry.get(id).ok_or_else(|| FleetError::NotFound(id.to_string()))?;
            if instance.is_blocked() {
                return Err(FleetError::Blocked(id.to_string()));
            }
            registry.remove(id)
        };
        if let Some(instance) = removed {
            instance.workers.close();
        }
        Ok(())
    }

    /// Lists registered databases in id order.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Internal`] when the registry lock is poisoned.
    pub fn databases(&self) -> Result<Vec<DatabaseSummary>, FleetError> {
        Ok(self
            .instances()?
            .iter()
            .map(|instance| DatabaseSummary::from(&instance.describe()))
            .collect())
    }

    /// Returns the public descriptor of one database.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::NotFound`] for an unknown id.
    pub fn database(&self, id: &DatabaseId) -> Result<DatabaseInstance, FleetError> {
        Ok(self.instance(id)?.describe())
    }

    // ------------------------------------------------------------------------
    // Worker Pools
    // ------------------------------------------------------------------------

    /// Starts the worker pool of every database. Running pools are left as is.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Blocked`] when any database is blocked; no pool
    /// is started in that case.
    pub fn start_workers(&self) -> Result<(), FleetError> {
        let result = self.start_all_workers();
        self.audit_result(None, "start_worker", &result);
        result
    }

    /// Starts all pools without auditing.
    fn start_all_workers(&self) -> Result<(), FleetError> {
        let instances = self.instances()?;
        if let Some(blocked) = instances.iter().find(|instance| instance.is_blocked()) {
            return Err(FleetError::Blocked(blocked.id.to_string()));
        }
        for instance in &instances {
            instance.workers.start()?;
        }
        Ok(())
    }

    /// Closes the worker pool of every database, discarding pending tasks.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Internal`] when the registry lock is poisoned.
    pub fn close_workers(&self) -> Result<(), FleetError> {
        let result = self.instances().map(|instances| {
            for instance in &instances {
                instance.workers.close();
            }
        });
        self.audit_result(None, "close_worker", &result);
        result
    }

    /// Returns the pending task count of every database.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Internal`] when the registry lock is poisoned.
    pub fn queue_lengths(&self) -> Result<Vec<QueueLengthEntry>, FleetError> {
        Ok(self
            .instances()?
            .iter()
            .map(|instance| QueueLengthEntry {
                id: instance.id.clone(),
                queue_length: instance.workers.queue_length(),
            })
            .collect())
    }

    /// Returns the status of every database.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Internal`] when the registry lock is poisoned.
    pub fn status(&self) -> Result<Vec<InstanceStatus>, FleetError> {
        Ok(self.instances()?.iter().map(|instance| self.instance_status(instance)).collect())
    }

    /// Builds the status report of one instance.
    fn instance_status(&self, instance: &ManagedInstance) -> InstanceStatus {
        let tables: Vec<LoadedTable> = instance.data().tables.iter().cloned().collect();
        let loaded_benchmarks = self
            .settings
            .benchmarks
            .folders()
            .filter(|folder| {
                self.settings.benchmarks.tables(folder).is_some_and(|expected| {
                    expected.iter().all(|table| {
                        tables
                            .iter()
                            .any(|entry| entry.benchmark == *folder && entry.table_name == *table)
                    })
                })
            })
            .map(str::to_string)
            .collect();
        InstanceStatus {
            id: instance.id.clone(),
            database_blocked_status: instance.is_blocked(),
            worker_pool_status: instance.pool_status(),
            loaded_benchmarks,
            loaded_tables: tables,
            last_load_error: instance.data().last_load_error.clone(),
        }
    }

    // ------------------------------------------------------------------------
    // Plugins
    // ------------------------------------------------------------------------

    /// Returns the active plugins of every database.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Internal`] when the registry lock is poisoned.
    pub fn plugins(&self) -> Result<Vec<ActivePluginsEntry>, FleetError> {
        Ok(self
            .instances()?
            .iter()
            .map(|instance| ActivePluginsEntry {
                id: instance.id.clone(),
                plugins: instance
                    .data()
                    .plugins
                    .values()
                    .filter(|activation| activation.active)
                    .map(|activation| activation.plugin_name.to_string())
                    .collect(),
            })
            .collect())
    }

    /// Activates a plugin on one database.
    ///
    /// Settings keep their values across deactivation; first activation
    /// applies the declared defaults.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::NotFound`], [`FleetError::Blocked`], or
    /// [`FleetError::Plugin`] for a plugin outside the catalog.
    pub fn activate_plugin(&self, id: &DatabaseId, plugin: &str) -> Result<(), FleetError> {
        let result = self.set_plugin_active(id, plugin, true);
        self.audit_result(Some(id), "activate_plugin", &result);
        result
    }

    /// Deactivates a plugin on one database.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::NotFound`], [`FleetError::Blocked`], or
    /// [`FleetError::Plugin`] when the plugin is unknown or not active.
    pub fn deactivate_plugin(&self, id: &DatabaseId, plugin: &str) -> Result<(), FleetError> {
        let result = self.set_plugin_active(id, plugin, false);
        self.audit_result(Some(id), "deactivate_plugin", &result);
        result
    }

    /// Flips the activation flag of one plugin on one database.
    fn set_plugin_active(
        &self,
        id: &DatabaseId,
        plugin: &str,
        active: bool,
    ) -> Result<(), FleetError> {
        let spec = self
            .settings
            .plugins
            .get(plugin)
            .ok_or_else(|| FleetError::Plugin(format!("unknown plugin `{plugin}`")))?;
        let instance = self.instance(id)?;
        if instance.is_blocked() {
            return Err(FleetError::Blocked(id.to_string()));
        }
        let mut data = instance.data();
        if !active {
            return match data.plugins.get_mut(plugin) {
                Some(activation) if activation.active => {
                    activation.active = false;
                    Ok(())
                }
                _ => Err(FleetError::Plugin(format!(
                    "plugin `{plugin}` is not active on database `{id}`"
                ))),
            };
        }
        let activation = data.plugins.entry(spec.name.clone()).or_insert_with(|| {
            PluginActivation::inactive(
                id.clone(),
                PluginName::new(spec.name.clone()),
                spec.defaults(),
            )
        });
        activation.active = true;
        Ok(())
    }

    /// Returns the settings of every active plugin on every database.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Internal`] when the registry lock is poisoned.
    pub fn plugin_settings(&self) -> Result<Vec<PluginSettingsEntry>, FleetError> {
        Ok(self
            .instances()?
            .iter()
            .map(|instance| PluginSettingsEntry {
                id: instance.id.clone(),
                plugin_settings: self.active_settings(&instance.data()),
            })
            .collect())
    }

    /// Lists the settings of active plugins with their catalog descriptions.
    fn active_settings(&self, data: &InstanceData) -> Vec<PluginSetting> {
        let mut settings = Vec::new();
        for activation in data.plugins.values().filter(|activation| activation.active) {
            let Some(spec) = self.settings.plugins.get(activation.plugin_name.as_str()) else {
                continue;
            };
            for declared in &spec.settings {
                let value = activation
                    .settings
                    .get(&declared.name)
                    .cloned()
                    .unwrap_or_else(|| declared.default_value.clone());
                settings.push(PluginSetting {
                    plugin: spec.name.clone(),
                    name: spec.qualified(&declared.name),
                    value,
                    description: declared.description.clone(),
                });
            }
        }
        settings
    }

    /// Sets a plugin setting on one database.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Plugin`] when the setting is unknown or its
    /// plugin is not active on the database, and [`FleetError::NotFound`] for
    /// an unknown id.
    pub fn set_plugin_setting(
        &self,
        id: &DatabaseId,
        name: &str,
        value: &str,
    ) -> Result<(), FleetError> {
        let result = self.write_plugin_setting(id, name, value);
        self.audit_result(Some(id), "set_plugin_setting", &result);
        result
    }

    /// Writes a plugin setting without auditing.
    fn write_plugin_setting(
        &self,
        id: &DatabaseId,
        name: &str,
        value: &str,
    ) -> Result<(), FleetError> {
        let (plugin, setting) = self
            .settings
            .plugins
            .resolve_setting(name)
            .ok_or_else(|| FleetError::Plugin(format!("unknown plugin setting `{name}`")))?;
        let instance = self.instance(id)?;
        let mut data = instance.data();
        match data.plugins.get_mut(&plugin.name) {
            Some(activation) if activation.active => {
                activation.settings.insert(setting.name.clone(), value.to_string());
                Ok(())
            }
            _ => Err(FleetError::Plugin(format!(
                "plugin `{}` is not active on database `{id}`",
                plugin.name
            ))),
        }
    }

    // ------------------------------------------------------------------------
    // Benchmark Data
    // ------------------------------------------------------------------------

    /// Starts loading a benchmark data folder into every database.
    ///
    /// Databases that already hold the folder are skipped. Each other
    /// database is blocked until its loader thread finishes; the call returns
    /// once all loaders are started. A loader failure is reported as
    /// `last_load_error` in [`FleetManager::status`].
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Data`] for an unknown folder, a missing table
    /// file, or a table already loaded from another folder, and
    /// [`FleetError::Blocked`] when any database is busy. Nothing is started
    /// in those cases.
    pub fn load_data(&self, folder: &str) -> Result<(), FleetError> {
        let result = self.start_loading(folder);
        self.audit_result(None, "load_data", &result);
        result
    }

    /// Validates the folder and spawns one loader per target instance.
    fn start_loading(&self, folder: &str) -> Result<(), FleetError> {
        let (directory, tables) = self.resolve_folder(folder)?;
        let files = tables
            .iter()
            .map(|table| {
                let path = directory.join(format!("{table}.sql"));
                if path.is_file() {
                    Ok((table.clone(), path))
                } else {
                    Err(FleetError::Data(format!("missing table file `{}`", path.display())))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let instances = self.instances()?;
        let mut targets = Vec::new();
        for instance in &instances {
            if instance.is_blocked() {
                return Err(FleetError::Blocked(instance.id.to_string()));
            }
            let data = instance.data();
            if tables.iter().all(|table| data.tables.contains(&loaded(table, folder))) {
                continue;
            }
            if let Some(clash) = data.tables.iter().find(|existing| {
                existing.benchmark != folder && tables.contains(&existing.table_name)
            }) {
                return Err(FleetError::Data(format!(
                    "table `{}` on database `{}` is already loaded from `{}`",
                    clash.table_name, instance.id, clash.benchmark
                )));
            }
            targets.push(Arc::clone(instance));
        }

        for instance in targets {
            if instance
                .blocked
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return Err(FleetError::Blocked(instance.id.to_string()));
            }
            let spawned = thread::Builder::new().name(format!("loader-{}", instance.id)).spawn({
                let instance = Arc::clone(&instance);
                let files = files.clone();
                let folder = folder.to_string();
                let audit = Arc::clone(&self.audit);
                move || load_tables(&instance, &folder, &files, audit.as_ref())
            });
            match spawned {
                Ok(handle) => {
                    let previous = instance
                        .loader
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .replace(handle);
                    if let Some(previous) = previous {
                        let _ = previous.join();
                    }
                }
                Err(err) => {
                    instance.blocked.store(false, Ordering::Release);
                    return Err(FleetError::Internal(format!("loader spawn failed: {err}")));
                }
            }
        }
        Ok(())
    }

    /// Drops the tables of a benchmark data folder from every database.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Data`] for an unknown folder or a failed drop and
    /// [`FleetError::Blocked`] when a database holding the folder is busy.
    pub fn delete_data(&self, folder: &str) -> Result<(), FleetError> {
        let result = self.drop_folder(folder);
        self.audit_result(None, "delete_data", &result);
        result
    }

    /// Drops loaded tables of `folder` without auditing.
    fn drop_folder(&self, folder: &str) -> Result<(), FleetError> {
        self.resolve_folder(folder)?;
        for instance in self.instances()? {
            let dropped: Vec<LoadedTable> = instance
                .data()
                .tables
                .iter()
                .filter(|table| table.benchmark == folder)
                .cloned()
                .collect();
            if dropped.is_empty() {
                continue;
            }
            if instance.is_blocked() {
                return Err(FleetError::Blocked(instance.id.to_string()));
            }
            for table in dropped {
                instance
                    .executor
                    .execute(&format!("DROP TABLE IF EXISTS {};", table.table_name))
                    .map_err(|err| FleetError::Data(format!("database `{}`: {err}", instance.id)))?;
                instance.data().tables.remove(&table);
            }
        }
        Ok(())
    }

    /// Resolves a data folder to its directory and table list.
    fn resolve_folder(&self, folder: &str) -> Result<(PathBuf, Vec<String>), FleetError> {
        let name = DataFolder::new(folder);
        let tables = self
            .settings
            .benchmarks
            .tables(folder)
            .filter(|_| name.is_safe_component())
            .ok_or_else(|| FleetError::Data(format!("unknown data folder `{folder}`")))?;
        Ok((self.settings.data_root.join(name.as_str()), tables.to_vec()))
    }

    /// Waits until no database is blocked. Returns false on timeout.
    #[must_use]
    pub fn wait_until_unblocked(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let blocked = self
                .instances()
                .map(|instances| instances.iter().any(|instance| instance.is_blocked()))
                .unwrap_or(false);
            if !blocked {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Returns every registered instance in id order.
    fn instances(&self) -> Result<Vec<Arc<ManagedInstance>>, FleetError> {
        Ok(self.read_registry()?.values().cloned().collect())
    }

    /// Returns one registered instance.
    fn instance(&self, id: &DatabaseId) -> Result<Arc<ManagedInstance>, FleetError> {
        self.read_registry()?.get(id).cloned().ok_or_else(|| FleetError::NotFound(id.to_string()))
    }

    /// Acquires the registry for reading.
    fn read_registry(&self) -> Result<RwLockReadGuard<'_, Registry>, FleetError> {
        self.registry
            .read()
            .map_err(|_| FleetError::Internal("registry lock poisoned".to_string()))
    }

    /// Acquires the registry for writing.
    fn write_registry(&self) -> Result<RwLockWriteGuard<'_, Registry>, FleetError> {
        self.registry
            .write()
            .map_err(|_| FleetError::Internal("registry lock poisoned".to_string()))
    }

    /// Records the outcome of a registry operation.
    fn audit_result<T>(
        &self,
        id: Option<&DatabaseId>,
        action: &'static str,
        result: &Result<T, FleetError>,
    ) {
        let detail = result.as_ref().err().map(ToString::to_string);
        self.audit.record_registry(&RegistryAuditEvent::new(
            id.cloned(),
            action,
            result.is_ok(),
            detail,
        ));
    }
}

impl WorkloadSink for FleetManager {
    fn submit(&self, task: &QueryTask) -> usize {
        let Ok(instances) = self.instances() else {
            return 0;
        };
        instances
            .iter()
            .filter(|instance| !instance.is_blocked())
            .filter(|instance| instance.workers.enqueue(task.clone()))
            .count()
    }
}

// ============================================================================
// SECTION: Data Loading
// ============================================================================

/// Builds the loaded-table record of `table` from `folder`.
fn loaded(table: &str, folder: &str) -> LoadedTable {
    LoadedTable {
        table_name: table.to_string(),
        benchmark: folder.to_string(),
    }
}

/// Loads each table file into one instance, then unblocks it.
fn load_tables(
    instance: &ManagedInstance,
    folder: &str,
    files: &[(String, PathBuf)],
    audit: &dyn AuditSink,
) {
    let result = files.iter().try_for_each(|(table, path)| {
        let record = loaded(table, folder);
        if instance.data().tables.contains(&record) {
            return Ok(());
        }
        let sql = read_table_file(path)?;
        instance
            .executor
            .execute(&sql)
            .map_err(|err| FleetError::Data(format!("loading `{table}` failed: {err}")))?;
        instance.data().tables.insert(record);
        Ok::<(), FleetError>(())
    });
    let detail = result.as_ref().err().map(ToString::to_string);
    instance.data().last_load_error.clone_from(&detail);
    instance.blocked.store(false, Ordering::Release);
    audit.record_registry(&RegistryAuditEvent::new(
        Some(instance.id.clone()),
        "load_data_complete",
        result.is_ok(),
        detail,
    ));
}

/// Reads one table file.
fn read_table_file(path: &Path) -> Result<String, FleetError> {
    fs::read_to_string(path)
        .map_err(|err| FleetError::Data(format!("reading `{}` failed: {err}", path.display())))
}
