//! Table-level access control on top of the [`Store`].
//!
//! Two reserved collections back this module: `mApps` holds one
//! [`AppRegistration`] per application and `mAccess` holds [`AccessGrant`]s.
//!
//! # Decision order for [`AccessController::authorize`]
//!
//! 1. Restricted tables are always denied, whatever the grants say.
//! 2. The `(app name, app key)` pair must match a registration exactly.
//! 3. An exact-table grant decides, including an explicit deny.
//! 4. Otherwise the app's wildcard grant decides.
//! 5. Otherwise deny.
//!
//! # Grant invariant
//!
//! At most one grant exists per `(app name, table name)`: every grant write
//! deletes all grants on the key before inserting the new one.

pub mod model;

pub use model::{is_restricted, normalize_table_name, AccessGrant, AppRegistration, WILDCARD_TABLE};

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::codec::{Codec, CodecError};
use crate::store::{Predicate, Store, ACCESS_COLLECTION, APPS_COLLECTION};
use model::{from_record, to_record};

/// Errors from administrative operations.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The operation targets `mApps` or `mAccess`.
    #[error("cannot modify restricted table {0}")]
    Restricted(String),

    /// The app has no registration; provision a key for it first.
    #[error("the application {0} could not be found")]
    AppNotFound(String),

    /// The app name is empty or only whitespace.
    #[error("an application name must be specified")]
    EmptyAppName,

    /// The table name is empty after normalization (e.g. `*`).
    #[error("a table name must be specified")]
    EmptyTableName,

    /// Saving the database failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Result of [`AccessController::provision_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedKey {
    pub app_key: String,
    /// `false` when the app was already registered and its key was returned as-is.
    pub created: bool,
}

/// Result of [`AccessController::drop_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DroppedTable {
    /// Whether the collection itself existed.
    pub existed: bool,
    /// Grants on the table that were removed, whether or not it existed.
    pub grants_removed: usize,
}

/// Owner of the in-memory [`Store`] and the [`Codec`] that persists it.
///
/// Every mutating method ends by saving the whole database.
#[derive(Debug)]
pub struct AccessController<C> {
    store: Store,
    codec: C,
}

fn app_predicate(app_name: &str) -> Predicate {
    Predicate::all().with("appName", app_name)
}

fn require_app_name(app_name: &str) -> Result<(), AccessError> {
    if app_name.trim().is_empty() {
        return Err(AccessError::EmptyAppName);
    }
    Ok(())
}

fn grant_predicate(app_name: &str, table: &str) -> Predicate {
    app_predicate(app_name).with("tableName", table)
}

impl<C: Codec> AccessController<C> {
    /// Load the database through `codec`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Unreadable`] if the backing store exists but
    /// cannot be decrypted.
    pub fn open(mut codec: C) -> Result<Self, CodecError> {
        let db = codec.load()?;
        Ok(Self {
            store: Store::new(db),
            codec,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    #[cfg(test)]
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Apply `f` to the store, then save the whole database. If the save
    /// fails the store is restored to its state before `f`.
    pub fn commit<R>(&mut self, f: impl FnOnce(&mut Store) -> R) -> Result<R, CodecError> {
        let snapshot = self.store.clone();
        let out = f(&mut self.store);
        if let Err(e) = self.codec.save(self.store.database()) {
            self.store = snapshot;
            return Err(e);
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Whether `app_name` authenticated by `app_key` may access `table`.
    pub fn authorize(&self, app_name: &str, app_key: &str, table: &str) -> bool {
        let table = normalize_table_name(table);
        if table.is_empty() || is_restricted(&table) {
            return false;
        }

        let registered = self.store.any(
            APPS_COLLECTION,
            &app_predicate(app_name).with("appKey", app_key),
        );
        if !registered {
            debug!(app = app_name, table = %table, "unknown app or key");
            return false;
        }

        if let Some(grant) = self.find_grant(app_name, &table) {
            return grant.has_access;
        }
        if let Some(grant) = self.find_grant(app_name, WILDCARD_TABLE) {
            return grant.has_access;
        }
        false
    }

    /// The key of a registered app, without creating anything.
    pub fn lookup_key(&self, app_name: &str) -> Option<String> {
        self.store
            .list(APPS_COLLECTION, &app_predicate(app_name))
            .into_iter()
            .find_map(from_record::<AppRegistration>)
            .map(|app| app.app_key)
    }

    /// Every collection reachable through the public surface.
    pub fn list_tables(&self) -> Vec<String> {
        self.store
            .collection_names()
            .filter(|name| !is_restricted(name))
            .map(str::to_owned)
            .collect()
    }

    fn find_grant(&self, app_name: &str, table: &str) -> Option<AccessGrant> {
        self.store
            .list(ACCESS_COLLECTION, &grant_predicate(app_name, table))
            .into_iter()
            .find_map(from_record)
    }

    fn require_app(&self, app_name: &str) -> Result<(), AccessError> {
        require_app_name(app_name)?;
        if self.store.any(APPS_COLLECTION, &app_predicate(app_name)) {
            Ok(())
        } else {
            Err(AccessError::AppNotFound(app_name.to_owned()))
        }
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    /// Return the app's key, registering the app with a new key first if
    /// needed. An existing key is never rotated.
    pub fn provision_key(&mut self, app_name: &str) -> Result<ProvisionedKey, AccessError> {
        require_app_name(app_name)?;
        if let Some(app_key) = self.lookup_key(app_name) {
            return Ok(ProvisionedKey {
                app_key,
                created: false,
            });
        }

        let registration = AppRegistration {
            app_name: app_name.to_owned(),
            app_key: Uuid::new_v4().to_string(),
        };
        self.commit(|store| store.insert_raw(APPS_COLLECTION, to_record(&registration)))?;
        info!(app = app_name, "application key provisioned");
        Ok(ProvisionedKey {
            app_key: registration.app_key,
            created: true,
        })
    }

    /// Set the app's grant on one table, replacing any previous grant on it.
    pub fn grant_table(&mut self, app_name: &str, table: &str, allow: bool) -> Result<(), AccessError> {
        let table = normalize_table_name(table);
        if table.is_empty() {
            return Err(AccessError::EmptyTableName);
        }
        if is_restricted(&table) {
            return Err(AccessError::Restricted(table));
        }
        self.require_app(app_name)?;

        let grant = AccessGrant {
            app_name: app_name.to_owned(),
            table_name: table.clone(),
            has_access: allow,
        };
        self.commit(|store| {
            store.remove_by_predicate(ACCESS_COLLECTION, &grant_predicate(app_name, &table));
            store.insert_raw(ACCESS_COLLECTION, to_record(&grant));
        })?;
        info!(app = app_name, table = %table, allow, "table grant set");
        Ok(())
    }

    /// Replace every grant of the app with a single wildcard allow.
    pub fn grant_all_tables(&mut self, app_name: &str) -> Result<(), AccessError> {
        self.require_app(app_name)?;
        let grant = AccessGrant {
            app_name: app_name.to_owned(),
            table_name: WILDCARD_TABLE.to_owned(),
            has_access: true,
        };
        self.commit(|store| {
            store.remove_by_predicate(ACCESS_COLLECTION, &app_predicate(app_name));
            store.insert_raw(ACCESS_COLLECTION, to_record(&grant));
        })?;
        info!(app = app_name, "all tables allowed");
        Ok(())
    }

    /// Remove every grant of the app, leaving it default-denied.
    pub fn deny_all_tables(&mut self, app_name: &str) -> Result<(), AccessError> {
        self.require_app(app_name)?;
        self.commit(|store| {
            store.ensure_collection(ACCESS_COLLECTION);
            store.remove_by_predicate(ACCESS_COLLECTION, &app_predicate(app_name));
        })?;
        info!(app = app_name, "all tables denied");
        Ok(())
    }

    /// Remove the app's registration and all of its grants. Returns whether
    /// the app was registered.
    pub fn revoke_app(&mut self, app_name: &str) -> Result<bool, AccessError> {
        require_app_name(app_name)?;
        let removed = self.commit(|store| {
            store.ensure_collection(APPS_COLLECTION);
            store.ensure_collection(ACCESS_COLLECTION);
            let apps = store.remove_by_predicate(APPS_COLLECTION, &app_predicate(app_name));
            store.remove_by_predicate(ACCESS_COLLECTION, &app_predicate(app_name));
            apps > 0
        })?;
        info!(app = app_name, existed = removed, "application revoked");
        Ok(removed)
    }

    /// Drop a collection and every grant on it. Grants are removed even when
    /// the collection itself does not exist.
    pub fn drop_table(&mut self, table: &str) -> Result<DroppedTable, AccessError> {
        let table = normalize_table_name(table);
        if table.is_empty() {
            return Err(AccessError::EmptyTableName);
        }
        if is_restricted(&table) {
            return Err(AccessError::Restricted(table));
        }
        let dropped = self.commit(|store| DroppedTable {
            grants_removed: store
                .remove_by_predicate(ACCESS_COLLECTION, &Predicate::all().with("tableName", table.as_str())),
            existed: store.drop_collection(&table),
        })?;
        info!(
            table = %table,
            existed = dropped.existed,
            grants_removed = dropped.grants_removed,
            "table dropped"
        );
        Ok(dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::memory::MemoryCodec;
    use crate::codec::MockCodec;
    use crate::store::{Database, Record};
    use serde_json::json;

    fn controller() -> AccessController<MemoryCodec> {
        AccessController::open(MemoryCodec::new()).unwrap()
    }

    fn grants_for(ctl: &AccessController<MemoryCodec>, app: &str) -> Vec<AccessGrant> {
        ctl.store()
            .list(ACCESS_COLLECTION, &app_predicate(app))
            .into_iter()
            .filter_map(from_record)
            .collect()
    }

    #[test]
    fn restricted_tables_always_denied() {
        let mut ctl = controller();
        let key = ctl.provision_key("app1").unwrap().app_key;
        ctl.grant_all_tables("app1").unwrap();
        for table in ["mapps", "maccess", "mApps", "MACCESS"] {
            assert!(!ctl.authorize("app1", &key, table), "{table}");
        }
    }

    #[test]
    fn grants_on_restricted_tables_are_refused() {
        let mut ctl = controller();
        ctl.provision_key("app1").unwrap();
        assert!(matches!(
            ctl.grant_table("app1", "mApps", true),
            Err(AccessError::Restricted(_))
        ));
        assert!(grants_for(&ctl, "app1").is_empty());
    }

    #[test]
    fn provision_key_is_idempotent() {
        let mut ctl = controller();
        let first = ctl.provision_key("app1").unwrap();
        let second = ctl.provision_key("app1").unwrap();
        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.app_key, second.app_key);
        assert_eq!(
            ctl.store().list(APPS_COLLECTION, &Predicate::all()).len(),
            1
        );
        assert_eq!(ctl.codec().saves, 1);
    }

    #[test]
    fn lookup_key_creates_nothing() {
        let mut ctl = controller();
        assert!(ctl.lookup_key("ghost").is_none());
        let key = ctl.provision_key("app1").unwrap().app_key;
        assert_eq!(ctl.lookup_key("app1"), Some(key));
        assert_eq!(ctl.codec().saves, 1);
    }

    #[test]
    fn repeated_grants_leave_one_record_with_last_flag() {
        let mut ctl = controller();
        ctl.provision_key("app1").unwrap();
        ctl.grant_table("app1", "widgets", true).unwrap();
        ctl.grant_table("app1", "Widgets", false).unwrap();
        ctl.grant_table("app1", "widgets", true).unwrap();
        ctl.grant_table("app1", "widgets", false).unwrap();

        let grants = grants_for(&ctl, "app1");
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].table_name, "widgets");
        assert!(!grants[0].has_access);
    }

    #[test]
    fn exact_deny_beats_wildcard_allow() {
        let mut ctl = controller();
        let key = ctl.provision_key("app").unwrap().app_key;
        ctl.grant_all_tables("app").unwrap();
        ctl.grant_table("app", "orders", false).unwrap();
        assert!(!ctl.authorize("app", &key, "orders"));
        assert!(ctl.authorize("app", &key, "invoices"));
    }

    #[test]
    fn registered_app_without_grants_is_denied() {
        let mut ctl = controller();
        let key = ctl.provision_key("app").unwrap().app_key;
        assert!(!ctl.authorize("app", &key, "widgets"));
    }

    #[test]
    fn wrong_key_or_unknown_app_is_denied() {
        let mut ctl = controller();
        let key = ctl.provision_key("app").unwrap().app_key;
        ctl.grant_all_tables("app").unwrap();
        assert!(!ctl.authorize("app", "not-the-key", "widgets"));
        assert!(!ctl.authorize("other", &key, "widgets"));
        assert!(!ctl.authorize("APP", &key, "widgets"));
    }

    #[test]
    fn wildcard_table_name_is_never_authorized() {
        let mut ctl = controller();
        let key = ctl.provision_key("app").unwrap().app_key;
        ctl.grant_all_tables("app").unwrap();
        assert!(!ctl.authorize("app", &key, "*"));
        assert!(!ctl.authorize("app", &key, ""));
    }

    #[test]
    fn deny_all_then_allow_all_leaves_one_wildcard_grant() {
        let mut ctl = controller();
        ctl.provision_key("app").unwrap();
        for table in ["a", "b", "c"] {
            ctl.grant_table("app", table, true).unwrap();
        }
        ctl.deny_all_tables("app").unwrap();
        assert!(grants_for(&ctl, "app").is_empty());
        ctl.grant_all_tables("app").unwrap();

        assert_eq!(
            grants_for(&ctl, "app"),
            vec![AccessGrant {
                app_name: "app".into(),
                table_name: "*".into(),
                has_access: true,
            }]
        );
    }

    #[test]
    fn grant_operations_require_registration() {
        let mut ctl = controller();
        assert!(matches!(
            ctl.grant_table("ghost", "widgets", true),
            Err(AccessError::AppNotFound(_))
        ));
        assert!(matches!(
            ctl.grant_all_tables("ghost"),
            Err(AccessError::AppNotFound(_))
        ));
        assert!(matches!(
            ctl.deny_all_tables("ghost"),
            Err(AccessError::AppNotFound(_))
        ));
        assert_eq!(ctl.codec().saves, 0);
    }

    #[test]
    fn grants_do_not_leak_between_apps() {
        let mut ctl = controller();
        ctl.provision_key("app1").unwrap();
        ctl.provision_key("app2").unwrap();
        ctl.grant_table("app1", "widgets", true).unwrap();
        ctl.grant_table("app2", "widgets", false).unwrap();
        ctl.deny_all_tables("app1").unwrap();
        assert_eq!(grants_for(&ctl, "app2").len(), 1);
    }

    #[test]
    fn provision_allow_then_revoke_scenario() {
        let mut ctl = controller();
        let key1 = ctl.provision_key("app1").unwrap().app_key;
        ctl.grant_table("app1", "widgets", true).unwrap();
        assert!(ctl.authorize("app1", &key1, "widgets"));
        assert!(!ctl.authorize("app1", &key1, "gadgets"));

        assert!(ctl.revoke_app("app1").unwrap());
        assert!(!ctl.authorize("app1", &key1, "widgets"));
        assert!(grants_for(&ctl, "app1").is_empty());
        assert!(ctl.lookup_key("app1").is_none());
    }

    #[test]
    fn revoking_unknown_app_is_not_an_error() {
        let mut ctl = controller();
        assert!(!ctl.revoke_app("ghost").unwrap());
    }

    #[test]
    fn drop_table_removes_collection_and_its_grants() {
        let mut ctl = controller();
        ctl.provision_key("app").unwrap();
        ctl.grant_table("app", "widgets", true).unwrap();
        ctl.grant_table("app", "gadgets", true).unwrap();
        ctl.commit(|s| s.create("widgets", Record::new())).unwrap();

        let dropped = ctl.drop_table("Widgets").unwrap();
        assert!(dropped.existed);
        assert_eq!(dropped.grants_removed, 1);
        assert!(!ctl.list_tables().contains(&"widgets".to_owned()));
        let tables: Vec<_> = grants_for(&ctl, "app")
            .into_iter()
            .map(|g| g.table_name)
            .collect();
        assert_eq!(tables, vec!["gadgets".to_owned()]);
    }

    #[test]
    fn drop_missing_table_still_removes_its_grants() {
        let mut ctl = controller();
        ctl.provision_key("app").unwrap();
        ctl.grant_table("app", "ghosts", true).unwrap();

        let dropped = ctl.drop_table("ghosts").unwrap();
        assert_eq!(
            dropped,
            DroppedTable {
                existed: false,
                grants_removed: 1
            }
        );
        assert!(grants_for(&ctl, "app").is_empty());
    }

    #[test]
    fn drop_table_refuses_restricted_names() {
        let mut ctl = controller();
        for table in ["mapps", "mAccess"] {
            assert!(matches!(
                ctl.drop_table(table),
                Err(AccessError::Restricted(_))
            ));
        }
        assert!(ctl.store().database().collection(APPS_COLLECTION).is_some());
        assert_eq!(ctl.codec().saves, 0);
    }

    #[test]
    fn list_tables_hides_reserved_collections() {
        let mut ctl = controller();
        ctl.commit(|s| s.create("widgets", Record::new())).unwrap();
        assert_eq!(ctl.list_tables(), vec!["widgets".to_owned()]);
    }

    #[test]
    fn mutations_persist_whole_database() {
        let mut ctl = controller();
        ctl.provision_key("app1").unwrap();
        ctl.grant_table("app1", "widgets", true).unwrap();
        let image = ctl.codec().image().unwrap();
        assert_eq!(image["mApps"].as_array().unwrap().len(), 1);
        assert_eq!(
            image["mAccess"],
            json!([{"appName": "app1", "tableName": "widgets", "hasAccess": true}])
        );
    }

    #[test]
    fn authorize_never_saves() {
        let mut codec = MockCodec::new();
        codec.expect_load().times(1).returning(|| Ok(Database::default()));
        codec.expect_save().never();
        let ctl = AccessController::open(codec).unwrap();
        assert!(!ctl.authorize("app", "key", "widgets"));
    }

    #[test]
    fn save_failure_is_reported() {
        let mut codec = MockCodec::new();
        codec.expect_load().returning(|| Ok(Database::default()));
        codec.expect_save().times(1).returning(|_| {
            Err(CodecError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        });
        let mut ctl = AccessController::open(codec).unwrap();
        assert!(matches!(
            ctl.provision_key("app"),
            Err(AccessError::Codec(CodecError::Io(_)))
        ));
    }

    fn failing_save_codec() -> MockCodec {
        let mut codec = MockCodec::new();
        codec.expect_load().returning(|| Ok(Database::default()));
        codec
            .expect_save()
            .returning(|_| Err(CodecError::Io(std::io::Error::other("disk full"))));
        codec
    }

    #[test]
    fn failed_save_rolls_back_mutation() {
        let mut ctl = AccessController::open(failing_save_codec()).unwrap();
        assert!(ctl.commit(|s| s.create("widgets", Record::new())).is_err());
        assert!(ctl.store().list("widgets", &Predicate::all()).is_empty());
        assert!(!ctl.list_tables().contains(&"widgets".to_owned()));
    }

    #[test]
    fn failed_provision_leaves_app_unregistered() {
        let mut ctl = AccessController::open(failing_save_codec()).unwrap();
        assert!(ctl.provision_key("app1").is_err());
        assert!(ctl.lookup_key("app1").is_none());
        assert!(ctl.provision_key("app1").is_err());
    }

    #[test]
    fn empty_app_name_is_rejected() {
        let mut ctl = controller();
        for name in ["", "   "] {
            assert!(matches!(ctl.provision_key(name), Err(AccessError::EmptyAppName)));
            assert!(matches!(
                ctl.grant_table(name, "widgets", true),
                Err(AccessError::EmptyAppName)
            ));
            assert!(matches!(ctl.grant_all_tables(name), Err(AccessError::EmptyAppName)));
            assert!(matches!(ctl.revoke_app(name), Err(AccessError::EmptyAppName)));
            assert!(ctl.lookup_key(name).is_none());
        }
        assert_eq!(ctl.codec().saves, 0);
    }
}
