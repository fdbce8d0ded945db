//! `SQLite` storage for the driver roster.
//!
//! Persists the followed-driver list and per-driver shared keys. All data is
//! stored locally on the rider's device; the roster (who the rider follows)
//! is never published to relays.
//!
//! # Privacy
//!
//! The shared-key table holds raw secret bytes. The database file carries
//! the same sensitivity as the rider's identity key and must live in
//! app-private storage.

// SQLite operations need to hold the lock for the duration of the operation.
// Dropping the guard earlier would require restructuring all methods.
#![allow(clippy::significant_drop_tightening)]

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use nostr::{PublicKey, Timestamp};
use rusqlite::{params, Connection, OptionalExtension};

use super::error::{Result, RosterError};
use super::types::FollowedDriver;
use crate::keys::{KeyError, KeyStore, SharedKey};

/// `SQLite`-based storage for the roster and shared keys.
///
/// Thread-safe wrapper around a `SQLite` connection. Implements [`KeyStore`]
/// so the acceptance pipeline and staleness monitor can read keys directly
/// from the same database the roster lives in.
pub struct RosterStorage {
    conn: Mutex<Connection>,
}

impl RosterStorage {
    /// Creates a new storage instance at the given path.
    ///
    /// Creates the database file and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or initialized.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.initialize_schema()?;
        Ok(storage)
    }

    /// Creates an in-memory storage instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.initialize_schema()?;
        Ok(storage)
    }

    /// Initializes the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock_conn()?;

        conn.execute_batch(
            r"
            -- Followed drivers (local only, never published)
            CREATE TABLE IF NOT EXISTS followed_drivers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pubkey TEXT NOT NULL UNIQUE,
                note TEXT,
                added_at INTEGER NOT NULL
            );

            -- At most one active shared key per driver
            CREATE TABLE IF NOT EXISTS shared_keys (
                driver_pubkey TEXT PRIMARY KEY,
                secret_key BLOB NOT NULL,
                version INTEGER NOT NULL,
                key_updated_at INTEGER NOT NULL
            );
            ",
        )?;

        Ok(())
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RosterError::Storage(format!("Failed to acquire database lock: {e}")))
    }

    // ==================== Roster Operations ====================

    /// Adds a driver to the roster.
    ///
    /// If the driver is already followed, the note is updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn follow_driver(
        &self,
        pubkey: &PublicKey,
        note: Option<&str>,
        added_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.lock_conn()?;

        conn.execute(
            r"
            INSERT INTO followed_drivers (pubkey, note, added_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(pubkey) DO UPDATE SET
                note = excluded.note
            ",
            params![pubkey.to_hex(), note, added_at.timestamp()],
        )?;

        Ok(())
    }

    /// Removes a driver from the roster, along with any shared key.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::NotFound`] if the driver is not followed, or
    /// an error if the database operation fails.
    pub fn unfollow_driver(&self, pubkey: &PublicKey) -> Result<()> {
        let conn = self.lock_conn()?;
        let hex = pubkey.to_hex();

        conn.execute(
            "DELETE FROM shared_keys WHERE driver_pubkey = ?1",
            params![hex],
        )?;
        let rows = conn.execute(
            "DELETE FROM followed_drivers WHERE pubkey = ?1",
            params![hex],
        )?;

        if rows == 0 {
            return Err(RosterError::NotFound(hex));
        }

        Ok(())
    }

    /// Retrieves a followed driver with their shared key, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or a stored row is
    /// corrupt.
    pub fn get_driver(&self, pubkey: &PublicKey) -> Result<Option<FollowedDriver>> {
        let conn = self.lock_conn()?;

        let result = conn
            .query_row(
                r"
                SELECT d.pubkey, d.note, d.added_at,
                       k.secret_key, k.version, k.key_updated_at
                FROM followed_drivers d
                LEFT JOIN shared_keys k ON k.driver_pubkey = d.pubkey
                WHERE d.pubkey = ?1
                ",
                params![pubkey.to_hex()],
                row_to_raw,
            )
            .optional()?;

        result.map(raw_to_driver).transpose()
    }

    /// Retrieves all followed drivers with their shared keys, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or a stored row is
    /// corrupt.
    pub fn list_drivers(&self) -> Result<Vec<FollowedDriver>> {
        let conn = self.lock_conn()?;

        let mut stmt = conn.prepare(
            r"
            SELECT d.pubkey, d.note, d.added_at,
                   k.secret_key, k.version, k.key_updated_at
            FROM followed_drivers d
            LEFT JOIN shared_keys k ON k.driver_pubkey = d.pubkey
            ORDER BY d.added_at, d.pubkey
            ",
        )?;

        let rows = stmt
            .query_map([], row_to_raw)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(raw_to_driver).collect()
    }

    // ==================== Shared Key Operations ====================

    /// Saves (or rotates) the shared key for a driver.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn save_shared_key(&self, driver: &PublicKey, key: &SharedKey) -> Result<()> {
        let conn = self.lock_conn()?;

        conn.execute(
            r"
            INSERT INTO shared_keys (driver_pubkey, secret_key, version, key_updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(driver_pubkey) DO UPDATE SET
                secret_key = excluded.secret_key,
                version = excluded.version,
                key_updated_at = excluded.key_updated_at
            ",
            params![
                driver.to_hex(),
                key.secret_bytes().as_slice(),
                key.version,
                i64::try_from(key.key_updated_at.as_u64())
                    .map_err(|_| RosterError::Storage("key_updated_at overflow".to_string()))?,
            ],
        )?;

        Ok(())
    }

    /// Retrieves the shared key for a driver.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or the stored key
    /// material is corrupt.
    pub fn get_shared_key(&self, driver: &PublicKey) -> Result<Option<SharedKey>> {
        let conn = self.lock_conn()?;

        let result = conn
            .query_row(
                r"
                SELECT secret_key, version, key_updated_at
                FROM shared_keys
                WHERE driver_pubkey = ?1
                ",
                params![driver.to_hex()],
                |row| {
                    let secret_key: Vec<u8> = row.get(0)?;
                    let version: u32 = row.get(1)?;
                    let key_updated_at: i64 = row.get(2)?;
                    Ok((secret_key, version, key_updated_at))
                },
            )
            .optional()?;

        match result {
            Some((secret_key, version, key_updated_at)) => {
                Ok(Some(build_shared_key(&secret_key, version, key_updated_at)?))
            }
            None => Ok(None),
        }
    }

    /// Deletes the shared key for a driver, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_shared_key(&self, driver: &PublicKey) -> Result<()> {
        let conn = self.lock_conn()?;

        conn.execute(
            "DELETE FROM shared_keys WHERE driver_pubkey = ?1",
            params![driver.to_hex()],
        )?;

        Ok(())
    }
}

impl KeyStore for RosterStorage {
    fn shared_key(&self, driver: &PublicKey) -> crate::keys::Result<Option<SharedKey>> {
        self.get_shared_key(driver)
            .map_err(|e| KeyError::Store(e.to_string()))
    }

    fn put_shared_key(&self, driver: &PublicKey, key: SharedKey) -> crate::keys::Result<()> {
        self.save_shared_key(driver, &key)
            .map_err(|e| KeyError::Store(e.to_string()))
    }

    fn remove_shared_key(&self, driver: &PublicKey) -> crate::keys::Result<()> {
        self.delete_shared_key(driver)
            .map_err(|e| KeyError::Store(e.to_string()))
    }
}

type RawRow = (
    String,
    Option<String>,
    i64,
    Option<Vec<u8>>,
    Option<u32>,
    Option<i64>,
);

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn raw_to_driver(raw: RawRow) -> Result<FollowedDriver> {
    let (pubkey_hex, note, added_at, secret_key, version, key_updated_at) = raw;

    let pubkey = PublicKey::from_hex(&pubkey_hex)
        .map_err(|e| RosterError::InvalidData(format!("Invalid pubkey: {e}")))?;

    let added_at = DateTime::from_timestamp(added_at, 0)
        .ok_or_else(|| RosterError::InvalidData(format!("Invalid added_at: {added_at}")))?;

    let shared_key = match (secret_key, version, key_updated_at) {
        (Some(secret_key), Some(version), Some(key_updated_at)) => {
            Some(build_shared_key(&secret_key, version, key_updated_at)?)
        }
        _ => None,
    };

    Ok(FollowedDriver {
        pubkey,
        note,
        added_at,
        shared_key,
    })
}

fn build_shared_key(secret_key: &[u8], version: u32, key_updated_at: i64) -> Result<SharedKey> {
    let secret_bytes: [u8; 32] = secret_key
        .try_into()
        .map_err(|_| RosterError::InvalidData("Invalid secret key length".to_string()))?;

    let key_updated_at = u64::try_from(key_updated_at)
        .map_err(|_| RosterError::InvalidData(format!("Invalid key_updated_at: {key_updated_at}")))?;

    SharedKey::from_secret_bytes(secret_bytes, version, Timestamp::from(key_updated_at))
        .map_err(|e| RosterError::InvalidData(format!("Invalid key material: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostr::Keys;

    fn test_driver() -> PublicKey {
        Keys::generate().public_key()
    }

    #[test]
    fn follow_and_get_driver() {
        let storage = RosterStorage::in_memory().unwrap();
        let driver = test_driver();
        let added_at = DateTime::from_timestamp(1_000_000, 0).unwrap();

        storage
            .follow_driver(&driver, Some("airport regular"), added_at)
            .unwrap();

        let followed = storage.get_driver(&driver).unwrap().unwrap();
        assert_eq!(followed.pubkey, driver);
        assert_eq!(followed.note.as_deref(), Some("airport regular"));
        assert_eq!(followed.added_at, added_at);
        assert!(!followed.has_key());
    }

    #[test]
    fn get_nonexistent_driver_returns_none() {
        let storage = RosterStorage::in_memory().unwrap();
        assert!(storage.get_driver(&test_driver()).unwrap().is_none());
    }

    #[test]
    fn follow_updates_existing_note() {
        let storage = RosterStorage::in_memory().unwrap();
        let driver = test_driver();
        let added_at = Utc::now();

        storage.follow_driver(&driver, None, added_at).unwrap();
        storage
            .follow_driver(&driver, Some("updated"), added_at)
            .unwrap();

        let followed = storage.get_driver(&driver).unwrap().unwrap();
        assert_eq!(followed.note.as_deref(), Some("updated"));
        assert_eq!(storage.list_drivers().unwrap().len(), 1);
    }

    #[test]
    fn unfollow_removes_driver_and_key() {
        let storage = RosterStorage::in_memory().unwrap();
        let driver = test_driver();

        storage.follow_driver(&driver, None, Utc::now()).unwrap();
        storage
            .save_shared_key(&driver, &SharedKey::generate(1, Timestamp::from(100u64)))
            .unwrap();

        storage.unfollow_driver(&driver).unwrap();

        assert!(storage.get_driver(&driver).unwrap().is_none());
        assert!(storage.get_shared_key(&driver).unwrap().is_none());
    }

    #[test]
    fn unfollow_nonexistent_fails() {
        let storage = RosterStorage::in_memory().unwrap();
        let result = storage.unfollow_driver(&test_driver());
        assert!(matches!(result, Err(RosterError::NotFound(_))));
    }

    #[test]
    fn save_and_get_shared_key() {
        let storage = RosterStorage::in_memory().unwrap();
        let driver = test_driver();
        let key = SharedKey::generate(3, Timestamp::from(500u64));

        storage.save_shared_key(&driver, &key).unwrap();

        let fetched = storage.get_shared_key(&driver).unwrap().unwrap();
        assert!(fetched.material_eq(&key));
        assert_eq!(fetched.version, 3);
        assert_eq!(fetched.key_updated_at, Timestamp::from(500u64));
        assert_eq!(fetched.public_key(), key.public_key());
    }

    #[test]
    fn save_shared_key_rotates_existing() {
        let storage = RosterStorage::in_memory().unwrap();
        let driver = test_driver();

        storage
            .save_shared_key(&driver, &SharedKey::generate(1, Timestamp::from(100u64)))
            .unwrap();
        let rotated = SharedKey::generate(2, Timestamp::from(200u64));
        storage.save_shared_key(&driver, &rotated).unwrap();

        let fetched = storage.get_shared_key(&driver).unwrap().unwrap();
        assert_eq!(fetched.version, 2);
        assert!(fetched.material_eq(&rotated));
    }

    #[test]
    fn delete_shared_key_keeps_roster_entry() {
        let storage = RosterStorage::in_memory().unwrap();
        let driver = test_driver();

        storage.follow_driver(&driver, None, Utc::now()).unwrap();
        storage
            .save_shared_key(&driver, &SharedKey::generate(1, Timestamp::from(100u64)))
            .unwrap();

        storage.delete_shared_key(&driver).unwrap();

        // Back to pending, still followed.
        let followed = storage.get_driver(&driver).unwrap().unwrap();
        assert!(!followed.has_key());
    }

    #[test]
    fn list_drivers_joins_keys_oldest_first() {
        let storage = RosterStorage::in_memory().unwrap();
        let older = test_driver();
        let newer = test_driver();

        storage
            .follow_driver(&newer, None, DateTime::from_timestamp(2_000, 0).unwrap())
            .unwrap();
        storage
            .follow_driver(&older, None, DateTime::from_timestamp(1_000, 0).unwrap())
            .unwrap();
        storage
            .save_shared_key(&older, &SharedKey::generate(1, Timestamp::from(100u64)))
            .unwrap();

        let drivers = storage.list_drivers().unwrap();
        assert_eq!(drivers.len(), 2);
        assert_eq!(drivers[0].pubkey, older);
        assert!(drivers[0].has_key());
        assert_eq!(drivers[1].pubkey, newer);
        assert!(!drivers[1].has_key());
    }

    #[test]
    fn key_store_trait_roundtrip() {
        let storage = RosterStorage::in_memory().unwrap();
        let driver = test_driver();
        let key = SharedKey::generate(1, Timestamp::from(100u64));

        assert!(storage.shared_key(&driver).unwrap().is_none());

        storage.put_shared_key(&driver, key.clone()).unwrap();
        let fetched = KeyStore::shared_key(&storage, &driver).unwrap().unwrap();
        assert!(fetched.material_eq(&key));

        storage.remove_shared_key(&driver).unwrap();
        assert!(KeyStore::shared_key(&storage, &driver).unwrap().is_none());
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.db");
        let driver = test_driver();
        let key = SharedKey::generate(2, Timestamp::from(300u64));

        {
            let storage = RosterStorage::new(&path).unwrap();
            storage.follow_driver(&driver, None, Utc::now()).unwrap();
            storage.save_shared_key(&driver, &key).unwrap();
        }

        let storage = RosterStorage::new(&path).unwrap();
        let followed = storage.get_driver(&driver).unwrap().unwrap();
        assert!(followed.has_key());
        assert!(followed.shared_key.unwrap().material_eq(&key));
    }
}
