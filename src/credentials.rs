//! Credential Store
//!
//! Flat JSON file of `{"users": {"<name>": "<digest>"}}` gating the client UI.
//! Digests are `sha256$<salt hex>$<hex(sha256(salt || password))>`; legacy
//! unsalted 64-hex SHA-256 digests still verify and are replaced on reset.
//!
//! A missing file is an empty store. An unreadable or corrupt file fails
//! logins and makes signup and reset return an error without touching it.
//! Every load-modify-save cycle holds the store's writer lock, and the file
//! is replaced by rename so readers never see a partial write.

use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SCHEME: &str = "sha256";
const SALT_BYTES: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("Credential store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential store encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupOutcome {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    Updated,
    NotFound,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserFile {
    #[serde(default)]
    users: BTreeMap<String, String>,
}

#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the user exists and the password matches
    pub fn verify(&self, username: &str, password: &str) -> bool {
        if username.is_empty() {
            return false;
        }
        match self.read_users() {
            Ok(file) => file
                .users
                .get(username)
                .is_some_and(|stored| digest_matches(stored, password)),
            Err(e) => {
                tracing::warn!("Credential store {:?} unavailable: {}", self.path, e);
                false
            }
        }
    }

    pub fn create(&self, username: &str, password: &str) -> Result<SignupOutcome, CredentialError> {
        require_non_empty(username, password)?;

        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = self.read_users()?;
        if file.users.contains_key(username) {
            return Ok(SignupOutcome::AlreadyExists);
        }

        file.users.insert(username.to_string(), hash_password(password));
        self.write_users(&file)?;
        tracing::info!("Created account '{}'", username);
        Ok(SignupOutcome::Created)
    }

    pub fn reset(&self, username: &str, new_password: &str) -> Result<ResetOutcome, CredentialError> {
        require_non_empty(username, new_password)?;

        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = self.read_users()?;
        let Some(stored) = file.users.get_mut(username) else {
            return Ok(ResetOutcome::NotFound);
        };

        *stored = hash_password(new_password);
        self.write_users(&file)?;
        tracing::info!("Reset password for '{}'", username);
        Ok(ResetOutcome::Updated)
    }

    fn read_users(&self) -> Result<UserFile, CredentialError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(UserFile::default()),
            Err(e) => return Err(e.into()),
        };

        Ok(serde_json::from_str(&contents)?)
    }

    fn write_users(&self, file: &UserFile) -> Result<(), CredentialError> {
        let json = serde_json::to_string_pretty(file)?;

        let mut tmp_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "users.json".into());
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

fn require_non_empty(username: &str, password: &str) -> Result<(), CredentialError> {
    if username.is_empty() {
        return Err(CredentialError::EmptyField("username"));
    }
    if password.is_empty() {
        return Err(CredentialError::EmptyField("password"));
    }
    Ok(())
}

/// Salted digest in `sha256$<salt>$<hash>` form
pub fn hash_password(password: &str) -> String {
    let salt: [u8; SALT_BYTES] = rand::thread_rng().gen();
    let salt_hex = to_hex(&salt);
    format!("{}${}${}", SCHEME, salt_hex, salted_sha256(&salt_hex, password))
}

fn salted_sha256(salt_hex: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn digest_matches(stored: &str, password: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    match parts.as_slice() {
        [SCHEME, salt_hex, hash] => constant_time_eq(&salted_sha256(salt_hex, password), hash),
        // Unsalted legacy digest
        [hash] if hash.len() == 64 => {
            constant_time_eq(&format!("{:x}", Sha256::digest(password.as_bytes())), hash)
        }
        _ => false,
    }
}

/// Byte comparison that inspects every byte regardless of where they differ
fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> CredentialStore {
        let dir = std::env::temp_dir().join(format!(
            "crop_advisor_credentials_{}_{}",
            name,
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("users.json");
        let _ = fs::remove_file(&path);
        CredentialStore::new(path)
    }

    #[test]
    fn test_signup_then_verify() {
        let store = temp_store("signup");
        assert_eq!(store.create("alice", "s3cret").unwrap(), SignupOutcome::Created);
        assert!(store.verify("alice", "s3cret"));
        assert!(!store.verify("alice", "wrong"));
        assert!(!store.verify("bob", "s3cret"));
    }

    #[test]
    fn test_duplicate_signup() {
        let store = temp_store("duplicate");
        store.create("alice", "one").unwrap();
        assert_eq!(store.create("alice", "two").unwrap(), SignupOutcome::AlreadyExists);
        assert!(store.verify("alice", "one"));
    }

    #[test]
    fn test_reset() {
        let store = temp_store("reset");
        assert_eq!(store.reset("ghost", "pw").unwrap(), ResetOutcome::NotFound);

        store.create("alice", "old").unwrap();
        assert_eq!(store.reset("alice", "new").unwrap(), ResetOutcome::Updated);
        assert!(store.verify("alice", "new"));
        assert!(!store.verify("alice", "old"));
    }

    #[test]
    fn test_digests_are_salted() {
        let store = temp_store("salted");
        store.create("alice", "same").unwrap();
        store.create("bob", "same").unwrap();

        let file: UserFile = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_ne!(file.users["alice"], file.users["bob"]);
        assert!(file.users["alice"].starts_with("sha256$"));
        assert!(!file.users["alice"].contains("same"));
    }

    #[test]
    fn test_legacy_digest_verifies_and_upgrades() {
        let store = temp_store("legacy");
        let legacy = format!("{:x}", Sha256::digest(b"hunter2"));
        fs::write(store.path(), format!(r#"{{"users": {{"carol": "{}"}}}}"#, legacy)).unwrap();

        assert!(store.verify("carol", "hunter2"));
        store.reset("carol", "hunter3").unwrap();

        let file: UserFile = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert!(file.users["carol"].starts_with("sha256$"));
        assert!(store.verify("carol", "hunter3"));
    }

    #[test]
    fn test_corrupt_file_is_left_untouched() {
        let store = temp_store("corrupt");
        store.create("alice", "pw1").unwrap();
        store.create("bob", "pw2").unwrap();

        // Trailing comma makes the file invalid JSON
        let valid = fs::read_to_string(store.path()).unwrap();
        let corrupt = valid.trim_end().trim_end_matches('}').trim_end().to_string() + ",}";
        fs::write(store.path(), &corrupt).unwrap();

        assert!(!store.verify("alice", "pw1"));
        assert!(matches!(store.create("carol", "pw3"), Err(CredentialError::Encoding(_))));
        assert!(matches!(store.reset("bob", "new"), Err(CredentialError::Encoding(_))));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), corrupt);
    }

    #[test]
    fn test_unreadable_store_is_an_io_error() {
        let store = temp_store("unreadable");
        // A directory in place of the file fails to read with something other than NotFound
        fs::create_dir_all(store.path()).unwrap();
        assert!(!store.verify("alice", "pw"));
        assert!(matches!(store.create("alice", "pw"), Err(CredentialError::Io(_))));
        fs::remove_dir(store.path()).unwrap();
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc123", "abc123"));
        assert!(!constant_time_eq("abc123", "abc124"));
        assert!(!constant_time_eq("abc", "abc123"));
        assert!(constant_time_eq("", ""));
    }

    #[test]
    fn test_empty_fields_rejected() {
        let store = temp_store("empty");
        assert!(matches!(store.create("", "pw"), Err(CredentialError::EmptyField("username"))));
        assert!(matches!(store.create("alice", ""), Err(CredentialError::EmptyField("password"))));
        assert!(!store.verify("", ""));
    }
}
