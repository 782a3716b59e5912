use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::RwLock;

use serde::Serialize;
use tracing::debug;
use tracing::info;

use crate::catalogue::Catalogue;
use crate::device::Device;
use crate::error::StoreError;

/// Owns the catalogue and its backing file.
///
/// Readers and writers of the in-memory catalogue go through a reader/writer
/// lock. Saving writes the whole document and is serialized by its own lock,
/// independent of any hardware locking done by callers.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    catalogue: RwLock<Catalogue>,
    save_lock: Mutex<()>,
}

impl Store {
    /// Load the catalogue from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let catalogue = read_catalogue(&path)?;

        info!(
            "Loaded catalogue {}: {} devices, {} commands, {} scenarios, {} controls",
            path.display(),
            catalogue.devices.len(),
            catalogue.commands.len(),
            catalogue.scenarios.len(),
            catalogue.controls.len()
        );

        Ok(Self::with_catalogue(path, catalogue))
    }

    /// Load the catalogue, creating an empty file if none exists yet.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        match Self::load(path.as_ref()) {
            Err(StoreError::Read(path, e)) if e.kind() == ErrorKind::NotFound => {
                info!("Catalogue {} does not exist, creating it", path.display());
                let store = Self::with_catalogue(path, Catalogue::default());
                store.save()?;
                Ok(store)
            }
            other => other,
        }
    }

    /// Wrap an in-memory catalogue that will be saved to `path`.
    pub fn with_catalogue(path: impl Into<PathBuf>, catalogue: Catalogue) -> Self {
        Self {
            path: path.into(),
            catalogue: RwLock::new(catalogue),
            save_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against the catalogue under the read lock.
    pub fn read<T>(&self, f: impl FnOnce(&Catalogue) -> T) -> Result<T, StoreError> {
        let catalogue = self.catalogue.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&catalogue))
    }

    /// Clone of the whole catalogue.
    pub fn snapshot(&self) -> Result<Catalogue, StoreError> {
        self.read(Catalogue::clone)
    }

    /// Replace the device stored under `key`.
    pub fn replace_device(&self, key: &str, device: Device) -> Result<(), StoreError> {
        let mut catalogue = self.catalogue.write().map_err(|_| StoreError::Poisoned)?;
        let slot = catalogue
            .devices
            .get_mut(key)
            .ok_or_else(|| StoreError::DeviceNotFound(key.to_string()))?;
        *slot = device;
        Ok(())
    }

    /// Insert or overwrite the device stored under `key`.
    ///
    /// Returns true when the device was not in the catalogue before.
    pub fn upsert_device(&self, key: &str, device: Device) -> Result<bool, StoreError> {
        let mut catalogue = self.catalogue.write().map_err(|_| StoreError::Poisoned)?;
        Ok(catalogue.devices.insert(key.to_string(), device).is_none())
    }

    /// Record the state a control item switched to.
    pub fn set_active_state(
        &self,
        control_id: &str,
        item_id: &str,
        state: &str,
    ) -> Result<(), StoreError> {
        let mut catalogue = self.catalogue.write().map_err(|_| StoreError::Poisoned)?;
        let item = catalogue
            .controls
            .get_mut(control_id)
            .and_then(|c| c.item_mut(item_id))
            .ok_or_else(|| StoreError::ControlItemNotFound {
                control_id: control_id.to_string(),
                item_id: item_id.to_string(),
            })?;
        item.active_state = Some(state.to_string());
        Ok(())
    }

    /// Write the whole catalogue to its backing file.
    ///
    /// The document goes to a sibling temporary file first (with the target's
    /// permissions, when it exists) and is then renamed over the target.
    pub fn save(&self) -> Result<(), StoreError> {
        let _guard = self.save_lock.lock().map_err(|_| StoreError::Poisoned)?;

        let data = {
            let catalogue = self.catalogue.read().map_err(|_| StoreError::Poisoned)?;
            to_pretty_json(&*catalogue)?
        };

        let tmp_path = temporary_path(&self.path);
        fs::write(&tmp_path, &data).map_err(|e| StoreError::Write(tmp_path.clone(), e))?;

        if let Ok(metadata) = fs::metadata(&self.path) {
            fs::set_permissions(&tmp_path, metadata.permissions())
                .map_err(|e| StoreError::Write(tmp_path.clone(), e))?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Write(self.path.clone(), e))?;

        debug!("Saved catalogue to {} ({} bytes)", self.path.display(), data.len());
        Ok(())
    }
}

fn read_catalogue(path: &Path) -> Result<Catalogue, StoreError> {
    let contents = fs::read_to_string(path).map_err(|e| StoreError::Read(path.to_path_buf(), e))?;
    serde_json::from_str(&contents).map_err(|e| StoreError::Parse(path.to_path_buf(), e))
}

fn to_pretty_json(catalogue: &Catalogue) -> Result<Vec<u8>, StoreError> {
    let mut data = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut data, formatter);
    catalogue
        .serialize(&mut serializer)
        .map_err(StoreError::Serialize)?;
    data.push(b'\n');
    Ok(data)
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("catalogue.json"));
    name.push(".tmp");
    path.with_file_name(name)
}
