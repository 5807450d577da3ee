use std::cell::Cell;

use tracing::{debug, info, warn};
use zeolite_core::migrate;
use zeolite_core::{AvailabilityData, DateKey, DayState, Half, SchemaVersion};

use crate::document::{decode_document, encode_document, validate_document};
use crate::error::StoreError;
use crate::kv::Store;
use crate::profile::OwnerProfile;

/// Key of the availability document.
pub const AVAILABILITY_KEY: &str = "zeolite:availability";

/// Key of the owner profile document.
pub const PROFILE_KEY: &str = "zeolite:owner-profile";

/// Loads, saves, imports and exports one owner's availability through a
/// string key-value [`Store`].
///
/// A store built with [`unavailable`](Self::unavailable) has no medium: loads
/// find nothing and saves succeed without effect.
pub struct AvailabilityStore<S> {
    backend: Option<S>,
    owner_id: String,
    /// Set while a load writes a freshly migrated document back.
    migrating: Cell<bool>,
}

impl<S: Store> AvailabilityStore<S> {
    pub fn new(backend: S, owner_id: impl Into<String>) -> Self {
        Self {
            backend: Some(backend),
            owner_id: owner_id.into(),
            migrating: Cell::new(false),
        }
    }

    pub fn unavailable(owner_id: impl Into<String>) -> Self {
        Self {
            backend: None,
            owner_id: owner_id.into(),
            migrating: Cell::new(false),
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Reads the stored document and brings it to the latest schema.
    ///
    /// Returns `None` when nothing is stored. An unreadable document yields
    /// empty data. A legacy document is written back once in its migrated
    /// form.
    pub fn load(&self) -> Result<Option<AvailabilityData>, StoreError> {
        let Some(backend) = &self.backend else {
            debug!("no storage medium, nothing to load");
            return Ok(None);
        };
        let Some(raw) = backend.get(AVAILABILITY_KEY).map_err(StoreError::backend)? else {
            return Ok(None);
        };

        let data = match decode_document(&raw, &self.owner_id) {
            Ok(data) => data,
            Err(err) => {
                warn!(error = %err, "stored availability is unreadable, starting empty");
                return Ok(Some(AvailabilityData::new(self.owner_id.as_str())));
            }
        };

        let found = data.schema_version;
        let data = migrate::upgrade(data);

        if found < SchemaVersion::LATEST && !self.migrating.get() {
            self.migrating.set(true);
            let written = self.save(&data);
            self.migrating.set(false);
            match written {
                Ok(()) => info!(from = %found, to = %SchemaVersion::LATEST, "migrated stored availability"),
                Err(err) => warn!(error = %err, "could not write migrated availability back"),
            }
        }

        Ok(Some(data))
    }

    /// Like [`load`](Self::load), but starts from empty data when nothing is
    /// stored.
    pub fn load_or_default(&self) -> Result<AvailabilityData, StoreError> {
        Ok(self
            .load()?
            .unwrap_or_else(|| AvailabilityData::new(self.owner_id.as_str())))
    }

    pub fn save(&self, data: &AvailabilityData) -> Result<(), StoreError> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };
        let encoded = serde_json::to_string(&encode_document(data))?;
        backend
            .put(AVAILABILITY_KEY, &encoded)
            .map_err(StoreError::backend)?;
        debug!(days = data.days().len(), "saved availability");
        Ok(())
    }

    /// Blocks one half of `date` and saves.
    pub fn block(
        &self,
        data: &mut AvailabilityData,
        date: DateKey,
        half: Half,
        label: Option<String>,
    ) -> Result<DayState, StoreError> {
        let state = data.block(date, half, label);
        self.save(data)?;
        Ok(state)
    }

    /// Unblocks one half of `date` and saves.
    pub fn unblock(
        &self,
        data: &mut AvailabilityData,
        date: DateKey,
        half: Half,
    ) -> Result<DayState, StoreError> {
        let state = data.unblock(date, half);
        self.save(data)?;
        Ok(state)
    }

    /// Applies several changes and saves once.
    pub fn batch<T>(
        &self,
        data: &mut AvailabilityData,
        changes: impl FnOnce(&mut AvailabilityData) -> T,
    ) -> Result<T, StoreError> {
        let out = changes(data);
        self.save(data)?;
        Ok(out)
    }

    /// Validates `payload`, merges its days over the stored ones and saves.
    ///
    /// Imported days replace stored days on the same date. Nothing is written
    /// when validation fails.
    pub fn import(&self, payload: &str) -> Result<AvailabilityData, StoreError> {
        let imported = migrate::upgrade(validate_document(payload)?);
        if imported.owner_id != self.owner_id {
            debug!(imported = %imported.owner_id, owner = %self.owner_id, "importing another owner's days");
        }

        let mut data = self.load_or_default()?;
        let count = imported.days().len();
        for (date, record) in imported.into_days() {
            data.merge_day(date, record);
        }
        self.save(&data)?;
        info!(days = count, "imported availability");
        Ok(data)
    }

    /// Exports the stored availability at the latest schema version.
    pub fn export(&self) -> Result<String, StoreError> {
        self.export_as(SchemaVersion::LATEST)
    }

    /// Exports the stored availability at `version`.
    ///
    /// Exporting as version 1 fails when a day's slot pattern has no version 1
    /// equivalent.
    pub fn export_as(&self, version: SchemaVersion) -> Result<String, StoreError> {
        let data = migrate::migrate(self.load_or_default()?, version)?;
        Ok(serde_json::to_string_pretty(&encode_document(&data))?)
    }

    pub fn load_profile(&self) -> Result<Option<OwnerProfile>, StoreError> {
        let Some(backend) = &self.backend else {
            return Ok(None);
        };
        let Some(raw) = backend.get(PROFILE_KEY).map_err(StoreError::backend)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(profile) => Ok(Some(profile)),
            Err(err) => {
                warn!(error = %err, "stored owner profile is unreadable");
                Ok(None)
            }
        }
    }

    pub fn save_profile(&self, profile: &OwnerProfile) -> Result<(), StoreError> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };
        let encoded = serde_json::to_string(profile)?;
        backend.put(PROFILE_KEY, &encoded).map_err(StoreError::backend)
    }
}
