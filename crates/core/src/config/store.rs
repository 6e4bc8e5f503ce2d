//! Integrity-checked persistent configuration store.
//!
//! Two alternating flash slots hold versioned records with a trailing
//! CRC-32. Loading trusts the highest-sequence slot whose magic,
//! version and CRC all verify; saving writes the *inactive* slot and
//! read-back-verifies it before the new sequence number makes it
//! authoritative. A torn write therefore loses the sequence race to the
//! intact older slot — the record on disk is never half-new.
//!
//! Edits go to a staged working copy; the active snapshot the control
//! loop reads changes only at `commit()`/`save()`, so a configuration
//! session can never produce a torn read.

use crate::fault::FaultFlags;
use crate::pid::{PidGains, PidRole};
use crate::traits::FlashInterface;

use super::crc::{calculate_crc32, validate_crc32};
use super::error::{ConfigError, ConfigFault};
use super::record::{FlightConfig, CONFIG_VERSION, PAYLOAD_SIZE};

/// Record magic, ASCII "QPCF".
pub const CONFIG_MAGIC: u32 = 0x5150_4346;

/// Flash offsets of the two record slots.
pub const SLOT_ADDRESSES: [u32; 2] = [0x0000, 0x1000];

/// Slot header: magic, version, sequence.
const HEADER_SIZE: usize = 8;

/// Full record size at the current version: header + payload + CRC.
pub const RECORD_SIZE: usize = HEADER_SIZE + PAYLOAD_SIZE + 4;

#[derive(Debug, Clone, Copy)]
struct SlotHeader {
    magic: u32,
    version: u16,
    sequence: u16,
}

impl SlotHeader {
    fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic.to_le_bytes());
        buf[4..6].copy_from_slice(&self.version.to_le_bytes());
        buf[6..8].copy_from_slice(&self.sequence.to_le_bytes());
        buf
    }

    fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Self {
        Self {
            magic: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            version: u16::from_le_bytes([buf[4], buf[5]]),
            sequence: u16::from_le_bytes([buf[6], buf[7]]),
        }
    }
}

/// The persistent configuration store.
pub struct ConfigStore<F: FlashInterface> {
    flash: F,
    active: FlightConfig,
    staged: FlightConfig,
    sequence: u16,
    active_slot: Option<u8>,
    last_fault: Option<ConfigFault>,
}

impl<F: FlashInterface> ConfigStore<F> {
    /// Creates a store over `flash` with safe defaults active. Call
    /// [`load`](Self::load) to pull the persisted record.
    pub fn new(flash: F) -> Self {
        Self {
            flash,
            active: FlightConfig::safe_defaults(),
            staged: FlightConfig::safe_defaults(),
            sequence: 0,
            active_slot: None,
            last_fault: None,
        }
    }

    /// Loads the persisted record.
    ///
    /// On success the record becomes both the active and staged copy.
    /// On any failure the hard-coded defaults are substituted with the
    /// history-bad flag set, and the classified fault is returned —
    /// never partial or garbage gains.
    pub fn load(&mut self) -> Result<(), ConfigFault> {
        let mut best: Option<(u8, u16, FlightConfig)> = None;
        let mut worst_fault = ConfigFault::Empty;

        for (slot, &address) in SLOT_ADDRESSES.iter().enumerate() {
            match self.read_slot(address) {
                Ok((sequence, config)) => {
                    let newer = match &best {
                        Some((_, best_seq, _)) => sequence > *best_seq,
                        None => true,
                    };
                    if newer {
                        best = Some((slot as u8, sequence, config));
                    }
                }
                Err(fault) => worst_fault = escalate(worst_fault, fault),
            }
        }

        match best {
            Some((slot, sequence, config)) => {
                self.active = config.clone();
                self.staged = config;
                self.sequence = sequence;
                self.active_slot = Some(slot);
                self.last_fault = None;
                Ok(())
            }
            None => {
                let mut defaults = FlightConfig::safe_defaults();
                defaults.history_bad = true;
                self.active = defaults.clone();
                self.staged = defaults;
                self.sequence = 0;
                self.active_slot = None;
                self.last_fault = Some(worst_fault);
                Err(worst_fault)
            }
        }
    }

    fn read_slot(&mut self, address: u32) -> Result<(u16, FlightConfig), ConfigFault> {
        let mut header_buf = [0u8; HEADER_SIZE];
        self.flash
            .read(address, &mut header_buf)
            .map_err(|_| ConfigFault::IntegrityMismatch)?;
        let header = SlotHeader::from_bytes(&header_buf);

        if header.magic != CONFIG_MAGIC {
            return Err(ConfigFault::Empty);
        }

        let payload_size = FlightConfig::payload_size_for(header.version)
            .ok_or(ConfigFault::VersionMismatch {
                found: header.version,
            })?;

        let mut payload = [0u8; PAYLOAD_SIZE];
        let payload = &mut payload[..payload_size];
        self.flash
            .read(address + HEADER_SIZE as u32, payload)
            .map_err(|_| ConfigFault::IntegrityMismatch)?;

        let mut crc_buf = [0u8; 4];
        self.flash
            .read(address + (HEADER_SIZE + payload_size) as u32, &mut crc_buf)
            .map_err(|_| ConfigFault::IntegrityMismatch)?;
        let stored_crc = u32::from_le_bytes(crc_buf);

        let mut covered = heapless::Vec::<u8, { HEADER_SIZE + PAYLOAD_SIZE }>::new();
        covered
            .extend_from_slice(&header_buf)
            .map_err(|_| ConfigFault::IntegrityMismatch)?;
        covered
            .extend_from_slice(payload)
            .map_err(|_| ConfigFault::IntegrityMismatch)?;
        if !validate_crc32(&covered, stored_crc) {
            return Err(ConfigFault::IntegrityMismatch);
        }

        let config = FlightConfig::decode(header.version, payload)
            .ok_or(ConfigFault::IntegrityMismatch)?;
        Ok((header.sequence, config))
    }

    /// Persists the staged record and publishes it as active.
    ///
    /// Writes the slot the last valid record does *not* occupy, then
    /// reads the whole record back and verifies it verbatim before the
    /// store switches over. Power loss mid-save leaves the previous
    /// record authoritative.
    pub fn save(&mut self) -> Result<(), ConfigError> {
        let target = match self.active_slot {
            Some(0) => 1u8,
            _ => 0u8,
        };
        let address = SLOT_ADDRESSES[target as usize];
        let sequence = self.sequence.wrapping_add(1);

        let mut record = [0u8; RECORD_SIZE];
        let header = SlotHeader {
            magic: CONFIG_MAGIC,
            version: CONFIG_VERSION,
            sequence,
        };
        record[..HEADER_SIZE].copy_from_slice(&header.to_bytes());
        {
            let payload: &mut [u8; PAYLOAD_SIZE] = (&mut record
                [HEADER_SIZE..HEADER_SIZE + PAYLOAD_SIZE])
                .try_into()
                .map_err(|_| ConfigError::VerifyFailed)?;
            self.staged.encode(payload);
        }
        let crc = calculate_crc32(&record[..HEADER_SIZE + PAYLOAD_SIZE]);
        record[HEADER_SIZE + PAYLOAD_SIZE..].copy_from_slice(&crc.to_le_bytes());

        self.flash.erase(address, self.flash.block_size())?;
        self.flash.write(address, &record)?;

        // Read back and verify before this slot becomes authoritative
        let mut verify = [0u8; RECORD_SIZE];
        self.flash.read(address, &mut verify)?;
        if verify != record {
            return Err(ConfigError::VerifyFailed);
        }

        self.sequence = sequence;
        self.active_slot = Some(target);
        self.active = self.staged.clone();
        Ok(())
    }

    /// Publishes the staged edits to the active snapshot without
    /// persisting them.
    pub fn commit(&mut self) {
        self.active = self.staged.clone();
    }

    /// Drops staged edits, restoring the active record.
    pub fn discard_staged(&mut self) {
        self.staged = self.active.clone();
    }

    /// The snapshot the control loop reads. Only `commit`/`save`/`load`
    /// replace it.
    pub fn active(&self) -> &FlightConfig {
        &self.active
    }

    /// The staged working copy.
    pub fn staged(&self) -> &FlightConfig {
        &self.staged
    }

    /// Mutable access to the staged working copy.
    pub fn staged_mut(&mut self) -> &mut FlightConfig {
        &mut self.staged
    }

    /// Active gains for one PID role.
    pub fn pid_gains(&self, role: PidRole) -> PidGains {
        self.active.pid_gains[role.index()]
    }

    /// Stages new gains for one PID role.
    pub fn set_pid_gains(&mut self, role: PidRole, gains: PidGains) {
        self.staged.pid_gains[role.index()] = gains;
    }

    /// Stages a new magnetic variation.
    pub fn set_mag_variation(&mut self, deg: f32) {
        self.staged.mag_variation_deg = deg;
    }

    /// Stages the history-bad flag clear. Persist with `save`.
    pub fn clear_history_flag(&mut self) {
        self.staged.history_bad = false;
    }

    /// Whether the active record descends from substituted defaults.
    pub fn history_bad(&self) -> bool {
        self.active.history_bad
    }

    /// Classification of the last failed load, if any.
    pub fn last_fault(&self) -> Option<ConfigFault> {
        self.last_fault
    }

    /// Last load failure as fault flags for the cycle outcome.
    ///
    /// `Empty` storage maps to no flags: first boot is expected, the
    /// history-bad indicator already tells telemetry defaults are in
    /// use.
    pub fn fault_flags(&self) -> FaultFlags {
        match self.last_fault {
            Some(ConfigFault::IntegrityMismatch) => FaultFlags::CONFIG_INTEGRITY,
            Some(ConfigFault::VersionMismatch { .. }) => FaultFlags::CONFIG_VERSION,
            _ => FaultFlags::empty(),
        }
    }

    /// Slot currently holding the authoritative record.
    pub fn active_slot(&self) -> Option<u8> {
        self.active_slot
    }

    /// Flash access for tests.
    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Consumes the store, returning the flash.
    pub fn into_flash(self) -> F {
        self.flash
    }
}

/// Keeps the most specific fault when no slot loads: a version problem
/// outranks corruption, corruption outranks empty.
fn escalate(current: ConfigFault, new: ConfigFault) -> ConfigFault {
    match (current, new) {
        (ConfigFault::VersionMismatch { .. }, _) => current,
        (_, ConfigFault::VersionMismatch { .. }) => new,
        (ConfigFault::IntegrityMismatch, _) => current,
        (_, ConfigFault::IntegrityMismatch) => new,
        _ => current,
    }
}
