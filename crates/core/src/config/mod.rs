//! Persistent configuration: record layout, integrity code, store.
//!
//! The store seeds every loop gain and scaling at boot and is the sole
//! writer of the record; the control task only ever sees an immutable
//! snapshot published at load, commit or save time.

mod crc;
mod error;
mod record;
mod store;

pub use crc::{calculate_crc32, validate_crc32};
pub use error::{ConfigError, ConfigFault};
pub use record::{
    DlpfSetting, FlightConfig, GpsReceiverType, MixerType, OsdOptions, ReceiverType,
    CONFIG_VERSION, CONFIG_VERSION_MIN, PAYLOAD_SIZE,
};
pub use store::{ConfigStore, CONFIG_MAGIC, RECORD_SIZE, SLOT_ADDRESSES};
