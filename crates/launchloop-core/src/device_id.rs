// Device identity for campaign ownership.
// Format: "launchloop-<uuid>"

use std::fs;
use std::io::Write;
use std::path::Path;

use uuid::Uuid;

use crate::storage::data_dir;

const DEVICE_ID_FILE: &str = "device_id.txt";
const DEVICE_ID_PREFIX: &str = "launchloop-";

/// Error type for device ID operations
#[derive(Debug, thiserror::Error)]
pub enum DeviceIdError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid device ID format: {0}")]
    InvalidFormat(String),
}

/// Get or create the device ID stored in `dir/device_id.txt`.
///
/// The ID is recorded as `creator_device_id` on every campaign this device
/// creates.
pub fn get_or_create_device_id_at(dir: &Path) -> Result<String, DeviceIdError> {
    let id_path = dir.join(DEVICE_ID_FILE);

    if id_path.exists() {
        let device_id = fs::read_to_string(&id_path)?.trim().to_string();
        if device_id.starts_with(DEVICE_ID_PREFIX) {
            return Ok(device_id);
        }
        return Err(DeviceIdError::InvalidFormat(device_id));
    }

    let device_id = format!("{DEVICE_ID_PREFIX}{}", Uuid::new_v4());

    fs::create_dir_all(dir)?;
    let mut file = fs::File::create(&id_path)?;
    writeln!(file, "{device_id}")?;

    Ok(device_id)
}

/// Get or create the device ID in the default data directory.
pub fn get_or_create_device_id() -> Result<String, DeviceIdError> {
    get_or_create_device_id_at(&data_dir()?)
}
