// Device inventory endpoints
//
// Devices are mostly opaque to the client: a handful of fields are typed
// for display, everything else is carried through untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::client::ApiClient;
use crate::error::Error;

const DEVICES_PATH: &str = "/devices";

/// A network device in the inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "ip")]
    pub ip_address: Option<String>,
    #[serde(default, alias = "mac")]
    pub mac_address: Option<String>,
    #[serde(default, alias = "type")]
    pub device_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Fields the client does not interpret.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// The backend answers list calls either with a bare array or with a
/// paginated envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum DeviceList {
    Bare(Vec<Device>),
    Paged {
        #[serde(alias = "results", alias = "items")]
        data: Vec<Device>,
    },
}

impl From<DeviceList> for Vec<Device> {
    fn from(list: DeviceList) -> Self {
        match list {
            DeviceList::Bare(devices) | DeviceList::Paged { data: devices } => devices,
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// `/devices/{id}` with the id percent-encoded as exactly one segment, so
/// `/`, `?` or `#` inside an id never reach another endpoint.
fn device_path(id: &str) -> Result<String, Error> {
    let invalid = |reason: &str| Error::InvalidPath {
        path: format!("{DEVICES_PATH}/{id}"),
        reason: reason.into(),
    };
    if matches!(id, "" | "." | "..") {
        return Err(invalid("device id must be a non-empty path segment"));
    }

    // Only the path of this scratch URL is kept.
    let mut scratch = Url::parse("http://localhost")?;
    scratch
        .path_segments_mut()
        .map_err(|()| invalid("cannot build device path"))?
        .clear()
        .push(DEVICES_PATH.trim_start_matches('/'))
        .push(id);
    Ok(scratch.path().to_owned())
}

impl ApiClient {
    /// `GET /devices`, with optional filter parameters (e.g. `site`, `status`).
    pub async fn list_devices(&self, filters: &[(&str, String)]) -> Result<Vec<Device>, Error> {
        let list: DeviceList = self.get_with_params(DEVICES_PATH, filters).await?;
        Ok(list.into())
    }

    /// `GET /devices/{id}`.
    pub async fn get_device(&self, id: &str) -> Result<Device, Error> {
        self.get(&device_path(id)?).await
    }

    /// `POST /devices`.
    pub async fn create_device(&self, device: &serde_json::Value) -> Result<Device, Error> {
        self.post(DEVICES_PATH, device).await
    }

    /// `PATCH /devices/{id}` with the changed fields only.
    pub async fn update_device(
        &self,
        id: &str,
        changes: &serde_json::Value,
    ) -> Result<Device, Error> {
        self.patch(&device_path(id)?, changes).await
    }

    /// `DELETE /devices/{id}`.
    pub async fn delete_device(&self, id: &str) -> Result<(), Error> {
        self.delete(&device_path(id)?).await
    }
}
