//! Persisted record of a provisioned resource.
//!
//! The caller persists the record after each lifecycle phase. Keys are
//! plain strings so the record survives round trips through the host tool's
//! state file unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::driver_config::AttachmentType;

/// Key holding the resource identifier.
pub const SERVER_ID: &str = "server_id";
/// Key holding the reachable address.
pub const HOSTNAME: &str = "hostname";
/// Key holding the generated Windows user.
pub const USERNAME: &str = "username";
/// Key holding the generated Windows password.
pub const PASSWORD: &str = "password";

/// Mutable key/value record describing a running resource.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct StateRecord {
    /// Scalar entries such as `server_id` and `hostname`.
    #[serde(default)]
    pub entries: BTreeMap<String, String>,
    /// Block volumes attached to the resource.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_attachments: Vec<VolumeAttachmentState>,
}

impl StateRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Sets an entry, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Removes an entry.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Returns the resource identifier.
    #[must_use]
    pub fn server_id(&self) -> Option<&str> {
        self.get(SERVER_ID)
    }

    /// Returns the reachable address.
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        self.get(HOSTNAME)
    }

    /// Returns the attachment recorded for `volume_id`.
    #[must_use]
    pub fn attachment(&self, volume_id: &str) -> Option<&VolumeAttachmentState> {
        self.volume_attachments
            .iter()
            .find(|attachment| attachment.volume_id == volume_id)
    }

    /// Records an attachment, replacing any entry for the same volume.
    pub fn upsert_attachment(&mut self, attachment: VolumeAttachmentState) {
        match self
            .volume_attachments
            .iter_mut()
            .find(|existing| existing.volume_id == attachment.volume_id)
        {
            Some(existing) => *existing = attachment,
            None => self.volume_attachments.push(attachment),
        }
    }

    /// Drops the attachment recorded for `volume_id`.
    pub fn remove_attachment(&mut self, volume_id: &str) {
        self.volume_attachments
            .retain(|attachment| attachment.volume_id != volume_id);
    }
}

/// Connection details of one block volume attachment.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct VolumeAttachmentState {
    /// Attached volume.
    pub volume_id: String,
    /// Attachment identifier.
    pub attachment_id: String,
    /// Attachment mechanism.
    pub attachment_type: AttachmentType,
    /// iSCSI target qualified name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iqn: Option<String>,
    /// iSCSI target address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iqn_ipv4: Option<String>,
    /// iSCSI target port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}
