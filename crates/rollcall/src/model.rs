//! Core attendance types for rollcall.
//!
//! These structures serialize to the JSON layout kept in the key-value
//! backend: camelCase field names and RFC 3339 timestamps.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// What an attendance record was emitted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    /// The user was recognized and marked present.
    Present,
    /// The user enrolled.
    Registered,
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Registered => write!(f, "registered"),
        }
    }
}

/// An opaque image snapshot, usually a `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceSnapshot(String);

impl FaceSnapshot {
    /// Wrap already-encoded snapshot data.
    #[must_use]
    pub fn new(data: impl Into<String>) -> Self {
        Self(data.into())
    }

    /// Build a `data:` URL snapshot from raw image bytes.
    #[must_use]
    pub fn from_image_bytes(mime: &str, bytes: &[u8]) -> Self {
        use base64::{engine::general_purpose::STANDARD, Engine as _};
        Self(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
    }

    /// Capture a snapshot from an image file.
    ///
    /// The MIME type is guessed from the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SnapshotRead`] if the file cannot be read.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| Error::SnapshotRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_image_bytes(mime_for(path), &bytes))
    }

    /// The encoded snapshot.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short BLAKE3 fingerprint, for logging in place of the image itself.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let hex = blake3::hash(self.0.as_bytes()).to_hex();
        hex.as_str()[..12].to_string()
    }

    /// Size of the encoded snapshot in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the snapshot holds no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Registration form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Display name. Also the key attendance records are linked by.
    pub name: String,
    /// Contact email, may be empty.
    #[serde(default)]
    pub email: String,
    /// Department, may be empty.
    #[serde(default)]
    pub department: String,
}

impl UserProfile {
    /// Create a profile with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Return the profile with surrounding whitespace removed, rejecting a blank name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProfile`] if the name is empty after trimming.
    pub fn normalized(self) -> Result<Self> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::invalid_profile("name is required"));
        }
        Ok(Self {
            name: name.to_string(),
            email: self.email.trim().to_string(),
            department: self.department.trim().to_string(),
        })
    }
}

/// A profile enrolled in the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    /// Unique identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Contact email, may be empty.
    #[serde(default)]
    pub email: String,
    /// Department, may be empty.
    #[serde(default)]
    pub department: String,
    /// The snapshot captured at enrollment.
    pub face_data: FaceSnapshot,
    /// When the user enrolled.
    pub registered_at: DateTime<Utc>,
}

impl RegisteredUser {
    /// Enroll a profile now with a fresh identifier.
    #[must_use]
    pub fn new(profile: UserProfile, face_data: FaceSnapshot) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: profile.name,
            email: profile.email,
            department: profile.department,
            face_data,
            registered_at: Utc::now(),
        }
    }
}

/// A timestamped attendance event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Unique identifier.
    pub id: Uuid,
    /// Name of the user this event belongs to.
    pub name: String,
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// What the event was.
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    /// Create a record for `name` timestamped now.
    #[must_use]
    pub fn new(name: impl Into<String>, status: AttendanceStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            timestamp: Utc::now(),
            status,
        }
    }

    /// Check if this record marks the user present.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.status == AttendanceStatus::Present
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(AttendanceStatus::Present.to_string(), "present");
        assert_eq!(AttendanceStatus::Registered.to_string(), "registered");
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&AttendanceStatus::Registered).unwrap();
        assert_eq!(json, "\"registered\"");
    }

    #[test]
    fn test_profile_normalized_trims() {
        let profile = UserProfile {
            name: "  Ann  ".to_string(),
            email: " ann@example.com ".to_string(),
            department: String::new(),
        }
        .normalized()
        .unwrap();

        assert_eq!(profile.name, "Ann");
        assert_eq!(profile.email, "ann@example.com");
    }

    #[test]
    fn test_profile_blank_name_rejected() {
        let err = UserProfile::named("   ").normalized().unwrap_err();
        assert!(matches!(err, Error::InvalidProfile { .. }));
    }

    #[test]
    fn test_snapshot_from_image_bytes() {
        let snapshot = FaceSnapshot::from_image_bytes("image/png", b"abc");
        assert_eq!(snapshot.as_str(), "data:image/png;base64,YWJj");
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_snapshot_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.JPG");
        std::fs::write(&path, b"abc").unwrap();

        let snapshot = FaceSnapshot::from_file(&path).unwrap();
        assert_eq!(snapshot.as_str(), "data:image/jpeg;base64,YWJj");
    }

    #[test]
    fn test_snapshot_from_missing_file() {
        let err = FaceSnapshot::from_file("/nonexistent/face.png").unwrap_err();
        assert!(err.is_capture_error());
    }

    #[test]
    fn test_mime_for_unknown_extension() {
        assert_eq!(mime_for(Path::new("face")), "application/octet-stream");
        assert_eq!(mime_for(Path::new("face.webp")), "image/webp");
    }

    #[test]
    fn test_snapshot_fingerprint() {
        let a = FaceSnapshot::new("one");
        let b = FaceSnapshot::new("two");
        assert_eq!(a.fingerprint().len(), 12);
        assert_eq!(a.fingerprint(), FaceSnapshot::new("one").fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_registered_user_json_layout() {
        let user = RegisteredUser::new(UserProfile::named("Ann"), FaceSnapshot::new("data:x"));
        let value = serde_json::to_value(&user).unwrap();

        assert_eq!(value["name"], "Ann");
        assert_eq!(value["faceData"], "data:x");
        assert!(value.get("registeredAt").is_some());
        assert_eq!(value["id"], user.id.to_string());
    }

    #[test]
    fn test_registered_user_accepts_missing_optional_fields() {
        let json = r#"{
            "id": "6f1c1b3a-6a55-4c8e-9d4e-2f7f0a1d9b11",
            "name": "Bo",
            "faceData": "data:y",
            "registeredAt": "2024-03-01T09:00:00Z"
        }"#;
        let user: RegisteredUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.name, "Bo");
        assert!(user.email.is_empty());
        assert!(user.department.is_empty());
    }

    #[test]
    fn test_record_new() {
        let record = AttendanceRecord::new("Ann", AttendanceStatus::Present);
        assert!(record.is_present());
        assert_eq!(record.name, "Ann");

        let registered = AttendanceRecord::new("Ann", AttendanceStatus::Registered);
        assert!(!registered.is_present());
        assert_ne!(record.id, registered.id);
    }
}
