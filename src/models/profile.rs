//! Profile model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::role::AppRole;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub year: Option<String>,
    pub semester: Option<String>,
    pub course: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Completion summary over the six profile fields
    pub fn completion(&self) -> ProfileCompletion {
        let filled = |value: Option<&str>| value.map_or(false, |v| !v.trim().is_empty());
        let checks = [
            ("name", filled(Some(self.name.as_str()))),
            ("mobile", filled(self.mobile.as_deref())),
            ("email", filled(Some(self.email.as_str()))),
            ("year", filled(self.year.as_deref())),
            ("semester", filled(self.semester.as_deref())),
            ("course", filled(self.course.as_deref())),
        ];

        let total = checks.len() as u32;
        let completed = checks.iter().filter(|(_, done)| *done).count() as u32;
        let missing = checks
            .iter()
            .filter(|(_, done)| !*done)
            .map(|(field, _)| field.to_string())
            .collect();

        ProfileCompletion {
            completed,
            total,
            percentage: ((completed as f64 / total as f64) * 100.0).round() as u8,
            missing,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProfileRequest {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub mobile: Option<String>,
    pub year: Option<String>,
    pub semester: Option<String>,
    pub course: Option<String>,
}

/// Owner-editable fields. Email is owned by the account and cannot be changed here.
///
/// The optional fields are patches: an absent key leaves the stored value
/// alone, while `null` or a blank string clears it (`Some(None)` after
/// validation).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub mobile: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub year: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub semester: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub course: Option<Option<String>>,
}

/// A key that is present, even as `null`, becomes `Some`
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileCompletion {
    pub completed: u32,
    pub total: u32,
    pub percentage: u8,
    pub missing: Vec<String>,
}

impl ProfileCompletion {
    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }
}

/// User management row: a profile with its role grants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWithRoles {
    #[serde(flatten)]
    pub profile: Profile,
    pub roles: Vec<AppRole>,
}

impl UserWithRoles {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&AppRole::Admin)
    }
}
