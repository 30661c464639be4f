use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::RecordError;

static EMPLOYEE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9][A-Z0-9_-]{0,49}$").expect("valid employee id pattern"));

/// One employee's business card data.
///
/// `employee_id` is used verbatim as a directory name and as a URL path
/// segment, so [`UserRecord::validate`] restricts it to `[A-Z0-9_-]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub employee_id: String,
    pub full_name: String,
    pub title: String,
    pub department: String,
    pub unit: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl UserRecord {
    /// Uppercases and trims the id, trims the name, lowercases the email, and
    /// collapses blank optional fields to `None`.
    pub fn normalize(mut self) -> Self {
        self.employee_id = self.employee_id.trim().to_uppercase();
        self.full_name = self.full_name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        for field in [
            &mut self.phone,
            &mut self.address,
            &mut self.linkedin_url,
            &mut self.github_url,
            &mut self.photo_url,
        ] {
            *field = field
                .take()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
        }
        self
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        let invalid = |reason: &str| RecordError::Invalid {
            employee_id: self.employee_id.clone(),
            reason: reason.to_string(),
        };
        if !EMPLOYEE_ID.is_match(&self.employee_id) {
            return Err(invalid(
                "employee_id must be 1-50 characters of A-Z, 0-9, '_' or '-'",
            ));
        }
        if self.full_name.is_empty() {
            return Err(invalid("full_name is required"));
        }
        for (name, value) in [
            ("title", &self.title),
            ("department", &self.department),
            ("unit", &self.unit),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(&format!("{name} is required")));
            }
        }
        match self.email.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {}
            _ => return Err(invalid("email is not a valid address")),
        }
        Ok(())
    }

    /// Public path of this record's card, e.g. `/E001/`.
    pub fn url_path(&self) -> String {
        format!("/{}/", self.employee_id)
    }

    /// File name of the copied photo inside `assets/`.
    pub fn photo_asset_name(&self) -> String {
        format!("{}-photo.jpg", self.employee_id)
    }
}
