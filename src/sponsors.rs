//! Sponsor tiers and the companies assigned to them.

use crate::error::{input_error, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A sponsorship level and the permissions it grants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub id: Uuid,
    pub name: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierInput {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// A sponsoring company with its resolved tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub tier: Tier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyInput {
    pub name: String,
    #[serde(rename = "tier")]
    pub tier_id: Uuid,
}

impl TierInput {
    /// Validate and turn the input into a new tier record
    pub fn into_tier(self) -> AppResult<Tier> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(input_error("Tier name must not be empty"));
        }

        let mut permissions: Vec<String> = Vec::new();
        for permission in self.permissions {
            let permission = permission.trim().to_string();
            if !permission.is_empty() && !permissions.contains(&permission) {
                permissions.push(permission);
            }
        }

        Ok(Tier {
            id: Uuid::new_v4(),
            name: name.to_string(),
            permissions,
        })
    }
}

impl CompanyInput {
    /// Validate and build the company record once its tier is resolved
    pub fn into_company(self, tier: Tier) -> AppResult<Company> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(input_error("Company name must not be empty"));
        }

        Ok(Company {
            id: Uuid::new_v4(),
            name: name.to_string(),
            tier,
        })
    }
}
