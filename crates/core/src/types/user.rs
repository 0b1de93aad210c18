//! User and profile domain types.
//!
//! These mirror the account objects returned by the marketplace API. The
//! profile is a separate record on the backend and rides along inside the
//! user object on every authenticated read.

use serde::{Deserialize, Serialize};

use crate::types::email::Email;
use crate::types::id::UserId;

/// Role a marketplace account plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    /// Cloth shop buying materials and design licenses.
    Buyer,
    /// Material seller (mills, fabric stockists).
    Seller,
    /// Cloth designer licensing designs.
    Designer,
    /// Garment manufacturer.
    Manufacturer,
    /// Platform administrator.
    Admin,
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buyer => write!(f, "buyer"),
            Self::Seller => write!(f, "seller"),
            Self::Designer => write!(f, "designer"),
            Self::Manufacturer => write!(f, "manufacturer"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            "designer" => Ok(Self::Designer),
            "manufacturer" => Ok(Self::Manufacturer),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid user type: {s}")),
        }
    }
}

/// Extended profile attached to every account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Role of this account.
    pub user_type: UserType,
    /// Company or studio name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    /// Contact phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    /// Postal address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// URL of the uploaded profile picture, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

/// An authenticated marketplace account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique account ID.
    pub id: UserId,
    /// Login username.
    pub username: String,
    /// Unique email address.
    pub email: Email,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Role of this account (duplicated from the profile for convenience).
    pub user_type: UserType,
    /// Extended profile record.
    pub profile: Profile,
}

/// Payload for `POST /accounts/register/`.
///
/// Field names match the registration endpoint verbatim, including the
/// `password2` confirmation field the backend validates server-side.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
    pub user_type: UserType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}
