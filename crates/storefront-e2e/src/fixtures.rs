//! Typed fixture records: accounts, catalog products and checkout data.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::result::{StorefrontError, StorefrontResult};

fn require(record: &'static str, field: &'static str, value: &str) -> StorefrontResult<()> {
    if value.trim().is_empty() {
        Err(StorefrontError::InvalidInput { record, field })
    } else {
        Ok(())
    }
}

/// Login credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account name
    pub username: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Create credentials
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Reject empty username or password
    pub fn validate(&self) -> StorefrontResult<()> {
        require("credentials", "username", &self.username)?;
        require("credentials", "password", &self.password)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Contents of a users file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersFile {
    /// Account that is expected to log in successfully
    #[serde(rename = "VALID_USER")]
    pub valid_user: Credentials,
}

impl UsersFile {
    /// Read a users JSON file
    pub fn load(path: impl AsRef<Path>) -> StorefrontResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let users: Self = serde_json::from_str(&raw)?;
        users.valid_user.validate()?;
        Ok(users)
    }
}

/// Product categories offered by the storefront
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Phones
    Phones,
    /// Laptops
    Laptops,
    /// Monitors
    Monitors,
}

impl Category {
    /// All categories
    pub const ALL: [Self; 3] = [Self::Phones, Self::Laptops, Self::Monitors];

    /// Caption of the category link
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Phones => "Phones",
            Self::Laptops => "Laptops",
            Self::Monitors => "Monitors",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog product
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProductInfo {
    /// Product name as shown on its card
    pub name: &'static str,
    /// Category it is listed under
    pub category: Category,
    /// Unit price in whole dollars
    pub price: f64,
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

impl ProductInfo {
    const fn listed(name: &'static str, category: Category, price: f64) -> Self {
        Self {
            name,
            category,
            price,
            description: None,
        }
    }

    pub const SAMSUNG_GALAXY_S6: Self = Self::listed("Samsung galaxy s6", Category::Phones, 360.0);
    pub const MACBOOK_PRO: Self = Self::listed("MacBook Pro", Category::Laptops, 1100.0);
    pub const SONY_XPERIA_Z5: Self = Self::listed("Sony xperia z5", Category::Phones, 320.0);
    pub const MACBOOK_AIR: Self = Self::listed("MacBook air", Category::Laptops, 700.0);
    pub const SONY_VAIO_I5: Self = Self::listed("Sony vaio i5", Category::Laptops, 790.0);
    pub const APPLE_MONITOR_24: Self = Self::listed("Apple monitor 24", Category::Monitors, 400.0);

    /// Every product the suite knows about
    pub const CATALOG: [Self; 6] = [
        Self::SAMSUNG_GALAXY_S6,
        Self::MACBOOK_PRO,
        Self::SONY_XPERIA_Z5,
        Self::MACBOOK_AIR,
        Self::SONY_VAIO_I5,
        Self::APPLE_MONITOR_24,
    ];

    /// Look a product up by exact name
    #[must_use]
    pub fn find(name: &str) -> Option<Self> {
        Self::CATALOG.iter().copied().find(|p| p.name == name)
    }
}

/// Order form data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutInfo {
    /// Customer name
    pub name: String,
    /// Country
    pub country: String,
    /// City
    pub city: String,
    /// Credit card number
    pub credit_card: String,
    /// Card expiry month
    pub month: String,
    /// Card expiry year
    pub year: String,
}

impl CheckoutInfo {
    /// John Doe, New York
    #[must_use]
    pub fn john_doe() -> Self {
        Self {
            name: "John Doe".to_string(),
            country: "USA".to_string(),
            city: "New York".to_string(),
            credit_card: "4111111111111111".to_string(),
            month: "12".to_string(),
            year: "2025".to_string(),
        }
    }

    /// Anna, Ho Chi Minh City
    #[must_use]
    pub fn anna_vn() -> Self {
        Self {
            name: "Anna".to_string(),
            country: "VN".to_string(),
            city: "HCM".to_string(),
            credit_card: "12345678".to_string(),
            month: "01".to_string(),
            year: "2026".to_string(),
        }
    }

    /// Reject records with an empty field
    pub fn validate(&self) -> StorefrontResult<()> {
        const RECORD: &str = "checkout info";
        require(RECORD, "name", &self.name)?;
        require(RECORD, "country", &self.country)?;
        require(RECORD, "city", &self.city)?;
        require(RECORD, "credit card", &self.credit_card)?;
        require(RECORD, "month", &self.month)?;
        require(RECORD, "year", &self.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod credentials_tests {
        use super::*;

        #[test]
        fn test_debug_hides_password() {
            let creds = Credentials::new("tester", "hunter2");
            let text = format!("{creds:?}");
            assert!(text.contains("tester"));
            assert!(!text.contains("hunter2"));
        }

        #[test]
        fn test_validate_rejects_blank_password() {
            let err = Credentials::new("tester", "  ").validate().unwrap_err();
            assert!(matches!(
                err,
                StorefrontError::InvalidInput { field: "password", .. }
            ));
        }

        #[test]
        fn test_load_users_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("users.json");
            std::fs::write(
                &path,
                r#"{ "VALID_USER": { "username": "tester", "password": "secret" } }"#,
            )
            .unwrap();
            let users = UsersFile::load(&path).unwrap();
            assert_eq!(users.valid_user, Credentials::new("tester", "secret"));
        }

        #[test]
        fn test_bundled_users_file_is_valid() {
            let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/users.json");
            assert!(UsersFile::load(path).is_ok());
        }

        #[test]
        fn test_missing_users_file() {
            let err = UsersFile::load("/nonexistent/users.json").unwrap_err();
            assert!(matches!(err, StorefrontError::Io(_)));
        }
    }

    mod catalog_tests {
        use super::*;

        #[test]
        fn test_find() {
            let product = ProductInfo::find("MacBook Pro").unwrap();
            assert_eq!(product.price, 1100.0);
            assert_eq!(product.category, Category::Laptops);
            assert!(ProductInfo::find("macbook pro").is_none());
        }

        #[test]
        fn test_every_category_is_stocked() {
            for category in Category::ALL {
                assert!(ProductInfo::CATALOG.iter().any(|p| p.category == category));
            }
        }
    }

    mod checkout_tests {
        use super::*;

        #[test]
        fn test_presets_are_valid() {
            assert!(CheckoutInfo::john_doe().validate().is_ok());
            assert!(CheckoutInfo::anna_vn().validate().is_ok());
        }

        #[test]
        fn test_empty_card_is_rejected() {
            let mut info = CheckoutInfo::john_doe();
            info.credit_card.clear();
            let err = info.validate().unwrap_err();
            assert!(matches!(
                err,
                StorefrontError::InvalidInput { field: "credit card", .. }
            ));
        }

        #[test]
        fn test_serde_uses_camel_case() {
            let json = serde_json::to_value(CheckoutInfo::anna_vn()).unwrap();
            assert_eq!(json["creditCard"], "12345678");
            let back: CheckoutInfo = serde_json::from_value(json).unwrap();
            assert_eq!(back, CheckoutInfo::anna_vn());
        }
    }
}
