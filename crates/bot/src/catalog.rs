//! Product catalog: static configuration mapping items to variants and prices.
//!
//! The catalog is loaded once at startup and never mutated. It comes from
//! the builtin TOML document embedded in the binary, or from a file the
//! operator points `GAMESTORE_CATALOG_PATH` at. Orders snapshot the label
//! and price they were sold at, so editing the catalog never rewrites
//! history.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use gamestore_core::Price;

/// The builtin catalog shipped with the binary.
const BUILTIN_CATALOG: &str = include_str!("../catalog.toml");

/// Errors that can occur while loading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Could not read the catalog file.
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid TOML for the expected shape.
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    /// The document parsed but violates a catalog invariant.
    #[error("invalid catalog: {0}")]
    Invalid(String),
}

/// An immutable product catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

/// A sellable product with one or more variants.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogItem {
    /// Stable identifier; appears in callback data and persisted orders.
    pub key: String,
    /// Human-readable display name.
    pub name: String,
    /// Short description shown in the catalog overview.
    #[serde(default)]
    pub description: String,
    /// Purchasable variants, in display order.
    pub variants: Vec<Variant>,
}

/// A purchasable variant (quantity or tier) of an item.
#[derive(Debug, Clone, Deserialize)]
pub struct Variant {
    /// Stable identifier, unique within its item.
    pub key: String,
    /// Human-readable quantity or tier.
    pub label: String,
    /// Price in whole currency units; always positive.
    pub price: Price,
}

impl Catalog {
    /// Load the catalog from `path`, or the builtin document when `None`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the file cannot be read, does not parse,
    /// or violates a catalog invariant.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => Self::from_toml_str(&std::fs::read_to_string(path)?),
            None => Self::from_toml_str(BUILTIN_CATALOG),
        }
    }

    /// Parse and validate a catalog from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the document does not parse or violates a
    /// catalog invariant.
    pub fn from_toml_str(document: &str) -> Result<Self, CatalogError> {
        let catalog: Self = toml::from_str(document)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// All items in display order.
    #[must_use]
    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    /// Look up an item by key.
    #[must_use]
    pub fn item(&self, key: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.key == key)
    }

    /// Look up an item/variant pair by keys.
    #[must_use]
    pub fn variant(&self, item_key: &str, variant_key: &str) -> Option<(&CatalogItem, &Variant)> {
        let item = self.item(item_key)?;
        let variant = item.variant(variant_key)?;
        Some((item, variant))
    }

    /// Display name for an item key, falling back to the key itself.
    ///
    /// Historical orders can reference items that were since removed from
    /// the catalog; reports still have to render them. The fallback returns
    /// the caller's key, so both inputs share the output lifetime.
    #[must_use]
    pub fn display_name<'a>(&'a self, item_key: &'a str) -> &'a str {
        self.item(item_key).map_or(item_key, |item| &item.name)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.items.is_empty() {
            return Err(CatalogError::Invalid("catalog has no items".to_string()));
        }

        let mut item_keys = HashSet::new();
        for item in &self.items {
            if !item_keys.insert(item.key.as_str()) {
                return Err(CatalogError::Invalid(format!(
                    "duplicate item key: {}",
                    item.key
                )));
            }
            if item.variants.is_empty() {
                return Err(CatalogError::Invalid(format!(
                    "item {} has no variants",
                    item.key
                )));
            }

            let mut variant_keys = HashSet::new();
            for variant in &item.variants {
                if !variant_keys.insert(variant.key.as_str()) {
                    return Err(CatalogError::Invalid(format!(
                        "duplicate variant key {} in item {}",
                        variant.key, item.key
                    )));
                }
                if variant.price.amount() <= 0 {
                    return Err(CatalogError::Invalid(format!(
                        "non-positive price for {}/{}",
                        item.key, variant.key
                    )));
                }
            }
        }

        Ok(())
    }
}

impl CatalogItem {
    /// Look up a variant by key.
    #[must_use]
    pub fn variant(&self, key: &str) -> Option<&Variant> {
        self.variants.iter().find(|variant| variant.key == key)
    }
}
