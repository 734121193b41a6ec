//! # Product Types
//!
//! Catalog snapshot types for the storefront.
//! Products follow the backend's variant-based model: every product carries
//! one or more variants, each with its own pricing and inventory. The catalog
//! is loaded from `config/products.toml` or received from the backend as JSON.

use serde::{Deserialize, Serialize};

/// Upper bound for the quantity selector when a variant does not track stock
pub const UNTRACKED_MAX_QUANTITY: u32 = 99;

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[serde(alias = "USD")]
    USD,
    #[serde(alias = "EUR")]
    EUR,
    #[serde(alias = "GBP")]
    GBP,
    #[serde(alias = "JPY")]
    JPY,
    #[serde(alias = "CAD")]
    CAD,
    #[serde(alias = "AUD")]
    AUD,
    #[serde(alias = "CHF")]
    CHF,
    #[serde(alias = "MXN")]
    MXN,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "usd",
            Currency::EUR => "eur",
            Currency::GBP => "gbp",
            Currency::JPY => "jpy",
            Currency::CAD => "cad",
            Currency::AUD => "aud",
            Currency::CHF => "chf",
            Currency::MXN => "mxn",
        }
    }

    /// Returns the number of decimal places for this currency
    /// (JPY has 0 decimals, most others have 2)
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Convert a decimal amount to the smallest currency unit (cents, etc.)
    pub fn to_smallest_unit(&self, amount: f64) -> i64 {
        let multiplier = 10_f64.powi(self.decimal_places() as i32);
        (amount * multiplier).round() as i64
    }

    /// Convert from smallest unit back to decimal
    pub fn from_smallest_unit(&self, amount: i64) -> f64 {
        let divisor = 10_f64.powi(self.decimal_places() as i32);
        amount as f64 / divisor
    }

    fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::JPY => "¥",
            Currency::CAD => "C$",
            Currency::AUD => "A$",
            Currency::CHF => "CHF ",
            Currency::MXN => "MX$",
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::MXN
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Price with amount in smallest currency unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in smallest currency unit (cents for MXN)
    pub amount: i64,
    /// Currency
    pub currency: Currency,
}

impl Price {
    /// Create a new price from decimal amount
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self {
            amount: currency.to_smallest_unit(amount),
            currency,
        }
    }

    /// Create a price from smallest unit (cents)
    pub fn from_cents(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Zero in the given currency
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: 0,
            currency,
        }
    }

    /// Get the decimal amount
    pub fn as_decimal(&self) -> f64 {
        self.currency.from_smallest_unit(self.amount)
    }

    /// Multiply by a quantity, saturating at the bounds of `i64`
    pub fn times(&self, quantity: u32) -> Self {
        Self {
            amount: self.amount.saturating_mul(i64::from(quantity)),
            currency: self.currency,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Format for display (e.g., "MX$250.00")
    pub fn display(&self) -> String {
        if self.currency.decimal_places() == 0 {
            format!("{}{}", self.currency.symbol(), self.amount)
        } else {
            format!("{}{:.2}", self.currency.symbol(), self.as_decimal())
        }
    }
}

/// Product category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Apparel,
    Accessories,
    Music,
    Instruments,
    Collectibles,
    Other,
}

impl Default for ProductCategory {
    fn default() -> Self {
        ProductCategory::Other
    }
}

/// Publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Draft,
    Published,
    Archived,
    OutOfStock,
}

impl Default for ProductStatus {
    fn default() -> Self {
        ProductStatus::Published
    }
}

/// Product image reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    pub url: String,
    #[serde(default)]
    pub public_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub order: u32,
}

/// Variant pricing as published by the backend (decimal amounts)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantPricing {
    pub base_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<f64>,
    #[serde(default)]
    pub currency: Currency,
}

impl VariantPricing {
    pub fn new(base_price: f64, currency: Currency) -> Self {
        Self {
            base_price,
            sale_price: None,
            currency,
        }
    }

    /// True when a sale price is set and undercuts the base price.
    /// A zero sale price counts as unset.
    pub fn has_discount(&self) -> bool {
        matches!(self.sale_price, Some(sale) if sale > 0.0 && sale < self.base_price)
    }

    /// Current unit price: sale price if present and lower, else base price.
    pub fn current_price(&self) -> Price {
        let amount = match self.sale_price {
            Some(sale) if self.has_discount() => sale,
            _ => self.base_price,
        };
        Price::new(amount, self.currency)
    }
}

/// Variant inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantInventory {
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub low_stock_threshold: u32,
    #[serde(default)]
    pub track_inventory: bool,
    #[serde(default)]
    pub allow_backorder: bool,
}

impl Default for VariantInventory {
    fn default() -> Self {
        Self {
            stock: 0,
            low_stock_threshold: 0,
            track_inventory: false,
            allow_backorder: false,
        }
    }
}

impl VariantInventory {
    pub fn tracked(stock: u32) -> Self {
        Self {
            stock,
            low_stock_threshold: 5,
            track_inventory: true,
            allow_backorder: false,
        }
    }

    /// Whether the variant can currently be sold
    pub fn is_sellable(&self) -> bool {
        !self.track_inventory || self.stock > 0 || self.allow_backorder
    }

    pub fn is_low(&self) -> bool {
        self.track_inventory && self.stock > 0 && self.stock <= self.low_stock_threshold
    }
}

/// A purchasable variant of a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub sku: String,
    #[serde(default)]
    pub name: String,
    pub pricing: VariantPricing,
    #[serde(default)]
    pub inventory: VariantInventory,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl ProductVariant {
    pub fn new(sku: impl Into<String>, pricing: VariantPricing) -> Self {
        Self {
            id: None,
            sku: sku.into(),
            name: String::new(),
            pricing,
            inventory: VariantInventory::default(),
            is_active: true,
        }
    }

    /// Builder: set inventory
    pub fn with_inventory(mut self, inventory: VariantInventory) -> Self {
        self.inventory = inventory;
        self
    }

    /// Builder: mark inactive
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// A product in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique product identifier
    #[serde(rename = "_id")]
    pub id: String,

    /// Display name
    pub name: String,

    #[serde(default)]
    pub slug: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub category: ProductCategory,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Purchasable variants; the first active one drives price and stock
    #[serde(default)]
    pub variants: Vec<ProductVariant>,

    #[serde(default)]
    pub images: Vec<ProductImage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    #[serde(default)]
    pub status: ProductStatus,

    #[serde(default)]
    pub is_featured: bool,

    #[serde(default)]
    pub is_new_arrival: bool,
}

impl Product {
    /// Create a published product with a single untracked variant
    pub fn simple(
        id: impl Into<String>,
        name: impl Into<String>,
        base_price: f64,
        currency: Currency,
    ) -> Self {
        let id = id.into();
        let variant = ProductVariant::new(
            format!("{}-default", id),
            VariantPricing::new(base_price, currency),
        );
        Self {
            slug: id.clone(),
            id,
            name: name.into(),
            description: String::new(),
            category: ProductCategory::Other,
            tags: Vec::new(),
            variants: vec![variant],
            images: Vec::new(),
            brand: None,
            status: ProductStatus::Published,
            is_featured: false,
            is_new_arrival: false,
        }
    }

    /// Builder: set a sale price on every variant
    pub fn with_sale_price(mut self, sale_price: f64) -> Self {
        for variant in &mut self.variants {
            variant.pricing.sale_price = Some(sale_price);
        }
        self
    }

    /// Builder: replace the variants
    pub fn with_variants(mut self, variants: Vec<ProductVariant>) -> Self {
        self.variants = variants;
        self
    }

    /// Builder: set category
    pub fn with_category(mut self, category: ProductCategory) -> Self {
        self.category = category;
        self
    }

    /// Builder: add an image
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        let is_primary = self.images.is_empty();
        self.images.push(ProductImage {
            url: url.into(),
            public_id: String::new(),
            alt_text: None,
            is_primary,
            order: self.images.len() as u32,
        });
        self
    }

    /// Builder: set status
    pub fn with_status(mut self, status: ProductStatus) -> Self {
        self.status = status;
        self
    }

    /// First active variant, if any
    pub fn active_variant(&self) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.is_active)
    }

    /// Pricing currency of the product
    pub fn currency(&self) -> Currency {
        self.active_variant()
            .map(|v| v.pricing.currency)
            .unwrap_or_default()
    }

    /// Current unit price. Every price read in the storefront goes through
    /// here so the per-item display and the cart totals never diverge.
    pub fn unit_price(&self) -> Price {
        self.active_variant()
            .map(|v| v.pricing.current_price())
            .unwrap_or_else(|| Price::zero(Currency::default()))
    }

    pub fn is_published(&self) -> bool {
        self.status == ProductStatus::Published
    }

    /// Whether any active variant can be sold
    pub fn has_stock(&self) -> bool {
        self.variants
            .iter()
            .any(|v| v.is_active && v.inventory.is_sellable())
    }

    pub fn is_available(&self) -> bool {
        self.is_published() && self.has_stock()
    }

    /// Stock across all variants; untracked variants count as 999
    pub fn total_stock(&self) -> u32 {
        self.variants
            .iter()
            .map(|v| {
                if v.inventory.track_inventory {
                    v.inventory.stock
                } else {
                    999
                }
            })
            .sum()
    }

    /// Largest quantity the quantity selector offers for this product
    pub fn max_quantity(&self) -> u32 {
        match self.active_variant() {
            Some(v) if v.inventory.track_inventory => v.inventory.stock,
            _ => UNTRACKED_MAX_QUANTITY,
        }
    }

    /// Primary image URL, falling back to the first image
    pub fn primary_image(&self) -> Option<&str> {
        self.images
            .iter()
            .find(|i| i.is_primary)
            .or_else(|| self.images.first())
            .map(|i| i.url.as_str())
    }
}

/// Product catalog (loaded from config)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCatalog {
    #[serde(default)]
    pub products: Vec<Product>,
}

impl ProductCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            products: Vec::new(),
        }
    }

    /// Add a product to the catalog
    pub fn add(&mut self, product: Product) {
        self.products.push(product);
    }

    /// Builder: add a product
    pub fn with_product(mut self, product: Product) -> Self {
        self.add(product);
        self
    }

    /// Find a product by ID
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Get all products that are published and in stock
    pub fn available_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| p.is_available())
    }

    /// Load catalog from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_conversion() {
        let mxn = Currency::MXN;
        assert_eq!(mxn.to_smallest_unit(999.99), 99999);
        assert_eq!(mxn.from_smallest_unit(1099), 10.99);

        let jpy = Currency::JPY;
        assert_eq!(jpy.to_smallest_unit(1000.0), 1000);
    }

    #[test]
    fn test_currency_accepts_uppercase() {
        let c: Currency = serde_json::from_str("\"MXN\"").unwrap();
        assert_eq!(c, Currency::MXN);
        let c: Currency = serde_json::from_str("\"usd\"").unwrap();
        assert_eq!(c, Currency::USD);
    }

    #[test]
    fn test_price_display() {
        assert_eq!(Price::new(250.0, Currency::MXN).display(), "MX$250.00");
        assert_eq!(Price::new(19.99, Currency::EUR).display(), "€19.99");
        assert_eq!(Price::from_cents(500, Currency::JPY).display(), "¥500");
    }

    #[test]
    fn test_sale_price_applies_only_when_lower() {
        let on_sale = Product::simple("vinyl", "Vinyl", 500.0, Currency::MXN).with_sale_price(400.0);
        assert_eq!(on_sale.unit_price(), Price::new(400.0, Currency::MXN));

        let higher_sale = Product::simple("cap", "Cap", 300.0, Currency::MXN).with_sale_price(350.0);
        assert_eq!(higher_sale.unit_price(), Price::new(300.0, Currency::MXN));

        let zero_sale = Product::simple("pin", "Pin", 50.0, Currency::MXN).with_sale_price(0.0);
        assert_eq!(zero_sale.unit_price(), Price::new(50.0, Currency::MXN));
    }

    #[test]
    fn test_price_uses_first_active_variant() {
        let product = Product::simple("shirt", "Shirt", 0.0, Currency::MXN).with_variants(vec![
            ProductVariant::new("shirt-s", VariantPricing::new(100.0, Currency::MXN)).inactive(),
            ProductVariant::new("shirt-m", VariantPricing::new(120.0, Currency::MXN)),
        ]);
        assert_eq!(product.unit_price().amount, 12000);

        let dead = product.with_variants(vec![
            ProductVariant::new("x", VariantPricing::new(100.0, Currency::MXN)).inactive(),
        ]);
        assert!(dead.unit_price().is_zero());
    }

    #[test]
    fn test_stock_rules() {
        let tracked = Product::simple("hat", "Hat", 200.0, Currency::MXN).with_variants(vec![
            ProductVariant::new("hat-1", VariantPricing::new(200.0, Currency::MXN))
                .with_inventory(VariantInventory::tracked(3)),
        ]);
        assert!(tracked.is_available());
        assert_eq!(tracked.max_quantity(), 3);
        assert_eq!(tracked.total_stock(), 3);

        let sold_out = tracked.clone().with_variants(vec![ProductVariant::new(
            "hat-1",
            VariantPricing::new(200.0, Currency::MXN),
        )
        .with_inventory(VariantInventory::tracked(0))]);
        assert!(!sold_out.has_stock());

        let untracked = Product::simple("poster", "Poster", 80.0, Currency::MXN);
        assert_eq!(untracked.max_quantity(), UNTRACKED_MAX_QUANTITY);

        let draft = untracked.with_status(ProductStatus::Draft);
        assert!(!draft.is_available());
    }

    #[test]
    fn test_product_json_uses_backend_names() {
        let json = r#"{
            "_id": "64f0c0ffee",
            "name": "Sombrero",
            "slug": "sombrero",
            "category": "accessories",
            "status": "published",
            "isFeatured": true,
            "variants": [{
                "sku": "SOM-1",
                "name": "Default",
                "pricing": { "basePrice": 1200, "salePrice": 999.5, "currency": "MXN" },
                "inventory": { "stock": 4, "lowStockThreshold": 2, "trackInventory": true, "allowBackorder": false },
                "isActive": true
            }],
            "images": [{ "url": "https://cdn/som.jpg", "publicId": "som", "isPrimary": true, "order": 0 }]
        }"#;

        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, "64f0c0ffee");
        assert!(product.is_featured);
        assert_eq!(product.unit_price().amount, 99950);
        assert_eq!(product.primary_image(), Some("https://cdn/som.jpg"));
    }

    #[test]
    fn test_catalog_from_toml() {
        let toml_str = r#"
            [[products]]
            _id = "vinyl-lp"
            name = "Vinyl LP"
            category = "music"

            [[products.variants]]
            sku = "LP-1"
            pricing = { basePrice = 650.0, currency = "mxn" }
        "#;

        let catalog = ProductCatalog::from_toml(toml_str).unwrap();
        let product = catalog.get("vinyl-lp").unwrap();
        assert_eq!(product.category, ProductCategory::Music);
        assert_eq!(product.unit_price(), Price::new(650.0, Currency::MXN));
        assert_eq!(catalog.available_products().count(), 1);
    }
}
