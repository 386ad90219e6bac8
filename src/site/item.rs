//! Item records produced by site parsers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryStatus {
    InStock,
    AlmostSoldOut,
    OutOfStock,
}

impl InventoryStatus {
    /// Status from a sold-out flag and an optional stock count; fewer than
    /// ten units left counts as almost sold out.
    pub fn of(sold_out: bool, stock: Option<i64>) -> Self {
        match (sold_out, stock) {
            (true, _) => InventoryStatus::OutOfStock,
            (false, Some(stock)) if stock < 10 => InventoryStatus::AlmostSoldOut,
            _ => InventoryStatus::InStock,
        }
    }

    /// Status from a remaining quantity.
    pub fn from_quantity(quantity: i64) -> Self {
        if quantity > 10 {
            InventoryStatus::InStock
        } else if quantity > 0 {
            InventoryStatus::AlmostSoldOut
        } else {
            InventoryStatus::OutOfStock
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryPayType {
    #[default]
    Free,
    Paid,
    FreeOrPaid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    ExpressTonight,
    ExpressToday,
    ExpressTodayDawn,
    ExpressNextDawn,
    ExpressNextMorning,
    ExpressNextDay,
    ExpressSpecific,
    Express,
    #[default]
    Standard,
    Slow,
    Pickup,
    Online,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeliveryData {
    pub price: Option<f64>,
    pub threshold_price: Option<f64>,
    pub pay_type: DeliveryPayType,
    pub delivery_type: DeliveryType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemUnitType {
    G,
    Kg,
    Ml,
    L,
    #[default]
    Piece,
}

impl ItemUnitType {
    /// Map a unit label (English, Japanese, Korean or Chinese) to a unit.
    pub fn of(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "g" | "gram" | "グラム" | "그램" | "克" => ItemUnitType::G,
            "kg" | "kilogram" | "キログラム" | "キロ" | "킬로그램" | "킬로" => ItemUnitType::Kg,
            "ml" | "millilitre" | "ミリリットル" | "ミリ" | "밀리리터" | "밀리" => ItemUnitType::Ml,
            "l" | "litre" | "リットル" | "리터" => ItemUnitType::L,
            _ => ItemUnitType::Piece,
        }
    }
}

/// Price per unit, normalised to grams or millilitres and scaled down to a
/// single unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemUnitData {
    pub unit_type: ItemUnitType,
    pub unit: f64,
    pub price: f64,
}

impl ItemUnitData {
    pub fn new(price: f64, unit_type: ItemUnitType, unit: f64) -> Self {
        let (unit_type, price) = match unit_type {
            ItemUnitType::Kg => (ItemUnitType::G, price / 1000.0),
            ItemUnitType::L => (ItemUnitType::Ml, price / 1000.0),
            other => (other, price),
        };
        let (unit, price) = rescale(unit, price);
        Self {
            unit_type,
            unit,
            price,
        }
    }

    pub fn piece(price: f64) -> Self {
        Self::new(price, ItemUnitType::Piece, 1.0)
    }

    pub fn is_basic(&self) -> bool {
        self.unit == 1.0 && self.unit_type == ItemUnitType::Piece
    }
}

fn rescale(mut unit: f64, mut price: f64) -> (f64, f64) {
    if !unit.is_finite() {
        return (unit, price);
    }
    while unit > 1.0 {
        if unit < 10.0 {
            price = price / unit * (unit - 1.0);
            unit -= 1.0;
        } else {
            unit /= 10.0;
            price /= 10.0;
        }
    }
    (unit, price)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOptionData {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub inventory: Option<InventoryStatus>,
}

impl ItemOptionData {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64, stock: Option<i64>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            inventory: stock.map(InventoryStatus::from_quantity),
        }
    }
}

/// Normalised item record handed back by a site engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemData {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub original_price: f64,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub delivery: Option<DeliveryData>,
    pub url: Option<String>,
    pub image: Option<String>,
    pub unit: ItemUnitData,
    pub inventory: InventoryStatus,
    pub currency: String,
    pub options: Vec<ItemOptionData>,
}

impl ItemData {
    /// Minimal record: one piece at `price`, out of stock until told otherwise.
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            original_price: price,
            brand: None,
            description: None,
            category: None,
            delivery: None,
            url: None,
            image: None,
            unit: ItemUnitData::piece(price),
            inventory: InventoryStatus::OutOfStock,
            currency: "KRW".to_string(),
            options: Vec::new(),
        }
    }

    pub fn with_original_price(mut self, price: f64) -> Self {
        self.original_price = price;
        self
    }

    pub fn with_unit(mut self, unit: ItemUnitData) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_inventory(mut self, inventory: InventoryStatus) -> Self {
        self.inventory = inventory;
        self
    }

    /// Category path, accepting `>`-separated breadcrumbs.
    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.replace('>', "|").trim().to_string());
        self
    }

    pub fn category_path(&self) -> Vec<&str> {
        self.category
            .as_deref()
            .map(|category| category.split('|').map(str::trim).collect())
            .unwrap_or_default()
    }

    pub fn discount_rate(&self) -> f64 {
        if self.original_price <= 0.0 {
            return 0.0;
        }
        (self.original_price - self.price) / self.original_price * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinite_unit_is_left_alone() {
        let data = ItemUnitData::new(1000.0, ItemUnitType::G, f64::INFINITY);
        assert!(data.unit.is_infinite());
        assert_eq!(data.price, 1000.0);
    }

    #[test]
    fn kilograms_become_grams() {
        let unit = ItemUnitData::new(5000.0, ItemUnitType::Kg, 1.0);
        assert_eq!(unit.unit_type, ItemUnitType::G);
        assert_eq!(unit.price, 5.0);
    }

    #[test]
    fn rescales_to_single_unit() {
        let unit = ItemUnitData::new(1000.0, ItemUnitType::G, 100.0);
        assert_eq!(unit.unit, 1.0);
        assert!((unit.price - 10.0).abs() < 1e-9);

        let unit = ItemUnitData::new(900.0, ItemUnitType::Ml, 3.0);
        assert_eq!(unit.unit, 1.0);
        assert!((unit.price - 300.0).abs() < 1e-9);
    }

    #[test]
    fn unit_labels() {
        assert_eq!(ItemUnitType::of("킬로그램"), ItemUnitType::Kg);
        assert_eq!(ItemUnitType::of("ML"), ItemUnitType::Ml);
        assert_eq!(ItemUnitType::of("box"), ItemUnitType::Piece);
    }

    #[test]
    fn inventory_thresholds() {
        assert_eq!(InventoryStatus::from_quantity(11), InventoryStatus::InStock);
        assert_eq!(InventoryStatus::from_quantity(10), InventoryStatus::AlmostSoldOut);
        assert_eq!(InventoryStatus::from_quantity(0), InventoryStatus::OutOfStock);
        assert_eq!(InventoryStatus::of(false, Some(3)), InventoryStatus::AlmostSoldOut);
        assert_eq!(InventoryStatus::of(true, Some(30)), InventoryStatus::OutOfStock);
        assert_eq!(InventoryStatus::of(false, None), InventoryStatus::InStock);
    }

    #[test]
    fn item_defaults() {
        let item = ItemData::new("1", "Coffee", 9000.0)
            .with_original_price(10000.0)
            .with_category("Food > Drinks > Coffee");
        assert!(item.unit.is_basic());
        assert_eq!(item.category_path(), vec!["Food", "Drinks", "Coffee"]);
        assert!((item.discount_rate() - 10.0).abs() < 1e-9);
    }
}
