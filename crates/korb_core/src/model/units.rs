//! Measurement units and grocery categories.
//!
//! # Responsibility
//! - Define the unit and category vocabulary with its German wire strings.
//! - Classify units (weight/volume/count) and convert between compatible
//!   ones.
//!
//! # Invariants
//! - `as_str`/`parse` round-trip for every variant; the same string is used
//!   for the database column and for JSON.
//! - Conversions never cross unit families.

use serde::{Deserialize, Serialize};

/// Measurement unit for list items and recipe ingredients.
///
/// Wire strings are the German shopping vocabulary the app ships with;
/// abbreviations stay lowercase, count words keep their capitalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "kg")]
    Kilogram,
    #[serde(rename = "lb")]
    Pound,
    #[serde(rename = "oz")]
    Ounce,
    #[serde(rename = "ml")]
    Milliliter,
    #[serde(rename = "l")]
    Liter,
    #[serde(rename = "cup")]
    Cup,
    #[serde(rename = "tbsp")]
    Tablespoon,
    #[serde(rename = "tsp")]
    Teaspoon,
    #[serde(rename = "fl oz")]
    FluidOunce,
    #[serde(rename = "Stück")]
    Piece,
    #[serde(rename = "Packung")]
    Pack,
    #[serde(rename = "Flasche")]
    Bottle,
    #[serde(rename = "Dose")]
    Can,
    #[serde(rename = "Beutel")]
    Bag,
    #[serde(rename = "Schachtel")]
    Box,
    #[serde(rename = "Bund")]
    Bunch,
    #[serde(rename = "Scheibe")]
    Slice,
    #[serde(rename = "Prise")]
    Pinch,
    #[serde(rename = "Handvoll")]
    Handful,
}

/// Unit family; conversions are only defined within one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Weight,
    Volume,
    Count,
}

/// Pairwise conversion factors (`value_in_to = value_in_from * factor`).
///
/// Count units are deliberately absent; a `Bund` is not convertible.
const CONVERSIONS: &[(Unit, Unit, f64)] = &[
    (Unit::Gram, Unit::Kilogram, 0.001),
    (Unit::Kilogram, Unit::Gram, 1000.0),
    (Unit::Pound, Unit::Kilogram, 0.453592),
    (Unit::Kilogram, Unit::Pound, 2.20462),
    (Unit::Ounce, Unit::Gram, 28.3495),
    (Unit::Gram, Unit::Ounce, 0.035274),
    (Unit::Milliliter, Unit::Liter, 0.001),
    (Unit::Liter, Unit::Milliliter, 1000.0),
    (Unit::Cup, Unit::Milliliter, 236.588),
    (Unit::Tablespoon, Unit::Milliliter, 14.7868),
    (Unit::Teaspoon, Unit::Milliliter, 4.92892),
];

impl Unit {
    /// Every unit, in wire-vocabulary order. Used by the free-text parser.
    pub const ALL: [Unit; 20] = [
        Unit::Gram,
        Unit::Kilogram,
        Unit::Pound,
        Unit::Ounce,
        Unit::Milliliter,
        Unit::Liter,
        Unit::Cup,
        Unit::Tablespoon,
        Unit::Teaspoon,
        Unit::FluidOunce,
        Unit::Piece,
        Unit::Pack,
        Unit::Bottle,
        Unit::Can,
        Unit::Bag,
        Unit::Box,
        Unit::Bunch,
        Unit::Slice,
        Unit::Pinch,
        Unit::Handful,
    ];

    /// Returns the wire/storage string for this unit.
    pub fn as_str(self) -> &'static str {
        match self {
            Unit::Gram => "g",
            Unit::Kilogram => "kg",
            Unit::Pound => "lb",
            Unit::Ounce => "oz",
            Unit::Milliliter => "ml",
            Unit::Liter => "l",
            Unit::Cup => "cup",
            Unit::Tablespoon => "tbsp",
            Unit::Teaspoon => "tsp",
            Unit::FluidOunce => "fl oz",
            Unit::Piece => "Stück",
            Unit::Pack => "Packung",
            Unit::Bottle => "Flasche",
            Unit::Can => "Dose",
            Unit::Bag => "Beutel",
            Unit::Box => "Schachtel",
            Unit::Bunch => "Bund",
            Unit::Slice => "Scheibe",
            Unit::Pinch => "Prise",
            Unit::Handful => "Handvoll",
        }
    }

    /// Parses an exact wire/storage string.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|unit| unit.as_str() == value)
    }

    /// Returns the family this unit belongs to.
    pub fn kind(self) -> UnitKind {
        match self {
            Unit::Gram | Unit::Kilogram | Unit::Pound | Unit::Ounce => UnitKind::Weight,
            Unit::Milliliter
            | Unit::Liter
            | Unit::Cup
            | Unit::Tablespoon
            | Unit::Teaspoon
            | Unit::FluidOunce => UnitKind::Volume,
            _ => UnitKind::Count,
        }
    }

    /// Converts a value into another unit, directly or via one intermediate
    /// conversion. Returns `None` when no conversion path exists.
    pub fn convert(value: f64, from: Unit, to: Unit) -> Option<f64> {
        if from == to {
            return Some(value);
        }

        if let Some((_, _, factor)) = CONVERSIONS
            .iter()
            .find(|(conv_from, conv_to, _)| *conv_from == from && *conv_to == to)
        {
            return Some(value * factor);
        }

        for (first_from, first_to, first_factor) in CONVERSIONS {
            if *first_from != from {
                continue;
            }
            if let Some((_, _, second_factor)) = CONVERSIONS
                .iter()
                .find(|(conv_from, conv_to, _)| conv_from == first_to && *conv_to == to)
            {
                return Some(value * first_factor * second_factor);
            }
        }

        None
    }

    /// Units reachable from this one through the conversion table,
    /// including itself.
    pub fn compatible_units(self) -> Vec<Unit> {
        let mut compatible = vec![self];
        // Two expansion rounds cover every one-hop-indirect pair.
        for _ in 0..2 {
            let known: Vec<Unit> = compatible.clone();
            for unit in known {
                for (from, to, _) in CONVERSIONS {
                    if *from == unit && !compatible.contains(to) {
                        compatible.push(*to);
                    }
                    if *to == unit && !compatible.contains(from) {
                        compatible.push(*from);
                    }
                }
            }
        }
        compatible
    }
}

/// Grocery category for list items and recipe ingredients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Obst")]
    Fruits,
    #[serde(rename = "Gemüse")]
    Vegetables,
    #[serde(rename = "Fleisch")]
    Meat,
    #[serde(rename = "Fisch")]
    Fish,
    #[serde(rename = "Geflügel")]
    Poultry,
    #[serde(rename = "Eier")]
    Eggs,
    #[serde(rename = "Milchprodukte")]
    Dairy,
    #[serde(rename = "Käse")]
    Cheese,
    #[serde(rename = "Getreide & Nudeln")]
    Grains,
    #[serde(rename = "Konserven")]
    Canned,
    #[serde(rename = "Gewürze")]
    Spices,
    #[serde(rename = "Öle & Essige")]
    Oils,
    #[serde(rename = "Backzutaten")]
    Baking,
    #[serde(rename = "Snacks")]
    Snacks,
    #[serde(rename = "Getränke")]
    Beverages,
    #[serde(rename = "Alkohol")]
    Alcohol,
    #[serde(rename = "Reinigung")]
    Cleaning,
    #[serde(rename = "Körperpflege")]
    PersonalCare,
    #[serde(rename = "Babypflege")]
    BabyCare,
    #[serde(rename = "Tierbedarf")]
    PetSupplies,
}

impl Category {
    pub const ALL: [Category; 20] = [
        Category::Fruits,
        Category::Vegetables,
        Category::Meat,
        Category::Fish,
        Category::Poultry,
        Category::Eggs,
        Category::Dairy,
        Category::Cheese,
        Category::Grains,
        Category::Canned,
        Category::Spices,
        Category::Oils,
        Category::Baking,
        Category::Snacks,
        Category::Beverages,
        Category::Alcohol,
        Category::Cleaning,
        Category::PersonalCare,
        Category::BabyCare,
        Category::PetSupplies,
    ];

    /// Returns the wire/storage string for this category.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Fruits => "Obst",
            Category::Vegetables => "Gemüse",
            Category::Meat => "Fleisch",
            Category::Fish => "Fisch",
            Category::Poultry => "Geflügel",
            Category::Eggs => "Eier",
            Category::Dairy => "Milchprodukte",
            Category::Cheese => "Käse",
            Category::Grains => "Getreide & Nudeln",
            Category::Canned => "Konserven",
            Category::Spices => "Gewürze",
            Category::Oils => "Öle & Essige",
            Category::Baking => "Backzutaten",
            Category::Snacks => "Snacks",
            Category::Beverages => "Getränke",
            Category::Alcohol => "Alkohol",
            Category::Cleaning => "Reinigung",
            Category::PersonalCare => "Körperpflege",
            Category::BabyCare => "Babypflege",
            Category::PetSupplies => "Tierbedarf",
        }
    }

    /// Parses an exact wire/storage string.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
    }
}

#[cfg(test)]
mod tests {
    use super::{Category, Unit, UnitKind};

    #[test]
    fn unit_strings_round_trip() {
        for unit in Unit::ALL {
            assert_eq!(Unit::parse(unit.as_str()), Some(unit));
        }
    }

    #[test]
    fn category_strings_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::parse(category.as_str()), Some(category));
        }
    }

    #[test]
    fn unit_kinds_cover_families() {
        assert_eq!(Unit::Kilogram.kind(), UnitKind::Weight);
        assert_eq!(Unit::FluidOunce.kind(), UnitKind::Volume);
        assert_eq!(Unit::Bunch.kind(), UnitKind::Count);
    }

    #[test]
    fn direct_conversion_uses_table_factor() {
        assert_eq!(Unit::convert(2.0, Unit::Kilogram, Unit::Gram), Some(2000.0));
        assert_eq!(Unit::convert(500.0, Unit::Milliliter, Unit::Liter), Some(0.5));
    }

    #[test]
    fn indirect_conversion_goes_through_one_hop() {
        // lb -> kg -> g
        let grams = Unit::convert(1.0, Unit::Pound, Unit::Gram).unwrap();
        assert!((grams - 453.592).abs() < 1e-6);
    }

    #[test]
    fn conversion_never_crosses_families() {
        assert_eq!(Unit::convert(1.0, Unit::Gram, Unit::Liter), None);
        assert_eq!(Unit::convert(1.0, Unit::Piece, Unit::Pack), None);
    }

    #[test]
    fn fluid_ounce_has_no_conversion_path() {
        assert_eq!(Unit::convert(1.0, Unit::FluidOunce, Unit::Milliliter), None);
    }

    #[test]
    fn identity_conversion_is_free() {
        assert_eq!(Unit::convert(3.5, Unit::Cup, Unit::Cup), Some(3.5));
    }

    #[test]
    fn compatible_units_span_the_weight_family() {
        let compatible = Unit::Gram.compatible_units();
        for unit in [Unit::Gram, Unit::Kilogram, Unit::Pound, Unit::Ounce] {
            assert!(compatible.contains(&unit), "missing {unit:?}");
        }
        assert!(!compatible.contains(&Unit::Liter));
    }

    #[test]
    fn serde_uses_wire_strings() {
        assert_eq!(
            serde_json::to_string(&Unit::Piece).unwrap(),
            "\"Stück\""
        );
        assert_eq!(
            serde_json::from_str::<Category>("\"Getreide & Nudeln\"").unwrap(),
            Category::Grains
        );
    }
}
