//! Gear inventory model: stock classification, filtering, grouping, search.
//!
//! SYSTEM CONTEXT
//! ==============
//! Records come from the `gears` collection of the record store. Everything in
//! this module is pure so dashboard handlers stay thin.

use serde::de::IntoDeserializer;
use serde::de::value::StrDeserializer;
use serde::{Deserialize, Deserializer, Serialize};

/// Quantity at or below which a gear counts as running low.
pub const FEW_REMAINING_MAX: u32 = 3;
/// Maximum number of gears returned by [`search`].
pub const SEARCH_PART_LIMIT: usize = 5;

pub const COMMON_BORE_SIZES: [&str; 13] = [
    "1/4", "3/8", "1/2", "5/8", "3/4", "7/8", ".500", ".625", ".750", ".875", "1.000", "1.125", "1.250",
];
pub const COMMON_MATERIALS: [&str; 6] = ["Aluminum", "Steel", "Brass", "Delrin", "Nylon", "Titanium"];
pub const COMMON_DIAMETRAL_PITCHES: [u32; 7] = [20, 24, 32, 48, 64, 72, 96];

// =============================================================================
// RECORDS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoreType {
    Hex,
    Keyed,
    Bearing,
}

impl BoreType {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Hex => "Hex",
            Self::Keyed => "Keyed",
            Self::Bearing => "Bearing",
        }
    }
}

/// A gear record as stored in the `gears` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gear {
    pub id: String,
    pub name: String,
    pub bore_type: BoreType,
    /// Free-form size, e.g. `"1/2"` or `".875"`.
    pub bore_size: String,
    pub diametral_pitch: u32,
    pub teeth: u32,
    pub material: String,
    pub quantity: u32,
    pub owner: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
}

impl Gear {
    #[must_use]
    pub fn status(&self) -> GearStatus {
        GearStatus::from_quantity(self.quantity)
    }
}

/// Editable gear fields, as submitted by the add/edit forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GearFormData {
    pub name: String,
    pub bore_type: BoreType,
    pub bore_size: String,
    pub diametral_pitch: u32,
    pub teeth: u32,
    pub material: String,
    pub quantity: u32,
}

impl Default for GearFormData {
    fn default() -> Self {
        Self {
            name: String::new(),
            bore_type: BoreType::Hex,
            bore_size: "1/2".to_owned(),
            diametral_pitch: 20,
            teeth: 48,
            material: "Aluminum".to_owned(),
            quantity: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GearFormError {
    #[error("name is required")]
    MissingName,
    #[error("teeth must be at least 1")]
    NoTeeth,
    #[error("diametral pitch must be at least 1")]
    NoPitch,
    #[error("bore size is required")]
    MissingBoreSize,
}

impl GearFormData {
    /// Check the constraints the forms enforce before submitting.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), GearFormError> {
        if self.name.trim().is_empty() {
            return Err(GearFormError::MissingName);
        }
        if self.bore_size.trim().is_empty() {
            return Err(GearFormError::MissingBoreSize);
        }
        if self.teeth == 0 {
            return Err(GearFormError::NoTeeth);
        }
        if self.diametral_pitch == 0 {
            return Err(GearFormError::NoPitch);
        }
        Ok(())
    }
}

// =============================================================================
// STATUS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GearStatus {
    InStock,
    FewRemaining,
    OutOfStock,
}

impl GearStatus {
    #[must_use]
    pub fn from_quantity(quantity: u32) -> Self {
        match quantity {
            0 => Self::OutOfStock,
            q if q <= FEW_REMAINING_MAX => Self::FewRemaining,
            _ => Self::InStock,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::InStock => "In Stock",
            Self::FewRemaining => "Few Remaining",
            Self::OutOfStock => "Out of Stock",
        }
    }
}

// =============================================================================
// FILTERING AND GROUPING
// =============================================================================

/// Inventory page filters. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GearFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<GearStatus>,
    #[serde(default)]
    pub material: Option<String>,
}

/// Treat a blank query value (`?status=`) as an absent one.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => {
            let value: StrDeserializer<'_, D::Error> = value.into_deserializer();
            T::deserialize(value).map(Some)
        }
    }
}

impl GearFilter {
    #[must_use]
    pub fn matches(&self, gear: &Gear) -> bool {
        let search_ok = match self.search.as_deref().map(str::to_lowercase) {
            None => true,
            Some(q) if q.is_empty() => true,
            Some(q) => {
                gear.name.to_lowercase().contains(&q)
                    || gear.id.to_lowercase().contains(&q)
                    || gear.material.to_lowercase().contains(&q)
            }
        };
        let status_ok = self.status.is_none_or(|s| gear.status() == s);
        let material_ok = match self.material.as_deref() {
            None | Some("") => true,
            Some(m) => gear.material.eq_ignore_ascii_case(m),
        };
        search_ok && status_ok && material_ok
    }

    #[must_use]
    pub fn apply<'a>(&self, gears: &'a [Gear]) -> Vec<&'a Gear> {
        gears.iter().filter(|g| self.matches(g)).collect()
    }
}

/// Gears sharing one bore size and type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoreGroup {
    pub label: String,
    pub bore_size: String,
    pub bore_type: BoreType,
    pub gears: Vec<Gear>,
}

/// Display label such as `1/2" Hex`.
#[must_use]
pub fn format_bore_label(bore_size: &str, bore_type: BoreType) -> String {
    format!("{bore_size}\" {}", bore_type.label())
}

/// Group by `(bore_size, bore_type)`, keeping first-seen order.
#[must_use]
pub fn group_by_bore<'a, I>(gears: I) -> Vec<BoreGroup>
where
    I: IntoIterator<Item = &'a Gear>,
{
    let mut groups: Vec<BoreGroup> = Vec::new();
    for gear in gears {
        match groups
            .iter_mut()
            .find(|g| g.bore_size == gear.bore_size && g.bore_type == gear.bore_type)
        {
            Some(group) => group.gears.push(gear.clone()),
            None => groups.push(BoreGroup {
                label: format_bore_label(&gear.bore_size, gear.bore_type),
                bore_size: gear.bore_size.clone(),
                bore_type: gear.bore_type,
                gears: vec![gear.clone()],
            }),
        }
    }
    groups
}

/// Distinct materials in first-seen order.
#[must_use]
pub fn unique_materials(gears: &[Gear]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for gear in gears {
        if !out.contains(&gear.material) {
            out.push(gear.material.clone());
        }
    }
    out
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStats {
    pub total: usize,
    pub total_quantity: u64,
    pub in_stock: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
}

impl InventoryStats {
    #[must_use]
    pub fn from_gears(gears: &[Gear]) -> Self {
        gears.iter().fold(Self::default(), |mut acc, gear| {
            acc.total += 1;
            acc.total_quantity += u64::from(gear.quantity);
            match gear.status() {
                GearStatus::InStock => acc.in_stock += 1,
                GearStatus::FewRemaining => acc.low_stock += 1,
                GearStatus::OutOfStock => acc.out_of_stock += 1,
            }
            acc
        })
    }
}

// =============================================================================
// SEARCH
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartCategory {
    pub id: &'static str,
    pub title: &'static str,
    pub href: &'static str,
}

pub const PART_CATEGORIES: [PartCategory; 6] = [
    PartCategory { id: "gears", title: "Gears", href: "/gears" },
    PartCategory { id: "belts", title: "Belts", href: "/gears" },
    PartCategory { id: "sprockets", title: "Sprockets", href: "/gears" },
    PartCategory { id: "pulleys", title: "Pulleys", href: "/gears" },
    PartCategory { id: "motors", title: "Motors", href: "/gears" },
    PartCategory { id: "bearings", title: "Bearings", href: "/gears" },
];

/// One command-palette result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum SearchHit {
    Category(PartCategory),
    Part(Gear),
}

/// Categories whose title or id contains `query`, then up to
/// [`SEARCH_PART_LIMIT`] gears whose name does. Blank queries match nothing;
/// otherwise the query is matched as typed, surrounding spaces included.
#[must_use]
pub fn search(query: &str, gears: &[Gear]) -> Vec<SearchHit> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    let q = query.to_lowercase();
    let categories = PART_CATEGORIES
        .iter()
        .filter(|c| c.title.to_lowercase().contains(&q) || c.id.contains(&q))
        .map(|c| SearchHit::Category(*c));
    let parts = gears
        .iter()
        .filter(|g| g.name.to_lowercase().contains(&q))
        .take(SEARCH_PART_LIMIT)
        .map(|g| SearchHit::Part(g.clone()));
    categories.chain(parts).collect()
}

#[cfg(test)]
#[path = "inventory_test.rs"]
mod tests;
