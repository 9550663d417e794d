//! Grouping and price derivation for the product board.

use std::cmp::Ordering;
use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::Serialize;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::api::models::inventory::{Category, InventoryItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceDirection {
    Up,
    Down,
    Neutral,
}

/// An inventory item together with how far its live price has moved from the base price.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedItem {
    #[serde(flatten)]
    pub item: InventoryItem,
    pub price_delta: Decimal,
    pub price_delta_percent: Decimal,
    pub direction: PriceDirection,
}

pub fn price_item(item: InventoryItem) -> PricedItem {
    let price_delta = item.unit_price - item.base_price;
    // checked_div is None for a zero base price
    let price_delta_percent = price_delta
        .checked_div(item.base_price)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|percent| percent.normalize())
        .unwrap_or(Decimal::ZERO);

    let direction = match price_delta.cmp(&Decimal::ZERO) {
        Ordering::Greater => PriceDirection::Up,
        Ordering::Less => PriceDirection::Down,
        Ordering::Equal => PriceDirection::Neutral,
    };

    PricedItem {
        item,
        price_delta,
        price_delta_percent,
        direction,
    }
}

/// Orders product names the way a person reading the board expects.
///
/// Base letters decide first, ignoring accents and case. Among names equal on that, the
/// unaccented form comes first, then the lowercase form.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    collation_key(a, true)
        .cmp(&collation_key(b, true))
        .then_with(|| collation_key(a, false).cmp(&collation_key(b, false)))
        .then_with(|| b.cmp(a))
}

fn collation_key(name: &str, strip_marks: bool) -> String {
    name.nfd()
        .filter(|c| !(strip_marks && is_combining_mark(*c)))
        .collect::<String>()
        .to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryGroup {
    pub category: Category,
    pub items: Vec<PricedItem>,
}

/// Builds the board's groups from categories in upstream order, each paired with the items
/// fetched for it.
///
/// An item id seen under several categories stays only in the first. Categories left without
/// items are omitted.
pub fn group_by_category(fetched: Vec<(Category, Vec<InventoryItem>)>) -> Vec<CategoryGroup> {
    let mut seen = HashSet::new();

    fetched
        .into_iter()
        .filter_map(|(category, items)| {
            let mut items: Vec<PricedItem> = items
                .into_iter()
                .filter(|item| seen.insert(item.id))
                .map(price_item)
                .collect();
            if items.is_empty() {
                return None;
            }
            items.sort_by(|a, b| locale_cmp(&a.item.product_name, &b.item.product_name));
            Some(CategoryGroup { category, items })
        })
        .collect()
}
