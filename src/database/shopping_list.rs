use std::collections::BTreeMap;

use serde::Serialize;

use crate::schema::CartPart;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListLine {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

impl ShoppingListLine {
    pub fn render(&self) -> String {
        format!("{} ({}) — {}", self.name, self.measurement_unit, self.total)
    }
}

/// Sums ingredient amounts across every recipe in a cart.
///
/// Parts are grouped by `(name, measurement_unit)`, so the same ingredient in
/// two different units stays on two lines. Lines come out ordered by name,
/// then by unit.
pub fn aggregate(parts: impl IntoIterator<Item = CartPart>) -> Vec<ShoppingListLine> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();

    parts.into_iter().for_each(|part| {
        *totals
            .entry((part.name, part.measurement_unit))
            .or_insert(0) += part.amount as i64;
    });

    totals
        .into_iter()
        .map(|((name, measurement_unit), total)| ShoppingListLine {
            name,
            measurement_unit,
            total,
        })
        .collect()
}

pub fn render(lines: &[ShoppingListLine]) -> String {
    lines
        .iter()
        .map(ShoppingListLine::render)
        .collect::<Vec<String>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(name: &str, unit: &str, amount: i32) -> CartPart {
        CartPart {
            name: name.into(),
            measurement_unit: unit.into(),
            amount,
        }
    }

    #[test]
    fn sums_the_same_ingredient_across_recipes() {
        let lines = aggregate(vec![part("Salt", "g", 10), part("Salt", "g", 5)]);
        assert_eq!(render(&lines), "Salt (g) — 15");
    }

    #[test]
    fn empty_cart_renders_nothing() {
        let lines = aggregate(Vec::new());
        assert!(lines.is_empty());
        assert_eq!(render(&lines), "");
    }

    #[test]
    fn different_units_stay_separate_and_output_is_sorted() {
        let lines = aggregate(vec![
            part("Sugar", "g", 100),
            part("Milk", "ml", 200),
            part("Sugar", "tbsp", 2),
            part("Milk", "ml", 50),
            part("Eggs", "pcs", 3),
        ]);

        assert_eq!(
            render(&lines),
            "Eggs (pcs) — 3\nMilk (ml) — 250\nSugar (g) — 100\nSugar (tbsp) — 2"
        );
    }

    #[test]
    fn totals_do_not_overflow_i32() {
        let lines = aggregate(vec![
            part("Flour", "g", i32::MAX),
            part("Flour", "g", i32::MAX),
        ]);
        assert_eq!(lines[0].total, 2 * i32::MAX as i64);
    }
}
