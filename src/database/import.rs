use std::io::Read;

use csv::{ReaderBuilder, Trim};

use crate::{error::TypeError, schema::IngredientPayload, validation::validate_ingredient};

/// Reads headerless `name,measurement_unit` rows. Row numbers in errors start at 1.
pub fn parse_ingredients<R: Read>(reader: R) -> Result<Vec<IngredientPayload>, TypeError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .from_reader(reader);

    let mut rows = vec![];
    for (index, record) in reader.deserialize::<IngredientPayload>().enumerate() {
        let row = record.map_err(|e| TypeError::new(&format!("Row {}: {e}", index + 1)))?;
        validate_ingredient(&row)
            .map_err(|e| TypeError::new(&format!("Row {}: {e}", index + 1)))?;
        rows.push(row);
    }

    Ok(rows)
}
