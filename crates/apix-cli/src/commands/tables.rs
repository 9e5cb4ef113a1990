use apix_core::Catalog;
use serde_json::{json, Value};

use crate::error::CliError;
use crate::output;

pub fn run(pretty: bool) -> Result<(), CliError> {
    output::render(&describe(&Catalog::builtin()), pretty)
}

fn describe(catalog: &Catalog) -> Value {
    let tables = catalog
        .tables()
        .iter()
        .map(|table| {
            json!({
                "table": table.table_name,
                "endpoint": table.endpoint_name,
                "date_column": table.date_column_name,
                "columns": table.columns.len(),
            })
        })
        .collect::<Vec<_>>();
    Value::Array(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_every_table() {
        let described = describe(&Catalog::builtin());
        let tables = described.as_array().expect("array");

        assert_eq!(tables.len(), 9);
        assert_eq!(tables[0]["table"], "lista_lead");
        assert_eq!(tables[0]["endpoint"], "lista-lead");
        assert_eq!(tables[0]["date_column"], "dt_criacao");
    }
}
