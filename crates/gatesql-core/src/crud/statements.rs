//! Create, read and delete compilers.

use serde_json::Value;

use super::{documents, qualified_table, DeleteRequest, Operation, ReadRequest, Row, Statement};
use crate::builder::{identifier, Delete, FilterExpr, Insert, Select, SortOrder, SqlValue};
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::schema::SchemaFields;

/// Converts a document to rows without schema information.
pub fn rows_from_json(document: &Value) -> Result<Vec<Row>> {
    documents(document)?
        .into_iter()
        .map(|object| {
            object
                .iter()
                .map(|(key, value)| Ok((identifier(key)?.to_string(), SqlValue::from_json(value))))
                .collect()
        })
        .collect()
}

/// One INSERT for one row.
///
/// `schema`, when known, lets the dialect type each placeholder after its
/// column.
pub fn compile_insert(
    dialect: &dyn Dialect,
    project: &str,
    table: &str,
    row: Row,
    schema: Option<&SchemaFields>,
) -> Result<Statement> {
    if row.is_empty() {
        return Err(Error::invalid(format!("nothing to insert into {table}")));
    }
    for column in row.keys() {
        identifier(column)?;
    }
    let target = qualified_table(dialect, project, table)?;
    Ok(Insert::into_table(&target).row(row).build_typed(dialect, schema))
}

/// One INSERT per row, in input order.
pub fn compile_create(
    dialect: &dyn Dialect,
    project: &str,
    table: &str,
    rows: Vec<Row>,
    schema: Option<&SchemaFields>,
) -> Result<Vec<Statement>> {
    rows.into_iter()
        .map(|row| compile_insert(dialect, project, table, row, schema))
        .collect()
}

pub fn compile_read(
    dialect: &dyn Dialect,
    project: &str,
    table: &str,
    request: &ReadRequest,
    schema: Option<&SchemaFields>,
) -> Result<Statement> {
    let target = qualified_table(dialect, project, table)?;
    let filter = FilterExpr::from_find(&request.find)?;
    let options = &request.options;

    let select = match request.operation {
        Operation::Count => Select::new().count(),
        Operation::Distinct => {
            let column = options.distinct.as_deref().ok_or_else(|| {
                Error::invalid("distinct read requires options.distinct")
            })?;
            Select::new().distinct(identifier(column)?)
        }
        Operation::One | Operation::All => {
            let projected: Vec<&str> = options
                .select
                .iter()
                .flatten()
                .filter(|(_, include)| **include != 0)
                .map(|(column, _)| identifier(column))
                .collect::<Result<_>>()?;
            if projected.is_empty() {
                Select::new().all()
            } else {
                Select::new().columns(&projected)
            }
        }
        Operation::Upsert => {
            return Err(Error::invalid("upsert is not a read operation"));
        }
    };

    let mut select = select.from(&target).filter(filter);
    for key in &options.sort {
        let (column, order) = match key.strip_prefix('-') {
            Some(column) => (column, SortOrder::Desc),
            None => (key.as_str(), SortOrder::Asc),
        };
        select = select.order_by(identifier(column)?, order);
    }
    if let Some(skip) = options.skip {
        select = select.offset(skip);
    }
    let limit = match request.operation {
        Operation::One => Some(1),
        _ => options.limit,
    };
    if let Some(limit) = limit {
        select = select.limit(limit);
    }
    Ok(select.build_typed(dialect, schema))
}

/// DELETE for every row matching the filter.
pub fn compile_delete(
    dialect: &dyn Dialect,
    project: &str,
    table: &str,
    request: &DeleteRequest,
    schema: Option<&SchemaFields>,
) -> Result<Statement> {
    if request.operation != Operation::All {
        return Err(Error::invalid(format!(
            "invalid operation ({}) for delete, use all with a selective filter",
            request.operation
        )));
    }
    let target = qualified_table(dialect, project, table)?;
    let filter = FilterExpr::from_find(&request.find)?;
    Ok(Delete::from(&target).filter(filter).build_typed(dialect, schema))
}
