//! Write-operation model.
//!
//! An [`Operation`] is one SQL statement with its positional arguments. The
//! integrator's mapper produces operations either directly or through one of
//! the [`Model`] builders below.

mod value;

pub use value::SqlValue;

/// A normalized write operation: statement text plus positional arguments.
///
/// Operations are immutable once built. The batch buffer owns them from
/// insertion until they are flushed or discarded on rebalance.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    query: String,
    args: Vec<SqlValue>,
}

impl Operation {
    /// Creates an operation from statement text and its arguments.
    pub fn new(query: impl Into<String>, args: Vec<SqlValue>) -> Self {
        Operation {
            query: query.into(),
            args,
        }
    }

    /// Creates an operation with no bound arguments.
    pub fn statement(query: impl Into<String>) -> Self {
        Self::new(query, Vec::new())
    }

    /// Statement text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Positional arguments, in placeholder order.
    pub fn args(&self) -> &[SqlValue] {
        &self.args
    }
}

/// Anything that can be turned into a write operation.
pub trait Model {
    fn to_operation(&self) -> Operation;
}

impl Model for Operation {
    fn to_operation(&self) -> Operation {
        self.clone()
    }
}

/// Integrator-written SQL passed through as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct Raw {
    pub query: String,
    pub args: Vec<SqlValue>,
}

impl Model for Raw {
    fn to_operation(&self) -> Operation {
        Operation::new(self.query.clone(), self.args.clone())
    }
}

/// Single-row insert.
///
/// Renders `INSERT INTO <table> (<c1>, <c2>) VALUES ($1, $2)`, which the
/// compactor merges with other inserts into the same table and columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<SqlValue>,
}

impl Model for Insert {
    fn to_operation(&self) -> Operation {
        let placeholders = (1..=self.values.len())
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            self.columns.join(", "),
            placeholders
        );
        Operation::new(query, self.values.clone())
    }
}

/// Single-row insert that overwrites the existing row on a key conflict.
///
/// Renders `INSERT INTO <table> (<c1>, <c2>) VALUES ($1, $2) ON CONFLICT
/// (<key>) DO UPDATE SET <c2> = excluded.<c2>`, accepted by both SQLite and
/// PostgreSQL. The conflict columns need a unique index or primary key.
/// When every column is a conflict column the statement is `DO NOTHING`.
///
/// Upserts are never merged by the compactor, so they run in arrival order
/// together with deletes and other pass-through statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Upsert {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<SqlValue>,
    pub conflict_columns: Vec<String>,
}

impl Model for Upsert {
    fn to_operation(&self) -> Operation {
        let insert = Insert {
            table: self.table.clone(),
            columns: self.columns.clone(),
            values: self.values.clone(),
        }
        .to_operation();

        let updates = self
            .columns
            .iter()
            .filter(|c| !self.conflict_columns.contains(c))
            .map(|c| format!("{} = excluded.{}", c, c))
            .collect::<Vec<_>>();
        let action = if updates.is_empty() {
            "DO NOTHING".to_string()
        } else {
            format!("DO UPDATE SET {}", updates.join(", "))
        };

        let query = format!(
            "{} ON CONFLICT ({}) {}",
            insert.query(),
            self.conflict_columns.join(", "),
            action
        );
        Operation::new(query, self.values.clone())
    }
}

/// Delete by key column.
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: String,
    pub key_column: String,
    pub key: SqlValue,
}

impl Model for Delete {
    fn to_operation(&self) -> Operation {
        let query = format!("DELETE FROM {} WHERE {} = $1", self.table, self.key_column);
        Operation::new(query, vec![self.key.clone()])
    }
}
