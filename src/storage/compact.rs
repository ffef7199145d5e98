//! Query compaction.
//!
//! Merges single-row `INSERT INTO ... VALUES (...)` operations that share the
//! same statement prefix (table and column list) into one multi-row
//! statement, so a flush issues one round-trip per insert shape instead of
//! one per operation. Everything else passes through unchanged.
//!
//! Ordering: pass-through statements come first, in their original relative
//! order, followed by the statements of each insert shape in order of first
//! appearance. Value tuples inside a merged statement keep arrival order.
//! Order across statement types is not part of the contract.
//!
//! A merged statement never binds more than the store's parameter limit; a
//! shape that would exceed it continues in a new statement right after.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Operation, SqlValue};

/// Splits an insert into its prefix (up to and including `VALUES`) and its value clause.
static INSERT_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*(INSERT\s+INTO\s.*?\bVALUES)\s*(\(.*\))\s*;?\s*$")
        .expect("insert shape pattern is valid")
});

/// A statement ready to be sent to the store.
///
/// `argument_groups` holds one argument list per merged operation, in the
/// same order as the value tuples in `text`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactedStatement {
    pub text: String,
    pub argument_groups: Vec<Vec<SqlValue>>,
}

impl CompactedStatement {
    fn single(operation: &Operation) -> Self {
        CompactedStatement {
            text: operation.query().to_string(),
            argument_groups: vec![operation.args().to_vec()],
        }
    }

    /// All positional arguments, flattened in binding order.
    pub fn arguments(&self) -> impl Iterator<Item = &SqlValue> {
        self.argument_groups.iter().flatten()
    }

    /// Number of operations folded into this statement.
    pub fn operation_count(&self) -> usize {
        self.argument_groups.len()
    }
}

struct InsertGroup<'a> {
    prefix: &'a str,
    max_bind_parameters: usize,
    finished: Vec<CompactedStatement>,
    tuples: Vec<String>,
    argument_groups: Vec<Vec<SqlValue>>,
    bound_args: usize,
}

impl<'a> InsertGroup<'a> {
    fn new(prefix: &'a str, max_bind_parameters: usize) -> Self {
        InsertGroup {
            prefix,
            max_bind_parameters,
            finished: Vec::new(),
            tuples: Vec::new(),
            argument_groups: Vec::new(),
            bound_args: 0,
        }
    }

    fn push(&mut self, values: &str, args: &[SqlValue]) {
        // A single oversized operation still gets a statement of its own
        if !self.tuples.is_empty() && self.bound_args + args.len() > self.max_bind_parameters {
            self.finish_statement();
        }
        self.tuples.push(shift_placeholders(values, self.bound_args));
        self.bound_args += args.len();
        self.argument_groups.push(args.to_vec());
    }

    fn finish_statement(&mut self) {
        let tuples = std::mem::take(&mut self.tuples);
        self.finished.push(CompactedStatement {
            text: format!("{} {}", self.prefix, tuples.join(",")),
            argument_groups: std::mem::take(&mut self.argument_groups),
        });
        self.bound_args = 0;
    }

    fn into_statements(mut self) -> Vec<CompactedStatement> {
        if !self.tuples.is_empty() {
            self.finish_statement();
        }
        self.finished
    }
}

/// Compacts a batch into the statements a flush executes.
///
/// `max_bind_parameters` caps the positional arguments of one merged
/// statement; see [`StatementExecutor::max_bind_parameters`](super::StatementExecutor::max_bind_parameters).
pub fn compact(operations: &[Operation], max_bind_parameters: usize) -> Vec<CompactedStatement> {
    let mut statements = Vec::new();
    let mut groups: Vec<InsertGroup<'_>> = Vec::new();
    let mut group_index: HashMap<&str, usize> = HashMap::new();

    for operation in operations {
        match split_insert(operation.query()) {
            Some((prefix, values)) => {
                let slot = *group_index.entry(prefix).or_insert_with(|| {
                    groups.push(InsertGroup::new(prefix, max_bind_parameters));
                    groups.len() - 1
                });
                groups[slot].push(values, operation.args());
            }
            None => statements.push(CompactedStatement::single(operation)),
        }
    }

    statements.extend(groups.into_iter().flat_map(InsertGroup::into_statements));
    statements
}

/// Returns `(prefix, value tuples)` for a mergeable insert.
///
/// The value clause must be nothing but parenthesized tuples separated by
/// commas; anything trailing it (`ON CONFLICT`, `RETURNING`, ...) makes the
/// statement non-mergeable.
fn split_insert(query: &str) -> Option<(&str, &str)> {
    let captures = INSERT_SHAPE.captures(query)?;
    let prefix = captures.get(1)?.as_str();
    let values = captures.get(2)?.as_str();
    is_tuple_list(values).then_some((prefix, values))
}

fn is_tuple_list(values: &str) -> bool {
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut expect_tuple = true;

    for c in values.chars() {
        if in_quote {
            if c == '\'' {
                in_quote = false;
            }
            continue;
        }
        match c {
            '\'' if depth > 0 => in_quote = true,
            '(' => {
                if depth == 0 {
                    if !expect_tuple {
                        return false;
                    }
                    expect_tuple = false;
                }
                depth += 1;
            }
            ')' => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            ',' if depth == 0 => {
                if expect_tuple {
                    return false;
                }
                expect_tuple = true;
            }
            c if depth == 0 && !c.is_whitespace() => return false,
            _ => {}
        }
    }

    depth == 0 && !in_quote && !expect_tuple
}

/// Adds `offset` to every `$N` placeholder outside of single-quoted literals.
fn shift_placeholders(values: &str, offset: usize) -> String {
    if offset == 0 {
        return values.to_string();
    }

    let mut out = String::with_capacity(values.len() + 8);
    let mut chars = values.chars().peekable();
    let mut in_quote = false;

    while let Some(c) = chars.next() {
        if in_quote {
            in_quote = c != '\'';
            out.push(c);
            continue;
        }
        match c {
            '\'' => {
                in_quote = true;
                out.push(c);
            }
            '$' => {
                let mut digits = String::new();
                while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                    digits.push(d);
                    chars.next();
                }
                out.push('$');
                match digits.parse::<usize>() {
                    Ok(n) => out.push_str(&(n + offset).to_string()),
                    Err(_) => out.push_str(&digits),
                }
            }
            _ => out.push(c),
        }
    }

    out
}
