//! # Read-Only SQL Gate
//!
//! Static validation of candidate SQL before anything touches a target
//! engine. The primary path parses the statement with a real SQL parser and
//! accepts only a single SELECT-class statement; when the parser cannot
//! handle the dialect, a keyword denylist scan takes over.

use crate::errors::PipelineError;
use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use tracing::warn;

const DENYLIST: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE", "EXEC", "EXECUTE",
];

/// Validates a candidate statement against the read-only policy.
///
/// Blank SQL is always rejected, independent of the policy flag. With
/// `read_only` off, any non-blank statement passes.
pub fn validate_sql(sql: &str, read_only: bool) -> Result<(), PipelineError> {
    if sql.trim().is_empty() {
        return Err(PipelineError::EmptySql);
    }
    if !read_only {
        return Ok(());
    }

    match Parser::parse_sql(&GenericDialect {}, sql) {
        Ok(statements) => match statements.as_slice() {
            [Statement::Query(_)] => Ok(()),
            [other] => Err(PipelineError::SqlNotReadOnly(statement_kind(other))),
            _ => Err(PipelineError::SqlNotReadOnly(format!(
                "{} statements in one submission",
                statements.len()
            ))),
        },
        Err(parse_error) => {
            // Dialect-specific SQL the parser cannot handle falls back to a
            // keyword scan over the uppercased text. A statement that fails
            // to parse and dodges the denylist passes through unvalidated —
            // a known gap; the target engine's own permissions are the
            // remaining line of defense.
            warn!(error = %parse_error, "SQL parse failed; falling back to keyword scan");
            let upper = sql.to_uppercase();
            for keyword in DENYLIST {
                if upper.contains(keyword) {
                    return Err(PipelineError::ForbiddenKeyword((*keyword).to_string()));
                }
            }
            Ok(())
        }
    }
}

/// A short human-readable tag for the offending statement kind, used in the
/// rejection message.
fn statement_kind(statement: &Statement) -> String {
    statement
        .to_string()
        .split_whitespace()
        .next()
        .unwrap_or("unknown")
        .to_string()
}
