//! # Read-Only Gate Tests
//!
//! Covers the validator's three paths: the parser accepting SELECT-class
//! statements, the parser rejecting everything else, and the keyword-scan
//! fallback for SQL the parser cannot handle.

use askdb::errors::PipelineError;
use askdb::validate::validate_sql;

#[test]
fn accepts_simple_select() {
    assert!(validate_sql("SELECT 1", true).is_ok());
}

#[test]
fn accepts_select_with_joins_and_aggregates() {
    let sql = "SELECT c.name, SUM(o.amount) AS revenue \
               FROM orders o JOIN customers c ON o.customer_id = c.id \
               GROUP BY c.name ORDER BY revenue DESC LIMIT 5";
    assert!(validate_sql(sql, true).is_ok());
}

#[test]
fn accepts_cte_select() {
    // A CTE parses as a query statement, so it is accepted on the primary
    // path rather than falling through to the keyword scan.
    let sql = "WITH top AS (SELECT id FROM orders LIMIT 10) SELECT * FROM top";
    assert!(validate_sql(sql, true).is_ok());
}

#[test]
fn rejects_empty_sql_regardless_of_policy() {
    assert!(matches!(
        validate_sql("", true),
        Err(PipelineError::EmptySql)
    ));
    assert!(matches!(
        validate_sql("   \n\t", false),
        Err(PipelineError::EmptySql)
    ));
}

#[test]
fn rejects_mutating_statements() {
    for sql in [
        "INSERT INTO users (name) VALUES ('x')",
        "UPDATE users SET name = 'x' WHERE id = 1",
        "DELETE FROM users WHERE id = 1",
        "DROP TABLE users",
        "ALTER TABLE users ADD COLUMN age INT",
    ] {
        let result = validate_sql(sql, true);
        assert!(
            matches!(
                result,
                Err(PipelineError::SqlNotReadOnly(_)) | Err(PipelineError::ForbiddenKeyword(_))
            ),
            "expected a security rejection for {sql:?}, got {result:?}"
        );
    }
}

#[test]
fn rejects_multiple_statements() {
    let result = validate_sql("SELECT 1; SELECT 2", true);
    assert!(matches!(result, Err(PipelineError::SqlNotReadOnly(_))));
}

#[test]
fn keyword_fallback_rejects_malformed_sql_with_denylisted_keyword() {
    // Deliberately unparsable, but the denylist still catches it.
    let sql = "SELEC * FRM users; DROP TABLE users";
    let result = validate_sql(sql, true);
    assert!(
        matches!(result, Err(PipelineError::ForbiddenKeyword(ref kw)) if kw == "DROP"),
        "expected the keyword fallback to flag DROP, got {result:?}"
    );
}

#[test]
fn keyword_fallback_passes_unparsable_sql_without_keywords() {
    // The documented gap: parser failure plus a clean keyword scan lets the
    // statement through unvalidated.
    assert!(validate_sql("FOOBAR 123 ???", true).is_ok());
}

#[test]
fn read_only_off_allows_mutations() {
    assert!(validate_sql("DELETE FROM users", false).is_ok());
}
