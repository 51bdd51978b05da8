//! # Prompt Templates
//!
//! Centralized prompt constants. Placeholders in `{curly_braces}` are
//! filled by the context assembler or the component that owns the call.

/// System prompt for SQL generation.
pub const SQL_GENERATION_SYSTEM_PROMPT: &str = "You are an expert data analyst. You translate natural-language questions into a single read-only SQL query for the user's database. You only ever answer with the JSON object described in the instructions; you never execute anything yourself.";

/// User prompt template for SQL generation.
///
/// The reply contract is the structured tier of the reply parser: a JSON
/// object with `success`, `sql`, and `brief` (or `message` when the
/// question cannot be answered). The fenced and bare-statement tiers exist
/// because models do not always honor the contract.
pub const SQL_GENERATION_USER_PROMPT: &str = r#"Write one read-only SQL query that answers the user's question against the tables described below.

Rules:
1. Produce a single SELECT statement. Never produce INSERT, UPDATE, DELETE, DDL, or multiple statements.
2. Only reference tables and columns that appear in the schema context. Do not invent names.
3. Use the business terms and the reference examples to interpret domain wording.
4. If the conversation history contains a system error note about a previous attempt, correct that mistake.
5. If the question cannot be answered from the schema, say so instead of guessing.

Reply with exactly one JSON object, no surrounding prose:
- When a query is possible: {"success": true, "sql": "<the query>", "brief": "<one-sentence explanation>"}
- When it is not: {"success": false, "message": "<why not, and what is missing>"}

# Table schemas
{schema_context}

# Business terms
{term_glossary}

# Reference examples
{sql_examples}

# Conversation history
{chat_history}

# User question
{question}
"#;

/// Prompt template for the row-level permission rewrite.
pub const PERMISSION_REWRITE_PROMPT: &str = r#"You are a {engine} expert. Rewrite the SQL statement below so that its results are restricted by the mandatory filter condition. Apply the condition to the table it refers to, using AND with any existing WHERE clause, and preserve the statement's meaning otherwise. Do not change the selected columns, ordering, or limits.

Mandatory filter condition: {filter}

Original SQL:
```sql
{sql}
```

Reply with the rewritten statement in a single ```sql code block and nothing else.
"#;

/// Prompt template for result analysis and chart recommendation.
pub const DATA_ANALYSIS_PROMPT: &str = r#"You are a data analyst. Given a user question, the SQL that answered it, and a sample of the result rows, write a short insight and recommend how to visualize the data.

Reply with exactly one JSON object:
{"insight": "<2-3 sentence summary of what the data shows>", "chart_type": "<Table|Bar|Line|Pie>", "x_axis": "<column name or null>", "y_axis": "<column name or null>"}

# Question
{question}

# SQL
{sql}

# Result sample (JSON)
{data}
"#;

/// Prompt template for follow-up question suggestions.
pub const SUGGEST_QUESTIONS_PROMPT: &str = r#"The user asked a question about their data and received an answer. Propose 3 natural follow-up questions the user is likely to ask next. Stay within what the queried tables can plausibly answer.

Reply with exactly one JSON array of 3 strings, no surrounding prose.

# Question
{question}

# SQL used for the answer
{sql}
"#;
