use sqlx::PgPool;

/// Runs database queries expressed as `kanau` processors.
///
/// Each query is a plain struct; `impl Processor<Query> for DatabaseProcessor`
/// holds the SQL.
#[derive(Debug, Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}
