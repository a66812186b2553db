//! PostgreSQL executor over `tokio-postgres`.

use std::error::Error;
use std::pin::Pin;
use std::sync::Arc;

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_core::Stream;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_postgres::{Client, NoTls, Row, RowStream};

use crate::client::{ExecResult, Executor, RawRow, RowSource};
use crate::config::{ConnectionConfig, DRIVER_POSTGRES};
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::value::{TemporalKind, Value};

/// [`Executor`] backed by one `tokio_postgres::Client`.
///
/// # Example
///
/// ```ignore
/// use entorm::{ConnectionConfig, Model, PgExecutor};
///
/// let config = ConnectionConfig::new("postgres")
///     .host("127.0.0.1")
///     .database("app")
///     .username("app");
/// let executor = PgExecutor::connect(&config).await?;
/// let mut users = Model::new(&executor, User::default())?;
/// ```
pub struct PgExecutor {
    client: Client,
}

impl PgExecutor {
    /// Wrap an already connected client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Open a connection described by `config` and check it is alive.
    ///
    /// The connection task is spawned on the current tokio runtime.
    pub async fn connect(config: &ConnectionConfig) -> OrmResult<Self> {
        if config.driver != DRIVER_POSTGRES {
            return Err(OrmError::Config(format!(
                "PgExecutor cannot open driver `{}`",
                config.driver
            )));
        }

        let mut pg = tokio_postgres::Config::new();
        pg.host(&config.host)
            .port(config.effective_port())
            .dbname(&config.database)
            .user(&config.username);
        if !config.password.is_empty() {
            pg.password(&config.password);
        }
        Self::open(pg).await
    }

    /// Open a connection from a `postgres://` URL or key/value string.
    pub async fn connect_url(url: &str) -> OrmResult<Self> {
        let pg: tokio_postgres::Config = url
            .parse()
            .map_err(|e: tokio_postgres::Error| OrmError::Config(e.to_string()))?;
        Self::open(pg).await
    }

    async fn open(pg: tokio_postgres::Config) -> OrmResult<Self> {
        let (client, connection) = pg
            .connect(NoTls)
            .await
            .map_err(|e| OrmError::Connection(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(_e) = connection.await {
                #[cfg(feature = "tracing")]
                tracing::warn!(target: "entorm.sql", error = %_e, "postgres connection closed");
            }
        });

        let executor = Self { client };
        executor.ping().await?;
        Ok(executor)
    }

    /// Round-trip a trivial statement.
    pub async fn ping(&self) -> OrmResult<()> {
        self.client
            .batch_execute("SELECT 1")
            .await
            .map_err(|e| OrmError::Connection(e.to_string()))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn into_client(self) -> Client {
        self.client
    }
}

impl Executor for PgExecutor {
    type Rows = PgRows;

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<PgRows> {
        let stream = self
            .client
            .query_raw(sql, params.iter())
            .await
            .map_err(OrmError::from_db_error)?;
        Ok(PgRows::new(stream))
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<ExecResult> {
        let params: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|v| v as &(dyn ToSql + Sync)).collect();
        let rows_affected = self
            .client
            .execute(sql, &params)
            .await
            .map_err(OrmError::from_db_error)?;
        Ok(ExecResult {
            rows_affected,
            last_insert_id: None,
        })
    }
}

/// Rows streamed from a running PostgreSQL query.
#[must_use]
pub struct PgRows {
    stream: Option<Pin<Box<RowStream>>>,
    columns: Option<Arc<[String]>>,
}

impl PgRows {
    fn new(stream: RowStream) -> Self {
        Self {
            stream: Some(Box::pin(stream)),
            columns: None,
        }
    }

    /// Rows affected, known once the stream is exhausted.
    pub fn rows_affected(&self) -> Option<u64> {
        self.stream.as_ref().and_then(|s| s.rows_affected())
    }

    fn columns_of(&mut self, row: &Row) -> Arc<[String]> {
        let columns = self.columns.get_or_insert_with(|| {
            row.columns().iter().map(|c| c.name().to_string()).collect()
        });
        Arc::clone(columns)
    }
}

impl RowSource for PgRows {
    async fn next_row(&mut self) -> OrmResult<Option<RawRow>> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        let next = std::future::poll_fn(|cx| stream.as_mut().poll_next(cx)).await;
        match next {
            Some(Ok(row)) => {
                let columns = self.columns_of(&row);
                let values = decode_row(&row)?;
                Ok(Some(RawRow::new(columns, values)))
            }
            Some(Err(e)) => {
                self.stream = None;
                Err(OrmError::from_db_error(e))
            }
            None => {
                self.stream = None;
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        self.stream = None;
    }
}

fn decode_row(row: &Row) -> OrmResult<Vec<Value>> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            decode_column(row, idx, column.type_())
                .map_err(|e| OrmError::decode(column.name(), e.to_string()))
        })
        .collect()
}

type BoxError = Box<dyn Error + Sync + Send>;

fn decode_column(row: &Row, idx: usize, ty: &Type) -> Result<Value, BoxError> {
    let value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(Value::Bool),
        Type::CHAR => row.try_get::<_, Option<i8>>(idx)?.map(|v| Value::Int(v.into())),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx)?.map(|v| Value::Int(v.into())),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.map(|v| Value::Int(v.into())),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(Value::Int),
        Type::OID => row.try_get::<_, Option<u32>>(idx)?.map(|v| Value::UInt(v.into())),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx)?.map(|v| Value::Float(v.into())),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(Value::Float),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            row.try_get::<_, Option<String>>(idx)?.map(Value::Text)
        }
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map(|d| Value::Temporal(d.and_time(NaiveTime::MIN))),
        Type::TIME => row
            .try_get::<_, Option<NaiveTime>>(idx)?
            .map(|t| Value::Temporal(NaiveDate::default().and_time(t))),
        Type::TIMESTAMP => row.try_get::<_, Option<NaiveDateTime>>(idx)?.map(Value::Temporal),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|dt| Value::Temporal(dt.naive_utc())),
        ref other => return Err(format!("unsupported column type `{other}`").into()),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Text bound to a temporal parameter, tried with every layout.
fn parse_temporal(text: &str) -> Result<NaiveDateTime, BoxError> {
    [TemporalKind::DateTime, TemporalKind::Date, TemporalKind::Time]
        .into_iter()
        .find_map(|kind| kind.parse(text).ok())
        .ok_or_else(|| format!("`{text}` does not match any temporal layout").into())
}

fn temporal_to_sql(dt: NaiveDateTime, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::DATE => dt.date().to_sql_checked(ty, out),
        Type::TIME => dt.time().to_sql_checked(ty, out),
        Type::TIMESTAMPTZ => dt.and_utc().to_sql_checked(ty, out),
        _ => dt.to_sql_checked(ty, out),
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql_checked(ty, out),
            Value::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql_checked(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql_checked(ty, out),
                Type::OID => u32::try_from(*i)?.to_sql_checked(ty, out),
                Type::FLOAT4 => (*i as f32).to_sql_checked(ty, out),
                Type::FLOAT8 => (*i as f64).to_sql_checked(ty, out),
                Type::BOOL => (*i != 0).to_sql_checked(ty, out),
                _ => i.to_sql_checked(ty, out),
            },
            Value::UInt(u) => match *ty {
                Type::INT2 => i16::try_from(*u)?.to_sql_checked(ty, out),
                Type::INT4 => i32::try_from(*u)?.to_sql_checked(ty, out),
                Type::OID => u32::try_from(*u)?.to_sql_checked(ty, out),
                Type::FLOAT4 => (*u as f32).to_sql_checked(ty, out),
                Type::FLOAT8 => (*u as f64).to_sql_checked(ty, out),
                Type::BOOL => (*u != 0).to_sql_checked(ty, out),
                _ => i64::try_from(*u)?.to_sql_checked(ty, out),
            },
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql_checked(ty, out),
                _ => f.to_sql_checked(ty, out),
            },
            Value::Text(s) => match *ty {
                Type::DATE | Type::TIME | Type::TIMESTAMP | Type::TIMESTAMPTZ => {
                    temporal_to_sql(parse_temporal(s)?, ty, out)
                }
                _ => s.as_str().to_sql_checked(ty, out),
            },
            Value::Temporal(dt) => temporal_to_sql(*dt, ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
