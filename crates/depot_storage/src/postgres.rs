//! PostgreSQL large-object storage provider.
//!
//! Payloads live as database-native large objects (LOs); metadata lives in a
//! companion table, written in the same transaction as the LO so neither can
//! persist without the other. Large objects are driven through the
//! server-side SQL functions (`lo_creat`, `lo_open`, `loread`, `lowrite`,
//! `lo_close`, `lo_unlink`), which keeps all access inside diesel's query
//! interface and inside an explicit transaction, as the LO API requires.
//!
//! Diesel connections are synchronous, so every operation runs its
//! transaction on a blocking task. Payload chunks cross between the async
//! caller and the blocking transaction through a bounded mpsc channel, one
//! chunk at a time: the payload is never buffered whole.

use crate::{
    ByteStream, Content, DigestTee, FileRecord, OutputMode, PostgresConfig, StorageProvider,
    StoredPayload,
};
use chrono::{DateTime, Utc};
use depot_error::{
    DatabaseError, DatabaseErrorKind, DepotError, DepotResult, StorageError, StorageErrorKind,
};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sql_types::{BigInt, Binary, Integer, Jsonb, Oid, Text, Timestamptz, Uuid as SqlUuid};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

type PgPool = Pool<ConnectionManager<PgConnection>>;
type PgPooled = PooledConnection<ConnectionManager<PgConnection>>;

/// Chunk size for large-object reads, in bytes.
const CHUNK_SIZE: i32 = 64 * 1024;

/// Depth of the channel bridging async chunks and the blocking transaction.
const CHANNEL_DEPTH: usize = 8;

// lo_open flags, from the server's libpq-fs.h.
const INV_WRITE: i32 = 0x0002_0000;
const INV_READ: i32 = 0x0004_0000;

/// PostgreSQL large-object storage backend.
pub struct PostgresProvider {
    pool: PgPool,
    schema: String,
    table: String,
}

#[derive(QueryableByName)]
struct OidRow {
    #[diesel(sql_type = Oid)]
    oid: u32,
}

#[derive(QueryableByName)]
struct FdRow {
    #[diesel(sql_type = Integer)]
    fd: i32,
}

#[derive(QueryableByName)]
struct ChunkRow {
    #[diesel(sql_type = Binary)]
    data: Vec<u8>,
}

#[derive(QueryableByName)]
struct FileRow {
    #[diesel(sql_type = SqlUuid)]
    id: Uuid,
    #[diesel(sql_type = Oid)]
    lo_oid: u32,
    #[diesel(sql_type = Text)]
    filename: String,
    #[diesel(sql_type = Text)]
    content_type: String,
    #[diesel(sql_type = BigInt)]
    size: i64,
    #[diesel(sql_type = Text)]
    content_hash: String,
    #[diesel(sql_type = Jsonb)]
    metadata: serde_json::Value,
    #[diesel(sql_type = Timestamptz)]
    created_at: DateTime<Utc>,
}

impl FileRow {
    fn into_record(self) -> (FileRecord, u32) {
        let oid = self.lo_oid;
        let record = FileRecord {
            id: self.id,
            filename: self.filename,
            content_type: self.content_type,
            size: self.size,
            content_hash: self.content_hash,
            metadata: self
                .metadata
                .as_object()
                .cloned()
                .unwrap_or_default(),
            created_at: self.created_at,
            locator: oid.to_string(),
            storage: "postgres".to_string(),
        };
        (record, oid)
    }
}

impl PostgresProvider {
    /// Create a provider backed by an r2d2 connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection URL is configured, the schema or
    /// table name is not a plain identifier, or the pool cannot be built.
    #[tracing::instrument(skip(config))]
    pub fn new(config: &PostgresConfig) -> DepotResult<Self> {
        let url = config.url()?;
        validate_identifier(&config.schema)?;
        validate_identifier(&config.table)?;

        let manager = ConnectionManager::<PgConnection>::new(url);
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .build(manager)
            .map_err(|e| DatabaseError::new(DatabaseErrorKind::Connection(e.to_string())))?;

        tracing::info!(
            schema = %config.schema,
            table = %config.table,
            max_connections = config.max_connections,
            "Created postgres storage"
        );

        Ok(Self {
            pool,
            schema: config.schema.clone(),
            table: config.table.clone(),
        })
    }

    fn qualified(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    /// Fetch the metadata row for `id` on its own short-lived connection.
    async fn fetch_record(&self, id: Uuid) -> DepotResult<(FileRecord, u32)> {
        let pool = self.pool.clone();
        let table = self.qualified();
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            let row = fetch_row(&mut conn, &table, id)?;
            Ok(row.into_record())
        })
        .await
    }
}

#[async_trait::async_trait]
impl StorageProvider for PostgresProvider {
    fn name(&self) -> &'static str {
        "postgres"
    }

    /// Ensure the metadata table and its creation-time index exist.
    async fn init(&self) -> DepotResult<()> {
        let pool = self.pool.clone();
        let schema = self.schema.clone();
        let table = self.qualified();
        let index = format!("{}_created_at_idx", self.table);
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            if schema != "public" {
                diesel::sql_query(format!("CREATE SCHEMA IF NOT EXISTS {schema}"))
                    .execute(&mut conn)
                    .map_err(DatabaseError::from)?;
            }
            diesel::sql_query(format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id UUID PRIMARY KEY,
                    lo_oid OID NOT NULL,
                    filename TEXT NOT NULL,
                    content_type TEXT NOT NULL,
                    size BIGINT NOT NULL,
                    content_hash TEXT NOT NULL,
                    metadata JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
                )"
            ))
            .execute(&mut conn)
            .map_err(DatabaseError::from)?;
            diesel::sql_query(format!(
                "CREATE INDEX IF NOT EXISTS {index} ON {table} (created_at)"
            ))
            .execute(&mut conn)
            .map_err(DatabaseError::from)?;
            tracing::debug!(table = %table, "Ensured metadata table");
            Ok(())
        })
        .await
    }

    /// Stream the payload into a new large object and insert the metadata row
    /// in the same transaction.
    ///
    /// Any failure (source read, LO write, row insert) rolls the transaction
    /// back, so the LO and the row never persist independently. The pooled
    /// connection returns on drop in every path.
    #[tracing::instrument(skip(self, record, payload), fields(id = %record.id))]
    async fn store(
        &self,
        record: &FileRecord,
        payload: ByteStream,
    ) -> DepotResult<StoredPayload> {
        let (tx, mut rx) = mpsc::channel::<DepotResult<Vec<u8>>>(CHANNEL_DEPTH);

        // Feeder: drains the async payload into the channel. Stops early if
        // the writer gives up (channel closed) or the source errors.
        tokio::spawn(async move {
            use futures::StreamExt;
            let mut payload = payload;
            while let Some(chunk) = payload.next().await {
                let failed = chunk.is_err();
                if tx.send(chunk).await.is_err() || failed {
                    break;
                }
            }
        });

        let pool = self.pool.clone();
        let table = self.qualified();
        let id = record.id;
        let filename = record.filename.clone();
        let content_type = record.content_type.clone();
        let metadata = serde_json::Value::Object(record.metadata.clone());
        let created_at = record.created_at;

        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            conn.transaction::<_, DepotError, _>(|conn| {
                let oid = lo_creat(conn)?;
                let fd = lo_open(conn, oid, INV_WRITE)?;
                let mut tee = DigestTee::new();
                while let Some(chunk) = rx.blocking_recv() {
                    let chunk = chunk?;
                    tee.update(&chunk);
                    lo_write(conn, fd, chunk)?;
                }
                lo_close(conn, fd)?;
                let (size, content_hash) = tee.finalize();

                diesel::sql_query(format!(
                    "INSERT INTO {table} \
                     (id, lo_oid, filename, content_type, size, content_hash, metadata, created_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
                ))
                .bind::<SqlUuid, _>(id)
                .bind::<Oid, _>(oid)
                .bind::<Text, _>(filename)
                .bind::<Text, _>(content_type)
                .bind::<BigInt, _>(size)
                .bind::<Text, _>(content_hash.clone())
                .bind::<Jsonb, _>(metadata)
                .bind::<Timestamptz, _>(created_at)
                .execute(conn)
                .map_err(DatabaseError::from)?;

                tracing::debug!(id = %id, oid, size, "Stored large object");
                Ok(StoredPayload {
                    size,
                    content_hash,
                    locator: oid.to_string(),
                })
            })
        })
        .await
    }

    #[tracing::instrument(skip(self), fields(id = %id, output = %output))]
    async fn get(&self, id: Uuid, output: OutputMode) -> DepotResult<(FileRecord, Content)> {
        if output == OutputMode::Path {
            return Err(StorageError::new(StorageErrorKind::UnsupportedOutputMode(
                output.to_string(),
            ))
            .into());
        }

        // Metadata first, on its own connection, so an unknown id fails
        // before any stream resource is claimed.
        let (record, oid) = self.fetch_record(id).await?;

        let content = match output {
            OutputMode::Buffer => {
                let pool = self.pool.clone();
                let bytes = run_blocking(move || {
                    let mut conn = get_conn(&pool)?;
                    conn.transaction::<_, DepotError, _>(|conn| {
                        let fd = lo_open(conn, oid, INV_READ)?;
                        let mut bytes = Vec::new();
                        loop {
                            let data = lo_read(conn, fd, CHUNK_SIZE)?;
                            if data.is_empty() {
                                break;
                            }
                            bytes.extend_from_slice(&data);
                        }
                        lo_close(conn, fd)?;
                        Ok(bytes)
                    })
                })
                .await?;
                Content::Buffer(bytes)
            }
            OutputMode::Stream => {
                let (tx, rx) = mpsc::channel::<DepotResult<Vec<u8>>>(CHANNEL_DEPTH);
                let pool = self.pool.clone();
                tokio::task::spawn_blocking(move || stream_large_object(pool, oid, tx));
                Content::Stream(Box::pin(ReceiverStream::new(rx)))
            }
            OutputMode::Path => unreachable!("rejected above"),
        };

        tracing::debug!(id = %id, oid, "Retrieved object");
        Ok((record, content))
    }

    /// Unlink the large object and delete the metadata row in one
    /// transaction; a failure in either step rolls back both.
    #[tracing::instrument(skip(self), fields(id = %id))]
    async fn delete(&self, id: Uuid) -> DepotResult<()> {
        let pool = self.pool.clone();
        let table = self.qualified();
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            conn.transaction::<_, DepotError, _>(|conn| {
                let row = fetch_row(conn, &table, id)?;
                lo_unlink(conn, row.lo_oid)?;
                diesel::sql_query(format!("DELETE FROM {table} WHERE id = $1"))
                    .bind::<SqlUuid, _>(id)
                    .execute(conn)
                    .map_err(DatabaseError::from)?;
                tracing::debug!(id = %id, oid = row.lo_oid, "Deleted object");
                Ok(())
            })
        })
        .await
    }
}

/// Read a large object into a bounded channel from a dedicated blocking task.
///
/// The task is the single owner of the connection and the single completion
/// point for the streamed read: it exits exactly once — on full drain, on
/// consumer drop (surfacing as a failed send), or on a read error (forwarded
/// into the stream) — and the transaction ends and the connection returns to
/// the pool exactly then. An abandoned consumer unblocks the task within one
/// chunk send.
fn stream_large_object(pool: PgPool, oid: u32, tx: mpsc::Sender<DepotResult<Vec<u8>>>) {
    let mut conn = match get_conn(&pool) {
        Ok(conn) => conn,
        Err(e) => {
            let _ = tx.blocking_send(Err(e));
            return;
        }
    };

    let outcome = conn.transaction::<_, DepotError, _>(|conn| {
        let fd = lo_open(conn, oid, INV_READ)?;
        loop {
            let data = lo_read(conn, fd, CHUNK_SIZE)?;
            if data.is_empty() {
                break;
            }
            if tx.blocking_send(Ok(data)).is_err() {
                tracing::debug!(oid, "Stream consumer gone, releasing connection");
                break;
            }
        }
        lo_close(conn, fd)?;
        Ok(())
    });

    if let Err(e) = outcome {
        let _ = tx.blocking_send(Err(e));
    }
    tracing::trace!(oid, "Streamed read complete");
}

fn get_conn(pool: &PgPool) -> DepotResult<PgPooled> {
    pool.get()
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Connection(e.to_string())).into())
}

async fn run_blocking<T, F>(f: F) -> DepotResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> DepotResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Query(e.to_string())))?
}

fn fetch_row(conn: &mut PgConnection, table: &str, id: Uuid) -> DepotResult<FileRow> {
    diesel::sql_query(format!(
        "SELECT id, lo_oid, filename, content_type, size, content_hash, metadata, created_at \
         FROM {table} WHERE id = $1"
    ))
    .bind::<SqlUuid, _>(id)
    .get_result(conn)
    .map_err(|e| match e {
        diesel::result::Error::NotFound => {
            StorageError::new(StorageErrorKind::NotFound(id.to_string())).into()
        }
        other => DatabaseError::from(other).into(),
    })
}

/// Schema and table names are interpolated into SQL text; restrict them to
/// plain identifiers.
fn validate_identifier(name: &str) -> DepotResult<()> {
    let valid = !name.is_empty()
        && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(depot_error::ConfigError::new(format!("invalid identifier: {name:?}")).into())
    }
}

fn lo_creat(conn: &mut PgConnection) -> Result<u32, DatabaseError> {
    let row: OidRow = diesel::sql_query("SELECT lo_creat(-1) AS oid")
        .get_result(conn)
        .map_err(DatabaseError::from)?;
    Ok(row.oid)
}

fn lo_open(conn: &mut PgConnection, oid: u32, mode: i32) -> Result<i32, DatabaseError> {
    let row: FdRow = diesel::sql_query("SELECT lo_open($1, $2) AS fd")
        .bind::<Oid, _>(oid)
        .bind::<Integer, _>(mode)
        .get_result(conn)
        .map_err(DatabaseError::from)?;
    Ok(row.fd)
}

fn lo_write(conn: &mut PgConnection, fd: i32, chunk: Vec<u8>) -> Result<(), DatabaseError> {
    diesel::sql_query("SELECT lowrite($1, $2)")
        .bind::<Integer, _>(fd)
        .bind::<Binary, _>(chunk)
        .execute(conn)
        .map_err(DatabaseError::from)?;
    Ok(())
}

fn lo_read(conn: &mut PgConnection, fd: i32, len: i32) -> Result<Vec<u8>, DatabaseError> {
    let row: ChunkRow = diesel::sql_query("SELECT loread($1, $2) AS data")
        .bind::<Integer, _>(fd)
        .bind::<Integer, _>(len)
        .get_result(conn)
        .map_err(DatabaseError::from)?;
    Ok(row.data)
}

fn lo_close(conn: &mut PgConnection, fd: i32) -> Result<(), DatabaseError> {
    diesel::sql_query("SELECT lo_close($1)")
        .bind::<Integer, _>(fd)
        .execute(conn)
        .map_err(DatabaseError::from)?;
    Ok(())
}

fn lo_unlink(conn: &mut PgConnection, oid: u32) -> Result<(), DatabaseError> {
    diesel::sql_query("SELECT lo_unlink($1)")
        .bind::<Oid, _>(oid)
        .execute(conn)
        .map_err(DatabaseError::from)?;
    Ok(())
}
