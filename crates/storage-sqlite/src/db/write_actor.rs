//! Single-writer actor for SQLite.
//!
//! SQLite allows one writer at a time. Instead of letting pool connections
//! race for the write lock, all mutations go through one background task that
//! owns a dedicated connection and runs each job inside an immediate
//! transaction. That is also what makes the collector's batched upserts
//! atomic: the whole job commits or none of it does.

use std::any::Any;

use diesel::SqliteConnection;
use stockpulse_core::{Error, Result};
use tokio::sync::{mpsc, oneshot};

use super::DbPool;
use crate::errors::StorageError;

// Boxed closure executed on the writer's connection. The return type is
// erased so one channel can carry jobs with different result types.
type Job = Box<dyn FnOnce(&mut SqliteConnection) -> Result<Box<dyn Any + Send + 'static>> + Send + 'static>;
type Reply = oneshot::Sender<Result<Box<dyn Any + Send + 'static>>>;

/// Handle for sending jobs to the writer actor.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<(Job, Reply)>,
}

impl WriteHandle {
    /// Run `job` on the writer's connection, inside a transaction.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static + Any,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send((
                Box::new(move |c| job(c).map(|v| Box::new(v) as Box<dyn Any + Send>)),
                ret_tx,
            ))
            .await
            .map_err(|_| Error::database("writer actor is not running"))?;

        let boxed = ret_rx
            .await
            .map_err(|_| Error::database("writer actor dropped the reply channel"))??;

        boxed
            .downcast::<T>()
            .map(|v| *v)
            .map_err(|_| Error::database("writer actor returned an unexpected type"))
    }
}

/// Spawn the writer actor. It holds one connection from `pool` for its whole
/// lifetime and processes jobs serially until every `WriteHandle` is dropped.
pub fn spawn_writer(pool: std::sync::Arc<DbPool>) -> WriteHandle {
    let (tx, mut rx) = mpsc::channel::<(Job, Reply)>(1024);

    tokio::spawn(async move {
        let mut conn = match pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("writer actor could not acquire a connection: {}", e);
                while let Some((_, reply_tx)) = rx.recv().await {
                    let _ = reply_tx.send(Err(Error::database(format!(
                        "writer connection unavailable: {}",
                        e
                    ))));
                }
                return;
            }
        };

        while let Some((job, reply_tx)) = rx.recv().await {
            let result = conn
                .immediate_transaction::<_, StorageError, _>(|c| job(c).map_err(StorageError::from))
                .map_err(Error::from);

            // The requester may have given up; a closed reply channel is fine.
            let _ = reply_tx.send(result);
        }
    });

    WriteHandle { tx }
}
