//! Change tracking for a persistence context.
//!
//! SeaORM runs every statement as soon as it is awaited. The tracker sits in
//! front of it and turns repository calls into staged writes, plus snapshots
//! of tracked entities, that are only sent to the database on commit.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityName, EntityTrait, IntoActiveModel, Iterable, ModelTrait, PrimaryKeyToColumn,
    TransactionTrait, Value,
};
use tokio_util::sync::CancellationToken;

use crate::cancel::run_cancellable;
use crate::error::DataResult;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Kind of write a staged change performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Insert => write!(f, "insert"),
            ChangeKind::Update => write!(f, "update"),
            ChangeKind::Delete => write!(f, "delete"),
        }
    }
}

/// A write waiting for the next commit.
#[async_trait]
trait StagedChange: Send + Sync {
    fn kind(&self) -> ChangeKind;

    fn table(&self) -> &str;

    /// Run the write inside the commit transaction, returning affected rows.
    async fn apply(&self, txn: &DatabaseTransaction) -> Result<u64, DbErr>;
}

struct Write<E: EntityTrait> {
    kind: ChangeKind,
    table: String,
    active: E::ActiveModel,
}

impl<E> Write<E>
where
    E: EntityTrait + 'static,
    E::Model: Send + Sync + PartialEq + IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync + 'static,
{
    fn new(kind: ChangeKind, active: E::ActiveModel) -> Self {
        Self {
            kind,
            table: table_name::<E>(),
            active,
        }
    }

    /// Full-row update: every column of the model is written back.
    fn update(model: E::Model) -> Self {
        let mut active = model.into_active_model();
        for column in <E::Column as Iterable>::iter() {
            if let Some(value) = active.get(column).into_value() {
                active.set(column, value);
            }
        }
        Self::new(ChangeKind::Update, active)
    }
}

#[async_trait]
impl<E> StagedChange for Write<E>
where
    E: EntityTrait + 'static,
    E::Model: Send + Sync + PartialEq + IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync + 'static,
{
    fn kind(&self) -> ChangeKind {
        self.kind
    }

    fn table(&self) -> &str {
        &self.table
    }

    async fn apply(&self, txn: &DatabaseTransaction) -> Result<u64, DbErr> {
        match self.kind {
            ChangeKind::Insert => {
                self.active.clone().insert(txn).await?;
                Ok(1)
            }
            ChangeKind::Update => {
                self.active.clone().update(txn).await?;
                Ok(1)
            }
            ChangeKind::Delete => Ok(self.active.clone().delete(txn).await?.rows_affected),
        }
    }
}

pub(crate) fn table_name<E: EntityTrait>() -> String {
    E::default().table_name().to_owned()
}

/// Identity of a tracked row: its entity type plus its primary-key values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryKey {
    entity: TypeId,
    key: String,
}

fn key_of<E: EntityTrait + 'static>(model: &E::Model) -> EntryKey {
    let values: Vec<Value> = <E::PrimaryKey as Iterable>::iter()
        .map(|pk| model.get(pk.into_column()))
        .collect();
    EntryKey {
        entity: TypeId::of::<E>(),
        key: format!("{:?}", values),
    }
}

/// Handle to an entity the context is watching.
///
/// Clones share the same instance. Changes made through [`Tracked::modify`]
/// are picked up by the next `save_changes` without an explicit `update`.
pub struct Tracked<M> {
    inner: Arc<Mutex<M>>,
}

impl<M: Clone> Tracked<M> {
    fn new(model: M) -> Self {
        Self {
            inner: Arc::new(Mutex::new(model)),
        }
    }

    /// Current value of the entity.
    pub fn get(&self) -> M {
        lock(&self.inner).clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&M) -> R) -> R {
        f(&lock(&self.inner))
    }

    /// Mutate the entity in place.
    pub fn modify<R>(&self, f: impl FnOnce(&mut M) -> R) -> R {
        f(&mut lock(&self.inner))
    }

    /// True when both handles point at the same tracked instance.
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<M> Clone for Tracked<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: fmt::Debug> fmt::Debug for Tracked<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tracked").field(&*lock(&self.inner)).finish()
    }
}

trait TrackedEntry: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// An update for the current value, if it drifted from the snapshot.
    fn detect_change(&self) -> Option<Box<dyn StagedChange>>;

    /// Take the current value as the new snapshot.
    fn accept(&self);
}

struct Entry<E: EntityTrait> {
    current: Tracked<E::Model>,
    original: Mutex<E::Model>,
}

impl<E> TrackedEntry for Entry<E>
where
    E: EntityTrait + 'static,
    E::Model: Send + Sync + PartialEq + IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn detect_change(&self) -> Option<Box<dyn StagedChange>> {
        let current = self.current.get();
        if current == *lock(&self.original) {
            return None;
        }
        Some(Box::new(Write::<E>::update(current)))
    }

    fn accept(&self) {
        let current = self.current.get();
        *lock(&self.original) = current;
    }
}

#[derive(Default)]
struct TrackerState {
    staged: Vec<Box<dyn StagedChange>>,
    tracked: HashMap<EntryKey, Box<dyn TrackedEntry>>,
}

/// Staged writes and tracked entities of one persistence context.
#[derive(Default)]
pub struct ChangeTracker {
    state: Mutex<TrackerState>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an insert.
    pub fn stage_insert<E>(&self, active: E::ActiveModel)
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync + PartialEq + IntoActiveModel<E::ActiveModel>,
        E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync + 'static,
    {
        self.stage(Write::<E>::new(ChangeKind::Insert, active));
    }

    /// Stage a full-row update of a detached model.
    pub fn stage_update<E>(&self, model: E::Model)
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync + PartialEq + IntoActiveModel<E::ActiveModel>,
        E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync + 'static,
    {
        self.stage(Write::<E>::update(model));
    }

    /// Stage a delete. The entity stops being tracked.
    pub fn stage_delete<E>(&self, model: E::Model)
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync + PartialEq + IntoActiveModel<E::ActiveModel>,
        E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync + 'static,
    {
        lock(&self.state).tracked.remove(&key_of::<E>(&model));
        self.stage(Write::<E>::new(ChangeKind::Delete, model.into_active_model()));
    }

    fn stage<E>(&self, change: Write<E>)
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync + PartialEq + IntoActiveModel<E::ActiveModel>,
        E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync + 'static,
    {
        tracing::debug!(kind = %change.kind, table = %change.table, "Staged change");
        lock(&self.state).staged.push(Box::new(change));
    }

    /// Start tracking a freshly loaded model.
    ///
    /// If a row with the same key is already tracked, its handle is returned
    /// and the loaded values are discarded.
    pub fn track<E>(&self, model: E::Model) -> Tracked<E::Model>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync + PartialEq + IntoActiveModel<E::ActiveModel>,
        E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync + 'static,
    {
        let key = key_of::<E>(&model);
        let mut state = lock(&self.state);

        if let Some(entry) = state
            .tracked
            .get(&key)
            .and_then(|entry| entry.as_any().downcast_ref::<Entry<E>>())
        {
            return entry.current.clone();
        }

        let handle = Tracked::new(model.clone());
        state.tracked.insert(
            key,
            Box::new(Entry::<E> {
                current: handle.clone(),
                original: Mutex::new(model),
            }),
        );
        handle
    }

    /// Number of writes the next commit would perform.
    pub fn pending_count(&self) -> usize {
        let state = lock(&self.state);
        let modified = state
            .tracked
            .values()
            .filter(|entry| entry.detect_change().is_some())
            .count();
        state.staged.len() + modified
    }

    pub fn has_changes(&self) -> bool {
        self.pending_count() > 0
    }

    pub fn tracked_count(&self) -> usize {
        lock(&self.state).tracked.len()
    }

    /// Drop all staged writes and stop tracking every entity.
    pub fn clear(&self) {
        let mut state = lock(&self.state);
        state.staged.clear();
        state.tracked.clear();
    }

    /// Apply staged writes, then tracked modifications, in one transaction.
    ///
    /// On failure the transaction is rolled back and the staged writes are
    /// kept for another attempt.
    pub async fn commit(
        &self,
        db: &DatabaseConnection,
        cancel: &CancellationToken,
    ) -> DataResult<u64> {
        let staged = std::mem::take(&mut lock(&self.state).staged);
        let detected: Vec<Box<dyn StagedChange>> = lock(&self.state)
            .tracked
            .values()
            .filter_map(|entry| entry.detect_change())
            .collect();

        if staged.is_empty() && detected.is_empty() {
            return Ok(0);
        }

        let outcome = apply_all(db, &staged, &detected, cancel).await;

        match outcome {
            Ok(affected) => {
                for entry in lock(&self.state).tracked.values() {
                    entry.accept();
                }
                tracing::info!(
                    changes = staged.len() + detected.len(),
                    affected,
                    "Changes saved"
                );
                Ok(affected)
            }
            Err(err) => {
                let mut state = lock(&self.state);
                let newer = std::mem::replace(&mut state.staged, staged);
                state.staged.extend(newer);
                Err(err)
            }
        }
    }
}

async fn apply_all(
    db: &DatabaseConnection,
    staged: &[Box<dyn StagedChange>],
    detected: &[Box<dyn StagedChange>],
    cancel: &CancellationToken,
) -> DataResult<u64> {
    let txn = run_cancellable(cancel, db.begin()).await?;
    let mut affected = 0;

    for change in staged.iter().chain(detected.iter()) {
        match run_cancellable(cancel, change.apply(&txn)).await {
            Ok(rows) => {
                tracing::debug!(kind = %change.kind(), table = change.table(), rows, "Applied change");
                affected += rows;
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                return Err(err);
            }
        }
    }

    txn.commit().await?;
    Ok(affected)
}
