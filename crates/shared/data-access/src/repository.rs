//! Generic repository over a SeaORM entity.
//!
//! Every operation forwards to the entity's SeaORM query API. Writes are only
//! staged on the bound context; nothing reaches the database before
//! [`UnitOfWork::save_changes`](crate::UnitOfWork::save_changes).
//!
//! Operations that talk to the database come in pairs: `name` and
//! `name_cancellable`, the latter taking a [`CancellationToken`].

use std::marker::PhantomData;

use sea_orm::sea_query::IntoCondition;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, EntityTrait, IntoActiveModel, PrimaryKeyTrait,
    QueryFilter,
};
use tokio_util::sync::CancellationToken;

use crate::cancel::{ensure_active, run_cancellable};
use crate::context::{DbContext, PersistenceContext};
use crate::error::{DataError, DataResult};
use crate::query::{CountBy, Query, TrackedQuery};
use crate::tracker::{table_name, Tracked};

/// Primary key value type of an entity.
pub type KeyOf<E> = <<E as EntityTrait>::PrimaryKey as PrimaryKeyTrait>::ValueType;

/// Repository bound to one entity type and one persistence context.
///
/// Holds nothing but the borrowed context, so it is cheap to create per
/// unit of work.
pub struct Repository<'c, E, C = DbContext> {
    ctx: &'c C,
    entity: PhantomData<fn() -> E>,
}

impl<E, C> Clone for Repository<'_, E, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, C> Copy for Repository<'_, E, C> {}

impl<'c, E, C> Repository<'c, E, C>
where
    E: EntityTrait + 'static,
    E::Model: Send + Sync + PartialEq + IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync + 'static,
    C: PersistenceContext,
{
    pub fn new(ctx: &'c C) -> Self {
        Self {
            ctx,
            entity: PhantomData,
        }
    }

    /// Context this repository stages changes on.
    pub fn context(&self) -> &'c C {
        self.ctx
    }

    // =========================================================================
    // Staging
    // =========================================================================

    /// Stage an entity for insertion.
    ///
    /// Accepts a model or an active model, so generated columns can be left
    /// `NotSet`. Constraint violations surface at commit time.
    pub fn add<A>(&self, entity: A)
    where
        A: IntoActiveModel<E::ActiveModel>,
    {
        self.ctx.tracker().stage_insert::<E>(entity.into_active_model());
    }

    pub fn add_cancellable<A>(&self, entity: A, cancel: &CancellationToken) -> DataResult<()>
    where
        A: IntoActiveModel<E::ActiveModel>,
    {
        ensure_active(cancel)?;
        self.add(entity);
        Ok(())
    }

    pub fn add_range<I, A>(&self, entities: I)
    where
        I: IntoIterator<Item = A>,
        A: IntoActiveModel<E::ActiveModel>,
    {
        for entity in entities {
            self.add(entity);
        }
    }

    /// Stage a batch for insertion; nothing is staged if `cancel` already fired.
    pub fn add_range_cancellable<I, A>(&self, entities: I, cancel: &CancellationToken) -> DataResult<()>
    where
        I: IntoIterator<Item = A>,
        A: IntoActiveModel<E::ActiveModel>,
    {
        ensure_active(cancel)?;
        self.add_range(entities);
        Ok(())
    }

    /// Stage a full-row update of a detached model.
    pub fn update(&self, model: E::Model) {
        self.ctx.tracker().stage_update::<E>(model);
    }

    pub fn update_range<I>(&self, models: I)
    where
        I: IntoIterator<Item = E::Model>,
    {
        for model in models {
            self.update(model);
        }
    }

    /// Stage an entity for removal.
    pub fn delete(&self, model: E::Model) {
        self.ctx.tracker().stage_delete::<E>(model);
    }

    pub fn delete_range<I>(&self, models: I)
    where
        I: IntoIterator<Item = E::Model>,
    {
        for model in models {
            self.delete(model);
        }
    }

    /// Stage the first entity matching `condition` for removal.
    pub async fn delete_by_expression<F>(&self, condition: F) -> DataResult<()>
    where
        F: IntoCondition + Send,
    {
        self.delete_by_expression_cancellable(condition, &CancellationToken::new())
            .await
    }

    /// Fails with [`DataError::NotFound`] when nothing matches.
    pub async fn delete_by_expression_cancellable<F>(
        &self,
        condition: F,
        cancel: &CancellationToken,
    ) -> DataResult<()>
    where
        F: IntoCondition + Send,
    {
        let model = self
            .first_or_default_cancellable(condition, cancel)
            .await?
            .ok_or_else(|| DataError::not_found(table_name::<E>()))?;
        self.delete(model);
        Ok(())
    }

    /// Stage the entity with primary key `id` for removal.
    pub async fn delete_by_id<K>(&self, id: K) -> DataResult<()>
    where
        K: Into<KeyOf<E>> + Send,
    {
        self.delete_by_id_cancellable(id, &CancellationToken::new())
            .await
    }

    /// Fails with [`DataError::NotFound`] when no row has that key.
    pub async fn delete_by_id_cancellable<K>(&self, id: K, cancel: &CancellationToken) -> DataResult<()>
    where
        K: Into<KeyOf<E>> + Send,
    {
        let model = self
            .get_by_id_cancellable(id, cancel)
            .await?
            .ok_or_else(|| DataError::not_found(table_name::<E>()))?;
        self.delete(model);
        Ok(())
    }

    // =========================================================================
    // Single-entity reads
    // =========================================================================

    /// Whether at least one persisted entity matches `condition`.
    pub async fn any<F>(&self, condition: F) -> DataResult<bool>
    where
        F: IntoCondition + Send,
    {
        self.any_cancellable(condition, &CancellationToken::new())
            .await
    }

    pub async fn any_cancellable<F>(&self, condition: F, cancel: &CancellationToken) -> DataResult<bool>
    where
        F: IntoCondition + Send,
    {
        let matching = self.filter(condition).count_cancellable(cancel).await?;
        Ok(matching > 0)
    }

    /// First match, detached. Fails with [`DataError::EmptySequence`] when
    /// nothing matches.
    pub async fn first<F>(&self, condition: F) -> DataResult<E::Model>
    where
        F: IntoCondition + Send,
    {
        self.first_cancellable(condition, &CancellationToken::new())
            .await
    }

    pub async fn first_cancellable<F>(
        &self,
        condition: F,
        cancel: &CancellationToken,
    ) -> DataResult<E::Model>
    where
        F: IntoCondition + Send,
    {
        self.first_or_default_cancellable(condition, cancel)
            .await?
            .ok_or(DataError::EmptySequence)
    }

    /// First match, tracked by the context.
    pub async fn first_tracked<F>(&self, condition: F) -> DataResult<Tracked<E::Model>>
    where
        F: IntoCondition + Send,
    {
        self.first_tracked_cancellable(condition, &CancellationToken::new())
            .await
    }

    pub async fn first_tracked_cancellable<F>(
        &self,
        condition: F,
        cancel: &CancellationToken,
    ) -> DataResult<Tracked<E::Model>>
    where
        F: IntoCondition + Send,
    {
        self.first_or_default_tracked_cancellable(condition, cancel)
            .await?
            .ok_or(DataError::EmptySequence)
    }

    /// First match, detached, or `None`.
    pub async fn first_or_default<F>(&self, condition: F) -> DataResult<Option<E::Model>>
    where
        F: IntoCondition + Send,
    {
        self.first_or_default_cancellable(condition, &CancellationToken::new())
            .await
    }

    pub async fn first_or_default_cancellable<F>(
        &self,
        condition: F,
        cancel: &CancellationToken,
    ) -> DataResult<Option<E::Model>>
    where
        F: IntoCondition + Send,
    {
        let select = E::find().filter(condition);
        run_cancellable(cancel, select.one(self.ctx.connection())).await
    }

    pub async fn first_or_default_tracked<F>(
        &self,
        condition: F,
    ) -> DataResult<Option<Tracked<E::Model>>>
    where
        F: IntoCondition + Send,
    {
        self.first_or_default_tracked_cancellable(condition, &CancellationToken::new())
            .await
    }

    pub async fn first_or_default_tracked_cancellable<F>(
        &self,
        condition: F,
        cancel: &CancellationToken,
    ) -> DataResult<Option<Tracked<E::Model>>>
    where
        F: IntoCondition + Send,
    {
        self.filter_with_tracking(condition)
            .one_cancellable(cancel)
            .await
    }

    /// Entity matching `condition`, detached, or `None`.
    pub async fn get_by_expression<F>(&self, condition: F) -> DataResult<Option<E::Model>>
    where
        F: IntoCondition + Send,
    {
        self.first_or_default(condition).await
    }

    pub async fn get_by_expression_cancellable<F>(
        &self,
        condition: F,
        cancel: &CancellationToken,
    ) -> DataResult<Option<E::Model>>
    where
        F: IntoCondition + Send,
    {
        self.first_or_default_cancellable(condition, cancel).await
    }

    /// Entity matching `condition`, tracked, or `None`.
    pub async fn get_by_expression_with_tracking<F>(
        &self,
        condition: F,
    ) -> DataResult<Option<Tracked<E::Model>>>
    where
        F: IntoCondition + Send,
    {
        self.first_or_default_tracked(condition).await
    }

    pub async fn get_by_expression_with_tracking_cancellable<F>(
        &self,
        condition: F,
        cancel: &CancellationToken,
    ) -> DataResult<Option<Tracked<E::Model>>>
    where
        F: IntoCondition + Send,
    {
        self.first_or_default_tracked_cancellable(condition, cancel)
            .await
    }

    /// Some entity of the collection, in no particular order, or `None`.
    pub async fn get_first(&self) -> DataResult<Option<E::Model>> {
        self.get_first_cancellable(&CancellationToken::new()).await
    }

    pub async fn get_first_cancellable(
        &self,
        cancel: &CancellationToken,
    ) -> DataResult<Option<E::Model>> {
        self.get_all().one_cancellable(cancel).await
    }

    /// Entity with primary key `id`, detached, or `None`.
    pub async fn get_by_id<K>(&self, id: K) -> DataResult<Option<E::Model>>
    where
        K: Into<KeyOf<E>> + Send,
    {
        self.get_by_id_cancellable(id, &CancellationToken::new())
            .await
    }

    pub async fn get_by_id_cancellable<K>(
        &self,
        id: K,
        cancel: &CancellationToken,
    ) -> DataResult<Option<E::Model>>
    where
        K: Into<KeyOf<E>> + Send,
    {
        let select = E::find_by_id(id);
        run_cancellable(cancel, select.one(self.ctx.connection())).await
    }

    // =========================================================================
    // Query views
    // =========================================================================

    /// Detached view of the whole collection.
    pub fn get_all(&self) -> Query<'c, E, C> {
        Query::new(self.ctx, E::find())
    }

    /// Tracked view of the whole collection.
    pub fn get_all_with_tracking(&self) -> TrackedQuery<'c, E, C> {
        TrackedQuery::new(self.ctx, E::find())
    }

    /// Detached view of the entities matching `condition`.
    pub fn filter<F: IntoCondition>(&self, condition: F) -> Query<'c, E, C> {
        self.get_all().filter(condition)
    }

    /// Tracked view of the entities matching `condition`.
    pub fn filter_with_tracking<F: IntoCondition>(&self, condition: F) -> TrackedQuery<'c, E, C> {
        self.get_all_with_tracking().filter(condition)
    }

    /// Lazy `{true: matching, false: rest}` partition of the collection.
    pub fn count_by<F: IntoCondition>(&self, condition: F) -> CountBy<'c, E, C> {
        CountBy::new(self.ctx, condition)
    }
}
