//! Lazy query views returned by repositories.
//!
//! Nothing touches the database until one of the terminal methods
//! (`all`, `one`, `count`, `fetch`) is awaited, and every view can be
//! evaluated again.

use std::collections::HashMap;

use sea_orm::sea_query::{Alias, Asterisk, Expr, IntoCondition, SimpleExpr};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, Condition, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QuerySelect, Select,
};
use tokio_util::sync::CancellationToken;

use crate::cancel::run_cancellable;
use crate::context::{DbContext, PersistenceContext};
use crate::error::DataResult;
use crate::tracker::Tracked;

/// Query whose results are detached from the context.
///
/// Mutating the returned models has no effect on the store unless they are
/// handed back through `Repository::update`.
pub struct Query<'c, E: EntityTrait, C = DbContext> {
    ctx: &'c C,
    select: Select<E>,
}

impl<'c, E, C> Query<'c, E, C>
where
    E: EntityTrait + 'static,
    E::Model: Send + Sync + PartialEq + IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync + 'static,
    C: PersistenceContext,
{
    pub(crate) fn new(ctx: &'c C, select: Select<E>) -> Self {
        Self { ctx, select }
    }

    /// Narrow the view with another predicate.
    pub fn filter<F: IntoCondition>(mut self, condition: F) -> Self {
        self.select = self.select.filter(condition);
        self
    }

    /// Switch to a view whose results are tracked by the context.
    pub fn with_tracking(self) -> TrackedQuery<'c, E, C> {
        TrackedQuery::new(self.ctx, self.select)
    }

    /// The underlying SeaORM select, for ordering, paging or joins.
    pub fn into_select(self) -> Select<E> {
        self.select
    }

    pub async fn all(&self) -> DataResult<Vec<E::Model>> {
        self.all_cancellable(&CancellationToken::new()).await
    }

    pub async fn all_cancellable(&self, cancel: &CancellationToken) -> DataResult<Vec<E::Model>> {
        run_cancellable(cancel, self.select.clone().all(self.ctx.connection())).await
    }

    pub async fn one(&self) -> DataResult<Option<E::Model>> {
        self.one_cancellable(&CancellationToken::new()).await
    }

    pub async fn one_cancellable(&self, cancel: &CancellationToken) -> DataResult<Option<E::Model>> {
        run_cancellable(cancel, self.select.clone().one(self.ctx.connection())).await
    }

    pub async fn count(&self) -> DataResult<u64> {
        self.count_cancellable(&CancellationToken::new()).await
    }

    pub async fn count_cancellable(&self, cancel: &CancellationToken) -> DataResult<u64> {
        run_cancellable(cancel, self.select.clone().count(self.ctx.connection())).await
    }
}

/// Query whose results are registered with the context's change tracker.
pub struct TrackedQuery<'c, E: EntityTrait, C = DbContext> {
    ctx: &'c C,
    select: Select<E>,
}

impl<'c, E, C> TrackedQuery<'c, E, C>
where
    E: EntityTrait + 'static,
    E::Model: Send + Sync + PartialEq + IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync + 'static,
    C: PersistenceContext,
{
    pub(crate) fn new(ctx: &'c C, select: Select<E>) -> Self {
        Self { ctx, select }
    }

    pub fn filter<F: IntoCondition>(mut self, condition: F) -> Self {
        self.select = self.select.filter(condition);
        self
    }

    /// Switch to a detached view of the same query.
    pub fn without_tracking(self) -> Query<'c, E, C> {
        Query::new(self.ctx, self.select)
    }

    pub async fn all(&self) -> DataResult<Vec<Tracked<E::Model>>> {
        self.all_cancellable(&CancellationToken::new()).await
    }

    pub async fn all_cancellable(
        &self,
        cancel: &CancellationToken,
    ) -> DataResult<Vec<Tracked<E::Model>>> {
        let models = run_cancellable(cancel, self.select.clone().all(self.ctx.connection())).await?;
        let tracker = self.ctx.tracker();
        Ok(models.into_iter().map(|model| tracker.track::<E>(model)).collect())
    }

    pub async fn one(&self) -> DataResult<Option<Tracked<E::Model>>> {
        self.one_cancellable(&CancellationToken::new()).await
    }

    pub async fn one_cancellable(
        &self,
        cancel: &CancellationToken,
    ) -> DataResult<Option<Tracked<E::Model>>> {
        let model = run_cancellable(cancel, self.select.clone().one(self.ctx.connection())).await?;
        Ok(model.map(|model| self.ctx.tracker().track::<E>(model)))
    }

    pub async fn count(&self) -> DataResult<u64> {
        self.count_cancellable(&CancellationToken::new()).await
    }

    pub async fn count_cancellable(&self, cancel: &CancellationToken) -> DataResult<u64> {
        run_cancellable(cancel, self.select.clone().count(self.ctx.connection())).await
    }
}

/// Lazy partition of an entity set by a predicate.
///
/// [`CountBy::fetch`] maps `true` to the number of matching rows and
/// `false` to the rest, read with a single `GROUP BY` statement. Empty
/// buckets are left out.
pub struct CountBy<'c, E: EntityTrait, C = DbContext> {
    ctx: &'c C,
    condition: Condition,
    select: Select<E>,
}

impl<'c, E, C> CountBy<'c, E, C>
where
    E: EntityTrait + 'static,
    E::Model: Send + Sync + PartialEq + IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + Sync + 'static,
    C: PersistenceContext,
{
    pub(crate) fn new<F: IntoCondition>(ctx: &'c C, condition: F) -> Self {
        Self {
            ctx,
            condition: condition.into_condition(),
            select: E::find(),
        }
    }

    pub async fn fetch(&self) -> DataResult<HashMap<bool, u64>> {
        self.fetch_cancellable(&CancellationToken::new()).await
    }

    pub async fn fetch_cancellable(
        &self,
        cancel: &CancellationToken,
    ) -> DataResult<HashMap<bool, u64>> {
        // One grouped statement, so both buckets come from the same snapshot.
        // Rows where the predicate is NULL land in the `false` bucket.
        let bucket: SimpleExpr = Expr::case(self.condition.clone(), 1).finally(0).into();
        let rows: Vec<(i32, i64)> = run_cancellable(
            cancel,
            self.select
                .clone()
                .select_only()
                .column_as(bucket, "bucket")
                .column_as(Expr::col(Asterisk).count(), "total")
                .group_by(Expr::col(Alias::new("bucket")))
                .into_tuple()
                .all(self.ctx.connection()),
        )
        .await?;

        Ok(rows
            .into_iter()
            .filter(|(_, total)| *total > 0)
            .map(|(bucket, total)| (bucket == 1, total as u64))
            .collect())
    }
}
