//! Append-only tables trimmed to a maximum row count.
//!
//! Build history and preflight runs share this: every insert goes through
//! [`append_capped`], which inserts and evicts the oldest rows of the same
//! scope inside one transaction.

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr,
    EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, TransactionSession,
    TransactionTrait,
};
use tracing::debug;

/// An entity whose rows form a capped log ordered by a timestamp column.
pub trait CappedLog: EntityTrait {
    /// Ordering key; newer rows have greater values.
    fn order_column() -> Self::Column;

    /// Integer primary key, used to break ordering ties and to evict rows.
    fn id_column() -> Self::Column;

    fn id_of(model: &Self::Model) -> i32;
}

/// Insert `record` and trim its scope to at most `max_rows` rows.
///
/// The new row is never evicted. Of the remaining rows in `scope`, only the
/// newest `max_rows - 1` by `(order_column DESC, id DESC)` survive. A
/// `max_rows` of zero behaves like one.
pub async fn append_capped<E, A, C>(
    conn: &C,
    record: A,
    max_rows: u64,
    scope: Condition,
) -> Result<E::Model, DbErr>
where
    E: CappedLog,
    A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
    E::Model: IntoActiveModel<A>,
    C: TransactionTrait,
{
    let keep_others = max_rows.max(1) - 1;

    let txn = conn.begin().await?;

    let inserted = record.insert(&txn).await?;
    let new_id = E::id_of(&inserted);

    let ordered_ids: Vec<i32> = E::find()
        .select_only()
        .column(E::id_column())
        .filter(scope)
        .filter(E::id_column().ne(new_id))
        .order_by_desc(E::order_column())
        .order_by_desc(E::id_column())
        .into_tuple()
        .all(&txn)
        .await?;

    let evicted: Vec<i32> = ordered_ids
        .into_iter()
        .skip(keep_others as usize)
        .collect();

    if !evicted.is_empty() {
        let result = E::delete_many()
            .filter(E::id_column().is_in(evicted.clone()))
            .exec(&txn)
            .await?;
        debug!(
            evicted = result.rows_affected,
            new_id, "Trimmed capped log after insert"
        );
    }

    txn.commit().await?;

    Ok(inserted)
}

/// Read up to `limit` rows of `scope`, newest first.
pub async fn newest<E, C>(conn: &C, scope: Condition, limit: u64) -> Result<Vec<E::Model>, DbErr>
where
    E: CappedLog,
    C: ConnectionTrait,
{
    E::find()
        .filter(scope)
        .order_by_desc(E::order_column())
        .order_by_desc(E::id_column())
        .limit(limit)
        .all(conn)
        .await
}
