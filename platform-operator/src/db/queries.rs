//! The four SQL operations the core issues against the application
//! database (§4.4, §6 "Database schema"). `Processing = 3` is the only
//! `processor_task.status` code the core interprets.

use crate::util::Error;
use sqlx::MySqlPool;
use std::collections::BTreeMap;

const TASK_STATUS_PROCESSING: i32 = 3;

/// `UPDATE job_node SET enabled=0 WHERE node_name LIKE <prefix>%`.
pub async fn disable_all_jobs(pool: &MySqlPool, node_name_prefix: &str) -> Result<u64, Error> {
    let pattern = format!("{node_name_prefix}%");
    let result = sqlx::query("UPDATE job_node SET enabled = 0 WHERE node_name LIKE ?")
        .bind(pattern)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Summary of in-flight tasks per node, restricted to nodes whose name
/// begins with `node_name_prefix` (i.e. belonging to one cluster).
pub async fn count_active_tasks(
    pool: &MySqlPool,
    node_name_prefix: &str,
) -> Result<BTreeMap<String, i64>, Error> {
    let pattern = format!("{node_name_prefix}%");
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT n.name, COUNT(*) \
         FROM processor_task pt \
         INNER JOIN node n ON n.id = pt.fk_processor_node_id \
         WHERE pt.status = ? AND n.name LIKE ? \
         GROUP BY n.name",
    )
    .bind(TASK_STATUS_PROCESSING)
    .bind(pattern)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}

/// Reads `(taskLimit, activeTasks)` for one `(node, job)` pair.
pub async fn read_node_task_state(
    pool: &MySqlPool,
    node_name: &str,
    job_name: &str,
) -> Result<(i32, i64), Error> {
    let row: (i32, i64) = sqlx::query_as(
        "SELECT jn.task_limit, \
            (SELECT COUNT(*) FROM processor_task pt \
             WHERE pt.fk_processor_node_id = n.id AND pt.status = ?) \
         FROM job_node jn \
         LEFT JOIN job j ON jn.job_id = j.id \
         LEFT JOIN node n ON n.name = jn.node_name \
         WHERE n.name = ? AND j.name = ?",
    )
    .bind(TASK_STATUS_PROCESSING)
    .bind(node_name)
    .bind(job_name)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// `UPDATE job_node ⋈ job SET task_limit=? WHERE node_name=? AND job.name=?`.
pub async fn write_node_task_limit(
    pool: &MySqlPool,
    node_name: &str,
    job_name: &str,
    task_limit: i32,
) -> Result<(), Error> {
    sqlx::query(
        "UPDATE job_node jn INNER JOIN job j ON j.id = jn.job_id \
         SET jn.task_limit = ? \
         WHERE jn.node_name = ? AND j.name = ?",
    )
    .bind(task_limit)
    .bind(node_name)
    .bind(job_name)
    .execute(pool)
    .await?;
    Ok(())
}
