use std::collections::HashMap;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::UserService;
use crate::error::AppError;
use crate::models::{User, UserId};

/// 批量查询中单个ID的结果
#[derive(Debug)]
pub enum BatchOutcome {
    Found(User),
    NotFound,
    Failed(String),
}

impl UserService {
    /// 并发查询每个ID，返回每个ID各自的结果
    ///
    /// 每个ID（包括重复的）启动一个独立任务，复用单条查询的缓存逻辑。
    /// 等待全部任务完成后才返回，结果顺序是完成顺序而不是请求顺序。
    /// 没有设置并发上限时任务数等于ID数。
    pub async fn get_many_detailed(&self, ids: &[UserId]) -> Vec<(UserId, BatchOutcome)> {
        let mut tasks = JoinSet::new();
        for &id in ids {
            let service = self.clone();
            tasks.spawn(async move {
                let _permit = match &service.batch_limit {
                    Some(limit) => match limit.clone().acquire_owned().await {
                        Ok(permit) => Some(permit),
                        Err(e) => return (id, BatchOutcome::Failed(e.to_string())),
                    },
                    None => None,
                };

                let outcome = match service.get(id).await {
                    Ok(user) => BatchOutcome::Found(user),
                    Err(AppError::NotFound(_)) => BatchOutcome::NotFound,
                    Err(e) => BatchOutcome::Failed(e.to_string()),
                };
                (id, outcome)
            });
        }

        // 记录还没有返回结果的ID，任务 panic 时用来找回它对应的ID
        let mut pending: HashMap<UserId, usize> = HashMap::new();
        for &id in ids {
            *pending.entry(id).or_default() += 1;
        }

        let mut outcomes = Vec::with_capacity(ids.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, outcome)) => {
                    if let Some(count) = pending.get_mut(&id) {
                        *count -= 1;
                    }
                    outcomes.push((id, outcome));
                }
                Err(e) => warn!(error = %e, "batch lookup task did not complete"),
            }
        }

        for (id, count) in pending {
            for _ in 0..count {
                outcomes.push((id, BatchOutcome::Failed("lookup task aborted".into())));
            }
        }

        outcomes
    }

    /// 批量查询，全部成功才返回
    ///
    /// 任意一个ID失败（包括不存在）整个请求就失败，并且不说明是哪个ID。
    /// 失败的ID只写日志。
    pub async fn get_many(&self, ids: &[UserId]) -> Result<Vec<User>, AppError> {
        let outcomes = self.get_many_detailed(ids).await;

        let mut users = Vec::with_capacity(outcomes.len());
        let mut missing = Vec::new();
        let mut failed = Vec::new();
        for (id, outcome) in outcomes {
            match outcome {
                BatchOutcome::Found(user) => users.push(user),
                BatchOutcome::NotFound => missing.push(id),
                BatchOutcome::Failed(reason) => failed.push((id, reason)),
            }
        }

        if !missing.is_empty() || !failed.is_empty() {
            warn!(?missing, ?failed, "Error fetching some users");
            return Err(AppError::BatchFailed {
                failed: missing.len() + failed.len(),
            });
        }

        debug!(count = users.len(), "batch fetch complete");
        Ok(users)
    }
}
