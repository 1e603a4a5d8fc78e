//! Three-phase optimistic mutations: snapshot, apply, commit-or-revert.

use super::{CacheEntry, QueryCache, QueryKey};
use crate::error::ApiError;
use async_trait::async_trait;

/// Whole-entry pre-images captured before an optimistic patch.
///
/// Restoring a snapshot puts every captured entry back verbatim - absent
/// entries are removed again - so a failed mutation can never leave a
/// partially-applied patch behind.
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    entries: Vec<(QueryKey, Option<CacheEntry>)>,
}

impl CacheSnapshot {
    pub(crate) fn capture<I>(entries: I) -> CacheSnapshot
    where
        I: IntoIterator<Item = (QueryKey, Option<CacheEntry>)>,
    {
        CacheSnapshot {
            entries: entries.into_iter().collect(),
        }
    }

    pub(crate) fn into_entries(self) -> Vec<(QueryKey, Option<CacheEntry>)> {
        self.entries
    }
}

/// One write operation against the API, with its cache side effects.
///
/// `on_mutate` runs synchronously before the network call: snapshot the
/// entries you will patch, apply the optimistic patch, and return the
/// snapshot as rollback context. `on_success` typically invalidates the
/// affected keys; the default `on_error` restores the snapshot whole.
#[async_trait]
pub trait Mutation: Send + Sync {
    type Vars: Send + Sync;
    type Output: Send;

    async fn execute(&self, vars: &Self::Vars) -> Result<Self::Output, ApiError>;

    fn on_mutate(&self, _cache: &QueryCache, _vars: &Self::Vars) -> Option<CacheSnapshot> {
        None
    }

    fn on_success(&self, _cache: &QueryCache, _output: &Self::Output, _vars: &Self::Vars) {}

    fn on_error(
        &self,
        cache: &QueryCache,
        _error: &ApiError,
        _vars: &Self::Vars,
        context: Option<CacheSnapshot>,
    ) {
        if let Some(snapshot) = context {
            cache.restore(snapshot);
        }
    }
}

impl QueryCache {
    /// Drive `mutation` through the three-phase protocol.
    pub async fn run<M: Mutation>(
        &self,
        mutation: &M,
        vars: M::Vars,
    ) -> Result<M::Output, ApiError> {
        let context = mutation.on_mutate(self, &vars);
        match mutation.execute(&vars).await {
            Ok(output) => {
                mutation.on_success(self, &output, &vars);
                Ok(output)
            }
            Err(error) => {
                tracing::warn!(%error, "mutation failed, rolling back optimistic patch");
                mutation.on_error(self, &error, &vars, context);
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{EntryStatus, FetchOptions};
    use serde_json::Value;
    use std::time::Duration;

    struct BumpFirst {
        fail: bool,
    }

    #[async_trait]
    impl Mutation for BumpFirst {
        type Vars = i64;
        type Output = ();

        async fn execute(&self, _vars: &i64) -> Result<(), ApiError> {
            if self.fail {
                Err(ApiError::Api {
                    status: 500,
                    message: "boom".to_string(),
                    data: None,
                })
            } else {
                Ok(())
            }
        }

        fn on_mutate(&self, cache: &QueryCache, vars: &i64) -> Option<CacheSnapshot> {
            let key = QueryKey::agendas();
            let snapshot = cache.snapshot(std::slice::from_ref(&key));
            cache.modify::<Vec<i64>, _>(&key, |items| {
                if let Some(first) = items.first_mut() {
                    *first = *vars;
                }
            });
            Some(snapshot)
        }

        fn on_success(&self, cache: &QueryCache, _output: &(), _vars: &i64) {
            cache.invalidate(&QueryKey::agendas());
        }
    }

    async fn seeded_cache() -> QueryCache {
        let cache = QueryCache::new();
        let _: Option<Vec<i64>> = cache
            .fetch(
                QueryKey::agendas(),
                FetchOptions::stale(Duration::from_secs(60)),
                || async { Ok(vec![1, 2, 3]) },
            )
            .await
            .unwrap();
        cache
    }

    #[tokio::test]
    async fn success_applies_patch_and_invalidates() {
        let cache = seeded_cache().await;
        cache.run(&BumpFirst { fail: false }, 10).await.unwrap();

        assert_eq!(
            cache.peek::<Vec<i64>>(&QueryKey::agendas()),
            Some(vec![10, 2, 3])
        );
        assert_eq!(
            cache.status(&QueryKey::agendas()),
            Some(EntryStatus::Stale)
        );
    }

    #[tokio::test]
    async fn failure_restores_the_exact_pre_image() {
        let cache = seeded_cache().await;
        let before: Value = cache.peek(&QueryKey::agendas()).unwrap();
        let before_status = cache.status(&QueryKey::agendas());

        let err = cache.run(&BumpFirst { fail: true }, 10).await.unwrap_err();
        assert_eq!(err.status(), Some(500));

        let after: Value = cache.peek(&QueryKey::agendas()).unwrap();
        assert_eq!(before, after);
        assert_eq!(cache.status(&QueryKey::agendas()), before_status);
    }

    #[tokio::test]
    async fn restoring_an_absent_entry_removes_it() {
        let cache = QueryCache::new();
        // nothing cached yet: snapshot captures absence
        let err = cache.run(&BumpFirst { fail: true }, 10).await.unwrap_err();
        assert!(matches!(err, ApiError::Api { .. }));
        assert!(cache.peek::<Value>(&QueryKey::agendas()).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn mutation_without_hooks_leaves_the_cache_alone() {
        struct Plain;

        #[async_trait]
        impl Mutation for Plain {
            type Vars = ();
            type Output = i64;

            async fn execute(&self, _vars: &()) -> Result<i64, ApiError> {
                Ok(5)
            }
        }

        let cache = seeded_cache().await;
        let out = cache.run(&Plain, ()).await.unwrap();
        assert_eq!(out, 5);
        assert_eq!(
            cache.peek::<Vec<i64>>(&QueryKey::agendas()),
            Some(vec![1, 2, 3])
        );
        assert_eq!(
            cache.status(&QueryKey::agendas()),
            Some(EntryStatus::Fresh)
        );
    }
}
