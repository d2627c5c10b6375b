use crate::models::schema::SchemaSnapshot;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

struct CachedSchema {
    fetched_at: DateTime<Utc>,
    snapshot: Arc<SchemaSnapshot>,
}

/// 每个数据源一份 schema 快照；快照只读，刷新时整体替换
pub struct SchemaCache {
    entries: DashMap<String, CachedSchema>,
    ttl: Duration,
}

impl SchemaCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// 仅在未过期时返回
    pub fn get(&self, source_id: &str, now: DateTime<Utc>) -> Option<Arc<SchemaSnapshot>> {
        let entry = self.entries.get(source_id)?;
        if now - entry.fetched_at > self.ttl {
            debug!("schema 缓存已过期: id={}", source_id);
            return None;
        }
        Some(entry.snapshot.clone())
    }

    pub fn insert(
        &self,
        source_id: &str,
        snapshot: SchemaSnapshot,
        now: DateTime<Utc>,
    ) -> Arc<SchemaSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.entries.insert(
            source_id.to_string(),
            CachedSchema {
                fetched_at: now,
                snapshot: snapshot.clone(),
            },
        );
        snapshot
    }

    pub fn invalidate(&self, source_id: &str) {
        self.entries.remove(source_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(tables: &[&str]) -> SchemaSnapshot {
        SchemaSnapshot {
            tables: tables.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn fresh_entries_are_returned() {
        let cache = SchemaCache::new(Duration::hours(24));
        let now = Utc::now();
        cache.insert("shop", snapshot(&["Orders"]), now);

        let hit = cache.get("shop", now + Duration::hours(23)).unwrap();
        assert_eq!(hit.tables, vec!["Orders"]);
        assert!(cache.get("other", now).is_none());
    }

    #[test]
    fn stale_entries_are_not_returned() {
        let cache = SchemaCache::new(Duration::hours(1));
        let now = Utc::now();
        cache.insert("shop", snapshot(&["Orders"]), now);

        assert!(cache.get("shop", now + Duration::minutes(61)).is_none());
    }

    #[test]
    fn refresh_replaces_without_touching_handed_out_snapshots() {
        let cache = SchemaCache::new(Duration::hours(1));
        let now = Utc::now();
        let old = cache.insert("shop", snapshot(&["Orders"]), now);
        cache.insert("shop", snapshot(&["Orders", "Customers"]), now);

        assert_eq!(old.tables.len(), 1);
        assert_eq!(cache.get("shop", now).unwrap().tables.len(), 2);

        cache.invalidate("shop");
        assert!(cache.get("shop", now).is_none());
    }
}
