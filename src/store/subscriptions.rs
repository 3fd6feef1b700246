//! Root and sub-app subscription lists.
//!
//! Grounded on `events::EventManager`'s global/per-key listener split: a
//! `RwLock<Vec<_>>` per list, callbacks invoked with the list's read lock
//! held (documented: callbacks must not recursively subscribe/unsubscribe to
//! the same list; self-unsubscribe from a different callback is fine).

use crate::commit::Commit;
use crate::config::SettingsSchema;
use crate::error::Result;
use crate::factory::SettingsFactory;
use crate::model::{OverridesSnapshot, SubAppId};
use crate::sync::RwLockExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Opaque handle returned from a subscribe call, used to target a single
/// callback for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionToken(u64);

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

fn next_token() -> SubscriptionToken {
    SubscriptionToken(NEXT_TOKEN.fetch_add(1, Ordering::SeqCst))
}

pub type RootCallback<Schema> = Arc<dyn Fn(Result<Arc<Schema>>) + Send + Sync>;
pub type SubAppsCallback<Schema> = Arc<dyn Fn(Result<HashMap<SubAppId, Arc<Schema>>>) + Send + Sync>;

struct RootSub<Schema> {
    token: SubscriptionToken,
    last_notified: Mutex<Commit>,
    callback: RootCallback<Schema>,
}

struct SubAppsSub<Schema> {
    token: SubscriptionToken,
    sub_app_ids: Vec<u32>,
    last_notified: Mutex<Commit>,
    callback: SubAppsCallback<Schema>,
}

pub struct SubscriptionRegistry<Schema> {
    root: RwLock<Vec<RootSub<Schema>>>,
    sub_apps: RwLock<Vec<SubAppsSub<Schema>>>,
}

impl<Schema: SettingsSchema> SubscriptionRegistry<Schema> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: RwLock::new(Vec::new()),
            sub_apps: RwLock::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn has_subscribers(&self) -> bool {
        !self.root.read().map(|g| g.is_empty()).unwrap_or(true)
            || !self.sub_apps.read().map(|g| g.is_empty()).unwrap_or(true)
    }

    /// Register a root subscription, delivering once synchronously before
    /// returning.
    pub fn subscribe_root(
        &self,
        factory: &SettingsFactory<Schema>,
        snapshot: &OverridesSnapshot,
        callback: RootCallback<Schema>,
    ) -> Result<SubscriptionToken> {
        let token = next_token();
        let result = materialize_root(factory, snapshot);
        callback(result.map(|(v, _)| v));

        self.root.write_recovered()?.push(RootSub {
            token,
            last_notified: Mutex::new(snapshot.commit),
            callback,
        });
        Ok(token)
    }

    /// Register a sub-apps subscription over `sub_app_ids`, delivering once
    /// synchronously before returning.
    pub fn subscribe_sub_apps(
        &self,
        factory: &SettingsFactory<Schema>,
        snapshot: &OverridesSnapshot,
        sub_app_ids: Vec<u32>,
        callback: SubAppsCallback<Schema>,
    ) -> Result<SubscriptionToken> {
        let token = next_token();
        let result = materialize_sub_apps(factory, snapshot, &sub_app_ids);
        callback(result);

        self.sub_apps.write_recovered()?.push(SubAppsSub {
            token,
            sub_app_ids,
            last_notified: Mutex::new(snapshot.commit),
            callback,
        });
        Ok(token)
    }

    /// Remove subscriptions matching `token`, or every subscription when
    /// `token` is `None`. Returns the number removed.
    ///
    /// # Errors
    /// Propagates lock-poison recovery failures.
    pub fn unsubscribe(&self, token: Option<SubscriptionToken>) -> Result<usize> {
        let mut removed = 0;
        {
            let mut root = self.root.write_recovered()?;
            let before = root.len();
            match token {
                Some(t) => root.retain(|s| s.token != t),
                None => root.clear(),
            }
            removed += before - root.len();
        }
        {
            let mut sub_apps = self.sub_apps.write_recovered()?;
            let before = sub_apps.len();
            match token {
                Some(t) => sub_apps.retain(|s| s.token != t),
                None => sub_apps.clear(),
            }
            removed += before - sub_apps.len();
        }
        Ok(removed)
    }

    /// Deliver the current snapshot to every subscription whose
    /// last-notified commit differs from it.
    ///
    /// # Errors
    /// Propagates lock-poison recovery failures.
    pub fn notify_all(&self, factory: &SettingsFactory<Schema>, snapshot: &OverridesSnapshot) -> Result<()> {
        {
            let root = self.root.read_recovered()?;
            for sub in root.iter() {
                let mut last = sub.last_notified.lock().unwrap();
                if *last == snapshot.commit {
                    continue;
                }
                let result = materialize_root(factory, snapshot);
                (sub.callback)(result.map(|(v, _)| v));
                *last = snapshot.commit;
            }
        }
        {
            let sub_apps = self.sub_apps.read_recovered()?;
            for sub in sub_apps.iter() {
                let mut last = sub.last_notified.lock().unwrap();
                if *last == snapshot.commit {
                    continue;
                }
                let result = materialize_sub_apps(factory, snapshot, &sub.sub_app_ids);
                (sub.callback)(result);
                *last = snapshot.commit;
            }
        }
        Ok(())
    }
}

impl<Schema: SettingsSchema> Default for SubscriptionRegistry<Schema> {
    fn default() -> Self {
        Self::new()
    }
}

fn materialize_root<Schema: SettingsSchema>(
    factory: &SettingsFactory<Schema>,
    snapshot: &OverridesSnapshot,
) -> Result<(Arc<Schema>, Vec<crate::error::InvalidOverrideEntry>)> {
    let (settings, errors) = factory.try_get_settings(None, snapshot, None)?;
    Ok((Arc::new(settings), errors))
}

fn materialize_sub_apps<Schema: SettingsSchema>(
    factory: &SettingsFactory<Schema>,
    snapshot: &OverridesSnapshot,
    sub_app_ids: &[u32],
) -> Result<HashMap<SubAppId, Arc<Schema>>> {
    let mut out = HashMap::with_capacity(sub_app_ids.len());
    for id in sub_app_ids {
        let (settings, _) = factory.try_get_settings(Some(*id), snapshot, None)?;
        out.insert(Some(*id), Arc::new(settings));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SettingDef;
    use crate::converters::PrimitiveType;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Schema {
        #[serde(rename = "Rate")]
        rate: i32,
    }

    impl SettingsSchema for Schema {
        fn setting_defs() -> Result<Vec<SettingDef>> {
            Ok(vec![SettingDef::new("Rate", PrimitiveType::I32, 1).build()?])
        }
    }

    #[test]
    fn root_subscription_delivers_once_synchronously() {
        let factory = SettingsFactory::<Schema>::new(0, 0).unwrap();
        factory.register_root_app().unwrap();
        let snapshot = OverridesSnapshot::initial("app");
        let registry = SubscriptionRegistry::<Schema>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        registry
            .subscribe_root(&factory, &snapshot, Arc::new(move |_| {
                calls_clone.fetch_add(1, AtomicOrdering::SeqCst);
            }))
            .unwrap();
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn notify_all_skips_subscriptions_already_at_this_commit() {
        let factory = SettingsFactory::<Schema>::new(0, 0).unwrap();
        factory.register_root_app().unwrap();
        let snapshot = OverridesSnapshot::initial("app");
        let registry = SubscriptionRegistry::<Schema>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        registry
            .subscribe_root(&factory, &snapshot, Arc::new(move |_| {
                calls_clone.fetch_add(1, AtomicOrdering::SeqCst);
            }))
            .unwrap();

        registry.notify_all(&factory, &snapshot).unwrap();
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_with_no_token_removes_everything() {
        let factory = SettingsFactory::<Schema>::new(0, 0).unwrap();
        factory.register_root_app().unwrap();
        let snapshot = OverridesSnapshot::initial("app");
        let registry = SubscriptionRegistry::<Schema>::new();
        registry.subscribe_root(&factory, &snapshot, Arc::new(|_| {})).unwrap();
        registry.subscribe_root(&factory, &snapshot, Arc::new(|_| {})).unwrap();
        assert_eq!(registry.unsubscribe(None).unwrap(), 2);
    }
}
