//! # Row Producers
//!
//! The concrete rows the CLI shows in its menus, and the producers that feed
//! them to a menu's update stream.
//!
//! | Row | Identity | Fields |
//! |-----|----------|--------|
//! | [`Choice::Offer`] | `region/model` | model, region, price |
//! | [`Choice::SshKey`] | key name | name, local path or `-` |
//! | [`Choice::Instance`] | instance id | name, model, region, ip, status |
//! | [`Choice::Text`] | the text | the text |
//! | [`Choice::Removed`] | instance id | none (removes the row) |

use crate::cloud::{Instance, InstanceApi, InstanceQuote, KeyCatalog, Status, Title};
use crate::menu::Row;
use anyhow::Result;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Placeholder for a missing value.
const NONE: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Offer {
        title: String,
        model: String,
        region: String,
        price: String,
    },
    SshKey {
        name: String,
        path: Option<String>,
    },
    Instance {
        id: String,
        name: Option<String>,
        model: String,
        region: String,
        ip: Option<String>,
        status: Status,
    },
    Removed(String),
    Text(String),
}

impl Choice {
    pub fn offer(title: &Title, quote: &InstanceQuote) -> Self {
        Choice::Offer {
            title: title.to_string(),
            model: title.model().to_string(),
            region: title.region().to_string(),
            price: quote.price(),
        }
    }

    pub fn instance(instance: &Instance) -> Self {
        Choice::Instance {
            id: instance.id.clone(),
            name: instance.name.clone().filter(|n| !n.is_empty()),
            model: instance.quote.name.clone(),
            region: instance.region.name.to_string(),
            ip: instance.ip.clone().filter(|ip| !ip.is_empty()),
            status: instance.status,
        }
    }
}

impl Row for Choice {
    fn identity(&self) -> &str {
        match self {
            Choice::Offer { title, .. } => title,
            Choice::SshKey { name, .. } => name,
            Choice::Instance { id, .. } => id,
            Choice::Removed(id) => id,
            Choice::Text(text) => text,
        }
    }

    fn fields(&self) -> Option<Vec<String>> {
        let fields = match self {
            Choice::Offer {
                model,
                region,
                price,
                ..
            } => vec![model.clone(), region.clone(), price.clone()],
            Choice::SshKey { name, path } => vec![
                name.clone(),
                path.clone().unwrap_or_else(|| NONE.to_string()),
            ],
            Choice::Instance {
                name,
                model,
                region,
                ip,
                status,
                ..
            } => vec![
                name.clone().unwrap_or_else(|| NONE.to_string()),
                model.clone(),
                region.clone(),
                ip.clone().unwrap_or_else(|| NONE.to_string()),
                status.to_string(),
            ],
            Choice::Removed(_) => return None,
            Choice::Text(text) => vec![text.clone()],
        };
        Some(fields)
    }

    fn is_removed(&self) -> bool {
        matches!(self, Choice::Removed(_))
    }
}

/// One row per offer, in title order.
pub fn offer_rows(offers: &BTreeMap<Title, InstanceQuote>) -> Vec<Choice> {
    offers
        .iter()
        .map(|(title, quote)| Choice::offer(title, quote))
        .collect()
}

/// One row per registered key name, keys present locally first, then by
/// name.
pub fn ssh_key_rows(catalog: &KeyCatalog, local: &HashMap<String, String>) -> Vec<Choice> {
    let mut rows: Vec<(bool, String, Option<String>)> = catalog
        .keys
        .iter()
        .flat_map(|(fingerprint, names)| {
            let path = local.get(fingerprint).cloned();
            names
                .iter()
                .map(move |name| (path.is_none(), name.clone(), path.clone()))
        })
        .collect();
    rows.sort();
    rows.into_iter()
        .map(|(_, name, path)| Choice::SshKey { name, path })
        .collect()
}

/// A closed update stream already holding `rows`.
pub fn feed<R: Send + 'static>(rows: Vec<R>) -> mpsc::Receiver<R> {
    let (tx, rx) = mpsc::channel(rows.len().max(1));
    for row in rows {
        if tx.try_send(row).is_err() {
            break;
        }
    }
    rx
}

/// The offer a menu result names, if it parses as a title with capacity.
pub fn chosen_offer(picked: &str, offers: &BTreeMap<Title, InstanceQuote>) -> Option<Title> {
    let title: Title = picked.parse().ok()?;
    offers.contains_key(&title).then_some(title)
}

/// The instance a menu result names, looked up by id.
pub fn chosen_instance<'a>(picked: &str, instances: &'a [Instance]) -> Option<&'a Instance> {
    instances.iter().find(|i| i.id == picked)
}

/// Publish the instance list every `interval` until cancelled or the menu
/// hangs up.
///
/// Every listed instance is republished each tick; instances that vanished
/// since the previous tick are published as [`Choice::Removed`]. The first
/// failed listing ends polling and is returned; rows already published stay
/// in the menu.
pub async fn poll_instances<A>(
    api: &A,
    tx: &mpsc::Sender<Choice>,
    interval: Duration,
    cancel: &CancellationToken,
) -> Result<()>
where
    A: InstanceApi + ?Sized,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut seen: HashSet<String> = HashSet::new();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            _ = ticker.tick() => {}
        }

        let instances = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            listed = api.instances() => listed?,
        };
        trace!(count = instances.len(), "polled instances");

        let current: HashSet<String> = instances.iter().map(|i| i.id.clone()).collect();
        let gone = seen
            .difference(&current)
            .cloned()
            .map(Choice::Removed);
        let updates: Vec<Choice> = instances.iter().map(Choice::instance).chain(gone).collect();
        seen = current;

        for update in updates {
            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                sent = tx.send(update) => sent,
            };
            if sent.is_err() {
                debug!("instance menu closed");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::types::{InstanceTypeSpecs, RegionDescription};
    use crate::cloud::{LaunchRequest, Region};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn quote(name: &str, cents: u32) -> InstanceQuote {
        InstanceQuote {
            name: name.to_string(),
            description: String::new(),
            gpu_description: String::new(),
            price_cents_per_hour: cents,
            specs: InstanceTypeSpecs::default(),
        }
    }

    fn instance(id: &str, ip: Option<&str>) -> Instance {
        Instance {
            id: id.to_string(),
            name: None,
            ip: ip.map(str::to_string),
            private_ip: None,
            hostname: None,
            status: Status::Active,
            region: RegionDescription {
                name: Region::UsEast1,
                description: String::new(),
            },
            quote: quote("gpu_1x_a10", 75),
            ssh_key_names: Vec::new(),
            file_system_names: Vec::new(),
        }
    }

    /// Answers each listing from a script; an exhausted script fails.
    struct ScriptedApi {
        listings: Mutex<VecDeque<Vec<Instance>>>,
    }

    impl ScriptedApi {
        fn new(listings: Vec<Vec<Instance>>) -> Self {
            Self {
                listings: Mutex::new(listings.into()),
            }
        }
    }

    #[async_trait]
    impl InstanceApi for ScriptedApi {
        async fn instances(&self) -> Result<Vec<Instance>> {
            let next = self.listings.lock().expect("lock").pop_front();
            next.ok_or_else(|| anyhow::anyhow!("listing failed"))
        }

        async fn launch(&self, _request: &LaunchRequest) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn terminate(&self, _ids: &[String]) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_offer_row_fields_and_identity() {
        let title = Title::new(Region::UsWest1, "gpu_8x_h100");
        let row = Choice::offer(&title, &quote("gpu_8x_h100", 2392));
        assert_eq!(row.identity(), "us-west-1/gpu_8x_h100");
        assert_eq!(
            row.fields(),
            Some(vec![
                "gpu_8x_h100".to_string(),
                "us-west-1".to_string(),
                "$23.92/hr".to_string()
            ])
        );
    }

    #[test]
    fn test_instance_row_uses_placeholders() {
        let row = Choice::instance(&instance("i-1", None));
        assert_eq!(row.identity(), "i-1");
        assert_eq!(
            row.fields(),
            Some(vec![
                "-".to_string(),
                "gpu_1x_a10".to_string(),
                "us-east-1".to_string(),
                "-".to_string(),
                "active".to_string()
            ])
        );
    }

    #[test]
    fn test_removed_and_text_rows() {
        let removed = Choice::Removed("i-1".to_string());
        assert_eq!(removed.identity(), "i-1");
        assert_eq!(removed.fields(), None);
        assert!(removed.is_removed());

        let text = Choice::Text("my-box".to_string());
        assert_eq!(text.identity(), "my-box");
        assert_eq!(text.fields(), Some(vec!["my-box".to_string()]));
        assert!(!text.is_removed());
    }

    #[test]
    fn test_offer_rows_follow_title_order() {
        let mut offers = BTreeMap::new();
        offers.insert(Title::new(Region::UsWest1, "b"), quote("b", 100));
        offers.insert(Title::new(Region::AsiaSouth1, "a"), quote("a", 100));
        let ids: Vec<String> = offer_rows(&offers)
            .iter()
            .map(|r| r.identity().to_string())
            .collect();
        assert_eq!(ids, vec!["asia-south-1/a", "us-west-1/b"]);
    }

    #[test]
    fn test_ssh_key_rows_put_local_keys_first() {
        let mut catalog = KeyCatalog::default();
        catalog
            .keys
            .insert("ssh-ed25519 AAA".to_string(), vec!["zeta".to_string()]);
        catalog.keys.insert(
            "ssh-rsa BBB".to_string(),
            vec!["alpha".to_string(), "beta".to_string()],
        );
        let mut local = HashMap::new();
        local.insert("ssh-ed25519 AAA".to_string(), "~/.ssh/id_ed25519.pub".to_string());

        let rows = ssh_key_rows(&catalog, &local);
        let ids: Vec<&str> = rows.iter().map(Row::identity).collect();
        assert_eq!(ids, vec!["zeta", "alpha", "beta"]);
        assert_eq!(
            rows[0].fields(),
            Some(vec!["zeta".to_string(), "~/.ssh/id_ed25519.pub".to_string()])
        );
        assert_eq!(
            rows[1].fields(),
            Some(vec!["alpha".to_string(), "-".to_string()])
        );
    }

    #[test]
    fn test_typed_offer_must_name_an_offer_with_capacity() {
        let mut offers = BTreeMap::new();
        offers.insert(Title::new(Region::UsWest1, "gpu_1x_a10"), quote("gpu_1x_a10", 75));

        assert_eq!(
            chosen_offer("us-west-1/gpu_1x_a10", &offers),
            Some(Title::new(Region::UsWest1, "gpu_1x_a10"))
        );
        assert_eq!(chosen_offer("us-east-1/gpu_1x_a10", &offers), None);
        assert_eq!(chosen_offer("gpu_1x_a10", &offers), None);
        assert_eq!(chosen_offer("", &offers), None);
    }

    #[test]
    fn test_typed_instance_id_must_be_listed() {
        let instances = vec![instance("i-1", None), instance("i-2", Some("203.0.113.7"))];
        assert_eq!(
            chosen_instance("i-2", &instances).map(|i| i.id.as_str()),
            Some("i-2")
        );
        assert!(chosen_instance("my typo", &instances).is_none());
        assert!(chosen_instance("", &instances).is_none());
    }

    #[tokio::test]
    async fn test_feed_delivers_rows_then_closes() {
        let mut rx = feed(vec![Choice::Text("a".to_string()), Choice::Text("b".to_string())]);
        assert_eq!(rx.recv().await, Some(Choice::Text("a".to_string())));
        assert_eq!(rx.recv().await, Some(Choice::Text("b".to_string())));
        assert_eq!(rx.recv().await, None);

        let mut empty = feed(Vec::<Choice>::new());
        assert_eq!(empty.recv().await, None);
    }

    #[tokio::test]
    async fn test_poll_publishes_removals_then_returns_first_error() {
        let api = ScriptedApi::new(vec![
            vec![instance("a", None), instance("b", None)],
            vec![instance("b", Some("203.0.113.7"))],
        ]);
        let (tx, mut rx) = mpsc::channel(16);

        let result = poll_instances(&api, &tx, Duration::from_millis(1), &CancellationToken::new()).await;
        let err = result.err().expect("third listing fails");
        assert!(err.to_string().contains("listing failed"));
        drop(tx);

        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update);
        }
        assert_eq!(updates.len(), 4);
        assert_eq!(updates[0].identity(), "a");
        assert_eq!(updates[1].identity(), "b");
        assert!(matches!(&updates[2], Choice::Instance { id, ip: Some(_), .. } if id == "b"));
        assert_eq!(updates[3], Choice::Removed("a".to_string()));
    }

    #[tokio::test]
    async fn test_poll_stops_when_menu_hangs_up() {
        let api = ScriptedApi::new(vec![vec![instance("a", None)]]);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let result = poll_instances(&api, &tx, Duration::from_millis(1), &CancellationToken::new()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_poll_stops_on_cancel() {
        let api = ScriptedApi::new(Vec::new());
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = poll_instances(&api, &tx, Duration::from_millis(1), &cancel).await;
        assert!(result.is_ok());
    }
}
