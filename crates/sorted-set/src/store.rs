//! The node arena: a snapshot of every set node of a campaign, indexed by key.

use std::collections::{BTreeMap, BTreeSet};

use campaign_ledger::{context::CampaignContext, gateway::LedgerGateway};
use campaign_params::{
    protocol::ProtocolParams,
    scripts::{key_from_node_token, ScriptParams},
};
use campaign_primitives::{
    datums::SetNode,
    errors::{CampaignError, CampaignResult},
    hashes::PubKeyHash,
    utxo::Utxo,
    value::{AssetClass, AssetName},
};
use tracing::{debug, warn};

/// A set node together with the output backing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    /// The backing output.
    pub utxo: Utxo,
    /// The decoded node.
    pub node: SetNode,
}

impl NodeRecord {
    /// The node key, `None` for the head.
    pub const fn key(&self) -> Option<&PubKeyHash> {
        self.node.key.as_ref()
    }

    /// Quantity of `asset` locked in the node.
    pub fn amount_of(&self, asset: &AssetClass) -> u64 {
        self.utxo.value().amount_of(asset)
    }

    /// Whether reward processing already rewrote the node to the reduced floor.
    pub fn is_marked(&self, protocol: &ProtocolParams) -> bool {
        self.utxo.value().lovelace() == protocol.reduced_floor()
    }

    /// The membership tokens of `scripts.node_policy` held by the node, decoded to keys.
    fn membership(&self, scripts: &ScriptParams) -> Vec<(Option<Option<PubKeyHash>>, u64)> {
        self.utxo
            .value()
            .assets_of_policy(&scripts.node_policy)
            .into_iter()
            .map(|(name, quantity)| (key_from_node_token(name), quantity))
            .collect()
    }
}

/// Every node of one campaign's sorted set, as seen at fetch time.
///
/// The store is an immutable snapshot. Mutations consume the records they touch and produce new
/// ones on the ledger; a stale snapshot only ever makes the next transaction fail, never
/// corrupts the set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetStore {
    nodes: BTreeMap<Option<PubKeyHash>, NodeRecord>,
    duplicates: Vec<NodeRecord>,
}

impl SetStore {
    /// Loads every node of the campaign from the ledger.
    pub async fn fetch<G>(gateway: &G, ctx: &CampaignContext) -> CampaignResult<Self>
    where
        G: LedgerGateway + ?Sized,
    {
        let utxos = gateway.utxos_at(&ctx.scripts().node_address()).await?;
        let store = Self::from_utxos(utxos, ctx.scripts(), &ctx.campaign_token());
        debug!(nodes = store.len(), head = store.head().is_some(), "fetched set");
        Ok(store)
    }

    /// Builds the arena from raw outputs, keeping those holding a membership token and a node
    /// of `campaign_token`.
    pub fn from_utxos(
        utxos: impl IntoIterator<Item = Utxo>,
        scripts: &ScriptParams,
        campaign_token: &AssetName,
    ) -> Self {
        let mut store = Self::default();
        for utxo in utxos {
            if utxo
                .value()
                .assets_of_policy(&scripts.node_policy)
                .is_empty()
            {
                continue;
            }
            let node = match utxo.output.decode_datum::<SetNode>() {
                Ok(node) => node,
                Err(err) => {
                    warn!(out_ref = %utxo.out_ref, %err, "skipping node with undecodable datum");
                    continue;
                }
            };
            if node.campaign_token != *campaign_token {
                continue;
            }
            store.insert(NodeRecord { utxo, node });
        }
        store
    }

    fn insert(&mut self, record: NodeRecord) {
        let key = record.node.key;
        if self.nodes.contains_key(&key) {
            self.duplicates.push(record);
        } else {
            self.nodes.insert(key, record);
        }
    }

    /// The head sentinel.
    pub fn head(&self) -> Option<&NodeRecord> {
        self.nodes.get(&None)
    }

    /// The node of `key`.
    pub fn get(&self, key: &PubKeyHash) -> Option<&NodeRecord> {
        self.nodes.get(&Some(*key))
    }

    /// Whether `key` has a node.
    pub fn contains(&self, key: &PubKeyHash) -> bool {
        self.get(key).is_some()
    }

    /// Number of participant nodes, the head excluded.
    pub fn len(&self) -> usize {
        self.nodes.len() - usize::from(self.head().is_some())
    }

    /// Whether the set has no participant node.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All records, head first, then in key order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    /// The node `key` would be inserted after.
    pub fn covering(&self, key: &PubKeyHash) -> Option<&NodeRecord> {
        self.nodes.values().find(|r| r.node.covers(key))
    }

    /// The node pointing at `key`.
    pub fn predecessor(&self, key: &PubKeyHash) -> Option<&NodeRecord> {
        self.nodes
            .values()
            .find(|r| r.node.next.as_ref() == Some(key))
    }

    /// Up to `max` consecutive nodes, starting with `first` and following `next` pointers.
    pub fn run_from(&self, first: &PubKeyHash, max: usize) -> CampaignResult<Vec<&NodeRecord>> {
        let mut run = Vec::with_capacity(max);
        let mut cursor = Some(*first);
        while let Some(key) = cursor {
            if run.len() == max {
                break;
            }
            let record = self
                .get(&key)
                .ok_or_else(|| CampaignError::NotFound(format!("node {key}")))?;
            run.push(record);
            cursor = record.node.next;
        }
        Ok(run)
    }

    /// The chain from the head to the tail.
    ///
    /// Fails if there is no head, a `next` pointer dangles or the chain loops.
    pub fn walk(&self) -> CampaignResult<Vec<&NodeRecord>> {
        let head = self
            .head()
            .ok_or_else(|| CampaignError::NotFound("head node".to_string()))?;
        let mut chain = vec![head];
        let mut seen = BTreeSet::new();
        let mut cursor = head.node.next;
        while let Some(key) = cursor {
            if !seen.insert(key) {
                return Err(CampaignError::NotFound(format!("chain loops back to {key}")));
            }
            let record = self.get(&key).ok_or_else(|| {
                CampaignError::NotFound(format!("node {key} is linked but missing"))
            })?;
            chain.push(record);
            cursor = record.node.next;
        }
        Ok(chain)
    }

    /// Checks the set invariants: strictly ascending chain, every node reachable, one record per
    /// key and a membership token agreeing with each key.
    pub fn validate(&self, scripts: &ScriptParams) -> CampaignResult<()> {
        let corrupt = |msg: String| CampaignError::Configuration(format!("corrupt set: {msg}"));

        if let Some(dup) = self.duplicates.first() {
            return Err(corrupt(format!("two nodes for key {:?}", dup.node.key)));
        }
        let chain = self.walk()?;
        for pair in chain.windows(2) {
            if pair[0].node.key >= pair[1].node.key {
                return Err(corrupt(format!(
                    "{:?} is not below {:?}",
                    pair[0].node.key, pair[1].node.key
                )));
            }
        }
        if chain.len() != self.nodes.len() {
            return Err(corrupt(format!(
                "{} of {} nodes unreachable from the head",
                self.nodes.len() - chain.len(),
                self.nodes.len()
            )));
        }
        for record in chain {
            match record.membership(scripts).as_slice() {
                [(Some(key), 1)] if *key == record.node.key => {}
                other => {
                    return Err(corrupt(format!(
                        "node at {} holds membership tokens {other:?}",
                        record.utxo.out_ref
                    )))
                }
            }
        }
        Ok(())
    }
}
