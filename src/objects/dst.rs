//! Deterministic Simulation Testing for the object layer
//!
//! Drives random sequences of handle and key operations through a `Client`
//! whose channel injects seeded transport faults, and checks every outcome
//! against a shadow model of the keyspace.
//!
//! ## Design
//!
//! Two clients share one in-process store: a *faulty* client that issues the
//! operations under test, and a *clean* client the harness uses to observe the
//! store directly. For every operation the harness computes the expected reply
//! and post-state from the shadow model, then:
//!
//! - **Reply received**: the reply must match the model, and the model advances.
//! - **Request not sent**: the touched keys must be exactly as before.
//! - **Reply lost**: the touched keys must be either exactly as before or
//!   exactly as the model predicts afterwards. Anything in between is a torn
//!   (non-atomic) operation.
//!
//! At the end of a run the full keyspace is scanned and compared with the model.
//!
//! ## Usage
//!
//! ```rust,ignore
//! for seed in 0..50 {
//!     let mut harness = ObjectsDSTHarness::with_seed(seed);
//!     harness.run(300).await;
//!     assert!(harness.result().is_success(), "Seed {} failed", seed);
//! }
//! ```

use super::{Bucket, Client, ClientConfig, Error, Map, ObjectKind};
use crate::channel::{ChannelError, FaultConfig, FaultStats, FaultyChannel, LocalChannel};
use futures::TryStreamExt;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const KEY_PREFIX: &str = "obj:";

/// Configuration for object-layer DST
#[derive(Debug, Clone)]
pub struct ObjectsDSTConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Number of distinct key names
    pub num_keys: usize,
    /// Number of distinct payload values
    pub num_values: u64,
    /// Number of distinct map fields
    pub num_fields: u64,
    /// COUNT hint used by the clients' scans
    pub scan_count: usize,
    /// Transport faults injected on the client under test
    pub faults: FaultConfig,

    // Operation category weights
    pub weight_bucket: u64,
    pub weight_map: u64,
    pub weight_key: u64,
    pub weight_rename: u64,
    pub weight_scan: u64,
}

impl Default for ObjectsDSTConfig {
    fn default() -> Self {
        ObjectsDSTConfig {
            seed: 0,
            num_keys: 12,
            num_values: 20,
            num_fields: 6,
            scan_count: 4,
            faults: FaultConfig::none(),
            weight_bucket: 35,
            weight_map: 25,
            weight_key: 15,
            weight_rename: 15,
            weight_scan: 10,
        }
    }
}

impl ObjectsDSTConfig {
    pub fn new(seed: u64) -> Self {
        ObjectsDSTConfig {
            seed,
            ..Default::default()
        }
    }

    /// Few keys, no faults
    pub fn calm(seed: u64) -> Self {
        ObjectsDSTConfig {
            seed,
            num_keys: 5,
            num_values: 5,
            ..Default::default()
        }
    }

    /// Occasional faults, rename-heavy
    pub fn faulty(seed: u64) -> Self {
        ObjectsDSTConfig {
            seed,
            faults: FaultConfig::lossy(),
            weight_rename: 30,
            ..Default::default()
        }
    }

    /// Frequent faults, more keys, tiny scan batches
    pub fn chaos(seed: u64) -> Self {
        ObjectsDSTConfig {
            seed,
            num_keys: 30,
            scan_count: 2,
            faults: FaultConfig::chaos(),
            ..Default::default()
        }
    }

    fn total_weight(&self) -> u64 {
        self.weight_bucket + self.weight_map + self.weight_key + self.weight_rename + self.weight_scan
    }
}

/// Result of an object-layer DST run
#[derive(Debug, Clone)]
pub struct ObjectsDSTResult {
    pub seed: u64,
    pub total_operations: u64,
    pub bucket_ops: u64,
    pub map_ops: u64,
    pub key_ops: u64,
    pub rename_ops: u64,
    pub scan_ops: u64,
    pub transport_failures: u64,
    pub fault_stats: FaultStats,
    pub invariant_violations: Vec<String>,
    pub last_op: Option<String>,
}

impl ObjectsDSTResult {
    pub fn new(seed: u64) -> Self {
        ObjectsDSTResult {
            seed,
            total_operations: 0,
            bucket_ops: 0,
            map_ops: 0,
            key_ops: 0,
            rename_ops: 0,
            scan_ops: 0,
            transport_failures: 0,
            fault_stats: FaultStats::default(),
            invariant_violations: Vec::new(),
            last_op: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.invariant_violations.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Seed {}: {} ops (bucket:{}, map:{}, key:{}, rename:{}, scan:{}), {} transport failures, {} violations",
            self.seed,
            self.total_operations,
            self.bucket_ops,
            self.map_ops,
            self.key_ops,
            self.rename_ops,
            self.scan_ops,
            self.transport_failures,
            self.invariant_violations.len()
        )
    }
}

// =============================================================================
// Shadow Model
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum ShadowValue {
    Bucket(u64),
    Map(BTreeMap<u64, u64>),
}

type Shadow = BTreeMap<String, ShadowValue>;

#[derive(Debug, Clone)]
enum Op {
    Set { key: String, value: u64 },
    TrySet { key: String, value: u64 },
    GetAndSet { key: String, value: u64 },
    Get { key: String },
    MapPut { key: String, field: u64, value: u64 },
    MapGet { key: String, field: u64 },
    MapRemove { key: String, fields: Vec<u64> },
    Delete { keys: Vec<String> },
    Exists { key: String },
    KeyType { key: String },
    Rename { src: String, dst: String },
    RenameNx { src: String, dst: String },
    Scan { pattern: String },
}

impl Op {
    /// Keys whose state the operation may change.
    fn touched_keys(&self) -> Vec<String> {
        match self {
            Op::Set { key, .. }
            | Op::TrySet { key, .. }
            | Op::GetAndSet { key, .. }
            | Op::MapPut { key, .. }
            | Op::MapRemove { key, .. } => vec![key.clone()],
            Op::Delete { keys } => keys.clone(),
            Op::Rename { src, dst } | Op::RenameNx { src, dst } => vec![src.clone(), dst.clone()],
            Op::Get { .. }
            | Op::MapGet { .. }
            | Op::Exists { .. }
            | Op::KeyType { .. }
            | Op::Scan { .. } => Vec::new(),
        }
    }
}

/// Observable outcome of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Unit,
    Bool(bool),
    Count(u64),
    Value(Option<u64>),
    Kind(Option<ObjectKind>),
    Keys(Vec<String>),
    NotFound,
    WrongType,
}

/// Apply `op` to the model, returning the outcome the store should report.
fn apply(op: &Op, model: &mut Shadow) -> Outcome {
    match op {
        Op::Set { key, value } => {
            model.insert(key.clone(), ShadowValue::Bucket(*value));
            Outcome::Unit
        }
        Op::TrySet { key, value } => {
            if model.contains_key(key) {
                Outcome::Bool(false)
            } else {
                model.insert(key.clone(), ShadowValue::Bucket(*value));
                Outcome::Bool(true)
            }
        }
        Op::GetAndSet { key, value } => match model.get(key) {
            Some(ShadowValue::Map(_)) => Outcome::WrongType,
            Some(ShadowValue::Bucket(old)) => {
                let old = *old;
                model.insert(key.clone(), ShadowValue::Bucket(*value));
                Outcome::Value(Some(old))
            }
            None => {
                model.insert(key.clone(), ShadowValue::Bucket(*value));
                Outcome::Value(None)
            }
        },
        Op::Get { key } => match model.get(key) {
            Some(ShadowValue::Bucket(v)) => Outcome::Value(Some(*v)),
            Some(ShadowValue::Map(_)) => Outcome::WrongType,
            None => Outcome::Value(None),
        },
        Op::MapPut { key, field, value } => match model.get_mut(key) {
            Some(ShadowValue::Bucket(_)) => Outcome::WrongType,
            Some(ShadowValue::Map(m)) => Outcome::Bool(m.insert(*field, *value).is_none()),
            None => {
                let mut m = BTreeMap::new();
                m.insert(*field, *value);
                model.insert(key.clone(), ShadowValue::Map(m));
                Outcome::Bool(true)
            }
        },
        Op::MapGet { key, field } => match model.get(key) {
            Some(ShadowValue::Bucket(_)) => Outcome::WrongType,
            Some(ShadowValue::Map(m)) => Outcome::Value(m.get(field).copied()),
            None => Outcome::Value(None),
        },
        Op::MapRemove { key, fields } => {
            let (removed, now_empty) = match model.get_mut(key) {
                Some(ShadowValue::Bucket(_)) => return Outcome::WrongType,
                Some(ShadowValue::Map(m)) => {
                    let removed = fields.iter().filter(|f| m.remove(f).is_some()).count();
                    (removed as u64, m.is_empty())
                }
                None => return Outcome::Count(0),
            };
            if now_empty {
                model.remove(key);
            }
            Outcome::Count(removed)
        }
        Op::Delete { keys } => {
            let mut removed = 0;
            for key in keys {
                if model.remove(key).is_some() {
                    removed += 1;
                }
            }
            Outcome::Count(removed)
        }
        Op::Exists { key } => Outcome::Bool(model.contains_key(key)),
        Op::KeyType { key } => Outcome::Kind(model.get(key).map(|v| match v {
            ShadowValue::Bucket(_) => ObjectKind::Bucket,
            ShadowValue::Map(_) => ObjectKind::Map,
        })),
        Op::Rename { src, dst } => match model.remove(src) {
            Some(value) => {
                model.insert(dst.clone(), value);
                Outcome::Unit
            }
            None => Outcome::NotFound,
        },
        Op::RenameNx { src, dst } => {
            if !model.contains_key(src) {
                Outcome::NotFound
            } else if model.contains_key(dst) {
                Outcome::Bool(false)
            } else {
                if let Some(value) = model.remove(src) {
                    model.insert(dst.clone(), value);
                }
                Outcome::Bool(true)
            }
        }
        Op::Scan { pattern } => {
            // Test patterns only use a trailing '*' or exact names
            let keys = model
                .keys()
                .filter(|k| match pattern.strip_suffix('*') {
                    Some(prefix) => k.starts_with(prefix),
                    None => *k == pattern,
                })
                .cloned()
                .collect();
            Outcome::Keys(keys)
        }
    }
}

fn restrict(model: &Shadow, keys: &[String]) -> Shadow {
    keys.iter()
        .filter_map(|k| model.get(k).map(|v| (k.clone(), v.clone())))
        .collect()
}

// =============================================================================
// DST Harness
// =============================================================================

pub struct ObjectsDSTHarness {
    config: ObjectsDSTConfig,
    rng: ChaCha8Rng,
    /// Client under test, behind the fault injector
    faulty: Client,
    /// Observer client, talks to the store directly
    clean: Client,
    faults: Arc<FaultyChannel<Arc<LocalChannel>>>,
    shadow: Shadow,
    result: ObjectsDSTResult,
}

impl ObjectsDSTHarness {
    /// Spawns the store, so it must be called inside a tokio runtime.
    pub fn new(config: ObjectsDSTConfig) -> Self {
        let store = Arc::new(LocalChannel::spawn(Duration::from_secs(5)));
        // Fault stream is seeded independently of the operation stream
        let faults = Arc::new(FaultyChannel::new(
            store.clone(),
            config.faults,
            config.seed.wrapping_mul(0x9E37_79B9_7F4A_7C15),
        ));
        let client_config = ClientConfig {
            scan_count: config.scan_count.max(1),
            ..ClientConfig::default()
        };
        ObjectsDSTHarness {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            faulty: Client::with_channel(faults.clone(), client_config.clone()),
            clean: Client::with_channel(store, client_config),
            faults,
            shadow: Shadow::new(),
            result: ObjectsDSTResult::new(config.seed),
            config,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(ObjectsDSTConfig::new(seed))
    }

    // =========================================================================
    // Operation generation
    // =========================================================================

    /// Skewed toward low indices so a few keys stay hot.
    fn random_key(&mut self) -> String {
        let r: f64 = self.rng.gen();
        let idx = ((r * r) * self.config.num_keys as f64) as usize;
        format!("{}{}", KEY_PREFIX, idx.min(self.config.num_keys.saturating_sub(1)))
    }

    fn random_value(&mut self) -> u64 {
        self.rng.gen_range(0..self.config.num_values.max(1))
    }

    fn random_field(&mut self) -> u64 {
        self.rng.gen_range(0..self.config.num_fields.max(1))
    }

    fn random_op(&mut self) -> Op {
        let total = self.config.total_weight().max(1);
        let mut roll = self.rng.gen_range(0..total);
        let sub = self.rng.gen_range(0..100u32);

        if roll < self.config.weight_bucket {
            self.result.bucket_ops += 1;
            let key = self.random_key();
            let value = self.random_value();
            return match sub {
                0..=39 => Op::Set { key, value },
                40..=54 => Op::TrySet { key, value },
                55..=69 => Op::GetAndSet { key, value },
                _ => Op::Get { key },
            };
        }
        roll -= self.config.weight_bucket;

        if roll < self.config.weight_map {
            self.result.map_ops += 1;
            let key = self.random_key();
            let field = self.random_field();
            return match sub {
                0..=49 => Op::MapPut {
                    key,
                    field,
                    value: self.random_value(),
                },
                50..=74 => Op::MapGet { key, field },
                _ => {
                    let mut fields = vec![field];
                    if self.rng.gen_bool(0.5) {
                        fields.push(self.random_field());
                    }
                    Op::MapRemove { key, fields }
                }
            };
        }
        roll -= self.config.weight_map;

        if roll < self.config.weight_key {
            self.result.key_ops += 1;
            return match sub {
                0..=39 => {
                    let n = self.rng.gen_range(1..=3);
                    let keys = (0..n).map(|_| self.random_key()).collect();
                    Op::Delete { keys }
                }
                40..=69 => Op::Exists {
                    key: self.random_key(),
                },
                _ => Op::KeyType {
                    key: self.random_key(),
                },
            };
        }
        roll -= self.config.weight_key;

        if roll < self.config.weight_rename {
            self.result.rename_ops += 1;
            let src = self.random_key();
            let dst = self.random_key();
            return if sub < 40 {
                Op::Rename { src, dst }
            } else {
                Op::RenameNx { src, dst }
            };
        }

        self.result.scan_ops += 1;
        let pattern = match sub {
            0..=39 => format!("{}*", KEY_PREFIX),
            40..=59 => format!("{}1*", KEY_PREFIX),
            60..=89 => self.random_key(),
            _ => "missing:*".to_string(),
        };
        Op::Scan { pattern }
    }

    // =========================================================================
    // Execution
    // =========================================================================

    async fn execute(client: &Client, op: &Op) -> Result<Outcome, Error> {
        let outcome = match op {
            Op::Set { key, value } => {
                client.get_bucket::<u64>(key.as_str()).set(value).await?;
                Outcome::Unit
            }
            Op::TrySet { key, value } => {
                Outcome::Bool(client.get_bucket::<u64>(key.as_str()).try_set(value).await?)
            }
            Op::GetAndSet { key, value } => {
                Outcome::Value(client.get_bucket::<u64>(key.as_str()).get_and_set(value).await?)
            }
            Op::Get { key } => Outcome::Value(client.get_bucket::<u64>(key.as_str()).get().await?),
            Op::MapPut { key, field, value } => {
                let map: Map<u64, u64> = client.get_map(key.as_str());
                Outcome::Bool(map.fast_put(field, value).await?)
            }
            Op::MapGet { key, field } => {
                let map: Map<u64, u64> = client.get_map(key.as_str());
                Outcome::Value(map.get(field).await?)
            }
            Op::MapRemove { key, fields } => {
                let map: Map<u64, u64> = client.get_map(key.as_str());
                Outcome::Count(map.fast_remove(fields).await?)
            }
            Op::Delete { keys } => Outcome::Count(client.delete(keys).await?),
            Op::Exists { key } => Outcome::Bool(client.exists(key).await?),
            Op::KeyType { key } => Outcome::Kind(client.key_type(key).await?),
            Op::Rename { src, dst } => {
                client.rename(src, dst).await?;
                Outcome::Unit
            }
            Op::RenameNx { src, dst } => Outcome::Bool(client.renamenx(src, dst).await?),
            Op::Scan { pattern } => {
                let mut keys: Vec<String> = client.find_keys(pattern)?.try_collect().await?;
                // Duplicates survive the sort and fail the comparison
                keys.sort();
                Outcome::Keys(keys)
            }
        };
        Ok(outcome)
    }

    /// Read the current value of each key through the clean client.
    async fn observe(&self, keys: &[String]) -> Result<Shadow, Error> {
        let mut observed = Shadow::new();
        for key in keys {
            let value = match self.clean.key_type(key).await? {
                None => continue,
                Some(ObjectKind::Bucket) => {
                    let bucket: Bucket<u64> = self.clean.get_bucket(key.as_str());
                    match bucket.get().await? {
                        Some(v) => ShadowValue::Bucket(v),
                        None => continue,
                    }
                }
                Some(ObjectKind::Map) => {
                    let map: Map<u64, u64> = self.clean.get_map(key.as_str());
                    ShadowValue::Map(map.read_all_map().await?.into_iter().collect())
                }
            };
            observed.insert(key.clone(), value);
        }
        Ok(observed)
    }

    fn violation(&mut self, msg: String) {
        self.result.invariant_violations.push(msg);
    }

    async fn step(&mut self) {
        let op = self.random_op();
        self.result.total_operations += 1;
        self.result.last_op = Some(format!("{:?}", op));

        let mut post = self.shadow.clone();
        let expected = apply(&op, &mut post);

        let outcome = match Self::execute(&self.faulty, &op).await {
            Err(Error::NotFound(_)) => Ok(Outcome::NotFound),
            Err(Error::WrongType(_)) => Ok(Outcome::WrongType),
            other => other,
        };
        match outcome {
            Ok(actual) => {
                if actual != expected {
                    self.violation(format!(
                        "{:?}: expected {:?}, got {:?}",
                        op, expected, actual
                    ));
                }
                self.shadow = post;
            }
            Err(Error::Transport(e)) => {
                self.result.transport_failures += 1;
                self.reconcile(&op, &e, post).await;
            }
            Err(e) => self.violation(format!("{:?}: unexpected error {}", op, e)),
        }
    }

    /// After a transport failure, check the touched keys are all-or-nothing.
    async fn reconcile(&mut self, op: &Op, error: &ChannelError, post: Shadow) {
        let touched = op.touched_keys();
        if touched.is_empty() {
            return;
        }
        let observed = match self.observe(&touched).await {
            Ok(observed) => observed,
            Err(e) => {
                self.violation(format!("{:?}: observer failed: {}", op, e));
                return;
            }
        };
        let before = restrict(&self.shadow, &touched);
        let after = restrict(&post, &touched);

        if !error.may_have_applied() {
            if observed != before {
                self.violation(format!(
                    "{:?}: failed with {} but store changed: {:?} -> {:?}",
                    op, error, before, observed
                ));
            }
        } else if observed == after {
            self.shadow = post;
        } else if observed != before {
            self.violation(format!(
                "{:?}: torn after {}: before {:?}, expected {:?}, observed {:?}",
                op, error, before, after, observed
            ));
        }
    }

    /// Compare the whole keyspace with the model.
    async fn check_full_state(&mut self) {
        let keys = match self.clean.find_keys("*") {
            Ok(stream) => stream.collect_all().await,
            Err(e) => Err(e),
        };
        let keys = match keys {
            Ok(keys) => keys,
            Err(e) => {
                self.violation(format!("final scan failed: {}", e));
                return;
            }
        };
        match self.observe(&keys).await {
            Ok(observed) if observed == self.shadow => {}
            Ok(observed) => self.violation(format!(
                "final state mismatch: model {:?}, store {:?}",
                self.shadow, observed
            )),
            Err(e) => self.violation(format!("final observe failed: {}", e)),
        }
    }

    pub async fn run(&mut self, operations: usize) {
        for _ in 0..operations {
            self.step().await;
        }
        self.check_full_state().await;
        self.result.fault_stats = self.faults.stats();
    }

    pub fn result(&self) -> &ObjectsDSTResult {
        &self.result
    }

    /// Names of the keys the model currently holds.
    pub fn model_keys(&self) -> Vec<String> {
        self.shadow.keys().cloned().collect()
    }

    pub fn client(&self) -> &Client {
        &self.clean
    }
}

/// Run a batch of DST runs with consecutive seeds
pub async fn run_objects_batch(
    start_seed: u64,
    num_seeds: usize,
    ops_per_seed: usize,
    config_fn: fn(u64) -> ObjectsDSTConfig,
) -> Vec<ObjectsDSTResult> {
    let mut results = Vec::with_capacity(num_seeds);
    for i in 0..num_seeds {
        let mut harness = ObjectsDSTHarness::new(config_fn(start_seed + i as u64));
        harness.run(ops_per_seed).await;
        results.push(harness.result().clone());
    }
    results
}

/// Summarize batch results
pub fn summarize_objects_batch(results: &[ObjectsDSTResult]) -> String {
    let total = results.len();
    let passed = results.iter().filter(|r| r.is_success()).count();
    let failed = total - passed;
    let total_ops: u64 = results.iter().map(|r| r.total_operations).sum();
    let total_faults: u64 = results.iter().map(|r| r.transport_failures).sum();

    let mut summary = format!(
        "Objects DST Summary\n\
         ===================\n\
         Seeds: {} total, {} passed, {} failed\n\
         Total operations: {}\n\
         Transport failures: {}\n",
        total, passed, failed, total_ops, total_faults
    );

    if failed > 0 {
        summary.push_str("\nFailed seeds:\n");
        for result in results.iter().filter(|r| !r.is_success()) {
            summary.push_str(&format!("  {}\n", result.summary()));
            for violation in result.invariant_violations.iter().take(5) {
                summary.push_str(&format!("    - {}\n", violation));
            }
            if let Some(op) = &result.last_op {
                summary.push_str(&format!("    last op: {}\n", op));
            }
        }
    }

    summary
}
