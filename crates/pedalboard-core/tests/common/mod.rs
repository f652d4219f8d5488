//! Mock host shared by the integration tests: a patch bay recording
//! every edge the chain store drives, plugin nodes with configurable
//! parameters, and a loader with a failure list.

use parking_lot::Mutex;
use pedalboard_core::chain::ChainStore;
use pedalboard_core::error::NodeError;
use pedalboard_core::node::{
    ChainEndpoint, InstanceId, NodeEvent, ParameterInfo, ParameterValue, PluginLoader, PluginNode,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// The "real" graph underneath the store: records every signal and
/// event edge the mock endpoints create or drop.
#[derive(Default)]
pub struct PatchBay {
    next_id: AtomicU64,
    signal: Mutex<Vec<(u64, u64)>>,
    events: Mutex<Vec<(u64, u64)>>,
}

impl PatchBay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn allocate(&self) -> InstanceId {
        InstanceId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn signal_edges(&self) -> Vec<(u64, u64)> {
        self.signal.lock().clone()
    }

    pub fn event_edges(&self) -> Vec<(u64, u64)> {
        self.events.lock().clone()
    }

    fn connect_signal(&self, from: u64, to: u64) {
        self.signal.lock().push((from, to));
    }

    fn disconnect_signal(&self, from: u64) {
        self.signal.lock().retain(|&(f, _)| f != from);
    }

    fn connect_event(&self, from: u64, to: u64) {
        self.events.lock().push((from, to));
    }

    fn disconnect_event(&self, from: u64, to: Option<u64>) {
        self.events
            .lock()
            .retain(|&(f, t)| !(f == from && to.map_or(true, |dest| t == dest)));
    }
}

/// A chain boundary (input or output): connectable, nothing else.
pub struct MockEndpoint {
    id: InstanceId,
    bay: Arc<PatchBay>,
}

impl MockEndpoint {
    pub fn new(bay: &Arc<PatchBay>) -> Arc<Self> {
        Arc::new(Self {
            id: bay.allocate(),
            bay: bay.clone(),
        })
    }
}

impl ChainEndpoint for MockEndpoint {
    fn instance_id(&self) -> InstanceId {
        self.id
    }

    fn connect(&self, next: &dyn ChainEndpoint) -> Result<(), NodeError> {
        self.bay.connect_signal(self.id.0, next.instance_id().0);
        Ok(())
    }

    fn disconnect(&self) -> Result<(), NodeError> {
        self.bay.disconnect_signal(self.id.0);
        Ok(())
    }
}

/// A full mock plugin wired into the patch bay.
pub struct MockNode {
    id: InstanceId,
    name: String,
    bay: Arc<PatchBay>,
    params: Vec<ParameterInfo>,
    values: Mutex<HashMap<String, ParameterValue>>,
    state: Mutex<Vec<u8>>,
    pub scheduled: Mutex<Vec<NodeEvent>>,
    delay: u64,
    destroyed: AtomicBool,
    /// Round trips made through `parameter_values`.
    pub value_queries: AtomicU64,
}

impl MockNode {
    pub fn destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }
}

impl ChainEndpoint for MockNode {
    fn instance_id(&self) -> InstanceId {
        self.id
    }

    fn connect(&self, next: &dyn ChainEndpoint) -> Result<(), NodeError> {
        self.bay.connect_signal(self.id.0, next.instance_id().0);
        Ok(())
    }

    fn disconnect(&self) -> Result<(), NodeError> {
        self.bay.disconnect_signal(self.id.0);
        Ok(())
    }
}

impl PluginNode for MockNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn connect_events(&self, to: InstanceId, _output: Option<usize>) -> Result<(), NodeError> {
        self.bay.connect_event(self.id.0, to.0);
        Ok(())
    }

    fn disconnect_events(
        &self,
        to: Option<InstanceId>,
        _output: Option<usize>,
    ) -> Result<(), NodeError> {
        self.bay.disconnect_event(self.id.0, to.map(|t| t.0));
        Ok(())
    }

    fn parameter_list(&self) -> Result<Vec<ParameterInfo>, NodeError> {
        Ok(self.params.clone())
    }

    fn parameter_info(&self, ids: &[String]) -> Result<HashMap<String, ParameterInfo>, NodeError> {
        Ok(self
            .params
            .iter()
            .filter(|p| ids.contains(&p.id))
            .map(|p| (p.id.clone(), p.clone()))
            .collect())
    }

    fn parameter_values(
        &self,
        normalized: bool,
        ids: &[String],
    ) -> Result<HashMap<String, ParameterValue>, NodeError> {
        self.value_queries.fetch_add(1, Ordering::Relaxed);
        let values = self.values.lock();
        Ok(ids
            .iter()
            .map(|id| {
                let value = values
                    .get(id)
                    .copied()
                    .unwrap_or(ParameterValue { value: 0.0, normalized });
                (id.clone(), value)
            })
            .collect())
    }

    fn set_parameter_values(
        &self,
        values: &HashMap<String, ParameterValue>,
    ) -> Result<(), NodeError> {
        self.values
            .lock()
            .extend(values.iter().map(|(id, v)| (id.clone(), *v)));
        Ok(())
    }

    fn get_state(&self) -> Result<Vec<u8>, NodeError> {
        Ok(self.state.lock().clone())
    }

    fn set_state(&self, data: &[u8]) -> Result<(), NodeError> {
        *self.state.lock() = data.to_vec();
        Ok(())
    }

    fn compensation_delay(&self) -> Result<u64, NodeError> {
        Ok(self.delay)
    }

    fn schedule_events(&self, events: &[NodeEvent]) -> Result<(), NodeError> {
        self.scheduled.lock().extend_from_slice(events);
        Ok(())
    }

    fn clear_events(&self) -> Result<(), NodeError> {
        self.scheduled.lock().clear();
        Ok(())
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
    }
}

/// Per-locator shape of the plugin a [`MockLoader`] hands out.
#[derive(Clone)]
pub struct MockSpec {
    pub param_count: usize,
    pub delay: u64,
}

impl Default for MockSpec {
    fn default() -> Self {
        Self {
            param_count: 2,
            delay: 0,
        }
    }
}

pub struct MockLoader {
    bay: Arc<PatchBay>,
    catalog: Mutex<HashMap<String, MockSpec>>,
    failing: Mutex<HashSet<String>>,
    /// Every node handed out, in load order.
    pub loaded: Mutex<Vec<Arc<MockNode>>>,
}

impl MockLoader {
    pub fn new(bay: &Arc<PatchBay>) -> Arc<Self> {
        Arc::new(Self {
            bay: bay.clone(),
            catalog: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            loaded: Mutex::new(Vec::new()),
        })
    }

    pub fn register(&self, locator: &str, spec: MockSpec) {
        self.catalog.lock().insert(locator.to_string(), spec);
    }

    pub fn fail_next(&self, locator: &str) {
        self.failing.lock().insert(locator.to_string());
    }
}

impl PluginLoader for MockLoader {
    fn load(&self, locator: &str) -> Result<Arc<dyn PluginNode>, NodeError> {
        if self.failing.lock().contains(locator) {
            return Err(NodeError::Plugin(format!("{locator} unavailable")));
        }
        let spec = self
            .catalog
            .lock()
            .get(locator)
            .cloned()
            .unwrap_or_default();
        let params = (0..spec.param_count)
            .map(|i| ParameterInfo::new(format!("p{i}"), format!("param{i}")))
            .collect();
        let node = Arc::new(MockNode {
            id: self.bay.allocate(),
            name: locator.to_string(),
            bay: self.bay.clone(),
            params,
            values: Mutex::new(HashMap::new()),
            state: Mutex::new(Vec::new()),
            scheduled: Mutex::new(Vec::new()),
            delay: spec.delay,
            destroyed: AtomicBool::new(false),
            value_queries: AtomicU64::new(0),
        });
        self.loaded.lock().push(node.clone());
        Ok(node)
    }
}

/// A store over a fresh patch bay, plus everything needed to inspect it.
pub struct Fixture {
    pub bay: Arc<PatchBay>,
    pub loader: Arc<MockLoader>,
    pub store: ChainStore,
    pub input: u64,
    pub output: u64,
    pub event_dest: u64,
}

pub fn fixture() -> Fixture {
    let bay = PatchBay::new();
    let input = MockEndpoint::new(&bay);
    let output = MockEndpoint::new(&bay);
    let event_dest = bay.allocate();
    let loader = MockLoader::new(&bay);
    let store = ChainStore::new(loader.clone(), input.clone(), output.clone(), event_dest);
    Fixture {
        bay,
        loader,
        store,
        input: input.instance_id().0,
        output: output.instance_id().0,
        event_dest: event_dest.0,
    }
}

impl Fixture {
    /// Instance id of the node occupying chain position `pos`.
    pub fn node_id(&self, pos: usize) -> u64 {
        self.store.slots()[pos].node.instance_id().0
    }

    /// Assert the patch bay holds exactly the signal path through the
    /// given nodes and the matching event path ending at the
    /// destination.
    pub fn assert_path(&self, nodes: &[u64]) {
        let mut signal = Vec::with_capacity(nodes.len() + 1);
        let mut prev = self.input;
        for &id in nodes {
            signal.push((prev, id));
            prev = id;
        }
        signal.push((prev, self.output));

        let mut actual_signal = self.bay.signal_edges();
        actual_signal.sort_unstable();
        signal.sort_unstable();
        assert_eq!(actual_signal, signal, "signal path mismatch");

        let mut events = Vec::with_capacity(nodes.len());
        for pair in nodes.windows(2) {
            events.push((pair[0], pair[1]));
        }
        if let Some(&last) = nodes.last() {
            events.push((last, self.event_dest));
        }
        let mut actual_events = self.bay.event_edges();
        actual_events.sort_unstable();
        events.sort_unstable();
        assert_eq!(actual_events, events, "event path mismatch");
    }
}
