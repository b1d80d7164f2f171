#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use dynadag::{Producer, Step, StepContext, Task, Value};

/// A test task: a name plus the two engine tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    pub name: String,
    pub notable: bool,
    pub cacheable: bool,
}

impl Node {
    /// Cacheable, not tracked by the cycle detector.
    pub fn plain(name: &str) -> Self {
        Self {
            name: name.to_string(),
            notable: false,
            cacheable: true,
        }
    }

    /// Cacheable and tracked by the cycle detector.
    pub fn notable(name: &str) -> Self {
        Self {
            notable: true,
            ..Self::plain(name)
        }
    }

    /// Recomputed on every request.
    pub fn volatile(name: &str) -> Self {
        Self {
            cacheable: false,
            ..Self::plain(name)
        }
    }
}

impl Task for Node {
    fn is_cacheable(&self) -> bool {
        self.cacheable
    }

    fn is_notable(&self) -> bool {
        self.notable
    }
}

type Script<V> =
    Arc<dyn Fn(&StepContext<Node, V>) -> anyhow::Result<Step<Node, V>> + Send + Sync>;

/// Builder for [`ScriptedProducer`].
pub struct ProducerBuilder<V: Value> {
    scripts: HashMap<String, Script<V>>,
}

impl<V: Value> ProducerBuilder<V> {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
        }
    }

    /// Script the step of every node named `name`.
    pub fn on<F>(mut self, name: &str, script: F) -> Self
    where
        F: Fn(&StepContext<Node, V>) -> anyhow::Result<Step<Node, V>> + Send + Sync + 'static,
    {
        self.scripts.insert(name.to_string(), Arc::new(script));
        self
    }

    /// Node `name` is done with `value`.
    pub fn value(self, name: &str, value: V) -> Self {
        self.on(name, move |_| Ok(Step::done(value.clone())))
    }

    /// Node `name` fails with `message`.
    pub fn failing(self, name: &str, message: &str) -> Self {
        let message = message.to_string();
        self.on(name, move |_| Err(anyhow!("{message}")))
    }

    pub fn build(self) -> ScriptedProducer<V> {
        ScriptedProducer {
            scripts: self.scripts,
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<V: Value> Default for ProducerBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A producer whose steps are closures keyed by node name.
///
/// Counts how often `step` ran per name.
pub struct ScriptedProducer<V: Value> {
    scripts: HashMap<String, Script<V>>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
}

impl<V: Value> ScriptedProducer<V> {
    /// How many times `step` ran for nodes named `name`.
    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }
}

impl<V: Value> Producer for ScriptedProducer<V> {
    type Task = Node;
    type Value = V;

    fn step(&self, task: &Node, cx: &StepContext<Node, V>) -> anyhow::Result<Step<Node, V>> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(task.name.clone())
            .or_default() += 1;

        let script = self
            .scripts
            .get(&task.name)
            .ok_or_else(|| anyhow!("no script for node '{}'", task.name))?;
        script(cx)
    }
}
