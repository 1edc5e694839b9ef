//! Scripted in-memory document host
//!
//! Nodes are supplied up front with fixed geometry. Export returns a small
//! deterministic payload describing the call, which makes archive contents
//! easy to assert on.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;

use super::{DocumentHost, ExportSettings};
use crate::error::HostError;
use iconbridge_shared::{NodeId, NodeSnapshot};

pub struct ScriptedHost {
    nodes: Mutex<Vec<NodeSnapshot>>,
    unexportable: Mutex<HashSet<NodeId>>,
    calls: Mutex<Vec<(NodeId, ExportSettings)>>,
    delay: Option<Duration>,
    selection_tx: watch::Sender<usize>,
}

impl ScriptedHost {
    pub fn new(nodes: Vec<NodeSnapshot>) -> Self {
        let (selection_tx, _) = watch::channel(nodes.len());
        Self {
            nodes: Mutex::new(nodes),
            unexportable: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
            selection_tx,
        }
    }

    /// Make every export call take at least `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make export of `node` fail as unsupported
    pub fn refuse(&self, node: &NodeId) {
        self.unexportable
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(node.clone());
    }

    pub fn set_selection(&self, nodes: Vec<NodeSnapshot>) {
        let count = nodes.len();
        *self.nodes.lock().unwrap_or_else(|e| e.into_inner()) = nodes;
        self.selection_tx.send_replace(count);
    }

    /// Every export call made so far, in order
    pub fn calls(&self) -> Vec<(NodeId, ExportSettings)> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Payload returned for a successful export
    pub fn payload(node: &NodeId, settings: &ExportSettings) -> Vec<u8> {
        match settings {
            ExportSettings::Svg(_) => format!("<svg id=\"{}\"/>", node).into_bytes(),
            ExportSettings::Raster { format, scale, .. } => {
                format!("{}@{}x.{}", node, scale, format).into_bytes()
            }
        }
    }
}

#[async_trait]
impl DocumentHost for ScriptedHost {
    async fn selection(&self) -> Vec<NodeSnapshot> {
        self.nodes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn export(&self, node: &NodeId, settings: &ExportSettings) -> Result<Vec<u8>, HostError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((node.clone(), *settings));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let refused = self
            .unexportable
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(node);
        if refused {
            return Err(HostError::NotExportable { node: node.clone() });
        }

        Ok(Self::payload(node, settings))
    }

    fn watch_selection(&self) -> watch::Receiver<usize> {
        self.selection_tx.subscribe()
    }
}
