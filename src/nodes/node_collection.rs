use nalgebra::Vector3;
use tracing::{debug, info};

use crate::baselines::BaselineCollection;
use crate::collection::NamedCollection;
use crate::constants::MIN_CORRELATION_ORDER;
use crate::nodes::{default_node_name, Frame, Node, NodeFilter, NodeInfo};
use crate::stream::{Location, SampleStream};
use crate::vlbi_errors::VlbiError;

/// Read-only view of a node set, handed to baselines for geometry and correlation.
#[derive(Debug, Clone, Copy)]
pub struct NodeView<'a> {
    pub nodes: &'a NamedCollection<Node>,
    pub station: &'a Location,
    pub frame: Frame,
}

impl<'a> NodeView<'a> {
    pub fn node(&self, slot: usize) -> Option<&'a Node> {
        self.nodes.at_slot(slot)
    }

    pub fn position(&self, slot: usize) -> Option<Vector3<f64>> {
        self.node(slot)
            .map(|node| node.position(self.frame, self.station))
    }

    /// Point against which per-node delays are measured, expressed in the view frame.
    ///
    /// The station reference (the origin) in the relative frame, the first node otherwise.
    pub fn delay_reference(&self) -> Vector3<f64> {
        match self.frame {
            Frame::Relative => Vector3::zeros(),
            Frame::Geographic => self
                .nodes
                .iter()
                .next()
                .map(|node| node.position(self.frame, self.station))
                .unwrap_or_else(Vector3::zeros),
        }
    }
}

/// The active station set of one observing context.
///
/// Owns the nodes, the shared station reference location, the coordinate frame, the
/// correlation order and the lazily built [`BaselineCollection`]. Any change to the node set
/// or to the order drops the baselines; the next call to [`NodeCollection::baselines`]
/// rebuilds them.
#[derive(Default)]
pub struct NodeCollection {
    nodes: NamedCollection<Node>,
    station: Location,
    frame: Frame,
    order: usize,
    created: usize,
    baselines: Option<BaselineCollection>,
}

impl NodeCollection {
    pub fn new() -> Self {
        NodeCollection {
            order: MIN_CORRELATION_ORDER,
            ..Default::default()
        }
    }

    fn invalidate(&mut self) {
        if self.baselines.take().is_some() {
            debug!("baselines invalidated");
        }
    }

    fn next_free_name(&self) -> Result<String, VlbiError> {
        // letter/digit names cycle every 250 nodes
        (0..250)
            .map(|offset| default_node_name(self.created + offset))
            .find(|name| !self.nodes.contains(name))
            .ok_or_else(|| VlbiError::DuplicateName(default_node_name(self.created)))
    }

    fn insert(&mut self, node: Node) -> Result<String, VlbiError> {
        let name = node.name().to_string();
        self.nodes.add(node)?;
        self.created += 1;
        self.invalidate();
        info!(node = %name, count = self.nodes.len(), "node added");
        Ok(name)
    }

    /// Add a node recording `stream`.
    ///
    /// Arguments
    /// ---------
    /// * `name`: node name; an empty name is replaced by the next free letter/digit name
    /// * `stream`: the recording, moved into the node
    ///
    /// Return
    /// ------
    /// * the name of the new node, or [`VlbiError::DuplicateName`]
    pub fn add(&mut self, name: &str, stream: SampleStream) -> Result<String, VlbiError> {
        let name = if name.is_empty() {
            self.next_free_name()?
        } else {
            name.to_string()
        };
        self.insert(Node::new(name, self.created, stream))
    }

    /// Remove a node by name and drop the baselines. Unknown names are a no-op.
    pub fn remove(&mut self, name: &str) -> Option<Node> {
        let node = self.nodes.remove(name)?;
        self.invalidate();
        info!(node = %name, count = self.nodes.len(), "node removed");
        Some(node)
    }

    /// Deep copy of node `source` added under `target`.
    pub fn copy(&mut self, source: &str, target: &str) -> Result<String, VlbiError> {
        let node = self
            .nodes
            .get(source)
            .ok_or_else(|| VlbiError::NodeNotFound(source.to_string()))?
            .copy_as(target, self.created);
        self.insert(node)
    }

    /// Filtered copy of node `source` added under `target`.
    pub fn filter(
        &mut self,
        source: &str,
        target: &str,
        filter: NodeFilter,
    ) -> Result<String, VlbiError> {
        let node = self
            .nodes
            .get(source)
            .ok_or_else(|| VlbiError::NodeNotFound(source.to_string()))?
            .filtered(target, self.created, filter);
        self.insert(node)
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.nodes.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.nodes.names().map(str::to_string).collect()
    }

    pub fn infos(&self) -> Vec<NodeInfo> {
        self.nodes.iter().map(Node::info).collect()
    }

    pub fn station(&self) -> &Location {
        &self.station
    }

    /// Set the shared station reference. It must be a geographic location.
    pub fn set_station_location(&mut self, station: Location) -> Result<(), VlbiError> {
        if station.is_relative() {
            return Err(VlbiError::InvalidLocation(
                "the station reference must be geographic".into(),
            ));
        }
        self.station = station;
        Ok(())
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn set_frame(&mut self, frame: Frame) {
        self.frame = frame;
    }

    pub fn set_relative(&mut self, relative: bool) {
        self.set_frame(if relative {
            Frame::Relative
        } else {
            Frame::Geographic
        });
    }

    /// Correlation order used for the next baseline build, clamped to `[2, node count]`.
    pub fn correlation_order(&self) -> usize {
        self.order
            .min(self.nodes.len())
            .max(MIN_CORRELATION_ORDER)
    }

    /// Set the correlation order and drop the baselines.
    ///
    /// Return
    /// ------
    /// * the order actually applied, clamped to `[2, node count]`
    pub fn set_correlation_order(&mut self, order: usize) -> usize {
        self.order = order.max(MIN_CORRELATION_ORDER);
        self.invalidate();
        let effective = self.correlation_order();
        debug!(requested = order, effective, "correlation order set");
        effective
    }

    pub fn view(&self) -> NodeView<'_> {
        NodeView {
            nodes: &self.nodes,
            station: &self.station,
            frame: self.frame,
        }
    }

    /// Baselines of the current node set, built on first access after a mutation.
    pub fn baselines(&mut self) -> &mut BaselineCollection {
        self.split().1
    }

    /// Baselines as last built, `None` if a mutation dropped them since.
    pub fn cached_baselines(&self) -> Option<&BaselineCollection> {
        self.baselines.as_ref()
    }

    /// Node view and baselines at once, building the baselines if needed.
    pub fn split(&mut self) -> (NodeView<'_>, &mut BaselineCollection) {
        if self.baselines.is_none() {
            self.nodes.compact();
        }
        let order = self.correlation_order();
        let view = NodeView {
            nodes: &self.nodes,
            station: &self.station,
            frame: self.frame,
        };
        let baselines = self
            .baselines
            .get_or_insert_with(|| BaselineCollection::build(&view, order));
        (view, baselines)
    }
}
