//! Signal chain builder: turns a declarative [`LayerSpec`] into a running
//! layer: looped noise source → filters (declared order) → optional LFO
//! amplitude modulation → static layer gain.

use std::sync::Arc;

use rand::Rng;

use crate::catalog::{FilterSpec, LayerSpec, ModulationSpec};

use super::context::{AudioContext, NodeId};
use super::filter::{BiquadFilter, FilterType};
use super::noise;
use super::oscillator::Oscillator;
use super::source::{BufferSource, StereoBuffer};

/// Position of a node on a layer's signal path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Source,
    Filter(FilterType),
    Modulator,
    Gain,
}

/// One filter stage, with independent state per channel.
#[derive(Debug, Clone)]
struct FilterStage {
    id: NodeId,
    channels: [BiquadFilter; 2],
}

/// Gain stage driven by a sine LFO: `offset + swing * sin(...)`.
#[derive(Debug, Clone)]
struct Modulator {
    id: NodeId,
    oscillator_id: NodeId,
    oscillator: Oscillator,
    offset: f64,
    swing: f64,
}

impl Modulator {
    fn next_gain(&mut self) -> f64 {
        self.offset + self.swing * self.oscillator.next_sample()
    }
}

/// A built, running layer. All owned nodes are released together by
/// [`ActiveLayer::teardown`].
#[derive(Debug, Clone)]
pub struct ActiveLayer {
    source_id: NodeId,
    source: BufferSource,
    filters: Vec<FilterStage>,
    modulator: Option<Modulator>,
    gain_id: NodeId,
    base_gain: f64,
    released: bool,
}

/// Build a layer from its spec, generating a fresh stereo noise buffer of
/// `frames` frames.
pub fn build_layer<R: Rng + ?Sized>(
    ctx: &mut AudioContext,
    spec: &LayerSpec,
    frames: usize,
    rng: &mut R,
) -> ActiveLayer {
    let [left, right] = noise::generate_stereo(spec.noise_color, frames, rng);
    let buffer = Arc::new(StereoBuffer::new(left, right));
    ActiveLayer::from_buffer(
        ctx,
        buffer,
        &spec.filters,
        spec.modulation.as_ref(),
        spec.base_gain,
    )
}

impl ActiveLayer {
    /// Wire a chain around an existing buffer and start it.
    pub fn from_buffer(
        ctx: &mut AudioContext,
        buffer: Arc<StereoBuffer>,
        filters: &[FilterSpec],
        modulation: Option<&ModulationSpec>,
        base_gain: f64,
    ) -> Self {
        let sample_rate = ctx.sample_rate();
        let source_id = ctx.allocate_node();
        let mut source = BufferSource::new(buffer);

        let filters = filters
            .iter()
            .map(|f| {
                let make = || BiquadFilter::new(f.kind, f.frequency, f.q, sample_rate);
                FilterStage {
                    id: ctx.allocate_node(),
                    channels: [make(), make()],
                }
            })
            .collect();

        let mut modulator = modulation.map(|m| Modulator {
            id: ctx.allocate_node(),
            oscillator_id: ctx.allocate_node(),
            oscillator: Oscillator::new(m.frequency, sample_rate),
            offset: 1.0 - m.depth / 2.0,
            swing: m.depth / 2.0,
        });

        let gain_id = ctx.allocate_node();

        source.start();
        if let Some(m) = modulator.as_mut() {
            m.oscillator.start();
        }

        ActiveLayer {
            source_id,
            source,
            filters,
            modulator,
            gain_id,
            base_gain,
            released: false,
        }
    }

    /// Render the next stereo frame of this layer.
    pub fn next_frame(&mut self) -> (f64, f64) {
        let (mut l, mut r) = self.source.next_frame();
        for stage in &mut self.filters {
            l = stage.channels[0].process(l);
            r = stage.channels[1].process(r);
        }
        if let Some(m) = self.modulator.as_mut() {
            let g = m.next_gain();
            l *= g;
            r *= g;
        }
        (l * self.base_gain, r * self.base_gain)
    }

    /// Signal path, source first.
    pub fn node_kinds(&self) -> Vec<NodeKind> {
        let mut kinds = Vec::with_capacity(self.filters.len() + 3);
        kinds.push(NodeKind::Source);
        kinds.extend(
            self.filters
                .iter()
                .map(|s| NodeKind::Filter(s.channels[0].filter_type())),
        );
        if self.modulator.is_some() {
            kinds.push(NodeKind::Modulator);
        }
        kinds.push(NodeKind::Gain);
        kinds
    }

    /// Every node this layer owns, including the LFO oscillator.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids = vec![self.source_id];
        ids.extend(self.filters.iter().map(|s| s.id));
        if let Some(m) = &self.modulator {
            ids.push(m.id);
            ids.push(m.oscillator_id);
        }
        ids.push(self.gain_id);
        ids
    }

    pub fn node_count(&self) -> usize {
        self.node_ids().len()
    }

    /// Cutoff frequencies of the filter stages, in chain order.
    pub fn filter_frequencies(&self) -> Vec<f64> {
        self.filters
            .iter()
            .map(|s| s.channels[0].frequency())
            .collect()
    }

    pub fn is_running(&self) -> bool {
        self.source.is_running()
    }

    /// Stop the source and LFO and hand every node back to the context.
    /// Safe to call more than once.
    pub fn teardown(&mut self, ctx: &mut AudioContext) {
        self.source.stop();
        if let Some(m) = self.modulator.as_mut() {
            m.oscillator.stop();
        }
        if self.released {
            return;
        }
        for id in self.node_ids() {
            ctx.release_node(id);
        }
        self.released = true;
    }
}
