//! Mixer engine. Owns the audio context, the master bus and one signal
//! chain per playing sound.
//!
//! The engine is a single owned value: hosts create one per playback
//! session and drive it through `start` / `set_volume` / `stop` /
//! `stop_all` / `set_master_volume`, pulling audio with `process`.
//! Parameter changes are ramps on the audio clock; stopped sounds fade
//! out and are released by a deferred, generation-checked release.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::catalog::Catalog;
use crate::config::{MixerConfig, clamp_level};
use crate::error::MixerError;

use super::chain::{ActiveLayer, build_layer};
use super::context::{AudioContext, ContextState, NodeId};
use super::mixer::Mixer;
use super::param::GainParam;
use super::source::StereoBuffer;

/// Where a sound's audio comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundKind {
    /// Built from the catalog recipe.
    Synthesized,
    /// A registered pre-recorded loop.
    Streamed,
}

/// Lifecycle of a registered sound. Inactive sounds are simply absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundState {
    /// Chain built, no audio rendered yet (or restarted mid-fade).
    Starting,
    Playing,
    /// Fading out; nodes released once the fade has completed.
    Stopping,
}

/// One playing sound: its layers summed into a per-sound gain.
#[derive(Debug)]
pub struct ActiveSound {
    sound_id: String,
    kind: SoundKind,
    state: SoundState,
    /// Identifies this incarnation; stale deferred releases compare against it.
    generation: u64,
    gain_id: NodeId,
    gain: GainParam,
    layers: Vec<ActiveLayer>,
}

impl ActiveSound {
    pub fn sound_id(&self) -> &str {
        &self.sound_id
    }

    pub fn kind(&self) -> SoundKind {
        self.kind
    }

    pub fn state(&self) -> SoundState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Target of the per-sound gain.
    pub fn volume(&self) -> f64 {
        self.gain.target()
    }

    /// Time constants elapsed since the last volume change or stop.
    pub fn ramp_progress(&self) -> f64 {
        self.gain.elapsed_time_constants()
    }

    pub fn layers(&self) -> &[ActiveLayer] {
        &self.layers
    }

    /// Layer nodes plus the per-sound gain.
    pub fn node_count(&self) -> usize {
        self.layers.iter().map(ActiveLayer::node_count).sum::<usize>() + 1
    }

    fn next_frame(&mut self) -> (f64, f64) {
        let (mut l, mut r) = (0.0, 0.0);
        for layer in &mut self.layers {
            let (ll, lr) = layer.next_frame();
            l += ll;
            r += lr;
        }
        let g = self.gain.next_value();
        (l * g, r * g)
    }

    fn teardown(&mut self, ctx: &mut AudioContext) {
        for layer in &mut self.layers {
            layer.teardown(ctx);
        }
        ctx.release_node(self.gain_id);
    }
}

/// A release scheduled by `stop`, valid only for the generation it names.
#[derive(Debug, Clone)]
struct PendingRelease {
    sound_id: String,
    generation: u64,
    due_frame: u64,
}

/// Context plus master bus; created together on first use.
#[derive(Debug)]
struct Graph {
    ctx: AudioContext,
    bus: Mixer,
}

/// Create the graph if needed and make sure it is running.
fn open_graph<'a>(
    slot: &'a mut Option<Graph>,
    config: &MixerConfig,
    master_volume: f64,
) -> Result<&'a mut Graph, MixerError> {
    let graph = match slot.take() {
        Some(graph) => graph,
        None => {
            let ctx = AudioContext::new(config.sample_rate).inspect_err(|e| {
                log::warn!("Could not create audio context: {e}");
            })?;
            log::debug!("Audio context created at {} Hz", ctx.sample_rate());
            let bus = Mixer::new(master_volume, ctx.sample_rate());
            Graph { ctx, bus }
        }
    };
    let graph = slot.insert(graph);
    if !graph.ctx.is_running() {
        graph.ctx.resume();
    }
    Ok(graph)
}

/// Process-wide mixer state for one playback session.
pub struct MixerState {
    config: MixerConfig,
    catalog: Catalog,
    graph: Option<Graph>,
    master_volume: f64,
    sounds: BTreeMap<String, ActiveSound>,
    pending: Vec<PendingRelease>,
    streams: HashMap<String, Arc<StereoBuffer>>,
    rng: StdRng,
    next_generation: u64,
}

impl MixerState {
    pub fn new(catalog: Catalog, config: MixerConfig) -> Self {
        Self::with_rng(catalog, config, StdRng::from_entropy())
    }

    /// Deterministic noise: the same seed yields the same buffers.
    pub fn with_seed(catalog: Catalog, config: MixerConfig, seed: u64) -> Self {
        Self::with_rng(catalog, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(catalog: Catalog, config: MixerConfig, rng: StdRng) -> Self {
        let config = config.sanitized();
        MixerState {
            master_volume: config.master_volume,
            config,
            catalog,
            graph: None,
            sounds: BTreeMap::new(),
            pending: Vec::new(),
            streams: HashMap::new(),
            rng,
            next_generation: 0,
        }
    }

    // ── Control operations ──────────────────────────────────

    /// Lazily create the audio context and master bus, resuming a
    /// suspended context. Idempotent.
    pub fn ensure_context(&mut self) -> Result<(), MixerError> {
        open_graph(&mut self.graph, &self.config, self.master_volume).map(|_| ())
    }

    /// Start `sound_id` at `volume`, or retarget it if it is already
    /// registered. Never creates a second chain for the same id.
    pub fn start(&mut self, sound_id: &str, volume: f64) -> Result<(), MixerError> {
        let volume = clamp_level(volume);
        let graph = open_graph(&mut self.graph, &self.config, self.master_volume)?;

        if let Some(sound) = self.sounds.get_mut(sound_id) {
            if sound.state == SoundState::Stopping {
                self.next_generation += 1;
                sound.generation = self.next_generation;
                sound.state = SoundState::Starting;
                log::debug!("Restarting '{sound_id}' before its release");
            }
            sound.gain.set_target(volume, self.config.ramp_time_constant);
            return Ok(());
        }

        let recipe = self.catalog.recipe(sound_id);
        let stream = if recipe.synth_only {
            None
        } else {
            self.streams.get(sound_id).cloned()
        };
        let (kind, layers) = match stream {
            Some(buffer) => (
                SoundKind::Streamed,
                vec![ActiveLayer::from_buffer(&mut graph.ctx, buffer, &[], None, 1.0)],
            ),
            None => {
                let frames = graph.ctx.seconds_to_frames(self.config.buffer_seconds).max(1) as usize;
                let layers = recipe
                    .layers
                    .iter()
                    .map(|spec| build_layer(&mut graph.ctx, spec, frames, &mut self.rng))
                    .collect();
                (SoundKind::Synthesized, layers)
            }
        };

        self.next_generation += 1;
        let sound = ActiveSound {
            sound_id: sound_id.to_string(),
            kind,
            state: SoundState::Starting,
            generation: self.next_generation,
            gain_id: graph.ctx.allocate_node(),
            gain: GainParam::new(volume, graph.ctx.sample_rate()),
            layers,
        };
        log::debug!(
            "Started '{sound_id}' ({kind:?}, {} layers) at {volume:.2}",
            sound.layers.len()
        );
        self.sounds.insert(sound_id.to_string(), sound);
        Ok(())
    }

    /// Ramp the volume of a starting or playing sound. No-op otherwise.
    pub fn set_volume(&mut self, sound_id: &str, volume: f64) {
        if let Some(sound) = self.sounds.get_mut(sound_id) {
            if sound.state != SoundState::Stopping {
                sound
                    .gain
                    .set_target(clamp_level(volume), self.config.ramp_time_constant);
            }
        }
    }

    /// Fade `sound_id` out and schedule the release of its nodes.
    /// No-op for inactive or already stopping sounds.
    pub fn stop(&mut self, sound_id: &str) {
        let Some(graph) = self.graph.as_ref() else {
            return;
        };
        let Some(sound) = self.sounds.get_mut(sound_id) else {
            return;
        };
        if sound.state == SoundState::Stopping {
            return;
        }
        sound.gain.set_target(0.0, self.config.stop_time_constant);
        sound.state = SoundState::Stopping;
        let delay = graph.ctx.seconds_to_frames(self.config.release_delay());
        self.pending.push(PendingRelease {
            sound_id: sound_id.to_string(),
            generation: sound.generation,
            due_frame: graph.ctx.current_frame() + delay,
        });
        log::debug!("Stopping '{sound_id}', release in {delay} frames");
    }

    /// Stop every active sound.
    pub fn stop_all(&mut self) {
        let ids: Vec<String> = self.active_ids().map(str::to_string).collect();
        for id in ids {
            self.stop(&id);
        }
    }

    /// Ramp the master level. Per-sound balance is untouched.
    pub fn set_master_volume(&mut self, level: f64) {
        self.master_volume = clamp_level(level);
        if let Some(graph) = self.graph.as_mut() {
            graph
                .bus
                .set_master(self.master_volume, self.config.ramp_time_constant);
        }
    }

    // ── Rendering ───────────────────────────────────────────

    /// Render one block of stereo output. Silence until the context
    /// exists and runs.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        let graph = match self.graph.as_mut() {
            Some(graph) if graph.ctx.is_running() => graph,
            _ => {
                left.fill(0.0);
                right.fill(0.0);
                return;
            }
        };

        graph.bus.clear(frames);
        for sound in self.sounds.values_mut() {
            for i in 0..frames {
                let (l, r) = sound.next_frame();
                graph.bus.add(i, l, r);
            }
            if sound.state == SoundState::Starting {
                sound.state = SoundState::Playing;
            }
        }
        graph.bus.write_output(&mut left[..frames], &mut right[..frames]);
        left[frames..].fill(0.0);
        right[frames..].fill(0.0);
        graph.ctx.advance(frames);

        let now = graph.ctx.current_frame();
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| p.due_frame <= now);
        self.pending = waiting;
        for release in due {
            let current = self
                .sounds
                .get(&release.sound_id)
                .is_some_and(|s| s.generation == release.generation && s.state == SoundState::Stopping);
            if !current {
                log::debug!("Skipping stale release of '{}'", release.sound_id);
                continue;
            }
            if let Some(mut sound) = self.sounds.remove(&release.sound_id) {
                sound.teardown(&mut graph.ctx);
                log::debug!("Released '{}'", release.sound_id);
            }
        }
    }

    // ── Host hooks ──────────────────────────────────────────

    /// Supply the device rate before the context is created (e.g. after a
    /// failed creation). Ignored once the context exists.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        if self.graph.is_some() {
            log::warn!("Sample rate is fixed once the audio context exists");
            return;
        }
        self.config.sample_rate = sample_rate;
    }

    /// Pause rendering (e.g. the page was hidden). `ensure_context` resumes.
    pub fn suspend(&mut self) {
        if let Some(graph) = self.graph.as_mut() {
            graph.ctx.suspend();
        }
    }

    /// Register a decoded pre-recorded loop for `sound_id`. Takes effect the
    /// next time the sound is started.
    pub fn register_stream(&mut self, sound_id: &str, buffer: StereoBuffer) {
        self.streams.insert(sound_id.to_string(), Arc::new(buffer));
    }

    pub fn unregister_stream(&mut self, sound_id: &str) {
        self.streams.remove(sound_id);
    }

    /// Release every sound immediately and drop the context.
    pub fn close(&mut self) {
        if let Some(mut graph) = self.graph.take() {
            for sound in self.sounds.values_mut() {
                sound.teardown(&mut graph.ctx);
            }
            log::debug!("Audio context closed ({} nodes left)", graph.ctx.live_nodes());
        }
        self.sounds.clear();
        self.pending.clear();
    }

    // ── Queries ─────────────────────────────────────────────

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    pub fn context_state(&self) -> Option<ContextState> {
        self.graph.as_ref().map(|g| g.ctx.state())
    }

    /// Seconds rendered on the audio clock.
    pub fn current_time(&self) -> f64 {
        self.graph.as_ref().map_or(0.0, |g| g.ctx.current_time())
    }

    pub fn sound(&self, sound_id: &str) -> Option<&ActiveSound> {
        self.sounds.get(sound_id)
    }

    pub fn sound_state(&self, sound_id: &str) -> Option<SoundState> {
        self.sounds.get(sound_id).map(ActiveSound::state)
    }

    /// Starting or playing (not fading out).
    pub fn is_active(&self, sound_id: &str) -> bool {
        self.sound_state(sound_id)
            .is_some_and(|s| s != SoundState::Stopping)
    }

    /// Ids of starting or playing sounds, sorted.
    pub fn active_ids(&self) -> impl Iterator<Item = &str> {
        self.sounds
            .values()
            .filter(|s| s.state != SoundState::Stopping)
            .map(ActiveSound::sound_id)
    }

    pub fn active_count(&self) -> usize {
        self.active_ids().count()
    }

    /// Anything audible or about to be. Plain read, safe at any time.
    pub fn is_playing(&self) -> bool {
        self.active_count() > 0
    }

    /// Number of registered sounds, fading ones included.
    pub fn registered_count(&self) -> usize {
        self.sounds.len()
    }

    pub fn sound_volume(&self, sound_id: &str) -> Option<f64> {
        self.sounds.get(sound_id).map(ActiveSound::volume)
    }

    /// Current per-sound gain times current master gain.
    pub fn effective_level(&self, sound_id: &str) -> Option<f64> {
        let graph = self.graph.as_ref()?;
        let sound = self.sounds.get(sound_id)?;
        Some(sound.gain.value() * graph.bus.master_gain())
    }

    /// Master level the bus is heading to.
    pub fn master_volume(&self) -> f64 {
        self.master_volume
    }

    /// Nodes owned by registered sounds.
    pub fn node_count(&self) -> usize {
        self.sounds.values().map(ActiveSound::node_count).sum()
    }

    /// Nodes the context still considers live.
    pub fn live_nodes(&self) -> usize {
        self.graph.as_ref().map_or(0, |g| g.ctx.live_nodes())
    }

    pub fn pending_releases(&self) -> usize {
        self.pending.len()
    }
}
