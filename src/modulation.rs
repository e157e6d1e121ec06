//! Modulation source registry and routing matrix.
//!
//! Every named modulation signal (LFOs, envelopes, MIDI expression) registers
//! here and gets a stable [`ModSrcId`]. Sources are either *mono* (one scalar
//! shared by the whole engine) or *poly* (one scalar per voice slot).
//! Parameters register as destinations with an explicit poly/mono flag, and
//! any source can be connected to any destination with a depth expressed in
//! raw parameter units.
//!
//! Resolution happens at block rate. Within one sub-block the driver calls
//! `begin_block`, updates all mono sources, lets each voice update its poly
//! sources and read `value_for_voice`, then calls `finish_block` exactly
//! once. `finish_block` also advances every registered parameter's smoothing
//! ramp, so it must not be skipped even when no voice is active.

use std::sync::Arc;

use crate::error::SynthError;
use crate::params::{Parameter, UNREGISTERED};
use crate::MAX_VOICES;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable handle for a registered modulation source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModSrcId(pub(crate) usize);

struct SourceInfo {
    id: String,
    name: String,
    poly: bool,
    /// Natural range is [-1, 1] rather than [0, 1]. Only metadata for
    /// external depth editors, never enforced here.
    bipolar: bool,
}

#[derive(Debug, Clone, Copy)]
struct Connection {
    src: ModSrcId,
    depth: f32,
}

/// Serializable snapshot of the live connection wiring. The persistence
/// format itself belongs to an external owner; this is just the exchange
/// type for both directions of the sync.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModWiring {
    pub routes: Vec<WiringRoute>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct WiringRoute {
    pub source: String,
    pub dest: String,
    pub depth: f32,
}

/// The modulation matrix: source registry, destination table, and per-block
/// value resolution.
pub struct ModMatrix {
    sources: Vec<SourceInfo>,
    /// One slot for mono sources, `MAX_VOICES` slots for poly sources.
    /// Allocated once in `build`, never resized afterwards.
    values: Vec<Box<[f32]>>,

    params: Vec<Arc<Parameter>>,
    poly_dest: Vec<bool>,
    connections: Vec<Vec<Connection>>,

    sample_rate: f32,
    built: bool,
    block_active: bool,
}

impl ModMatrix {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            values: Vec::new(),
            params: Vec::new(),
            poly_dest: Vec::new(),
            connections: Vec::new(),
            sample_rate: 44_100.0,
            built: false,
            block_active: false,
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    //==================================================================
    // Registration. All of this happens before `build`; afterwards the
    // tables are frozen for the lifetime of the engine.

    pub fn add_mono_source(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        bipolar: bool,
    ) -> ModSrcId {
        self.add_source(id.into(), name.into(), false, bipolar)
    }

    pub fn add_poly_source(
        &mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        bipolar: bool,
    ) -> ModSrcId {
        self.add_source(id.into(), name.into(), true, bipolar)
    }

    fn add_source(&mut self, id: String, name: String, poly: bool, bipolar: bool) -> ModSrcId {
        debug_assert!(!self.built, "sources must be registered before build()");
        self.sources.push(SourceInfo {
            id,
            name,
            poly,
            bipolar,
        });
        ModSrcId(self.sources.len() - 1)
    }

    /// Register a parameter as a modulation destination. `poly` decides
    /// whether per-voice resolution applies; it is an explicit flag on
    /// every destination, independent of registration order.
    pub fn add_parameter(&mut self, param: &Arc<Parameter>, poly: bool) {
        debug_assert!(!self.built, "destinations must be registered before build()");
        param.set_mod_index(self.params.len());
        self.params.push(Arc::clone(param));
        self.poly_dest.push(poly);
        self.connections.push(Vec::new());
    }

    /// Freeze the source/destination tables and allocate value storage.
    /// Must be called exactly once, after registration, before any value
    /// query.
    pub fn build(&mut self) -> Result<(), SynthError> {
        if self.built {
            return Err(SynthError::AlreadyBuilt);
        }
        self.values = self
            .sources
            .iter()
            .map(|s| {
                let slots = if s.poly { MAX_VOICES } else { 1 };
                vec![0.0; slots].into_boxed_slice()
            })
            .collect();
        self.built = true;
        log::debug!(
            "mod matrix built: {} sources, {} destinations",
            self.sources.len(),
            self.params.len()
        );
        Ok(())
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn num_sources(&self) -> usize {
        self.sources.len()
    }

    pub fn source_name(&self, src: ModSrcId) -> &str {
        &self.sources[src.0].name
    }

    pub fn source_is_bipolar(&self, src: ModSrcId) -> bool {
        self.sources[src.0].bipolar
    }

    pub fn find_source(&self, id: &str) -> Option<ModSrcId> {
        self.sources.iter().position(|s| s.id == id).map(ModSrcId)
    }

    //==================================================================
    // Connections

    /// Connect `src` into `param` with `depth` in raw parameter units per
    /// unit of source value.
    pub fn add_connection(
        &mut self,
        src: ModSrcId,
        param: &Arc<Parameter>,
        depth: f32,
    ) -> Result<(), SynthError> {
        let dst = param.mod_index();
        if dst == UNREGISTERED {
            return Err(SynthError::UnregisteredParameter(param.id().to_string()));
        }
        // A second connection from the same source replaces the depth.
        if let Some(c) = self.connections[dst].iter_mut().find(|c| c.src == src) {
            c.depth = depth;
        } else {
            self.connections[dst].push(Connection { src, depth });
        }
        Ok(())
    }

    pub fn remove_connection(&mut self, src: ModSrcId, param: &Arc<Parameter>) {
        let dst = param.mod_index();
        if dst != UNREGISTERED {
            self.connections[dst].retain(|c| c.src != src);
        }
    }

    pub fn clear_connections(&mut self) {
        for conns in &mut self.connections {
            conns.clear();
        }
    }

    /// Export the live wiring for an external persistence owner.
    pub fn wiring(&self) -> ModWiring {
        let mut routes = Vec::new();
        for (dst, conns) in self.connections.iter().enumerate() {
            for c in conns {
                routes.push(WiringRoute {
                    source: self.sources[c.src.0].id.clone(),
                    dest: self.params[dst].id().to_string(),
                    depth: c.depth,
                });
            }
        }
        ModWiring { routes }
    }

    /// Replace the live wiring from a persisted snapshot. Unknown source or
    /// parameter ids fail the whole load so a half-applied patch never
    /// plays.
    pub fn apply_wiring(&mut self, wiring: &ModWiring) -> Result<(), SynthError> {
        let mut resolved = Vec::with_capacity(wiring.routes.len());
        for route in &wiring.routes {
            let src = self
                .find_source(&route.source)
                .ok_or_else(|| SynthError::UnknownSource(route.source.clone()))?;
            let dst = self
                .params
                .iter()
                .position(|p| p.id() == route.dest)
                .ok_or_else(|| SynthError::UnknownParameter(route.dest.clone()))?;
            resolved.push((src, dst, route.depth));
        }

        self.clear_connections();
        for (src, dst, depth) in resolved {
            self.connections[dst].push(Connection { src, depth });
        }
        log::debug!("mod wiring loaded: {} routes", wiring.routes.len());
        Ok(())
    }

    //==================================================================
    // Block-rate source updates

    pub fn set_mono_value(&mut self, src: ModSrcId, value: f32) {
        debug_assert!(self.built);
        debug_assert!(!self.sources[src.0].poly, "mono write to poly source");
        self.values[src.0][0] = value;
    }

    pub fn set_poly_value(&mut self, voice: usize, src: ModSrcId, value: f32) {
        debug_assert!(self.built);
        debug_assert!(self.sources[src.0].poly, "poly write to mono source");
        self.values[src.0][voice] = value;
    }

    pub fn mono_value(&self, src: ModSrcId) -> f32 {
        self.values[src.0][0]
    }

    pub fn poly_value(&self, voice: usize, src: ModSrcId) -> f32 {
        self.values[src.0][voice]
    }

    /// Mark the start of a sub-block. Mono sources must be fully updated
    /// between this call and the first `value_for_voice` of the sub-block.
    pub fn begin_block(&mut self) {
        debug_assert!(self.built, "begin_block before build()");
        self.block_active = true;
    }

    /// Advance per-block accounting (parameter smoothing ramps) and close
    /// the sub-block. Exactly once per sub-block, after all voices rendered.
    pub fn finish_block(&mut self, num_samples: usize) {
        for p in &self.params {
            p.smooth(num_samples, self.sample_rate);
        }
        self.block_active = false;
    }

    /// Snap every registered parameter's smoothing ramp to its target.
    pub fn snap_params(&self) {
        for p in &self.params {
            p.snap();
        }
    }

    //==================================================================
    // Value resolution

    /// Resolved value in the mono (global) context: base smoothed raw value
    /// plus mono-source contributions, clamped to the range, conversion
    /// applied last.
    pub fn value(&self, param: &Parameter) -> f32 {
        debug_assert!(self.built, "value() before build()");
        let dst = param.mod_index();
        if dst == UNREGISTERED {
            return param.proc_value();
        }

        let mut raw = param.current_value();
        for c in &self.connections[dst] {
            if !self.sources[c.src.0].poly {
                raw += c.depth * self.values[c.src.0][0];
            }
        }
        param.convert(param.range().clamp(raw))
    }

    /// Resolved value in a specific voice's context: mono contributions plus
    /// that voice's poly-source values. Only valid between `begin_block` and
    /// `finish_block`.
    pub fn value_for_voice(&self, voice: usize, param: &Parameter) -> f32 {
        debug_assert!(self.built, "value_for_voice() before build()");
        debug_assert!(
            self.block_active,
            "value_for_voice() outside begin_block/finish_block"
        );
        let dst = param.mod_index();
        if dst == UNREGISTERED {
            return param.proc_value();
        }

        let mut raw = param.current_value();
        for c in &self.connections[dst] {
            let info = &self.sources[c.src.0];
            let v = if info.poly {
                self.values[c.src.0][voice]
            } else {
                self.values[c.src.0][0]
            };
            raw += c.depth * v;
        }
        param.convert(param.range().clamp(raw))
    }

    /// Whether this destination resolves per voice.
    pub fn is_poly_dest(&self, param: &Parameter) -> bool {
        let dst = param.mod_index();
        dst != UNREGISTERED && self.poly_dest[dst]
    }
}

impl Default for ModMatrix {
    fn default() -> Self {
        Self::new()
    }
}
