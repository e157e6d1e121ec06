//! Event input for the engine.

pub mod midi;

pub use midi::MidiEvent;
