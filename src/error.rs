use thiserror::Error;

/// Setup-time failures. The render path itself never returns `Result`;
/// everything here can only happen while wiring the engine together.
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("modulation matrix has already been built")]
    AlreadyBuilt,

    #[error("unknown modulation source `{0}`")]
    UnknownSource(String),

    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),

    #[error("parameter `{0}` is not registered as a modulation destination")]
    UnregisteredParameter(String),
}
