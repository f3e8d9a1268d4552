//! Speech output ports
//!
//! - [`AzureSpeechSynthesizer`]: SSML to Azure Speech REST, played on the speaker
//! - [`ConsoleSpeechOutput`]: replies printed instead of spoken

mod azure;
mod console;

pub use azure::{build_ssml, AzureSpeechSynthesizer, AzureTtsConfig};
pub use console::ConsoleSpeechOutput;
