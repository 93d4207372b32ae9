use std::{fs, path::Path};

use sampling::{SamplerDesc, TextureFormat};
use serde::{Deserialize, Serialize};

use crate::CliError;

/// Settings for a reference render, read from YAML. Every field is optional;
/// command line flags override the file.
///
/// ```yaml
/// format: rgba8_srgb
/// mip_levels: 4
/// width: 256
/// sampler:
///   min_filter: nearest
///   address_mode_u: clamp_to_edge
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    pub sampler: SamplerDesc,
    pub format: TextureFormat,
    /// Total mip levels including the base image, a full chain when absent.
    pub mip_levels: Option<u32>,
    /// Target extent, the texture's when absent.
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub clear: [f32; 4],
}

impl RenderConfig {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = fs::read_to_string(path).map_err(|err| CliError::Io {
            path: path.to_path_buf(),
            err,
        })?;
        let config: RenderConfig =
            serde_yaml::from_str(&text).map_err(|err| CliError::Config {
                path: path.to_path_buf(),
                err,
            })?;
        log::debug!("loaded {:?} from {:?}", config, path);
        Ok(config)
    }
}
