use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use glam::Vec4;
use logger::LogLevel;
use render::{
    draw, DescriptorBindings, FragmentStage, InterfaceContract, RenderError, RenderTarget,
    StageInterface, Varyings,
};
use sampling::{SamplingError, Texture2d};
use structopt::StructOpt;

mod config;

use config::RenderConfig;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Render(#[from] RenderError),

    #[error("texture error {0}")]
    Texture(#[from] SamplingError),

    #[error("error reading or writing image at {path:?} ({err})")]
    Image {
        path: PathBuf,
        err: image::ImageError,
    },

    #[error("error reading {path:?} ({err})")]
    Io { path: PathBuf, err: std::io::Error },

    #[error("invalid config at {path:?} ({err})")]
    Config {
        path: PathBuf,
        err: serde_yaml::Error,
    },
}

#[derive(StructOpt, Debug)]
#[structopt(name = "texshade", about = "Textured fragment stage tooling")]
struct Opts {
    /// One of error, warn, info, debug, trace.
    #[structopt(long, default_value = "info", global = true)]
    log_level: LogLevel,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt, Debug)]
enum Command {
    /// Print the interface of a compiled fragment shader and check it against
    /// the layout the host binds.
    Inspect {
        #[structopt(parse(from_os_str))]
        spv: PathBuf,
    },
    /// Check that a vertex shader writes every varying a fragment shader reads.
    Link {
        #[structopt(parse(from_os_str))]
        vertex: PathBuf,
        #[structopt(parse(from_os_str))]
        fragment: PathBuf,
    },
    /// Draw a texture across a full screen pass with the CPU reference stage.
    Render(RenderOpts),
}

#[derive(StructOpt, Debug, Default)]
struct RenderOpts {
    #[structopt(long, parse(from_os_str))]
    texture: PathBuf,

    /// Written as 8 bit sRGB or unorm, or as 32 bit float for `.exr`.
    #[structopt(long, parse(from_os_str))]
    out: PathBuf,

    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    #[structopt(long)]
    width: Option<u32>,

    #[structopt(long)]
    height: Option<u32>,

    /// Total mip levels to generate.
    #[structopt(long)]
    mips: Option<u32>,

    /// Encode the output with the sRGB transfer function even when the
    /// texture format is linear.
    #[structopt(long)]
    srgb: bool,
}

fn main() {
    let opts = Opts::from_args();
    if let Err(err) = logger::init(opts.log_level) {
        eprintln!("unable to install logger: {}", err);
    }

    let result = match opts.cmd {
        Command::Inspect { spv } => inspect(&spv),
        Command::Link { vertex, fragment } => link(&vertex, &fragment),
        Command::Render(render_opts) => render_to_file(&render_opts),
    };
    if let Err(err) = result {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

fn inspect(spv: &Path) -> Result<(), CliError> {
    let interface = StageInterface::read_file(spv)?;
    println!(
        "{:?} stage, entry point {:?}",
        interface.stage, interface.entry_point
    );
    for binding in &interface.bindings {
        println!(
            "  set {} binding {}: {:?} {}",
            binding.set, binding.binding, binding.kind, binding.name
        );
    }
    for input in &interface.inputs {
        println!("  in  {}: {:?} {}", input.location, input.format, input.name);
    }
    for output in &interface.outputs {
        println!("  out {}: {:?} {}", output.location, output.format, output.name);
    }
    InterfaceContract::textured_fragment().validate(&interface)?;
    log::info!("{:?} matches the textured fragment layout", spv);
    Ok(())
}

fn link(vertex: &Path, fragment: &Path) -> Result<(), CliError> {
    let vertex_interface = StageInterface::read_file(vertex)?;
    let fragment_interface = StageInterface::read_file(fragment)?;
    InterfaceContract::fullscreen_vertex().validate(&vertex_interface)?;
    InterfaceContract::textured_fragment().validate(&fragment_interface)?;
    render::validate_linkage(&vertex_interface, &fragment_interface)?;
    log::info!("{:?} links with {:?}", vertex, fragment);
    Ok(())
}

/// Loads the config file, if any, and applies command line overrides.
fn resolve_config(opts: &RenderOpts) -> Result<RenderConfig, CliError> {
    let mut config = match &opts.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };
    if opts.width.is_some() {
        config.width = opts.width;
    }
    if opts.height.is_some() {
        config.height = opts.height;
    }
    if opts.mips.is_some() {
        config.mip_levels = opts.mips;
    }
    Ok(config)
}

fn load_texture(path: &Path, config: &RenderConfig) -> Result<Texture2d, CliError> {
    let image = image::open(path).map_err(|err| CliError::Image {
        path: path.to_path_buf(),
        err,
    })?;
    let mut texture = Texture2d::from_image(&image, config.format)?;
    texture.generate_mips(config.mip_levels);
    log::debug!(
        "loaded {:?}: {} levels, base {}",
        path,
        texture.level_count(),
        texture.extent(0)
    );
    Ok(texture)
}

fn render_texture(texture: Texture2d, config: &RenderConfig) -> Result<RenderTarget, CliError> {
    let extent = texture.extent(0);
    let width = config.width.unwrap_or(extent.x);
    let height = config.height.unwrap_or(extent.y);

    let mut bindings = DescriptorBindings::for_textured_fragment();
    bindings.bind_sampler(shader_objects::SAMPLER_BINDING, config.sampler)?;
    bindings.bind_texture(shader_objects::TEXTURE_BINDING, Arc::new(texture))?;
    let stage = FragmentStage::from_bindings(&bindings)?;

    let mut target = RenderTarget::with_clear(width, height, Vec4::from_array(config.clear))?;
    draw(&stage, &Varyings::fullscreen(), &mut target);
    Ok(target)
}

fn render_to_file(opts: &RenderOpts) -> Result<(), CliError> {
    let config = resolve_config(opts)?;
    let texture = load_texture(&opts.texture, &config)?;
    let target = render_texture(texture, &config)?;

    let is_exr = opts
        .out
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("exr"));
    let saved = if is_exr {
        target.to_rgba32f().save(&opts.out)
    } else {
        let encode_srgb = opts.srgb || config.format.is_srgb();
        target.to_rgba8(encode_srgb).save(&opts.out)
    };
    saved.map_err(|err| CliError::Image {
        path: opts.out.clone(),
        err,
    })?;
    log::info!(
        "wrote {}x{} render to {:?}",
        target.width,
        target.height,
        opts.out
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};
    use sampling::TextureFormat;
    use tempdir::TempDir;

    use super::*;

    fn write_checker(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("checker.png");
        let image = RgbaImage::from_fn(4, 4, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        image.save(&path).unwrap();
        path
    }

    fn opts(dir: &TempDir, texture: PathBuf) -> RenderOpts {
        RenderOpts {
            texture,
            out: dir.path().join("out.png"),
            ..Default::default()
        }
    }

    #[test]
    fn renders_texture_at_its_own_size() {
        let dir = TempDir::new("texshade").unwrap();
        let texture = write_checker(&dir);
        let mut opts = opts(&dir, texture.clone());
        let config = dir.path().join("render.yaml");
        std::fs::write(
            &config,
            "sampler:\n  mag_filter: nearest\n  min_filter: nearest\n  mipmap_mode: nearest\n",
        )
        .unwrap();
        opts.config = Some(config);

        render_to_file(&opts).unwrap();

        let input = image::open(&texture).unwrap().to_rgba8();
        let output = image::open(&opts.out).unwrap().to_rgba8();
        assert_eq!(input, output);
    }

    #[test]
    fn flags_override_config() {
        let dir = TempDir::new("texshade").unwrap();
        let config_path = dir.path().join("render.yaml");
        std::fs::write(&config_path, "width: 16\nheight: 16\nmip_levels: 3\n").unwrap();
        let mut opts = opts(&dir, PathBuf::new());
        opts.config = Some(config_path);
        opts.width = Some(2);

        let config = resolve_config(&opts).unwrap();
        assert_eq!(config.width, Some(2));
        assert_eq!(config.height, Some(16));
        assert_eq!(config.mip_levels, Some(3));
    }

    #[test]
    fn downscaled_render_averages_the_checker() {
        let dir = TempDir::new("texshade").unwrap();
        let texture = write_checker(&dir);
        let config = RenderConfig {
            format: TextureFormat::Rgba8Unorm,
            width: Some(1),
            height: Some(1),
            ..Default::default()
        };
        let texture = load_texture(&texture, &config).unwrap();
        let target = render_texture(texture, &config).unwrap();
        let pixel = target.pixel(0, 0);
        assert!((pixel.x - 0.5).abs() < 1e-5, "{pixel:?}");
    }

    #[test]
    fn missing_texture_reports_its_path() {
        let dir = TempDir::new("texshade").unwrap();
        let opts = opts(&dir, dir.path().join("nope.png"));
        match render_to_file(&opts) {
            Err(CliError::Image { path, .. }) => assert_eq!(path, opts.texture),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bad_config_is_rejected() {
        let dir = TempDir::new("texshade").unwrap();
        let config = dir.path().join("render.yaml");
        std::fs::write(&config, "sampler:\n  min_lod: 4.0\n  max_lod: 1.0\n").unwrap();
        let texture = write_checker(&dir);
        let mut opts = opts(&dir, texture);
        opts.config = Some(config);
        assert!(matches!(
            render_to_file(&opts),
            Err(CliError::Render(RenderError::Sampling(
                SamplingError::LodRangeInverted { .. }
            )))
        ));
    }

    #[test]
    fn inspect_rejects_non_spirv() {
        let dir = TempDir::new("texshade").unwrap();
        let path = dir.path().join("garbage.spv");
        std::fs::write(&path, [0u8; 7]).unwrap();
        assert!(matches!(
            inspect(&path),
            Err(CliError::Render(RenderError::ShaderRead(_)))
        ));
    }
}
