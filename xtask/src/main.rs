use std::io::BufRead;
use std::path::PathBuf;

use duct::cmd;
use structopt::StructOpt;

const FRAGMENT_SPV: &str = "assets/shaders/textured_fragment.spv";
const VERTEX_SPV: &str = "assets/shaders/fullscreen_vertex.spv";

#[derive(StructOpt, Debug)]
enum Command {
    FmtLint,
    BuildShaders,
    /// Checks the built shaders against the host layout with `texshade`.
    InspectShaders,
    BuildAll,
}

#[derive(StructOpt)]
struct Opts {
    #[structopt(subcommand)]
    cmd: Option<Command>,
}

macro_rules! ok {
    ($($arg:tt)*) => {
        use colorful::Colorful;
        println!("{}", format!($($arg)*).color(colorful::Color::Green))
     };
}

macro_rules! tool {
    ($($arg:tt)*) => {
        use colorful::Colorful;
        println!("{}", format!($($arg)*).color(colorful::Color::DarkGray))
     };
}

fn main() {
    std::env::set_var("RUST_BACKTRACE", "full");
    let opts = Opts::from_args();
    let result = match opts.cmd {
        Some(Command::FmtLint) => fmt_and_lint(),
        Some(Command::BuildShaders) => build_shaders(),
        Some(Command::InspectShaders) => inspect_shaders(),
        Some(Command::BuildAll) => fmt_and_lint()
            .and_then(|_| build_shaders())
            .and_then(|_| inspect_shaders()),
        None => {
            println!("No command given.");
            Ok(())
        }
    };
    if let Err(err) = result {
        eprintln!("xtask failed: {}", err);
        std::process::exit(1);
    }
}

fn fmt_and_lint() -> Result<(), std::io::Error> {
    cmd!("cargo", "+nightly", "fmt").run()?;
    cmd!("cargo", "clippy", "--workspace").run()?;
    Ok(())
}

fn build_shaders() -> Result<(), std::io::Error> {
    // the shader workspace targets spirv through rustc_codegen_spirv and is kept
    // out of the host workspace, so it is built as its own project.
    cmd!("cargo", "build").dir("assets/shaders").run()?;
    ok!("Shaders compiled to spirv");
    Ok(())
}

fn texshade(args: &[&str]) -> Result<(), std::io::Error> {
    let mut full = vec!["run", "--quiet", "--bin", "texshade", "--"];
    full.extend_from_slice(args);
    let reader = cmd("cargo", full).stderr_to_stdout().reader()?;
    for line in std::io::BufReader::new(&reader).lines() {
        tool!("texshade: {}", line?);
    }
    Ok(())
}

fn inspect_shaders() -> Result<(), std::io::Error> {
    for spv in [FRAGMENT_SPV, VERTEX_SPV] {
        if !PathBuf::from(spv).exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is missing, run build-shaders first", spv),
            ));
        }
    }
    texshade(&["inspect", FRAGMENT_SPV])?;
    texshade(&["link", VERTEX_SPV, FRAGMENT_SPV])?;
    ok!("Shaders match the host layout");
    Ok(())
}
