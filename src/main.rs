use std::path::PathBuf;
use ytmusic::app::AppOptions;
use ytmusic::model::RepeatMode;

#[derive(Debug, Default)]
struct CliArgs {
    debug: bool,
    library: Option<PathBuf>,
    repeat: Option<RepeatMode>,
    shuffle: bool,
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1).collect())?;
    if let Some(path) = ytmusic::logging::init(args.debug)? {
        eprintln!("Debug log: {}", path.display());
    }

    ytmusic::app::run(AppOptions {
        library: args.library,
        repeat: args.repeat,
        shuffle: args.shuffle,
    })
}

fn parse_args(args: Vec<String>) -> anyhow::Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--debug" => out.debug = true,
            "--shuffle" => out.shuffle = true,
            "--library" => {
                index += 1;
                let Some(value) = args.get(index) else {
                    anyhow::bail!("--library requires a file path");
                };
                if value.trim().is_empty() {
                    anyhow::bail!("--library cannot be empty");
                }
                out.library = Some(PathBuf::from(value.trim()));
            }
            "--repeat" => {
                index += 1;
                out.repeat = Some(match args.get(index).map(String::as_str) {
                    Some("none" | "off") => RepeatMode::None,
                    Some("one") => RepeatMode::One,
                    Some("all") => RepeatMode::All,
                    _ => anyhow::bail!("--repeat expects none, one or all"),
                });
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument {other}"),
        }
        index += 1;
    }
    Ok(out)
}

fn print_help() {
    println!("ytmusic");
    println!("  --debug               Write a debug log under the config directory");
    println!("  --library <file>      JSON library of playlists and liked tracks");
    println!("  --repeat none|one|all Initial repeat mode");
    println!("  --shuffle             Start with shuffle on");
}
