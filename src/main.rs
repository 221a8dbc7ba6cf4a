use clap::Parser;

/// Serves an RPG Maker MV game folder at a temporary local hostname
#[derive(Parser, Debug)]
#[command(name = "serve-mv")]
#[command(author = "bigbro")]
#[command(about = "Serve a game folder with case-insensitive paths", long_about = None)]
struct Args {
    #[arg(long)]
    #[arg(help = "serve this directory [default: current directory]")]
    #[arg(value_name = "DIR")]
    dir: Option<std::path::PathBuf>,

    #[arg(long)]
    #[arg(help = "the DNS domain to use [default: serve-mv.local]")]
    domain: Option<String>,

    #[arg(long)]
    #[arg(help = "the subdomain to use [default: generated from System.json gameTitle]")]
    subdomain: Option<String>,

    #[arg(long)]
    #[arg(help = "the network port to use [default: 9001]")]
    port: Option<u16>,

    #[arg(short)]
    #[arg(long)]
    #[arg(help = "path to a JSON configuration file")]
    #[arg(value_name = "FILE")]
    configuration: Option<String>,

    #[arg(long)]
    #[arg(help = "dump the configuration to file and exit")]
    #[arg(value_name = "OUT_FILE")]
    dump_configuration: Option<String>,
}

fn get_configuration(path: &Option<String>) -> smv::configuration::ServeConfiguration {
    match path {
        Some(path) => {
            let configuration = std::fs::read(path).expect("Configuration file not found");
            let configuration =
                String::from_utf8(configuration).expect("Could not decode the configuration file");
            serde_json::from_str(configuration.as_str()).expect("Invalid configuration file")
        }
        None => smv::configuration::ServeConfiguration::default(),
    }
}

fn apply_args(args: Args, configuration: &mut smv::configuration::ServeConfiguration) {
    if let Some(dir) = args.dir {
        configuration.game.directory = dir;
    }
    if let Some(domain) = args.domain {
        configuration.game.domain = domain;
    }
    if let Some(subdomain) = args.subdomain {
        configuration.game.subdomain = subdomain;
    }
    if let Some(port) = args.port {
        configuration.game.port = port;
    }
}

fn dump_configuration(path: &str, configuration: &smv::configuration::ServeConfiguration) {
    println!("Dumping configuration to {}", path);
    std::fs::write(
        path,
        serde_json::to_string_pretty(configuration).expect("Failed to serialize configuration"),
    )
    .expect("Failed to write configuration");
}

fn setup_logging(configuration: &smv::configuration::LoggingConfiguration) {
    let level = if configuration.enabled {
        configuration.level
    } else {
        log::LevelFilter::Off
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stdout)
        .init();
    log::info!("Logger initialized with level {:?}", level);
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut configuration = get_configuration(&args.configuration);
    let dump_path = args.dump_configuration.clone();
    apply_args(args, &mut configuration);

    setup_logging(&configuration.logging);

    if let Some(path) = dump_path {
        dump_configuration(&path, &configuration);
        return;
    }

    if let Err(e) = smv::serve(&configuration, None).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
