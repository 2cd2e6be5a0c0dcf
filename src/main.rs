//! Prints a directory listing and then follows it live.
//!
//! Usage: `viewer-dirlist [--sort MODE] [--poll] [DIR]`

use log::{error, info};
use std::path::PathBuf;
use std::time::Duration;
use viewer_dirlist::{Config, DirectoryEvent, DirectoryManager, SortingMode, WatcherBackend};

const PUMP_INTERVAL: Duration = Duration::from_millis(200);

struct Args {
    directory: PathBuf,
    sorting_mode: SortingMode,
    poll: bool,
}

fn parse_args() -> Result<Args, Box<dyn std::error::Error>> {
    let mut directory = None;
    let mut sorting_mode = SortingMode::default();
    let mut poll = false;

    let mut args = std::env::args_os().skip(1);
    while let Some(arg) = args.next() {
        let arg_str = arg.to_string_lossy().into_owned();
        match arg_str.as_str() {
            "--sort" => {
                let value = args.next().ok_or("--sort needs a value")?;
                sorting_mode = value.to_string_lossy().parse()?;
            }
            "--poll" => poll = true,
            flag if flag.starts_with('-') => return Err(format!("unknown option {}", flag).into()),
            _ => directory = Some(PathBuf::from(arg)),
        }
    }

    Ok(Args {
        directory: match directory {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        },
        sorting_mode,
        poll,
    })
}

fn describe(event: &DirectoryEvent) -> String {
    match event {
        DirectoryEvent::Loaded(path) => format!("loaded {}", path.display()),
        DirectoryEvent::SortingChanged => "sorting changed".to_string(),
        DirectoryEvent::FileAdded(name) => format!("+ {}", name),
        DirectoryEvent::FileRemoved { name, index } => format!("- {} (was #{})", name, index),
        DirectoryEvent::FileModified(name) => format!("~ {}", name),
        DirectoryEvent::FileRenamed {
            from,
            index_from,
            to,
            index_to,
        } => format!("{} (#{}) -> {} (#{})", from, index_from, to, index_to),
        DirectoryEvent::FileMoved { name, from, to } => {
            format!("{} moved #{} -> #{}", name, from, to)
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(debug_assertions)]
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .init();
    #[cfg(not(debug_assertions))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;
    let mut config = Config {
        sorting_mode: args.sorting_mode,
        ..Config::default()
    };
    if args.poll {
        config.watcher.backend = WatcherBackend::Poll;
    }

    let mut manager = DirectoryManager::new(&config)?;
    let events = manager.subscribe();

    if !manager.set_directory(&args.directory) {
        error!("Cannot open {}", args.directory.display());
        std::process::exit(1);
    }

    for (index, entry) in manager.entries().enumerate() {
        println!("{:>5}  {:>10}  {}", index, entry.size, entry.name);
    }
    info!("{} files, watching for changes (Ctrl-C to quit)", manager.file_count());

    loop {
        manager.process_pending_events();
        for event in events.try_iter() {
            info!("{}", describe(&event));
        }
        std::thread::sleep(PUMP_INTERVAL);
    }
}
