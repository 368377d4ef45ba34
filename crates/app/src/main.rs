use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use catalog_application::{AppContext, Controller};
use catalog_core::Settings;
use catalog_storage::Storage;
use catalog_ui::Ui;
use directories::ProjectDirs;

const DATA_ENV: &str = "CATALOG_DATA";

#[derive(Debug, Default)]
struct Args {
    data: Option<PathBuf>,
    export_html: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = parse_args()?;

    let project_dirs =
        ProjectDirs::from("dev", "catalog", "catalog").context("resolve project dirs")?;

    let config_dir = project_dirs.config_dir();
    fs::create_dir_all(config_dir)
        .with_context(|| format!("create config dir {}", config_dir.display()))?;

    init_logging(project_dirs.data_dir(), args.export_html)?;

    let db_path = config_dir.join("catalog.db");
    let storage = Storage::open(&db_path)?;
    let settings = resolve_settings(storage.load_settings()?, &args);

    let ctx = AppContext::new(settings);
    let ctx = match catalog_storage::load_catalog(&ctx.settings.data_path) {
        Ok(catalog) => ctx.with_catalog(catalog),
        Err(err) => {
            log::error!("{err:#}");
            ctx.with_load_error(format!("{err:#}"))
        }
    };

    let mut controller = Controller::new(ctx, storage);
    if let Err(err) = controller.restore() {
        log::warn!("{err:#}");
    }

    if args.export_html {
        let html = controller.ctx().render().to_html();
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(html.as_bytes()).context("write html")?;
        stdout.flush().context("flush stdout")?;
        return Ok(());
    }

    let mut ui = Ui::new(controller);
    ui.run()
}

fn parse_args() -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    let mut args = std::env::args_os().skip(1);
    while let Some(arg) = args.next() {
        let arg_str = arg.to_string_lossy();
        match arg_str.as_ref() {
            "--data" => {
                let value = args.next().context("missing value for --data")?;
                parsed.data = Some(PathBuf::from(value));
            }
            "--export-html" => parsed.export_html = true,
            other => anyhow::bail!("unknown arg: {other}"),
        }
    }
    Ok(parsed)
}

/// Stored setting, then `CATALOG_DATA`, then `--data`.
fn resolve_settings(mut settings: Settings, args: &Args) -> Settings {
    if let Some(value) = std::env::var_os(DATA_ENV)
        && !value.is_empty()
    {
        settings.data_path = value.to_string_lossy().to_string();
    }
    if let Some(path) = &args.data {
        settings.data_path = path.to_string_lossy().to_string();
    }
    settings.normalize();
    settings
}

fn init_logging(data_dir: &Path, to_stderr: bool) -> anyhow::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if !to_stderr {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("create data dir {}", data_dir.display()))?;
        let log_path = data_dir.join("catalog.log");
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("open log file {}", log_path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.try_init().context("init logger")?;
    Ok(())
}
