use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, instrument};

use attrview::attributes::MapConstantPool;
use attrview::controller::Controller;
use attrview::domain::{AVError, ViewConfig};
use attrview::frame::{self, AttributeData, AttributeKind, FrameSource};
use attrview::logging;
use attrview::model::{Model, Status};
use attrview::rowindex::{RowIndexCache, SharedRowIndex};
use attrview::table::{AttributeSource, CachedAttributeTable};
use attrview::ui::TableUI;

/// A tui based viewer for class file attribute tables.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Attribute dump to show (csv, parquet or arrow)
    path: String,

    /// How the columns of the dump are interpreted
    #[arg(short, long, value_enum, default_value_t)]
    kind: AttributeKind,

    /// Constant pool dump with `index` and `value` columns
    #[arg(short = 'p', long)]
    constant_pool: Option<String>,

    #[arg(long, default_value_t = 40)]
    max_column_width: usize,

    /// Event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Defaults to attrview.log in the temp directory
    #[arg(long)]
    log_file: Option<String>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    match run() {
        Err(e) => {
            error!(error = %e, "attrview failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn expand_path(path: &str) -> Result<PathBuf, AVError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| AVError::InvalidValue(e.to_string()))
}

fn run() -> Result<(), AVError> {
    let cli = Cli::parse();

    let log_file = match cli.log_file.as_deref() {
        Some(path) => expand_path(path)?,
        None => std::env::temp_dir().join("attrview.log"),
    };
    logging::init(&log_file, &cli.log_level)?;
    info!("Starting attrview!");

    let config = ViewConfig::default()
        .with_event_poll_time(cli.poll_ms)
        .with_max_column_width(cli.max_column_width);

    let path = expand_path(&cli.path)?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("???")
        .to_string();

    let df = frame::load_frame(path)?;
    let pool = match cli.constant_pool.as_deref() {
        Some(p) => frame::constant_pool_from_frame(&frame::load_frame(expand_path(p)?)?)?,
        None => MapConstantPool::new(),
    };
    info!("Constant pool has {} entries", pool.len());

    let row_index = RowIndexCache::shared();
    match AttributeData::decode(cli.kind, &df)? {
        Some(data) => {
            let source = data.source(&pool);
            show(name, source.as_ref(), row_index, &config)
        }
        None => {
            let source = FrameSource::new(df, config.max_column_width)?;
            show(name, &source, row_index, &config)
        }
    }
}

#[instrument(skip_all, fields(name = %name))]
fn show(
    name: String,
    source: &dyn AttributeSource,
    row_index: SharedRowIndex,
    config: &ViewConfig,
) -> Result<(), AVError> {
    let table = CachedAttributeTable::new(source, row_index);

    let mut terminal = ratatui::init();
    let result = (|| -> Result<(), AVError> {
        let size = terminal.size()?;
        let mut model = Model::init(name, table, size.width as usize, size.height as usize);
        let mut ui = TableUI::new();
        let controller = Controller::new(config);

        while model.status != Status::QUITTING {
            // Render the current view
            terminal.draw(|f| ui.draw(&model, f))?;

            // Handle events and map to a Message
            if let Some(message) = controller.handle_event()? {
                model.update(message)?;
            }
        }
        Ok(())
    })();
    ratatui::restore();
    result
}
