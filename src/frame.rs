use polars::prelude::*;
use rayon::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::attributes::{
    ConstantPool, ExceptionTableEntry, ExceptionTableSource, ExceptionsSource, LineNumberEntry,
    LineNumberTableSource, LocalVariableEntry, LocalVariableTableSource, MapConstantPool,
};
use crate::domain::{AVError, CellValue, ColumnType};
use crate::table::AttributeSource;

pub const COLUMN_WIDTH_MARGIN: usize = 2;
pub const NULL_VALUE: &str = "∅";

#[derive(Debug, Clone, Copy, PartialEq)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    file_type: FileType,
}

/// How the columns of a loaded dump are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum AttributeKind {
    /// Show the dump as it is
    #[default]
    Raw,
    ExceptionTable,
    LineNumberTable,
    LocalVariableTable,
    Exceptions,
}

fn detect_file_type(path: &Path) -> Result<FileType, AVError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(AVError::UnknownFileType),
    }
}

pub fn get_file_info(path: PathBuf) -> Result<FileInfo, AVError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => AVError::FileNotFound,
        ErrorKind::PermissionDenied => AVError::PermissionDenied,
        _ => AVError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(AVError::LoadingFailed("Not a file!".into()));
    }

    let file_type = detect_file_type(&path)?;

    Ok(FileInfo {
        path,
        file_size: metadata.len(),
        file_type,
    })
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

/// Reads a CSV, Parquet or Arrow IPC file into memory.
pub fn load_frame(path: PathBuf) -> Result<DataFrame, AVError> {
    let file_info = get_file_info(path)?;
    let start_time = Instant::now();
    let frame = match file_info.file_type {
        FileType::CSV => load_csv(&file_info.path)?,
        FileType::PARQUET => load_parquet(&file_info.path)?,
        FileType::ARROW => load_arrow(&file_info.path)?,
    };
    let df = frame.collect()?;
    info!(
        "Loaded {:?} ({} bytes, {} rows) in {}ms",
        file_info.path,
        file_info.file_size,
        df.height(),
        start_time.elapsed().as_millis()
    );
    Ok(df)
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn clamp_width(width: usize) -> u16 {
    u16::try_from(width).unwrap_or(u16::MAX)
}

fn display_value(value: &AnyValue) -> String {
    match value.get_str() {
        Some(s) => s.replace("\r\n", " ↵ ").replace('\n', " ↵ "),
        None => value.to_string(),
    }
}

/// A data frame shown as attribute data, one frame column per logical column.
///
/// Cell values are read from the frame when requested. Only the column widths
/// are computed up front.
pub struct FrameSource {
    df: DataFrame,
    names: Vec<String>,
    types: Vec<ColumnType>,
    widths: Vec<u16>,
    index_width: u16,
}

impl FrameSource {
    pub fn new(df: DataFrame, max_column_width: usize) -> Result<Self, AVError> {
        let start_time = Instant::now();
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let types = df
            .get_columns()
            .iter()
            .map(|c| {
                if is_numeric_type(c.dtype()) {
                    ColumnType::Number
                } else {
                    ColumnType::Text
                }
            })
            .collect();

        // Each column is measured in its own thread.
        let widths: Result<Vec<u16>, PolarsError> = names
            .par_iter()
            .map(|name| Self::measure_column(&df, name, max_column_width))
            .collect();
        let widths = widths?;
        debug!(
            "Measured {} columns in {}ms: {:?}",
            widths.len(),
            start_time.elapsed().as_millis(),
            widths
        );

        let index_width =
            clamp_width((df.height().max(1).to_string().len() + COLUMN_WIDTH_MARGIN).max(4));

        Ok(Self {
            df,
            names,
            types,
            widths,
            index_width,
        })
    }

    pub fn load(path: PathBuf, max_column_width: usize) -> Result<Self, AVError> {
        Self::new(load_frame(path)?, max_column_width)
    }

    fn measure_column(
        df: &DataFrame,
        col_name: &str,
        max_column_width: usize,
    ) -> Result<u16, PolarsError> {
        let col = df.column(col_name)?.cast(&DataType::String)?;
        let series = col.str()?;
        let max_width = series
            .into_iter()
            .map(|value| value.map(|s| s.chars().count()).unwrap_or(1))
            .max()
            .unwrap_or(0);
        let width = std::cmp::max(col_name.chars().count(), max_width) + COLUMN_WIDTH_MARGIN;
        Ok(clamp_width(std::cmp::min(width, max_column_width)))
    }
}

impl AttributeSource for FrameSource {
    fn row_count(&self) -> usize {
        self.df.height()
    }

    fn column_count(&self) -> usize {
        self.df.width()
    }

    fn value_at(&self, row: usize, column: usize) -> CellValue {
        let col = &self.df.get_columns()[column];
        match col.get(row) {
            Ok(AnyValue::Null) => CellValue::text(NULL_VALUE),
            Ok(value) if col.dtype().is_integer() => match value.extract::<i64>() {
                Some(n) => CellValue::Number(n),
                None => CellValue::text(display_value(&value)),
            },
            Ok(value) => CellValue::text(display_value(&value)),
            Err(e) => {
                debug!("No value at row {row}, column {column}: {e}");
                CellValue::text(NULL_VALUE)
            }
        }
    }

    fn column_name(&self, column: usize) -> String {
        self.names[column].clone()
    }

    fn column_type(&self, column: usize) -> ColumnType {
        self.types[column]
    }

    fn column_width(&self, column: usize) -> u16 {
        if column == 0 {
            self.index_width
        } else {
            self.widths[column - 1]
        }
    }
}

fn u16_column(df: &DataFrame, name: &str) -> Result<Vec<u16>, AVError> {
    let col = df
        .column(name)
        .map_err(|_| AVError::MissingColumn(name.to_string()))?
        .cast(&DataType::Int64)?;
    col.i64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(v) => u16::try_from(v)
                .map_err(|_| AVError::InvalidValue(format!("{name}[{row}] = {v} is not a u16"))),
            None => Err(AVError::InvalidValue(format!("{name}[{row}] is empty"))),
        })
        .collect()
}

/// Reads a constant pool dump with an `index` and a `value` column.
pub fn constant_pool_from_frame(df: &DataFrame) -> Result<MapConstantPool, AVError> {
    let indices = u16_column(df, "index")?;
    let values = df
        .column("value")
        .map_err(|_| AVError::MissingColumn("value".to_string()))?
        .cast(&DataType::String)?;
    let values = values.str()?;
    Ok(indices
        .into_iter()
        .zip(values.into_iter())
        .map(|(idx, value)| (idx, value.unwrap_or(NULL_VALUE).to_string()))
        .collect())
}

/// Attribute entries decoded from a typed dump.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeData {
    ExceptionTable(Vec<ExceptionTableEntry>),
    LineNumberTable(Vec<LineNumberEntry>),
    LocalVariableTable(Vec<LocalVariableEntry>),
    Exceptions(Vec<u16>),
}

impl AttributeData {
    /// Decodes `df` as `kind`. Returns `None` for [`AttributeKind::Raw`].
    pub fn decode(kind: AttributeKind, df: &DataFrame) -> Result<Option<Self>, AVError> {
        let data = match kind {
            AttributeKind::Raw => return Ok(None),
            AttributeKind::ExceptionTable => {
                let start = u16_column(df, "start_pc")?;
                let end = u16_column(df, "end_pc")?;
                let handler = u16_column(df, "handler_pc")?;
                let catch = u16_column(df, "catch_type")?;
                AttributeData::ExceptionTable(
                    (0..start.len())
                        .map(|i| ExceptionTableEntry {
                            start_pc: start[i],
                            end_pc: end[i],
                            handler_pc: handler[i],
                            catch_type: catch[i],
                        })
                        .collect(),
                )
            }
            AttributeKind::LineNumberTable => {
                let start = u16_column(df, "start_pc")?;
                let line = u16_column(df, "line_number")?;
                AttributeData::LineNumberTable(
                    start
                        .into_iter()
                        .zip(line)
                        .map(|(start_pc, line_number)| LineNumberEntry {
                            start_pc,
                            line_number,
                        })
                        .collect(),
                )
            }
            AttributeKind::LocalVariableTable => {
                let start = u16_column(df, "start_pc")?;
                let length = u16_column(df, "length")?;
                let name = u16_column(df, "name_index")?;
                let descriptor = u16_column(df, "descriptor_index")?;
                let index = u16_column(df, "index")?;
                AttributeData::LocalVariableTable(
                    (0..start.len())
                        .map(|i| LocalVariableEntry {
                            start_pc: start[i],
                            length: length[i],
                            name_index: name[i],
                            descriptor_index: descriptor[i],
                            index: index[i],
                        })
                        .collect(),
                )
            }
            AttributeKind::Exceptions => {
                AttributeData::Exceptions(u16_column(df, "exception_index")?)
            }
        };
        Ok(Some(data))
    }

    pub fn source<'a>(&'a self, pool: &'a dyn ConstantPool) -> Box<dyn AttributeSource + 'a> {
        match self {
            AttributeData::ExceptionTable(entries) => {
                Box::new(ExceptionTableSource::new(entries, pool))
            }
            AttributeData::LineNumberTable(entries) => Box::new(LineNumberTableSource::new(entries)),
            AttributeData::LocalVariableTable(entries) => {
                Box::new(LocalVariableTableSource::new(entries, pool))
            }
            AttributeData::Exceptions(indices) => Box::new(ExceptionsSource::new(indices, pool)),
        }
    }
}
