//! サービスレコードの JSON / CSV 出力。
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use thiserror::Error;
use tracing::{info, warn};

use super::listing::ServiceRecord;

/// 表計算ソフトが UTF-8 と認識するための BOM。
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const CSV_HEADER: [&str; 7] = [
    "タイトル",
    "URL",
    "企業",
    "インダストリー",
    "インダストリー確信度",
    "ソリューション",
    "要約",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode CSV")]
    Csv(#[from] csv::Error),
    #[error("failed to encode JSON")]
    Json(#[from] serde_json::Error),
}

/// 書き出したファイルのパス。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub json: PathBuf,
    pub csv: PathBuf,
}

/// `{prefix}_{YYYYmmdd_HHMMSS}.json` と `.csv` を書き出す。
///
/// レコードが空のときは何も書かずに `None` を返す。
///
/// # Errors
/// ディレクトリ作成・書き込み・エンコードに失敗した場合はエラーを返す。
pub fn export_records(
    records: &[ServiceRecord],
    output_dir: &Path,
    prefix: &str,
    timestamp: DateTime<Local>,
) -> Result<Option<ExportPaths>, ExportError> {
    if records.is_empty() {
        warn!("no records to export");
        return Ok(None);
    }

    fs::create_dir_all(output_dir).map_err(|source| ExportError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let stem = format!("{prefix}_{}", timestamp.format("%Y%m%d_%H%M%S"));
    let paths = ExportPaths {
        json: output_dir.join(format!("{stem}.json")),
        csv: output_dir.join(format!("{stem}.csv")),
    };

    write_json(records, &paths.json)?;
    write_csv(records, &paths.csv)?;

    info!(
        count = records.len(),
        json = %paths.json.display(),
        csv = %paths.csv.display(),
        "records exported"
    );
    Ok(Some(paths))
}

fn create(path: &Path) -> Result<BufWriter<File>, ExportError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn write_json(records: &[ServiceRecord], path: &Path) -> Result<(), ExportError> {
    let mut writer = create(path)?;
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
    records.serialize(&mut serializer)?;
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_csv(records: &[ServiceRecord], path: &Path) -> Result<(), ExportError> {
    let mut file = create(path)?;
    file.write_all(UTF8_BOM).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(CSV_HEADER)?;
    for record in records {
        let confidence = format!("{:.3}", record.confidence);
        let solution = record
            .solution
            .map(|solution| solution.label())
            .unwrap_or_default();
        writer.write_record([
            record.title.as_str(),
            record.url.as_str(),
            record.company.as_str(),
            record.industry.label(),
            confidence.as_str(),
            solution,
            record.summary.as_deref().unwrap_or_default(),
        ])?;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}
