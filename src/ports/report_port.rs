//! Report generation port.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::MactraderError;

/// Port for writing backtest output.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), MactraderError>;

    /// File name used for `result` inside an output directory.
    fn file_name(&self, result: &BacktestResult) -> String;

    /// Default implementation: one file per symbol under `output_dir`.
    fn write_all(
        &self,
        results: &[BacktestResult],
        output_dir: &Path,
    ) -> Result<Vec<std::path::PathBuf>, MactraderError> {
        results
            .iter()
            .map(|result| {
                let path = output_dir.join(self.file_name(result));
                self.write(result, &path)?;
                Ok(path)
            })
            .collect()
    }
}
