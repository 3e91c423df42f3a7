//! Single-use extraction run: parse, resolve the record set, extract rows
//!
//! ```text
//! Idle -> Configured -> Parsing -> Resolving -> Extracting -> Completed
//!   \__________\___________\__________\____________\-------> Failed
//! ```

use crate::config::{Configuration, OutputColumn, ValidatedConfig, Validator};
use crate::diagnostics::{codes, Diagnostics, LogDiagnostics};
use crate::error::{AcquisitionError, CellCoercionError, RunError};
use crate::extract::record_set;
use crate::extract::row::RowExtractor;
use crate::sink::RowSink;
use crate::source::Acquirer;
use anyhow::anyhow;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::Value;
use std::fmt;
use std::io::Read;

/// Tuning knobs for a run
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Size of the per-record field worker pool; 1 extracts sequentially
    pub workers: usize,
    /// Reject the row (and abort) on the first cell coercion failure
    pub strict_types: bool,
    /// Build the tree with simd-json, falling back to serde_json. Both paths
    /// accept the same documents.
    pub fast_parse: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            workers: 4,
            strict_types: false,
            fast_parse: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Configured,
    Parsing,
    Resolving,
    Extracting,
    Completed,
    Failed,
}

/// Counts reported at the end of a successful run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Tokens matched by the root path
    pub tokens_matched: usize,
    /// Record tokens found under those matches
    pub records_found: usize,
    pub rows_emitted: usize,
    /// Non-fatal cell coercion failures, in emission order
    pub cell_errors: Vec<CellCoercionError>,
}

pub struct ExtractionEngine<'d> {
    options: EngineOptions,
    state: EngineState,
    config: Option<ValidatedConfig>,
    diagnostics: &'d dyn Diagnostics,
}

impl<'d> ExtractionEngine<'d> {
    pub fn new(options: EngineOptions) -> Self {
        ExtractionEngine {
            options,
            state: EngineState::Idle,
            config: None,
            diagnostics: &LogDiagnostics,
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: &'d dyn Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Install an already validated configuration
    pub fn configure(&mut self, config: ValidatedConfig) -> Result<(), RunError> {
        self.ensure_state(EngineState::Idle)?;
        self.config = Some(config);
        self.state = EngineState::Configured;
        Ok(())
    }

    /// Validate `config` against `columns` and install it
    pub fn validate_and_configure(
        &mut self,
        config: Configuration,
        columns: &[OutputColumn],
    ) -> Result<(), RunError> {
        self.ensure_state(EngineState::Idle)?;
        match Validator::new(columns)
            .with_diagnostics(self.diagnostics)
            .validate(config)
        {
            Ok(validated) => self.configure(validated),
            Err(e) => {
                // the validator already reported it
                self.state = EngineState::Failed;
                Err(e.into())
            }
        }
    }

    /// Run the extraction over `stream`, handing each row to `sink`
    ///
    /// The stream is consumed and closed before rows are produced. Rows
    /// already handed to the sink stay there if the run fails later.
    pub fn run<R, S>(&mut self, stream: R, sink: &mut S) -> Result<RunSummary, RunError>
    where
        R: Read,
        S: RowSink + ?Sized,
    {
        self.ensure_state(EngineState::Configured)?;
        let config = match self.config.take() {
            Some(config) => config,
            None => {
                let err = RunError::runtime(
                    "engine has no configuration",
                    anyhow!("state is Configured"),
                );
                return Err(self.fail(err, None));
            }
        };

        match self.execute(&config, stream, sink) {
            Ok(summary) => {
                self.state = EngineState::Completed;
                Ok(summary)
            }
            Err(e) => Err(self.fail(e, Some(&config))),
        }
    }

    /// Acquire the configured source through `acquirer`, then [`run`](Self::run)
    pub fn run_source<S>(
        &mut self,
        acquirer: &Acquirer<'_>,
        sink: &mut S,
    ) -> Result<RunSummary, RunError>
    where
        S: RowSink + ?Sized,
    {
        self.ensure_state(EngineState::Configured)?;

        let acquired = match &self.config {
            Some(config) => acquirer.acquire(config.config()).map_err(RunError::from),
            None => Err(RunError::runtime(
                "engine has no configuration",
                anyhow!("state is Configured"),
            )),
        };

        match acquired {
            Ok(stream) => {
                log::debug!("reading document from {}", stream.path().display());
                self.run(stream, sink)
            }
            Err(e) => {
                let config = self.config.take();
                Err(self.fail(e, config.as_ref()))
            }
        }
    }

    fn execute<R, S>(
        &mut self,
        config: &ValidatedConfig,
        stream: R,
        sink: &mut S,
    ) -> Result<RunSummary, RunError>
    where
        R: Read,
        S: RowSink + ?Sized,
    {
        self.state = EngineState::Parsing;
        self.diagnostics.info(
            codes::INFO_PROGRESS,
            "Loading whole document into memory and deserializing...",
        );
        let document = parse_document(stream, self.options.fast_parse)?;
        self.diagnostics.info(codes::INFO_PROGRESS, "Document loaded.");

        self.state = EngineState::Resolving;
        let record_set = record_set::resolve(&document, config.root_path())?;
        self.diagnostics.info(
            codes::INFO_PROGRESS,
            &format!(
                "Root path matched {} tokens holding {} records.",
                record_set.tokens_matched,
                record_set.records.len()
            ),
        );

        self.state = EngineState::Extracting;
        let extractor = RowExtractor::new(self.options.workers)
            .map_err(|e| RunError::runtime("failed to start field workers", e.into()))?;

        let mut summary = RunSummary {
            tokens_matched: record_set.tokens_matched,
            records_found: record_set.records.len(),
            ..RunSummary::default()
        };

        for (index, record) in record_set.records.iter().enumerate() {
            let outcome = extractor.extract(record, config.slots(), index);

            for error in outcome.errors {
                if self.options.strict_types {
                    return Err(RunError::RowRejected(error));
                }
                self.diagnostics
                    .warning(codes::WARNING_CELL_COERCION, &error.to_string());
                summary.cell_errors.push(error);
            }

            sink.add_row(outcome.row).map_err(|e| {
                RunError::runtime(format!("failed to hand row {} to the sink", index), e)
            })?;
            summary.rows_emitted += 1;
        }

        sink.set_end_of_rowset()
            .map_err(|e| RunError::runtime("failed to close the rowset", e))?;

        self.diagnostics.info(
            codes::INFO_PROGRESS,
            &format!("Successfully extracted {} rows.", summary.rows_emitted),
        );
        log::debug!(
            "run completed: {} rows, {} cell errors",
            summary.rows_emitted,
            summary.cell_errors.len()
        );

        Ok(summary)
    }

    /// Out-of-order calls fail the engine unless its run already finished
    fn ensure_state(&mut self, expected: EngineState) -> Result<(), RunError> {
        if self.state == expected {
            return Ok(());
        }
        let err = RunError::runtime(
            "extraction engines are single-use",
            anyhow!("expected state {:?}, engine is {:?}", expected, self.state),
        );
        match self.state {
            EngineState::Completed | EngineState::Failed => Err(err),
            _ => Err(self.fail(err, None)),
        }
    }

    /// Move to `Failed` and emit the one diagnostic for this run
    fn fail(&mut self, error: RunError, config: Option<&ValidatedConfig>) -> RunError {
        self.state = EngineState::Failed;

        let code = match &error {
            RunError::Runtime { .. } => codes::RUNTIME_GENERIC_ERROR,
            _ => codes::RUNTIME_ERROR_MODEL_INVALID,
        };
        let message = match config {
            Some(config) => format!(
                "{} (source: {}, root path: `{}`)",
                error,
                config.config().location().unwrap_or("<stream>"),
                config.root_path()
            ),
            None => error.to_string(),
        };
        self.diagnostics.error(code, &message);

        error
    }
}

/// Read the whole stream and parse it into a token tree
fn parse_document<R: Read>(mut stream: R, fast_parse: bool) -> Result<Value, RunError> {
    let mut content = Vec::new();
    stream
        .read_to_end(&mut content)
        .map_err(AcquisitionError::Read)?;
    drop(stream);

    if fast_parse {
        // simd-json parses in place, keep the input bytes for the fallback
        let mut scratch = content.clone();
        if let Ok(value) = simd_json::serde::from_slice::<Value>(&mut scratch) {
            // simd-json accepts some documents serde_json rejects (lone surrogates)
            serde_json::from_slice::<StrictSyntax>(&content).map_err(RunError::Parse)?;
            return Ok(value);
        }
    }

    serde_json::from_slice(&content).map_err(RunError::Parse)
}

/// Walks a document with serde_json's grammar checks without building a tree
struct StrictSyntax;

impl<'de> Deserialize<'de> for StrictSyntax {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(StrictSyntax)
    }
}

impl<'de> Visitor<'de> for StrictSyntax {
    type Value = StrictSyntax;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self, E> {
        Ok(self)
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self, E> {
        Ok(self)
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self, E> {
        Ok(self)
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self, E> {
        Ok(self)
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<Self, E> {
        Ok(self)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self, E> {
        Ok(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self, A::Error> {
        while seq.next_element::<StrictSyntax>()?.is_some() {}
        Ok(self)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self, A::Error> {
        while map.next_key::<StrictSyntax>()?.is_some() {
            map.next_value::<StrictSyntax>()?;
        }
        Ok(self)
    }
}

/// Run a validated configuration once with default options
pub fn run<R, S>(config: ValidatedConfig, stream: R, sink: &mut S) -> Result<RunSummary, RunError>
where
    R: Read,
    S: RowSink + ?Sized,
{
    let mut engine = ExtractionEngine::new(EngineOptions::default());
    engine.configure(config)?;
    engine.run(stream, sink)
}
