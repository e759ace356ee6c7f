//! Ordered concatenation of transformed sources.
//!
//! The whole aggregate is assembled in memory before anything is written,
//! so a source that fails to transform leaves the previous artifact
//! untouched.

use crate::build::parallel::run_ordered;
use crate::build::{
    BuildContext, BuildError, DiagnosticSink, SourceFile, SourceSet, Transform, TransformOutput,
};
use std::path::Path;

/// Concatenates the transformed content of a source set.
#[derive(Debug, Clone)]
pub struct Aggregator {
    /// Per-file transform
    transform: Transform,
    /// Append a newline after every file
    insert_new_line: bool,
    /// Worker threads for transforms
    jobs: usize,
}

impl Aggregator {
    /// Create an aggregator using `transform` for every file.
    pub fn new(transform: Transform) -> Self {
        Self { transform, insert_new_line: true, jobs: 1 }
    }

    /// Set whether a newline follows each file.
    pub fn with_insert_new_line(mut self, insert_new_line: bool) -> Self {
        self.insert_new_line = insert_new_line;
        self
    }

    /// Set the number of worker threads.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Build the aggregate buffer for `sources`.
    ///
    /// Diagnostics are recorded in `sink` and reported through `ctx` file by
    /// file in source order. The first file that fails aborts the run; its
    /// error diagnostic is recorded before the error is returned.
    pub fn aggregate(
        &self,
        ctx: &dyn BuildContext,
        sources: &SourceSet,
        sink: &mut DiagnosticSink,
    ) -> Result<Vec<u8>, BuildError> {
        let mut buffer = Vec::new();

        if self.jobs <= 1 {
            for file in sources {
                let result = self.process(file);
                self.absorb(ctx, sink, file, result, &mut buffer)?;
            }
        } else {
            let results = run_ordered(self.jobs, sources.files(), |file| self.process(file));
            for (file, result) in sources.iter().zip(results) {
                self.absorb(ctx, sink, file, result, &mut buffer)?;
            }
        }

        Ok(buffer)
    }

    fn process(&self, file: &SourceFile) -> Result<TransformOutput, BuildError> {
        let path = file.path();
        let content = file.read().map_err(|e| BuildError::io(path, e))?;
        tracing::debug!(file = %path.display(), transform = self.transform.name(), "transforming");
        Ok(self.transform.apply(path, &content)?)
    }

    fn absorb(
        &self,
        ctx: &dyn BuildContext,
        sink: &mut DiagnosticSink,
        file: &SourceFile,
        result: Result<TransformOutput, BuildError>,
        buffer: &mut Vec<u8>,
    ) -> Result<(), BuildError> {
        match result {
            Ok(out) => {
                for diagnostic in &out.diagnostics {
                    ctx.add_message(diagnostic);
                }
                sink.record(file.path(), out.diagnostics);
                if let Some(bytes) = out.output {
                    buffer.extend_from_slice(&bytes);
                }
                if self.insert_new_line {
                    buffer.push(b'\n');
                }
                Ok(())
            }
            Err(BuildError::Transform(err)) => {
                ctx.add_message(&err.diagnostic);
                sink.record(file.path(), vec![err.diagnostic.clone()]);
                Err(BuildError::Transform(err))
            }
            Err(other) => Err(other),
        }
    }
}

/// Replace `output` with `content` in one step.
pub fn write_artifact(
    ctx: &dyn BuildContext,
    output: &Path,
    content: &[u8],
) -> Result<(), BuildError> {
    ctx.write_output(output, content).map_err(|e| BuildError::io(output, e))
}
