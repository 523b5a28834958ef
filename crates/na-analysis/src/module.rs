//! The analysis-module lifecycle.

use na_core::{Event, Result};
use na_hist::HistDir;

/// An analysis module driven by the event loop.
///
/// The lifecycle is `begin_job` once, `analyze` per event, `end_job` once.
/// Modules own their histograms for the whole job and hand them to the
/// output directory in `end_job`.
pub trait AnalysisModule {
    /// Short module name, recorded in the output provenance.
    fn name(&self) -> &str;

    /// Book histograms and load any external inputs.
    fn begin_job(&mut self) -> Result<()>;

    /// Process one event. `Ok(false)` means the event was rejected and
    /// later modules in a chain should not see it.
    fn analyze(&mut self, event: &Event) -> Result<bool>;

    /// Finalize and move all booked objects into `out`.
    fn end_job(&mut self, out: &mut HistDir) -> Result<()>;
}

impl<M: AnalysisModule + ?Sized> AnalysisModule for Box<M> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn begin_job(&mut self) -> Result<()> {
        (**self).begin_job()
    }

    fn analyze(&mut self, event: &Event) -> Result<bool> {
        (**self).analyze(event)
    }

    fn end_job(&mut self, out: &mut HistDir) -> Result<()> {
        (**self).end_job(out)
    }
}
