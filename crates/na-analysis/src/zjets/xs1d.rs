//! Groomed and ungroomed jet-mass response (1D).

use na_core::{Error, Event, Result};
use na_hist::{Hist1D, Hist2D, HistDir};
use tracing::info;

use super::{
    DETECTOR_MASS_EDGES, GENERATOR_MASS_EDGES, N_DETECTOR_GROOMED, N_GENERATOR_GROOMED,
    ZControlHists, select_event,
};
use crate::config::ZJetsConfig;
use crate::module::AnalysisModule;

/// Response, reco, truth, fake and miss histograms over one binning.
struct ResponseSet {
    response: Hist2D,
    reco: Hist1D,
    truth: Hist1D,
    fake: Hist1D,
    miss: Hist1D,
}

impl ResponseSet {
    fn book(suffix: &str, det_edges: &[f64], gen_edges: &[f64]) -> Result<Self> {
        let h1 = |base: &str, edges: &[f64]| {
            let name = format!("{base}{suffix}");
            Hist1D::with_edges(name.clone(), name, edges)
        };
        let response_name = format!("h_response{suffix}");
        Ok(Self {
            response: Hist2D::with_edges(
                response_name.clone(),
                response_name,
                det_edges,
                gen_edges,
            )?,
            reco: h1("h_reco", det_edges)?,
            truth: h1("h_gen", gen_edges)?,
            fake: h1("h_fake", det_edges)?,
            miss: h1("h_miss", gen_edges)?,
        })
    }

    fn write(self, out: &mut HistDir) -> Result<()> {
        out.insert(self.response)?;
        out.extend([self.reco, self.truth, self.fake, self.miss])
    }
}

struct Booked {
    groomed: ResponseSet,
    ungroomed: ResponseSet,
    controls: ZControlHists,
}

/// Z+jets jet-mass response module.
///
/// Groomed histograms use the first 18 detector and 9 generator mass bins;
/// the `_u` (ungroomed) ones use the full binning. Missed truth jets are
/// filled in the response at reco mass −1 (x underflow).
pub struct ZPlusJetsXS {
    config: ZJetsConfig,
    booked: Option<Booked>,
}

impl ZPlusJetsXS {
    /// Validate the configuration and create an unbooked module.
    pub fn new(config: ZJetsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, booked: None })
    }
}

impl AnalysisModule for ZPlusJetsXS {
    fn name(&self) -> &str {
        "zplusjets"
    }

    fn begin_job(&mut self) -> Result<()> {
        let groomed = ResponseSet::book(
            "",
            &DETECTOR_MASS_EDGES[..=N_DETECTOR_GROOMED],
            &GENERATOR_MASS_EDGES[..=N_GENERATOR_GROOMED],
        )?;
        let ungroomed = ResponseSet::book("_u", &DETECTOR_MASS_EDGES, &GENERATOR_MASS_EDGES)?;
        let controls = ZControlHists::book()?;
        self.booked = Some(Booked { groomed, ungroomed, controls });
        Ok(())
    }

    fn analyze(&mut self, event: &Event) -> Result<bool> {
        let Booked { groomed, ungroomed, controls } = self
            .booked
            .as_mut()
            .ok_or_else(|| Error::Validation("analyze called before begin_job".into()))?;
        let Some(sel) = select_event(&self.config, event, controls) else {
            return Ok(false);
        };

        for reco in &sel.reco {
            ungroomed.reco.fill(reco.p4.mass());
            if let Some(sd) = reco.groomed {
                groomed.reco.fill(sd.mass());
            }
            match reco.matched.map(|i| &sel.truth[i]) {
                Some(truth) => {
                    ungroomed.response.fill(reco.p4.mass(), truth.p4.mass());
                    ungroomed.truth.fill(truth.p4.mass());
                    controls.fill_matched(&reco.p4, &truth.p4);
                    if let (Some(sd), Some(truth_sd)) = (reco.groomed, truth.groomed) {
                        groomed.response.fill(sd.mass(), truth_sd.mass());
                        groomed.truth.fill(truth_sd.mass());
                    }
                }
                None => {
                    ungroomed.fake.fill(reco.p4.mass());
                    if let Some(sd) = reco.groomed {
                        groomed.fake.fill(sd.mass());
                    }
                }
            }
        }

        for truth in sel.missed() {
            ungroomed.response.fill(-1.0, truth.p4.mass());
            ungroomed.truth.fill(truth.p4.mass());
            ungroomed.miss.fill(truth.p4.mass());
            if let Some(sd) = truth.groomed {
                groomed.response.fill(-1.0, sd.mass());
                groomed.truth.fill(sd.mass());
                groomed.miss.fill(sd.mass());
            }
        }
        Ok(true)
    }

    fn end_job(&mut self, out: &mut HistDir) -> Result<()> {
        let Booked { groomed, ungroomed, controls } = self
            .booked
            .take()
            .ok_or_else(|| Error::Validation("end_job called before begin_job".into()))?;
        info!(
            reco = groomed.reco.entries(),
            matched = groomed.response.entries(),
            fakes = groomed.fake.entries(),
            misses = groomed.miss.entries(),
            "zplusjets finished"
        );
        groomed.write(out)?;
        ungroomed.write(out)?;
        controls.write(out)
    }
}
