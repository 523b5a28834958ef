//! Jet pt × groomed-mass response on multi-dimensional unfolding bins.

use na_core::{Error, Event, LorentzVector, Result};
use na_hist::{BinningAxis, BinningDistribution, Hist1D, Hist2D, HistDir, UnfoldBinning};
use tracing::info;

use super::{
    DETECTOR_MASS_EDGES, GENERATOR_MASS_EDGES, PT_EDGES, ZControlHists, select_event,
};
use crate::config::ZJetsConfig;
use crate::module::AnalysisModule;

fn pt_mass_binning(
    name: &str,
    distribution: &str,
    mass_edges: &[f64],
    underflow: bool,
) -> Result<UnfoldBinning> {
    UnfoldBinning::single(
        name,
        distribution,
        vec![
            BinningAxis::new("pt", &PT_EDGES, underflow, true)?,
            BinningAxis::new("mass", mass_edges, underflow, true)?,
        ],
    )
}

/// Global bin of `(pt, groomed mass)`, 0 when outside the binning.
fn global_bin(dist: &BinningDistribution, jet: &LorentzVector, groomed: &LorentzVector) -> f64 {
    dist.global_bin_number(&[jet.pt(), groomed.mass()]).unwrap_or(0) as f64
}

struct Booked {
    detector: UnfoldBinning,
    generator: UnfoldBinning,
    signal: UnfoldBinning,
    background: UnfoldBinning,
    det_dist: BinningDistribution,
    gen_dist: BinningDistribution,
    bkg_dist: BinningDistribution,
    reco: Hist1D,
    truth: Hist1D,
    fake: Hist1D,
    miss: Hist1D,
    response: Hist2D,
    controls: ZControlHists,
}

/// Z+jets response module over (jet pt, groomed mass) global bins.
///
/// Detector bins use the full detector mass binning, generator bins the
/// generator one; both have pt and mass overflow but no underflow. Fakes
/// are binned with the background binning and misses land in response
/// detector bin 0.
pub struct ZPlusJetsXS2D {
    config: ZJetsConfig,
    booked: Option<Booked>,
}

impl ZPlusJetsXS2D {
    /// Validate the configuration and create an unbooked module.
    pub fn new(config: ZJetsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, booked: None })
    }
}

fn only_distribution(binning: &UnfoldBinning) -> Result<BinningDistribution> {
    binning
        .distributions()
        .first()
        .cloned()
        .ok_or_else(|| Error::Validation(format!("binning '{}' is empty", binning.name())))
}

impl AnalysisModule for ZPlusJetsXS2D {
    fn name(&self) -> &str {
        "zplusjets_2d"
    }

    fn begin_job(&mut self) -> Result<()> {
        let detector = pt_mass_binning(
            "detectorBinning",
            "detectorDistribution",
            &DETECTOR_MASS_EDGES,
            false,
        )?;
        let generator = pt_mass_binning(
            "generatorBinning",
            "generatorDistribution",
            &GENERATOR_MASS_EDGES,
            false,
        )?;
        let signal =
            pt_mass_binning("signalBinning", "signalDistribution", &GENERATOR_MASS_EDGES, true)?;
        let background = pt_mass_binning(
            "backgroundBinning",
            "backgroundDistribution",
            &GENERATOR_MASS_EDGES,
            false,
        )?;

        self.booked = Some(Booked {
            det_dist: only_distribution(&detector)?,
            gen_dist: only_distribution(&generator)?,
            bkg_dist: only_distribution(&background)?,
            reco: detector.create_histogram("h_reco")?,
            truth: generator.create_histogram("h_gen")?,
            fake: background.create_histogram("h_fake")?,
            miss: generator.create_histogram("h_miss")?,
            response: UnfoldBinning::create_migration_histogram(
                &detector,
                &generator,
                "h_response",
            )?,
            controls: ZControlHists::book()?,
            detector,
            generator,
            signal,
            background,
        });
        Ok(())
    }

    fn analyze(&mut self, event: &Event) -> Result<bool> {
        let b = self
            .booked
            .as_mut()
            .ok_or_else(|| Error::Validation("analyze called before begin_job".into()))?;
        let Some(sel) = select_event(&self.config, event, &mut b.controls) else {
            return Ok(false);
        };

        for reco in &sel.reco {
            let det_bin = reco.groomed.map(|sd| global_bin(&b.det_dist, &reco.p4, &sd));
            if let Some(bin) = det_bin {
                b.reco.fill(bin);
            }
            match reco.matched.map(|i| &sel.truth[i]) {
                Some(truth) => {
                    b.controls.fill_matched(&reco.p4, &truth.p4);
                    if let (Some(det), Some(truth_sd)) = (det_bin, truth.groomed) {
                        let gen_bin = global_bin(&b.gen_dist, &truth.p4, &truth_sd);
                        b.truth.fill(gen_bin);
                        b.response.fill(det, gen_bin);
                    }
                }
                None => {
                    if let Some(sd) = reco.groomed {
                        b.fake.fill(global_bin(&b.bkg_dist, &reco.p4, &sd));
                    }
                }
            }
        }

        for truth in sel.missed() {
            if let Some(sd) = truth.groomed {
                let gen_bin = global_bin(&b.gen_dist, &truth.p4, &sd);
                b.response.fill(0.0, gen_bin);
                b.truth.fill(gen_bin);
                b.miss.fill(gen_bin);
            }
        }
        Ok(true)
    }

    fn end_job(&mut self, out: &mut HistDir) -> Result<()> {
        let b = self
            .booked
            .take()
            .ok_or_else(|| Error::Validation("end_job called before begin_job".into()))?;
        info!(
            detector_bins = b.detector.n_bins(),
            generator_bins = b.generator.n_bins(),
            matched = b.response.entries(),
            "zplusjets_2d finished"
        );
        out.extend([b.detector, b.generator, b.signal, b.background])?;
        out.extend([b.reco, b.truth, b.fake, b.miss])?;
        out.insert(b.response)?;
        b.controls.write(out)
    }
}
