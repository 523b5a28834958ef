//! All-hadronic ttbar resonance selection with a mistag-rate background.
//!
//! The background in the double-tag region is estimated from data: the
//! probe-jet mistag rate is measured in the anti-tag region (tag jet fails
//! top tagging) and applied to the single-tag region. A job runs in one of
//! two modes:
//!
//! - [`RunMode::Prediction`]: fill `preddist<cat>` (all probes) and
//!   `predtag<cat>` (tagged probes) in the anti-tag region; `end_job`
//!   divides them into `mistag<cat>`.
//! - [`RunMode::Signal`]: require a tagged tag jet in every variant (the
//!   event is rejected otherwise) and accumulate
//!   [`PredictedDistribution`]s weighted by the stored rate.
//!
//! Both modes fill per-variant control histograms and the double-tag
//! `h_mttbar_<variant>` spectrum.

use na_core::{Error, Event, FatJet, LorentzVector, Result};
use na_hist::{Hist1D, HistDir, HistFile, PredictedDistribution};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::category::{AnalysisCategory, BtagBucket, RapidityRegion};
use crate::config::{RunMode, TTbarConfig, TopTagger};
use crate::jets::{JetSysColl, VariedJet};
use crate::module::AnalysisModule;
use crate::systematics::Systematic;

/// Per-variant control histogram kinds.
#[derive(Debug, Clone, Copy)]
enum Control {
    Ak4Ht,
    Ak8Pt,
    Ak8Msd,
    Ak8Tau32,
    Ak8N3b1,
    Mttbar,
}

impl Control {
    const ALL: [Control; 6] =
        [Self::Ak4Ht, Self::Ak8Pt, Self::Ak8Msd, Self::Ak8Tau32, Self::Ak8N3b1, Self::Mttbar];

    fn booking(self) -> (&'static str, usize, f64, f64) {
        match self {
            Self::Ak4Ht => ("h_ak4ht", 25, 0.0, 2500.0),
            Self::Ak8Pt => ("h_ak8pt", 25, 0.0, 2500.0),
            Self::Ak8Msd => ("h_ak8msd", 25, 0.0, 500.0),
            Self::Ak8Tau32 => ("h_ak8tau32", 25, 0.0, 1.0),
            Self::Ak8N3b1 => ("h_ak8n3b1", 25, 0.0, 5.0),
            Self::Mttbar => ("h_mttbar", 25, 0.0, 5000.0),
        }
    }
}

/// `[kind][variant]` control histograms.
struct ControlHists {
    by_kind: Vec<Vec<Hist1D>>,
}

impl ControlHists {
    fn book() -> Result<Self> {
        let by_kind = Control::ALL
            .iter()
            .map(|kind| {
                let (base, n, lo, hi) = kind.booking();
                Systematic::ALL
                    .iter()
                    .map(|syst| Hist1D::new(format!("{base}_{syst}"), base, n, lo, hi))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { by_kind })
    }

    fn fill(&mut self, kind: Control, syst: Systematic, x: f64, w: f64) {
        self.by_kind[kind as usize][syst.index()].fill_weighted(x, w);
    }
}

/// The five predicted spectra of one category.
struct CategoryPredictions {
    jet_p: PredictedDistribution,
    mttbar: PredictedDistribution,
    sd_mass: PredictedDistribution,
    mass: PredictedDistribution,
    sd_rho: PredictedDistribution,
}

impl CategoryPredictions {
    fn book(rate: &Hist1D, cat: usize) -> Result<Self> {
        let pd = |name: &str, title: &str, n, lo, hi| {
            PredictedDistribution::new(
                rate.clone(),
                format!("{name}{cat}"),
                format!("{title}, cat={cat}"),
                n,
                lo,
                hi,
            )
        };
        Ok(Self {
            jet_p: pd("predJetP", "Jet p (GeV)", 30, 0.0, 3000.0)?,
            mttbar: pd("predJetMTTBAR", "M_{TTBAR} (GeV)", 50, 0.0, 5000.0)?,
            sd_mass: pd("predJetSDMass", "Soft Drop Mass", 50, 0.0, 250.0)?,
            mass: pd("predJetMass", "Ungroomed Jet Mass", 50, 0.0, 250.0)?,
            sd_rho: pd("predJetSDRho", "Soft Drop Rho", 50, 0.0, 1.0)?,
        })
    }

    fn accumulate(&mut self, probe: &VariedJet, ttbar: &LorentzVector, tagged: bool, w: f64) {
        let p = probe.p4.p();
        self.jet_p.accumulate(p, p, tagged, w);
        self.mttbar.accumulate(ttbar.mass(), p, tagged, w);
        self.mass.accumulate(probe.p4.mass(), p, tagged, w);
        if let Some(msd) = probe.msd {
            self.sd_mass.accumulate(msd, p, tagged, w);
            let pt = probe.p4.pt();
            if pt > 0.0 {
                self.sd_rho.accumulate((msd / pt).powi(2), p, tagged, w);
            }
        }
    }

    fn into_distributions(self) -> [PredictedDistribution; 5] {
        [self.jet_p, self.mttbar, self.sd_mass, self.mass, self.sd_rho]
    }
}

enum ModeHists {
    Prediction { preddist: Vec<Hist1D>, predtag: Vec<Hist1D> },
    Signal { predictions: Vec<CategoryPredictions> },
}

/// Probe/tag choice of one variant, made before any selection fill.
struct Selection {
    syst: Systematic,
    /// Positions in the variant collection passing acceptance (shuffled).
    candidates: Vec<usize>,
    probe: usize,
    tag: usize,
    probe_tagged: bool,
    tag_tagged: bool,
    category: AnalysisCategory,
}

struct Booked {
    controls: ControlHists,
    mode: ModeHists,
}

/// Hadronic ttbar resonance module.
pub struct TTbarResHadronic {
    config: TTbarConfig,
    tagger: TopTagger,
    rng: StdRng,
    booked: Option<Booked>,
}

impl TTbarResHadronic {
    /// Validate the configuration and create an unbooked module.
    pub fn new(config: TTbarConfig) -> Result<Self> {
        config.validate()?;
        let tagger = config.top_tagger();
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self { config, tagger, rng, booked: None })
    }

    /// Module configuration.
    pub fn config(&self) -> &TTbarConfig {
        &self.config
    }

    fn load_rates(&self) -> Result<Vec<Hist1D>> {
        let path = self
            .config
            .pred_file
            .as_ref()
            .ok_or_else(|| Error::Validation("signal mode requires pred_file".into()))?;
        let file = HistFile::read(path)?;
        let rates = AnalysisCategory::all()
            .map(|cat| {
                let key = format!("{}/mistag{}", self.config.pred_dir, cat.index());
                file.get_h1(&key).cloned()
            })
            .collect::<Result<Vec<_>>>()?;
        info!(path = %path.display(), categories = rates.len(), "loaded mistag rates");
        Ok(rates)
    }
}

/// Shuffle the candidate positions and take (probe, tag) from the front.
pub(crate) fn assign_probe_and_tag<R: Rng + ?Sized>(
    rng: &mut R,
    candidates: &mut [usize],
) -> Option<(usize, usize)> {
    candidates.shuffle(rng);
    match candidates {
        [probe, tag, ..] => Some((*probe, *tag)),
        _ => None,
    }
}

fn in_acceptance(jet: &VariedJet, pt_min: f64, max_abs_eta: f64) -> bool {
    jet.p4.pt() > pt_min && jet.p4.eta().abs() < max_abs_eta
}

impl AnalysisModule for TTbarResHadronic {
    fn name(&self) -> &str {
        "ttbar_hadronic"
    }

    fn begin_job(&mut self) -> Result<()> {
        let controls = ControlHists::book()?;
        let mode = match self.config.mode {
            RunMode::Prediction => {
                let book = |base: &str| {
                    AnalysisCategory::all()
                        .map(|cat| {
                            let name = format!("{base}{}", cat.index());
                            Hist1D::new(name.clone(), name, 25, 0.0, 2500.0)
                        })
                        .collect::<Result<Vec<_>>>()
                };
                ModeHists::Prediction { preddist: book("preddist")?, predtag: book("predtag")? }
            }
            RunMode::Signal => {
                let predictions = self
                    .load_rates()?
                    .iter()
                    .enumerate()
                    .map(|(cat, rate)| CategoryPredictions::book(rate, cat))
                    .collect::<Result<Vec<_>>>()?;
                ModeHists::Signal { predictions }
            }
        };
        self.rng = StdRng::seed_from_u64(self.config.seed);
        self.booked = Some(Booked { controls, mode });
        info!(mode = ?self.config.mode, seed = self.config.seed, "booked ttbar_hadronic");
        Ok(())
    }

    fn analyze(&mut self, event: &Event) -> Result<bool> {
        let Self { config, tagger, rng, booked } = self;
        let Booked { controls, mode } = booked
            .as_mut()
            .ok_or_else(|| Error::Validation("analyze called before begin_job".into()))?;

        let ak8_sys = JetSysColl::build(&event.fat_jets, |j: &FatJet| j.jet_id > 0);
        if ak8_sys.len() < 2 {
            return Ok(false);
        }
        let ak4_sys = JetSysColl::build(&event.jets, |j| j.jet_id > 0);

        // Preselection over all variants first: a failure anywhere rejects
        // the event before any other histogram is touched.
        let mut candidates = Vec::with_capacity(Systematic::COUNT);
        for syst in Systematic::ALL {
            let w = syst.event_weight(&event.weights);
            let ak8: Vec<usize> = ak8_sys
                .variant(syst)
                .iter()
                .enumerate()
                .filter(|(_, j)| in_acceptance(j, config.ak8_pt_min, config.max_abs_eta))
                .map(|(i, _)| i)
                .collect();
            if ak8.len() < 2 {
                return Ok(false);
            }
            let ht: f64 = ak4_sys
                .variant(syst)
                .iter()
                .filter(|j| in_acceptance(j, config.ak4_pt_min, config.max_abs_eta))
                .map(|j| j.p4.pt())
                .sum();
            controls.fill(Control::Ak4Ht, syst, ht, w);
            if ht < config.ht_cut {
                debug!(event = event.event, %syst, ht, "failed HT cut");
                return Ok(false);
            }
            candidates.push(ak8);
        }

        // Probe/tag assignment for every variant before filling: in signal
        // mode a failed tag rejects the event for all variants.
        let mut selected = Vec::with_capacity(Systematic::COUNT);
        for (syst, mut ak8) in Systematic::ALL.into_iter().zip(candidates) {
            let jets = ak8_sys.variant(syst);
            let Some((iprobe, itag)) = assign_probe_and_tag(rng, &mut ak8) else {
                return Ok(false);
            };
            let (probe, tag) = (&jets[iprobe], &jets[itag]);
            let (probe_raw, tag_raw) = (&event.fat_jets[probe.index], &event.fat_jets[tag.index]);
            let tag_tagged = tagger.pass(tag_raw.tau32(), tag.msd);
            if !tag_tagged && config.mode == RunMode::Signal {
                debug!(event = event.event, %syst, "tag jet failed in signal mode");
                return Ok(false);
            }
            let nbtag = [probe_raw, tag_raw].iter().filter(|j| j.max_csvv2 > config.bdisc).count();
            selected.push(Selection {
                syst,
                candidates: ak8,
                probe: iprobe,
                tag: itag,
                probe_tagged: tagger.pass(probe_raw.tau32(), probe.msd),
                tag_tagged,
                category: AnalysisCategory::new(
                    BtagBucket::from_count(nbtag),
                    RapidityRegion::classify(probe.p4.rapidity(), config.central_rapidity),
                ),
            });
        }

        for sel in selected {
            let syst = sel.syst;
            let w = syst.event_weight(&event.weights);
            let jets = ak8_sys.variant(syst);

            for &i in &sel.candidates {
                let raw = &event.fat_jets[jets[i].index];
                controls.fill(Control::Ak8Pt, syst, jets[i].p4.pt(), w);
                if let Some(msd) = jets[i].msd {
                    controls.fill(Control::Ak8Msd, syst, msd, w);
                }
                controls.fill(Control::Ak8Tau32, syst, raw.tau32(), w);
                controls.fill(Control::Ak8N3b1, syst, raw.n3b1, w);
            }

            let (probe, tag) = (&jets[sel.probe], &jets[sel.tag]);
            let ttbar = probe.p4 + tag.p4;
            let cat = sel.category.index();
            if syst == Systematic::Nom {
                match mode {
                    ModeHists::Prediction { preddist, predtag } => {
                        if !sel.tag_tagged {
                            preddist[cat].fill_weighted(probe.p4.p(), w);
                            if sel.probe_tagged {
                                predtag[cat].fill_weighted(probe.p4.p(), w);
                            }
                        }
                    }
                    ModeHists::Signal { predictions } => {
                        predictions[cat].accumulate(probe, &ttbar, sel.probe_tagged, w);
                    }
                }
            }

            if sel.probe_tagged {
                controls.fill(Control::Mttbar, syst, ttbar.mass(), w);
            }
        }
        Ok(true)
    }

    fn end_job(&mut self, out: &mut HistDir) -> Result<()> {
        let Booked { controls, mode } = self
            .booked
            .take()
            .ok_or_else(|| Error::Validation("end_job called before begin_job".into()))?;
        out.extend(controls.by_kind.into_iter().flatten())?;
        match mode {
            ModeHists::Prediction { preddist, predtag } => {
                let mut rates = Vec::with_capacity(preddist.len());
                for (i, (den, num)) in preddist.iter().zip(&predtag).enumerate() {
                    let name = format!("mistag{i}");
                    rates.push(Hist1D::divide_binomial(num, den, name.clone(), name)?);
                }
                out.extend(preddist)?;
                out.extend(predtag)?;
                out.extend(rates)?;
            }
            ModeHists::Signal { predictions } => {
                for cat in predictions {
                    for mut pd in cat.into_distributions() {
                        pd.set_calculated_errors();
                        out.insert(pd)?;
                    }
                }
            }
        }
        info!(objects = out.len(), "ttbar_hadronic finished");
        Ok(())
    }
}
