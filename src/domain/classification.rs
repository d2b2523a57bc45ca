// Color band classification and legend construction
use super::joined_sample::Metric;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BandKind {
    /// Continuous metric: highest threshold the value meets or exceeds.
    Threshold,
    /// Ordinal metric: exact match on a discrete level.
    Level,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Band {
    pub threshold: f64,
    pub color: String,
    pub description: String,
}

impl Band {
    pub fn new(threshold: f64, color: &str, description: &str) -> Self {
        Self {
            threshold,
            color: color.to_string(),
            description: description.to_string(),
        }
    }
}

/// Bands ordered by descending threshold. The last band doubles as the
/// fallback when nothing matches.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BandTable {
    pub kind: BandKind,
    pub title: String,
    pub bands: Vec<Band>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub color: String,
    pub description: String,
    /// Position counted from the lowest band, 0 = lowest threshold.
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub metric: Metric,
    pub title: String,
    pub entries: Vec<LegendEntry>,
}

impl BandTable {
    pub fn rms_default() -> Self {
        Self {
            kind: BandKind::Threshold,
            title: "RMS (m/s²)".to_string(),
            bands: vec![
                Band::new(0.8, "#d73027", "Very uncomfortable"),
                Band::new(0.63, "#fc8d59", "Uncomfortable"),
                Band::new(0.5, "#fee08b", "Fairly uncomfortable"),
                Band::new(0.315, "#4daf4a", "A little uncomfortable"),
                Band::new(0.0, "#216e39", "Comfortable"),
            ],
        }
    }

    pub fn cci_default() -> Self {
        Self {
            kind: BandKind::Level,
            title: "CCI (Comfort Cycling Index)".to_string(),
            bands: vec![
                Band::new(5.0, "#caf0f8", "Very comfortable"),
                Band::new(4.0, "#90e0ef", "Comfortable"),
                Band::new(3.0, "#00b4d8", "Slightly uncomfortable"),
                Band::new(2.0, "#0077b6", "Uncomfortable"),
                Band::new(1.0, "#03045e", "Extremely uncomfortable"),
            ],
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.bands.is_empty() {
            return Err(format!("band table '{}' has no bands", self.title));
        }
        if self.bands.iter().any(|b| !b.threshold.is_finite()) {
            return Err(format!("band table '{}' has a non-finite threshold", self.title));
        }
        if self.bands.windows(2).any(|w| w[0].threshold <= w[1].threshold) {
            return Err(format!(
                "band table '{}' must list thresholds in strictly descending order",
                self.title
            ));
        }
        Ok(())
    }

    pub fn classify(&self, value: f64) -> Classification {
        let matched = self.bands.iter().position(|band| match self.kind {
            BandKind::Threshold => value >= band.threshold,
            BandKind::Level => value == band.threshold,
        });
        let idx = matched.unwrap_or(self.bands.len().saturating_sub(1));

        match self.bands.get(idx) {
            Some(band) => Classification {
                color: band.color.clone(),
                description: band.description.clone(),
                rank: self.bands.len() - 1 - idx,
            },
            None => Classification {
                color: String::new(),
                description: String::new(),
                rank: 0,
            },
        }
    }

    /// Threshold tables list ascending ranges (`0.315–0.5`, `0.8+`); level
    /// tables list each level from the top down.
    pub fn legend(&self, metric: Metric) -> Legend {
        let entries = match self.kind {
            BandKind::Threshold => {
                let ascending: Vec<&Band> = self.bands.iter().rev().collect();
                ascending
                    .iter()
                    .enumerate()
                    .map(|(i, band)| {
                        let label = match ascending.get(i + 1) {
                            Some(next) => format!("{}–{}", band.threshold, next.threshold),
                            None => format!("{}+", band.threshold),
                        };
                        LegendEntry {
                            label,
                            color: band.color.clone(),
                            description: band.description.clone(),
                        }
                    })
                    .collect()
            }
            BandKind::Level => self
                .bands
                .iter()
                .map(|band| LegendEntry {
                    label: format!("{}", band.threshold),
                    color: band.color.clone(),
                    description: band.description.clone(),
                })
                .collect(),
        };

        Legend {
            metric,
            title: self.title.clone(),
            entries,
        }
    }
}

/// Band tables per metric; speed has no default coloring.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BandTables {
    pub rms: BandTable,
    pub cci: BandTable,
    #[serde(default)]
    pub speed: Option<BandTable>,
}

impl Default for BandTables {
    fn default() -> Self {
        Self {
            rms: BandTable::rms_default(),
            cci: BandTable::cci_default(),
            speed: None,
        }
    }
}

impl BandTables {
    pub fn table_for(&self, metric: Metric) -> Option<&BandTable> {
        match metric {
            Metric::Rms => Some(&self.rms),
            Metric::Cci => Some(&self.cci),
            Metric::Speed => self.speed.as_ref(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.rms.validate()?;
        self.cci.validate()?;
        if let Some(speed) = &self.speed {
            speed.validate()?;
        }
        Ok(())
    }
}
