//! Smoothing of document language models.
//!
//! Jelinek-Mercer interpolates the document and collection maximum
//! likelihood estimates with a fixed weight λ:
//!
//! ```text
//! p(t|θd) = (1-λ)·tf(t,d)/|d| + λ·tf(t,C)/|C|
//! ```
//!
//! Dirichlet smoothing adds μ pseudo-counts distributed along the collection
//! model:
//!
//! ```text
//! p(t|θd) = (tf(t,d) + μ·tf(t,C)/|C|) / (|d| + μ)
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{LexlinkError, Result};
use crate::stats::StatsCache;

/// Default Dirichlet prior.
pub const DEFAULT_DIRICHLET_MU: f64 = 2000.0;
/// Default Jelinek-Mercer interpolation weight.
pub const DEFAULT_JM_LAMBDA: f64 = 0.1;

pub const AVG_LEN: &str = "avg_len";

/// JM-smoothed term probability. Each ratio is 0 when its denominator is 0.
pub fn jelinek_mercer(tf_t_d: u64, len_d: u64, tf_t_c: u64, len_c: u64, lambda: f64) -> f64 {
    let p_t_d = if len_d > 0 {
        tf_t_d as f64 / len_d as f64
    } else {
        0.0
    };
    let p_t_c = if len_c > 0 {
        tf_t_c as f64 / len_c as f64
    } else {
        0.0
    };
    (1.0 - lambda) * p_t_d + lambda * p_t_c
}

/// Dirichlet-smoothed term probability. A prior of 0 means the field has no
/// content in the collection and yields 0.
pub fn dirichlet(tf_t_d: u64, len_d: u64, tf_t_c: u64, len_c: u64, mu: f64) -> f64 {
    if mu == 0.0 {
        return 0.0;
    }
    let p_t_c = if len_c > 0 {
        tf_t_c as f64 / len_c as f64
    } else {
        0.0
    };
    (tf_t_d as f64 + mu * p_t_c) / (len_d as f64 + mu)
}

/// A smoothing parameter: a number, or the field's average length resolved
/// at scoring time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SmoothingParam {
    Value(f64),
    AvgLen,
}

impl fmt::Display for SmoothingParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmoothingParam::Value(v) => write!(f, "{v}"),
            SmoothingParam::AvgLen => write!(f, "{AVG_LEN}"),
        }
    }
}

impl Serialize for SmoothingParam {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            SmoothingParam::Value(v) => serializer.serialize_f64(*v),
            SmoothingParam::AvgLen => serializer.serialize_str(AVG_LEN),
        }
    }
}

impl<'de> Deserialize<'de> for SmoothingParam {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(v) => Ok(SmoothingParam::Value(v)),
            Raw::Text(s) if s == AVG_LEN => Ok(SmoothingParam::AvgLen),
            Raw::Text(s) => s.parse::<f64>().map(SmoothingParam::Value).map_err(|_| {
                serde::de::Error::custom(format!(
                    "smoothing_param must be a number or \"{AVG_LEN}\", got \"{s}\""
                ))
            }),
        }
    }
}

/// Smoothing method with its validated parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Smoothing {
    JelinekMercer { lambda: f64 },
    Dirichlet { mu: SmoothingParam },
}

impl Default for Smoothing {
    fn default() -> Self {
        Smoothing::Dirichlet {
            mu: SmoothingParam::Value(DEFAULT_DIRICHLET_MU),
        }
    }
}

impl Smoothing {
    /// Build a smoothing method from its configuration name (`jm` or
    /// `dirichlet`) and optional parameter, applying the method's default.
    pub fn from_method(method: &str, param: Option<SmoothingParam>) -> Result<Self> {
        match method.to_lowercase().as_str() {
            "jm" => {
                let lambda = match param.unwrap_or(SmoothingParam::Value(DEFAULT_JM_LAMBDA)) {
                    SmoothingParam::Value(v) => v,
                    SmoothingParam::AvgLen => {
                        return Err(LexlinkError::config(
                            "\"avg_len\" is only supported for dirichlet smoothing",
                        ));
                    }
                };
                if !(lambda > 0.0 && lambda < 1.0) {
                    return Err(LexlinkError::config(format!(
                        "JM lambda must lie in (0, 1), got {lambda}"
                    )));
                }
                Ok(Smoothing::JelinekMercer { lambda })
            }
            "dirichlet" => {
                let mu = param.unwrap_or(SmoothingParam::Value(DEFAULT_DIRICHLET_MU));
                if let SmoothingParam::Value(v) = mu {
                    if !(v >= 0.0) || !v.is_finite() {
                        return Err(LexlinkError::config(format!(
                            "Dirichlet mu must be a non-negative number, got {v}"
                        )));
                    }
                }
                Ok(Smoothing::Dirichlet { mu })
            }
            other => Err(LexlinkError::config(format!(
                "smoothing method \"{other}\" is not supported"
            ))),
        }
    }

    /// Smoothed probability of a term in a document field.
    pub fn term_prob(
        &self,
        cache: &mut StatsCache<'_>,
        doc_id: &str,
        field: &str,
        term: &str,
    ) -> Result<f64> {
        let len_d = cache.doc_length(doc_id, field)?;
        let len_c = cache.coll_length(field)?;
        let tf_t_c = cache.coll_term_freq(term, field)?;
        let tf_t_d = cache.term_freq(doc_id, field, term)?;

        Ok(match *self {
            Smoothing::JelinekMercer { lambda } => {
                jelinek_mercer(tf_t_d, len_d, tf_t_c, len_c, lambda)
            }
            Smoothing::Dirichlet { mu } => {
                let mu = match mu {
                    SmoothingParam::Value(v) => v,
                    SmoothingParam::AvgLen => cache.avg_len(field)?,
                };
                dirichlet(tf_t_d, len_d, tf_t_c, len_c, mu)
            }
        })
    }
}
