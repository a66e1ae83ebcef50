//! Turn a trailer plan into a validated cut list.

use mcatch_models::{Cut, CutList, TrailerPlan};

use crate::error::{MediaError, MediaResult, Stage};

/// Slack allowed when checking boundaries computed in floating point.
const TOLERANCE: f64 = 1e-6;

/// Validate a plan and convert it to the cut list handed to the renderer.
///
/// Every moment must lie inside the source, moments must be strictly
/// chronological and non-overlapping, and the total must respect
/// `max_duration`. Violations are internal errors naming the moment index.
pub fn assemble_cut_list(plan: &TrailerPlan, max_duration: f64) -> MediaResult<CutList> {
    let mut cuts: Vec<Cut> = Vec::with_capacity(plan.moments.len());
    let mut total = 0.0;

    for (i, moment) in plan.moments.iter().enumerate() {
        let violation = |message: String| Err(MediaError::internal(Stage::Assembly, Some(i), message));

        if !(moment.start.is_finite() && moment.end.is_finite()) {
            return violation("moment bounds are not finite".to_string());
        }
        if moment.start < -TOLERANCE || moment.end > plan.source_duration + TOLERANCE {
            return violation(format!(
                "moment [{:.3}, {:.3}] lies outside source [0, {:.3}]",
                moment.start, moment.end, plan.source_duration
            ));
        }
        if moment.end <= moment.start {
            return violation(format!("moment [{:.3}, {:.3}] is empty", moment.start, moment.end));
        }
        if let Some(prev) = cuts.last() {
            if moment.start <= prev.start {
                return violation("moments are not in chronological order".to_string());
            }
            if moment.start < prev.end - TOLERANCE {
                return violation(format!(
                    "moment starting at {:.3} overlaps previous ending at {:.3}",
                    moment.start, prev.end
                ));
            }
        }

        let cut = Cut::new(moment.start.max(0.0), moment.end.min(plan.source_duration));
        total += cut.duration();
        cuts.push(cut);
    }

    if total > max_duration + TOLERANCE {
        return Err(MediaError::internal(
            Stage::Assembly,
            None,
            format!("total {:.3}s exceeds the {:.3}s trailer cap", total, max_duration),
        ));
    }

    Ok(CutList {
        cuts,
        total_duration: total,
    })
}
