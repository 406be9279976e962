use crate::document::{CarrierType, Document, LegendMarker, Sex};
use std::collections::BTreeSet;

/// Legend markers that actually occur in `doc`, so a rendered legend can
/// omit the rest.
pub fn legend_usage(doc: &Document) -> BTreeSet<LegendMarker> {
    let mut usage = BTreeSet::new();

    for ind in &doc.individuals {
        if ind.affected.value {
            usage.insert(LegendMarker::Filled);
        } else {
            match ind.carrier.kind {
                CarrierType::AR => {
                    usage.insert(LegendMarker::HalfFilled);
                }
                CarrierType::X => {
                    usage.insert(LegendMarker::Dot);
                }
                CarrierType::None => {}
            }
        }
        if ind.sex == Sex::U {
            usage.insert(LegendMarker::Diamond);
        }
    }

    if doc
        .pregnancies
        .iter()
        .any(|preg| preg.outcome.is_some_and(|outcome| !outcome.is_live()))
    {
        usage.insert(LegendMarker::Triangle);
    }

    usage
}
