use super::report::{codes, Finding, ValidationReport};
use crate::document::{Document, Relationship};
use std::collections::HashSet;

/// Relationship, pregnancy and ART checks, including reference integrity.
pub fn check_links(doc: &Document, report: &mut ValidationReport) {
    let individuals: HashSet<&str> = doc.individuals.iter().map(|ind| ind.id.as_str()).collect();

    for (idx, rel) in doc.relationships.iter().enumerate() {
        let path = format!("relationships[{}]", idx);
        match rel {
            Relationship::Partner(p) => {
                if p.a.is_none() || p.b.is_none() {
                    report.push(
                        Finding::error(
                            codes::REL_PARTNER_INCOMPLETE,
                            "Partner relationship needs both members",
                        )
                        .at(path),
                    );
                    continue;
                }
            }
            Relationship::ParentChild(pc) => {
                if pc.child.is_none() {
                    report.push(
                        Finding::error(codes::REL_CHILD_MISSING, "Parent/child link has no child")
                            .at(format!("{}.child", path)),
                    );
                }
                if pc.father.is_none() && pc.mother.is_none() {
                    report.push(
                        Finding::warning(
                            codes::REL_PARENTS_MISSING,
                            "Parent/child link has neither father nor mother",
                        )
                        .at(path.clone()),
                    );
                }
                if !pc.biological && !pc.adoptive {
                    report.push(
                        Finding::suggestion(
                            codes::REL_ADOPTIVE_FLAG,
                            "Non-biological link should say whether it is adoptive",
                        )
                        .at(format!("{}.adoptive", path)),
                    );
                }
            }
        }

        let context = match rel {
            Relationship::Partner(_) => "partner relationship",
            Relationship::ParentChild(_) => "parent/child relationship",
        };
        for (field, id) in rel.individual_refs() {
            if !individuals.contains(id) {
                report.push(missing_reference(id, context, format!("{}.{}", path, field)));
            }
        }
    }

    let pregnancies: HashSet<&str> = doc.pregnancies.iter().map(|p| p.id.as_str()).collect();

    for (idx, preg) in doc.pregnancies.iter().enumerate() {
        let path = format!("pregnancies[{}]", idx);
        let context = format!("pregnancy '{}'", preg.id);

        for (field, id) in [("mother", &preg.mother), ("father", &preg.father)] {
            if let Some(id) = id.as_deref()
                && !individuals.contains(id)
            {
                report.push(missing_reference(id, &context, format!("{}.{}", path, field)));
            }
        }

        if preg.outcome.is_none() {
            report.push(
                Finding::error(
                    codes::PREG_OUTCOME_INVALID,
                    format!(
                        "Pregnancy '{}' outcome must be one of SAB, TOP, ECT, SB, Live",
                        preg.id
                    ),
                )
                .at(format!("{}.outcome", path)),
            );
        }

        // anything but a live birth, including an unknown outcome
        let live = preg.outcome.is_some_and(|outcome| outcome.is_live());
        if !live && preg.karyotype.is_none() && !preg.affected {
            report.push(
                Finding::suggestion(
                    codes::PREG_FINDING_MISSING,
                    format!("Pregnancy '{}' could record a karyotype or finding", preg.id),
                )
                .at(path),
            );
        }
    }

    for (idx, entry) in doc.art.iter().enumerate() {
        let path = format!("art[{}].relatedTo", idx);
        match entry.related_to.as_deref() {
            None => report.push(
                Finding::warning(
                    codes::ART_RELATED_MISSING,
                    format!("ART entry '{}' is not linked to a pregnancy", entry.id),
                )
                .at(path),
            ),
            Some(pregnancy) if !pregnancies.contains(pregnancy) => report.push(
                Finding::error(
                    codes::ART_REF_MISSING,
                    format!(
                        "ART entry '{}' points at unknown pregnancy '{}'",
                        entry.id, pregnancy
                    ),
                )
                .at(path),
            ),
            Some(_) => {}
        }
    }
}

fn missing_reference(id: &str, context: &str, path: String) -> Finding {
    Finding::error(
        codes::REF_MISSING,
        format!("Missing reference '{}' in {}", id, context),
    )
    .at(path)
}
