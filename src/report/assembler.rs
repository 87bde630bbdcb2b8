use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::RiskConfig;
use crate::ingest::types::Transaction;
use crate::scoring::engine::Assessment;
use crate::scoring::types::{RiskScore, Signals};

use super::types::{NarrativeSource, SuspiciousActivityReport, Typology};

/// Build the ordered list of human-readable reasons.
///
/// Order is fixed: jurisdiction, velocity pattern, structuring, shell keyword, high value.
/// Only one velocity pattern is reported, by precedence fan-out > tunneling >
/// high velocity > burst.
pub fn build_reasons(tx: &Transaction, signals: &Signals, config: &RiskConfig) -> Vec<String> {
    let mut reasons = Vec::new();
    let v = &signals.velocity;

    if signals.rules.is_high_risk_jurisdiction {
        reasons.push(format!(
            "High Risk Jurisdiction ({})",
            tx.receiver_country
        ));
    }

    if v.is_fan_out {
        reasons.push(format!(
            "Fan-out Dispersion ({} distinct beneficiaries in {} txns)",
            v.distinct_beneficiaries, v.session_count
        ));
    } else if v.is_tunneling {
        reasons.push(format!(
            "Tunneling to Single Beneficiary ({} repeat transfers)",
            v.pair_count
        ));
    } else if v.is_high_velocity {
        reasons.push(format!(
            "High Velocity Alert ({} recent txns)",
            v.session_count
        ));
    } else if v.is_burst {
        if v.is_burst_same_target {
            reasons.push("Rapid Burst to Same Beneficiary".to_string());
        } else {
            reasons.push("Rapid Burst Activity".to_string());
        }
    }

    if signals.rules.is_structuring {
        reasons.push(format!(
            "Potential Structuring (just below reporting threshold of {})",
            config.structuring.reporting_threshold
        ));
    }

    if signals.has_shell_keyword {
        reasons.push("Shell Entity Indicator in Beneficiary Name".to_string());
    }

    if signals.is_high_value {
        reasons.push(format!(
            "High Value Transaction (> {})",
            config.high_value_threshold
        ));
    }

    reasons
}

/// Pick the dominant typology for a flagged transaction.
pub fn select_typology(signals: &Signals) -> Typology {
    let v = &signals.velocity;
    if signals.has_shell_keyword && signals.rules.is_high_risk_jurisdiction {
        Typology::ShellCompany
    } else if v.is_fan_out {
        Typology::Dispersion
    } else if signals.rules.is_structuring || v.is_high_velocity {
        Typology::Structuring
    } else {
        Typology::Layering
    }
}

/// Assemble the final risk score for a transaction.
pub fn build_risk_score(tx: &Transaction, assessment: &Assessment, config: &RiskConfig) -> RiskScore {
    let reasons = build_reasons(tx, &assessment.signals, config);
    let b = &assessment.breakdown;
    let explanation = format!(
        "Composite score {}/100 ({}) from rules {}, velocity {}, anomaly {} and contextual {}; {} indicator(s) detected{}.",
        assessment.total,
        assessment.level.as_str(),
        b.rules,
        b.velocity,
        b.anomaly,
        b.contextual,
        reasons.len(),
        if assessment.is_high_risk {
            ", flagged for reporting"
        } else {
            ""
        }
    );

    RiskScore {
        transaction_id: tx.id.clone(),
        score: assessment.total,
        risk_level: assessment.level,
        is_high_risk: assessment.is_high_risk,
        reasons,
        velocity_count: assessment.signals.velocity.session_count,
        breakdown: assessment.breakdown,
        explanation,
    }
}

/// Structured input to the narrative templates.
struct NarrativeContext<'a> {
    tx: &'a Transaction,
    risk: &'a RiskScore,
    signals: &'a Signals,
    config: &'a RiskConfig,
}

fn render_typology_paragraph(typology: Typology, ctx: &NarrativeContext<'_>) -> String {
    let v = &ctx.signals.velocity;
    match typology {
        Typology::ShellCompany => format!(
            "The activity is consistent with {}: the beneficiary '{}' carries shell-entity \
             indicators and the funds are routed to {}, a high-risk jurisdiction, in a manner \
             that obscures beneficial ownership.",
            typology.label(),
            ctx.tx.to_account,
            ctx.tx.receiver_country
        ),
        Typology::Dispersion => format!(
            "The activity is consistent with {}: the originator has sent {} transfers to {} \
             distinct beneficiaries in the current session, dispersing funds across multiple \
             accounts in a pattern typical of mule-account layering.",
            typology.label(),
            v.session_count,
            v.distinct_beneficiaries
        ),
        Typology::Structuring => {
            let mut grounds = Vec::new();
            if ctx.signals.rules.is_structuring {
                grounds.push(format!(
                    "the amount falls just below the mandatory reporting threshold of {}",
                    ctx.config.structuring.reporting_threshold
                ));
            }
            if v.is_high_velocity {
                grounds.push(format!(
                    "the originator has initiated {} transactions in the current session",
                    v.session_count
                ));
            }
            format!(
                "The activity is consistent with {}: {}, suggesting a larger sum split to \
                 evade reporting.",
                typology.label(),
                grounds.join(" and ")
            )
        }
        Typology::Layering => format!(
            "The activity is consistent with {}: funds are moved through intermediate accounts \
             or jurisdictions in a manner that obscures their origin.",
            typology.label()
        ),
    }
}

fn render_narrative(typology: Option<Typology>, ctx: &NarrativeContext<'_>) -> String {
    let tx = ctx.tx;
    let risk = ctx.risk;

    let Some(typology) = typology else {
        return format!(
            "Transaction {} for {} {} from {} to {} is assessed as routine (score {}/100, {}). \
             No reportable indicators were identified.",
            tx.id,
            tx.amount,
            tx.currency,
            tx.from_account,
            tx.to_account,
            risk.score,
            risk.risk_level.as_str()
        );
    };

    let opening = format!(
        "Transaction {} for {} {} was initiated by account {} in favour of {} ({}) via {} at {}. \
         The risk-scoring pipeline assigned a composite score of {}/100 ({}), with {} \
         transaction(s) from the originator in the current session.",
        tx.id,
        tx.amount,
        tx.currency,
        tx.from_account,
        tx.to_account,
        tx.receiver_country,
        tx.transfer_type,
        tx.location,
        risk.score,
        risk.risk_level.as_str(),
        risk.velocity_count
    );

    let indicators = if risk.reasons.is_empty() {
        "No single rule indicator was triggered; the flag results from the combined component \
         scores."
            .to_string()
    } else {
        format!("Indicators detected: {}.", risk.reasons.join("; "))
    };

    [
        opening,
        render_typology_paragraph(typology, ctx),
        indicators,
        "The transaction is recommended for filing as a Suspicious Transaction Report.".to_string(),
    ]
    .join("\n\n")
}

fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_payload(
    report_id: &str,
    typology: Option<Typology>,
    tx: &Transaction,
    risk: &RiskScore,
) -> String {
    let Some(typology) = typology else {
        return format!(
            "<Transaction id=\"{}\" status=\"Processed\" score=\"{}\" level=\"{}\" />",
            xml_escape(&tx.id),
            risk.score,
            risk.risk_level.as_str()
        );
    };

    let mut xml = String::new();
    xml.push_str(&format!(
        "<STR id=\"{}\" transactionId=\"{}\">\n",
        xml_escape(report_id),
        xml_escape(&tx.id)
    ));
    xml.push_str(&format!("  <Transaction id=\"{}\">\n", xml_escape(&tx.id)));
    xml.push_str(&format!(
        "    <Amount currency=\"{}\">{}</Amount>\n",
        xml_escape(&tx.currency),
        tx.amount
    ));
    for (tag, value) in [
        ("FromAccount", &tx.from_account),
        ("ToAccount", &tx.to_account),
        ("ReceiverCountry", &tx.receiver_country),
        ("TransferType", &tx.transfer_type),
        ("Location", &tx.location),
    ] {
        xml.push_str(&format!("    <{tag}>{}</{tag}>\n", xml_escape(value)));
    }
    if let Some(ts) = tx.timestamp {
        xml.push_str(&format!(
            "    <Timestamp>{}</Timestamp>\n",
            ts.to_rfc3339_opts(SecondsFormat::Secs, true)
        ));
    }
    xml.push_str("  </Transaction>\n");

    let b = &risk.breakdown;
    xml.push_str(&format!(
        "  <RiskAssessment score=\"{}\" level=\"{}\" typology=\"{}\" velocityCount=\"{}\">\n",
        risk.score,
        risk.risk_level.as_str(),
        typology.as_str(),
        risk.velocity_count
    ));
    xml.push_str(&format!(
        "    <Breakdown rules=\"{}\" velocity=\"{}\" anomaly=\"{}\" contextual=\"{}\" />\n",
        b.rules, b.velocity, b.anomaly, b.contextual
    ));
    xml.push_str("    <Indicators>\n");
    for reason in &risk.reasons {
        xml.push_str(&format!(
            "      <Indicator>{}</Indicator>\n",
            xml_escape(reason)
        ));
    }
    xml.push_str("    </Indicators>\n");
    xml.push_str("  </RiskAssessment>\n");
    xml.push_str("</STR>");
    xml
}

/// Build the deterministic report. Narrative and payload depend only on the
/// transaction, its score and signals; `generated_at` is the only varying field.
pub fn build_report(
    tx: &Transaction,
    risk: &RiskScore,
    assessment: &Assessment,
    config: &RiskConfig,
    generated_at: DateTime<Utc>,
) -> SuspiciousActivityReport {
    let id = format!("STR-{}", tx.id);
    let typology = risk
        .is_high_risk
        .then(|| select_typology(&assessment.signals));

    let ctx = NarrativeContext {
        tx,
        risk,
        signals: &assessment.signals,
        config,
    };

    SuspiciousActivityReport {
        narrative: render_narrative(typology, &ctx),
        xml_payload: render_payload(&id, typology, tx, risk),
        id,
        transaction_id: tx.id.clone(),
        typology,
        generated_at,
        is_filed: risk.is_high_risk,
        source: NarrativeSource::Deterministic,
    }
}
