//! Parsed XBRL instance documents.
//!
//! An [`XbrlInstance`] is the output of every parser and the input of every
//! analysis. Queries are plain filters over the fact list; filings carry
//! thousands of facts, not millions, so no index is maintained.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::{
    context::{XbrlContext, XbrlPeriod},
    fact::XbrlFact,
    fact_type::FactType,
    namespaces::is_dei,
    parse_result::ParseResult,
    unit::XbrlUnit,
};

/// Physical encoding of the source document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentFormat {
    /// Standalone XBRL instance XML.
    Xbrl,
    /// Inline XBRL embedded in XHTML.
    InlineXbrl,
    /// Not recognized.
    #[default]
    Unknown,
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Xbrl => "XBRL",
            Self::InlineXbrl => "INLINE_XBRL",
            Self::Unknown => "UNKNOWN",
        })
    }
}

/// A footnote attached to one or more facts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct XbrlFootnote {
    /// Footnote id or label.
    pub id: String,
    /// Footnote text.
    pub text: String,
    /// `xml:lang` of the footnote.
    pub language: Option<String>,
}

/// Short description of an instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstanceSummary {
    /// Source document URI.
    pub document_uri: String,
    /// Source format.
    pub format: DocumentFormat,
    /// Entity identifier.
    pub entity_identifier: Option<String>,
    /// Number of facts.
    pub fact_count: usize,
    /// Number of numeric facts.
    pub numeric_fact_count: usize,
    /// Number of distinct concepts.
    pub concept_count: usize,
    /// Number of contexts.
    pub context_count: usize,
    /// Number of units.
    pub unit_count: usize,
    /// Id of the primary context.
    pub primary_context: Option<String>,
    /// End date of the primary context.
    pub period_end: Option<NaiveDate>,
    /// Whether parsing succeeded.
    pub success: bool,
    /// Parsed facts divided by found facts.
    pub success_rate: f64,
}

/// A parsed XBRL or inline XBRL document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct XbrlInstance {
    /// Where the document came from (URL, file name or package entry).
    pub document_uri: String,
    /// Source format.
    pub format: DocumentFormat,
    /// When the document was parsed.
    pub parsed_at: DateTime<Utc>,
    /// Contexts by id.
    pub contexts: BTreeMap<String, XbrlContext>,
    /// Units by id.
    pub units: BTreeMap<String, XbrlUnit>,
    /// Facts in document order.
    pub facts: Vec<XbrlFact>,
    /// Namespace URIs by prefix.
    pub namespaces: BTreeMap<String, String>,
    /// `schemaRef` locations.
    pub schema_refs: Vec<String>,
    /// `linkbaseRef` locations.
    pub linkbase_refs: Vec<String>,
    /// Entity identifier of the first context.
    pub entity_identifier: Option<String>,
    /// Footnotes.
    pub footnotes: Vec<XbrlFootnote>,
    /// Parse statistics and diagnostics.
    pub parse_result: ParseResult,
}

impl XbrlInstance {
    /// Creates an empty instance.
    #[must_use]
    pub fn new(document_uri: impl Into<String>, format: DocumentFormat) -> Self {
        Self {
            document_uri: document_uri.into(),
            format,
            parsed_at: Utc::now(),
            contexts: BTreeMap::new(),
            units: BTreeMap::new(),
            facts: Vec::new(),
            namespaces: BTreeMap::new(),
            schema_refs: Vec::new(),
            linkbase_refs: Vec::new(),
            entity_identifier: None,
            footnotes: Vec::new(),
            parse_result: ParseResult::new(),
        }
    }

    /// Adds a context, taking the entity identifier from the first one seen.
    pub fn add_context(&mut self, context: XbrlContext) {
        if self.entity_identifier.is_none() && !context.entity_identifier.is_empty() {
            self.entity_identifier = Some(context.entity_identifier.clone());
        }
        self.contexts.insert(context.id.clone(), context);
    }

    /// Adds a unit.
    pub fn add_unit(&mut self, unit: XbrlUnit) {
        self.units.insert(unit.id.clone(), unit);
    }

    /// Looks up a context by id.
    #[must_use]
    pub fn context(&self, id: &str) -> Option<&XbrlContext> {
        self.contexts.get(id)
    }

    /// Looks up a unit by id.
    #[must_use]
    pub fn unit(&self, id: &str) -> Option<&XbrlUnit> {
        self.units.get(id)
    }

    /// The unit of a fact.
    #[must_use]
    pub fn unit_of(&self, fact: &XbrlFact) -> Option<&XbrlUnit> {
        fact.unit_ref.as_deref().and_then(|id| self.unit(id))
    }

    /// The period of a fact.
    #[must_use]
    pub fn period_of(&self, fact: &XbrlFact) -> Option<XbrlPeriod> {
        self.context(&fact.context_ref).map(|c| c.period)
    }

    /// All facts with the given local name.
    #[must_use]
    pub fn facts_by_concept_name(&self, local_name: &str) -> Vec<&XbrlFact> {
        self.facts
            .iter()
            .filter(|f| f.local_name == local_name)
            .collect()
    }

    /// All facts with the given `prefix:localName` (or bare local name).
    #[must_use]
    pub fn facts_by_qname(&self, qname: &str) -> Vec<&XbrlFact> {
        match qname.split_once(':') {
            Some((prefix, local)) => self
                .facts
                .iter()
                .filter(|f| f.local_name == local && f.prefix == prefix)
                .collect(),
            None => self.facts_by_concept_name(qname),
        }
    }

    /// All facts in a context.
    #[must_use]
    pub fn facts_by_context(&self, context_id: &str) -> Vec<&XbrlFact> {
        self.facts
            .iter()
            .filter(|f| f.context_ref == context_id)
            .collect()
    }

    /// Facts that are monetary by type or by unit.
    #[must_use]
    pub fn monetary_facts(&self) -> Vec<&XbrlFact> {
        self.facts
            .iter()
            .filter(|f| {
                f.fact_type == FactType::Monetary
                    || self.unit_of(f).is_some_and(XbrlUnit::is_monetary)
            })
            .collect()
    }

    /// Facts that carry a number.
    #[must_use]
    pub fn numeric_facts(&self) -> Vec<&XbrlFact> {
        self.facts
            .iter()
            .filter(|f| f.numeric_value.is_some())
            .collect()
    }

    /// The fact for `local_name` in a specific context.
    #[must_use]
    pub fn fact_in_context(&self, local_name: &str, context_id: &str) -> Option<&XbrlFact> {
        self.facts
            .iter()
            .find(|f| f.local_name == local_name && f.context_ref == context_id && !f.is_nil)
    }

    /// The non-dimensional context with the latest period end date.
    ///
    /// Ties prefer the longest duration, then instants, then the smallest id.
    /// In 10-K filings this is often the cover-page instant (the shares
    /// outstanding date) rather than the fiscal year end; see
    /// [`reporting_period_end`](Self::reporting_period_end).
    #[must_use]
    pub fn primary_context(&self) -> Option<&XbrlContext> {
        self.contexts
            .values()
            .filter(|c| !c.is_dimensional() && c.end_date().is_some())
            .max_by(|a, b| {
                a.end_date()
                    .cmp(&b.end_date())
                    .then_with(|| {
                        a.period
                            .duration_days()
                            .unwrap_or(0)
                            .cmp(&b.period.duration_days().unwrap_or(0))
                    })
                    .then_with(|| b.id.cmp(&a.id))
            })
    }

    /// End date of the primary context.
    #[must_use]
    pub fn primary_period_end(&self) -> Option<NaiveDate> {
        self.primary_context().and_then(XbrlContext::end_date)
    }

    /// Period end the document reports on.
    ///
    /// `dei:DocumentPeriodEndDate` when some non-dimensional context ends on
    /// that date, otherwise the primary period end.
    #[must_use]
    pub fn reporting_period_end(&self) -> Option<NaiveDate> {
        let declared = self
            .facts
            .iter()
            .filter(|f| {
                f.local_name == "DocumentPeriodEndDate" && is_dei(&f.namespace) && !f.is_nil
            })
            .find_map(|f| {
                let text = f.string_value.as_deref().unwrap_or(&f.raw_value).trim();
                NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
            })
            .filter(|date| {
                self.contexts
                    .values()
                    .any(|c| !c.is_dimensional() && c.end_date() == Some(*date))
            });
        declared.or_else(|| self.primary_period_end())
    }

    /// The fact for `local_name` at the reporting period end.
    ///
    /// Looks in the primary context first when it ends on that date, then in
    /// any other non-dimensional context ending on the same date (instants
    /// for balance sheet items, the longest duration for flow items).
    #[must_use]
    pub fn primary_fact(&self, local_name: &str) -> Option<&XbrlFact> {
        let end = Some(self.reporting_period_end()?);
        if let Some(fact) = self
            .primary_context()
            .filter(|c| c.end_date() == end)
            .and_then(|c| self.fact_in_context(local_name, &c.id))
        {
            return Some(fact);
        }
        self.facts
            .iter()
            .filter(|f| f.local_name == local_name && !f.is_nil)
            .filter_map(|f| {
                let ctx = self.context(&f.context_ref)?;
                (!ctx.is_dimensional() && ctx.end_date() == end).then_some((f, ctx))
            })
            .max_by_key(|(_, ctx)| ctx.period.duration_days().unwrap_or(0))
            .map(|(f, _)| f)
    }

    /// Sorted distinct local names.
    #[must_use]
    pub fn concepts(&self) -> Vec<String> {
        self.facts
            .iter()
            .map(|f| f.local_name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sorted distinct period end dates over all contexts.
    #[must_use]
    pub fn period_end_dates(&self) -> Vec<NaiveDate> {
        self.contexts
            .values()
            .filter_map(XbrlContext::end_date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Footnotes attached to a fact.
    #[must_use]
    pub fn footnotes_for(&self, fact: &XbrlFact) -> Vec<&XbrlFootnote> {
        self.footnotes
            .iter()
            .filter(|n| fact.footnote_refs.contains(&n.id))
            .collect()
    }

    /// Summarizes the instance.
    #[must_use]
    pub fn summary(&self) -> InstanceSummary {
        let primary = self.primary_context();
        InstanceSummary {
            document_uri: self.document_uri.clone(),
            format: self.format,
            entity_identifier: self.entity_identifier.clone(),
            fact_count: self.facts.len(),
            numeric_fact_count: self.numeric_facts().len(),
            concept_count: self.concepts().len(),
            context_count: self.contexts.len(),
            unit_count: self.units.len(),
            primary_context: primary.map(|c| c.id.clone()),
            period_end: primary.and_then(XbrlContext::end_date),
            success: self.parse_result.success,
            success_rate: self.parse_result.success_rate(),
        }
    }
}
