//! Per-session system instruction assembly.
//!
//! The assembler stitches policy data from the deployment profile together
//! with the schema descriptions the adapters captured at initialization.
//! It runs exactly once per session; the resulting text is immutable and
//! prepended to every provider request. No policy text is hardcoded here —
//! dates, constants, and extra rules all come from configuration.

use plantline_config::ProfileConfig;

/// Builds the session's system instructions.
pub struct ContextAssembler {
    profile: ProfileConfig,
    relational_schema: String,
    graph_schema: String,
}

impl ContextAssembler {
    pub fn new(
        profile: ProfileConfig,
        relational_schema: impl Into<String>,
        graph_schema: impl Into<String>,
    ) -> Self {
        Self {
            profile,
            relational_schema: relational_schema.into(),
            graph_schema: graph_schema.into(),
        }
    }

    /// Assemble the complete system instructions.
    pub fn assemble(&self) -> String {
        let p = &self.profile;
        let mut out = String::new();

        out.push_str(&format!(
            "You are an operations assistant for {}. You answer questions \
             about production, processes, quality, and plant organization \
             using the query tools provided.\n\n",
            p.plant_name
        ));

        out.push_str(&format!(
            "## Dates\n\
             Today's date is {reference}. Never use database current-time \
             functions such as NOW(), CURRENT_DATE, or datetime(); always \
             derive dates from today's date. When a question does not name \
             a date, use {default} (the most recent complete day).\n\n\
             Timestamp columns hold full timestamps: filter a single day as \
             a half-open interval, from 'DAY 00:00:00' inclusive to the \
             next day's 00:00:00 exclusive. Date-only columns are compared \
             directly against a date literal.\n\n",
            reference = p.reference_date,
            default = p.default_query_date(),
        ));

        out.push_str(&format!(
            "## Plant constants\n\
             Maximum production capacity: {} liters per day.\n\n",
            p.max_capacity_liters
        ));

        out.push_str(&format!(
            "## Relational database (sql_query)\n\
             Use sql_query for quantitative records: production volumes, \
             process measurements, shift logs, nonconformities, quality \
             checks. Provide exactly one SELECT statement as plain text, \
             no markdown fences.\n\n{}\n",
            self.relational_schema
        ));

        out.push_str(&format!(
            "## Knowledge graph (graph_query)\n\
             Use graph_query for structure and relationships: equipment, \
             production lines, personnel assignments, organizational links. \
             Provide exactly one Cypher statement as plain text.\n\n{}\n",
            self.graph_schema
        ));

        out.push_str(
            "## Accuracy\n\
             Base every figure in your answer on tool results from this \
             conversation. Never invent or estimate a value that a query \
             did not return. If a data source fails or returns an error, \
             say that the information could not be retrieved; do not \
             substitute a guess.\n",
        );

        for rule in &p.extra_rules {
            out.push('\n');
            out.push_str(rule);
            out.push('\n');
        }

        out
    }
}
