//! Audit report: a titled, sectioned security review built from model replies.

use crate::ai::{prompts, AiError, Model};

const TRACING_TARGET: &str = "midnight_ai::report";

/// Contract name used when the model cannot tell.
pub const UNKNOWN_CONTRACT: &str = "Unknown";

/// Content of one report section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionBody {
    Findings(String),
    NoFindings,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    pub number: usize,
    pub name: String,
    pub body: SectionBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditReport {
    pub contract_name: String,
    pub code: String,
    pub language: String,
    pub sections: Vec<ReportSection>,
}

impl AuditReport {
    pub fn title(&self) -> String {
        format!(
            "Security Audit Report - {} Smart Contract",
            self.contract_name
        )
    }

    pub fn description(&self) -> String {
        format!(
            "This report details the findings of a security audit performed on the provided {} \
smart contract code. The audit focused on identifying security vulnerabilities, privacy \
leaks, logic errors, and deviations from best practices.",
            self.contract_name
        )
    }

    /// Markdown rendering of the whole report.
    pub fn to_markdown(&self) -> String {
        let mut out = format!(
            "# {}\n\n{}\n\n## Code Snippet\n\n```{}\n{}\n```\n\n## Audit Findings\n",
            self.title(),
            self.description(),
            self.language,
            self.code.trim_end()
        );
        for section in &self.sections {
            out.push_str(&format!("\n### {}. {}\n\n", section.number, section.name));
            match &section.body {
                SectionBody::Findings(text) => out.push_str(text.trim_end()),
                SectionBody::NoFindings => out.push_str("No findings for this section."),
                SectionBody::Failed(reason) => {
                    out.push_str(&format!("Section could not be generated: {reason}"))
                }
            }
            out.push('\n');
        }
        out
    }
}

/// Ask the model for the contract's name, falling back to [`UNKNOWN_CONTRACT`].
pub fn identify_contract<M: Model + ?Sized>(model: &M, code: &str, language: &str) -> String {
    match model.generate(&prompts::contract_name_prompt(code, language)) {
        Ok(name) => {
            let name = name.trim().trim_matches('`').trim();
            if name.is_empty() || name.contains('\n') {
                UNKNOWN_CONTRACT.to_string()
            } else {
                name.to_string()
            }
        }
        Err(e) => {
            tracing::warn!(target: TRACING_TARGET, "could not identify contract: {e}");
            UNKNOWN_CONTRACT.to_string()
        }
    }
}

/// Generate one section. Backend failures become [`SectionBody::Failed`].
pub fn generate_section<M: Model + ?Sized>(
    model: &M,
    code: &str,
    section: &str,
    contract: &str,
    language: &str,
) -> SectionBody {
    match model.generate(&prompts::section_prompt(code, section, contract, language)) {
        Ok(text) if text.trim().is_empty() => SectionBody::NoFindings,
        Ok(text) => SectionBody::Findings(text),
        Err(AiError::EmptyResponse) => SectionBody::NoFindings,
        Err(e) => {
            tracing::warn!(target: TRACING_TARGET, section, "section failed: {e}");
            SectionBody::Failed(e.to_string())
        }
    }
}

/// Build a full report. `on_section` is called as each section starts, so a
/// UI can show progress.
pub fn generate_report<M, F>(
    model: &M,
    code: &str,
    sections: &[String],
    language: &str,
    mut on_section: F,
) -> AuditReport
where
    M: Model + ?Sized,
    F: FnMut(usize, &str),
{
    let contract_name = identify_contract(model, code, language);
    let sections = sections
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            on_section(idx + 1, name);
            ReportSection {
                number: idx + 1,
                name: name.clone(),
                body: generate_section(model, code, name, &contract_name, language),
            }
        })
        .collect();

    AuditReport {
        contract_name,
        code: code.to_string(),
        language: language.to_string(),
        sections,
    }
}
