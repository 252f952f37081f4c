//! Prompt text sent to the generative backend.

use std::fmt::Write as _;

/// Section name that gets the narrative, code-block-per-finding layout.
pub const LINE_BY_LINE_SECTION: &str = "Line by Line Analysis";
/// Section name that gets the single-paragraph layout.
pub const CONCLUSION_SECTION: &str = "Conclusion";

const STYLE_RULES: &str = "Make important words bold using markdown `**word**` and wrap \
variables in backticks (e.g., `my_variable`).\nIf there are no findings for this section, \
return an empty string.";

/// How the model is asked to lay out one report section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionStyle {
    Bullets,
    Narrative,
    Paragraph,
}

impl SectionStyle {
    pub fn for_section(name: &str) -> Self {
        match name {
            LINE_BY_LINE_SECTION => SectionStyle::Narrative,
            CONCLUSION_SECTION => SectionStyle::Paragraph,
            _ => SectionStyle::Bullets,
        }
    }
}

/// Source listing with right-aligned line numbers, so the model can cite
/// exact 1-based line ranges.
pub fn numbered_listing(code: &str) -> String {
    let mut out = String::with_capacity(code.len() + code.len() / 8);
    for (idx, line) in code.lines().enumerate() {
        let _ = writeln!(out, "{:>4} | {}", idx + 1, line);
    }
    out
}

fn fenced(code: &str, language: &str) -> String {
    format!("```{language}\n{code}\n```")
}

/// Prompt requesting line-addressed fixes as a JSON array.
pub fn fix_prompt(code: &str, language: &str) -> String {
    format!(
        "You are an expert security auditor and code refactoring tool for Midnight smart contracts.
Analyze the following code for security, privacy, logic, and best-practice issues.
Your response MUST be a valid JSON array of objects. Each object represents a single issue and suggested fix.
Each JSON object must have the following keys:
- \"lineNumber\": The starting line number of the code to be replaced.
- \"endLineNumber\": The ending line number of the code block to be replaced. For a single-line change, this is the same as lineNumber.
- \"explanation\": A brief, one-sentence explanation of the issue and the fix.
- \"originalCode\": The exact original code of lines lineNumber through endLineNumber, without the line-number prefix.
- \"suggestedCode\": The exact code that should replace those lines.
Fixes must not overlap. If there are no issues, return an empty array [].
The code is listed with a line-number prefix (\"  12 | \") that is not part of the source.
Here is the code:
{}",
        fenced(numbered_listing(code).trim_end(), language)
    )
}

/// Prompt asking for the contract's name only.
pub fn contract_name_prompt(code: &str, language: &str) -> String {
    format!(
        "What is the name of the smart contract in this code? Return just the name as a plain string.\n\n{}",
        fenced(code, language)
    )
}

/// Prompt for one audit report section.
pub fn section_prompt(code: &str, section: &str, contract: &str, language: &str) -> String {
    let header = format!(
        "You are an expert security auditor for Midnight smart contracts.
Analyze the following code for the contract named '{contract}'.
I want you to provide the content for the '{section}' section of the audit report."
    );

    let layout = match SectionStyle::for_section(section) {
        SectionStyle::Paragraph => "Return your response as a single, unbroken line of text with no newlines.
The text should be a short, concise paragraph (max 150 words)."
            .to_string(),
        SectionStyle::Bullets => "Return your response as a list of bullet points, where each bullet point starts with a `- `.
Keep the text for each bullet point concise and readable.
If a bullet point contains a code snippet, place the snippet on a new line and indent it."
            .to_string(),
        SectionStyle::Narrative => format!(
            "Return the response as a single raw string, formatted with Markdown.
**Do not use bullet points for this section.**
For each line or block of code you are analyzing, first present the code inside a Markdown code block (using triple backticks),
then immediately follow it with your narrative analysis of that code.
For example:
{}
This line hardcodes the sender to be the contract owner...",
            fenced("const from = this.owner;", language)
        ),
    };

    format!(
        "{header}\n\n{layout}\n\n{STYLE_RULES}\n\nHere is the code:\n{}",
        fenced(code, language)
    )
}

/// First message of a chat session.
pub fn chat_system_prompt() -> String {
    "You are a helpful AI assistant specializing in Midnight smart contracts. \
Keep your answers concise and clear."
        .to_string()
}

/// Message injecting a file into the conversation.
pub fn file_context_prompt(path: &str, content: &str, initial: bool) -> String {
    let lead = if initial {
        "The user has provided the following file for context:"
    } else {
        "The user has requested to load a new file for context:"
    };
    format!("{lead}\n\n---\n{path}\n---\n\n{content}\n\n---")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_listing() {
        assert_eq!(numbered_listing("a\nb"), "   1 | a\n   2 | b\n");
        assert_eq!(numbered_listing(""), "");
    }

    #[test]
    fn test_section_style() {
        assert_eq!(
            SectionStyle::for_section("Line by Line Analysis"),
            SectionStyle::Narrative
        );
        assert_eq!(
            SectionStyle::for_section("Conclusion"),
            SectionStyle::Paragraph
        );
        assert_eq!(
            SectionStyle::for_section("Privacy Leaks"),
            SectionStyle::Bullets
        );
    }

    #[test]
    fn test_section_prompt_mentions_contract_and_section() {
        let prompt = section_prompt("x", "Logic Errors", "Token", "typescript");
        assert!(prompt.contains("contract named 'Token'"));
        assert!(prompt.contains("'Logic Errors' section"));
        assert!(prompt.contains("bullet points"));
        assert!(prompt.ends_with("```typescript\nx\n```"));
    }

    #[test]
    fn test_fix_prompt_lists_schema() {
        let prompt = fix_prompt("a", "compact");
        for key in ["lineNumber", "endLineNumber", "originalCode", "suggestedCode"] {
            assert!(prompt.contains(key));
        }
        assert!(prompt.contains("```compact\n   1 | a\n```"));
    }
}
